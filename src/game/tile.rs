//! # Tiles
//!
//! Tile types and their shared, immutable descriptors.
//!
//! Every [`TileType`] maps to one static [`TileProps`] record, so a map stores
//! only the small `Copy` enum per cell. Doors keep their open/closed/locked
//! state by being distinct tile types.

use serde::{Deserialize, Serialize};

/// Special behaviour a tile carries beyond its movement flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileBehaviour {
    None,
    Door,
    Stairs,
    Bridge,
    Water,
    Chasm,
    Altar,
}

/// Shared descriptor for a tile type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileProps {
    pub name: &'static str,
    pub glyph: char,
    /// Walkable on foot
    pub passable: bool,
    /// Crossable by flying or floating creatures
    pub flyable: bool,
    /// Crossable by swimmers
    pub swimmable: bool,
    /// Blocks line of sight
    pub opaque: bool,
    pub behaviour: TileBehaviour,
}

/// Kinds of map cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileType {
    /// Indestructible ring around every generated map
    WorldBorder,
    PermWall,
    Wall,
    Floor,
    ClosedDoor,
    OpenDoor,
    LockedDoor,
    Bridge,
    /// Shallow water, wadeable
    Water,
    DeepWater,
    /// Flooded cave floor
    Underwater,
    Chasm,
    UpStairs,
    DownStairs,
    Altar,
    Grass,
}

const fn props(
    name: &'static str,
    glyph: char,
    passable: bool,
    flyable: bool,
    swimmable: bool,
    opaque: bool,
    behaviour: TileBehaviour,
) -> TileProps {
    TileProps {
        name,
        glyph,
        passable,
        flyable,
        swimmable,
        opaque,
        behaviour,
    }
}

static WORLD_BORDER: TileProps = props("world edge", ' ', false, false, false, true, TileBehaviour::None);
static PERM_WALL: TileProps = props("wall", '#', false, false, false, true, TileBehaviour::None);
static WALL: TileProps = props("wall", '#', false, false, false, true, TileBehaviour::None);
static FLOOR: TileProps = props("floor", '.', true, true, true, false, TileBehaviour::None);
static CLOSED_DOOR: TileProps = props("closed door", '+', false, false, false, true, TileBehaviour::Door);
static OPEN_DOOR: TileProps = props("open door", '\'', true, true, true, false, TileBehaviour::Door);
static LOCKED_DOOR: TileProps = props("locked door", '+', false, false, false, true, TileBehaviour::Door);
static BRIDGE: TileProps = props("bridge", '=', true, true, true, false, TileBehaviour::Bridge);
static WATER: TileProps = props("shallow water", '~', true, true, true, false, TileBehaviour::Water);
static DEEP_WATER: TileProps = props("deep water", '}', false, true, true, false, TileBehaviour::Water);
static UNDERWATER: TileProps = props("flooded floor", ',', true, true, true, false, TileBehaviour::Water);
static CHASM: TileProps = props("chasm", ':', false, true, false, false, TileBehaviour::Chasm);
static UP_STAIRS: TileProps = props("stairs up", '<', true, true, true, false, TileBehaviour::Stairs);
static DOWN_STAIRS: TileProps = props("stairs down", '>', true, true, true, false, TileBehaviour::Stairs);
static ALTAR: TileProps = props("altar", '_', true, true, true, false, TileBehaviour::Altar);
static GRASS: TileProps = props("grass", '"', true, true, true, false, TileBehaviour::None);

impl TileType {
    /// Returns the shared descriptor for this tile type.
    pub fn props(self) -> &'static TileProps {
        match self {
            TileType::WorldBorder => &WORLD_BORDER,
            TileType::PermWall => &PERM_WALL,
            TileType::Wall => &WALL,
            TileType::Floor => &FLOOR,
            TileType::ClosedDoor => &CLOSED_DOOR,
            TileType::OpenDoor => &OPEN_DOOR,
            TileType::LockedDoor => &LOCKED_DOOR,
            TileType::Bridge => &BRIDGE,
            TileType::Water => &WATER,
            TileType::DeepWater => &DEEP_WATER,
            TileType::Underwater => &UNDERWATER,
            TileType::Chasm => &CHASM,
            TileType::UpStairs => &UP_STAIRS,
            TileType::DownStairs => &DOWN_STAIRS,
            TileType::Altar => &ALTAR,
            TileType::Grass => &GRASS,
        }
    }

    /// Walkable on foot right now.
    pub fn is_passable(self) -> bool {
        self.props().passable
    }

    pub fn is_opaque(self) -> bool {
        self.props().opaque
    }

    pub fn is_door(self) -> bool {
        self.props().behaviour == TileBehaviour::Door
    }

    /// Part of the walkable network once doors are considered openable.
    ///
    /// This is the predicate the generators use for connectivity: floors,
    /// doors of every state, bridges, stairs and the other walkable cells.
    pub fn is_open_ground(self) -> bool {
        self.is_passable() || self.is_door()
    }

    pub fn is_wall_like(self) -> bool {
        matches!(
            self,
            TileType::Wall | TileType::PermWall | TileType::WorldBorder
        )
    }

    pub fn glyph(self) -> char {
        self.props().glyph
    }

    pub fn name(self) -> &'static str {
        self.props().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props_are_shared() {
        let a = TileType::Floor.props() as *const TileProps;
        let b = TileType::Floor.props() as *const TileProps;
        assert_eq!(a, b);
    }

    #[test]
    fn test_door_states() {
        assert!(!TileType::ClosedDoor.is_passable());
        assert!(TileType::OpenDoor.is_passable());
        assert!(TileType::LockedDoor.is_door());
        assert!(TileType::LockedDoor.is_open_ground());
        assert!(TileType::ClosedDoor.is_opaque());
    }

    #[test]
    fn test_movement_classes() {
        let deep = TileType::DeepWater.props();
        assert!(!deep.passable);
        assert!(deep.flyable);
        assert!(deep.swimmable);

        let chasm = TileType::Chasm.props();
        assert!(chasm.flyable);
        assert!(!chasm.swimmable);

        assert!(!TileType::WorldBorder.is_open_ground());
        assert!(TileType::Bridge.is_open_ground());
    }
}
