//! # Generation Module
//!
//! Procedural level generation: room-and-maze dungeons, rivers cut through
//! them, BSP towers standing in open grass, and stacks of flooded caves.
//!
//! Every generator works on a grid it allocates itself and draws only from
//! the RNG it is handed, so the same seed and [`GenerationConfig`] always
//! produce the same level. A failed attempt is thrown away whole and started
//! again; callers only ever see finished maps or
//! [`crate::DelveError::GenerationFailed`].

pub mod caves;
pub mod dungeon;
pub mod encounters;
pub mod items;
pub mod rivers;
pub mod tower;

pub use caves::*;
pub use dungeon::*;
pub use encounters::*;
pub use items::*;
pub use rivers::*;
pub use tower::*;

use crate::config::{DEFAULT_DUNGEON_HEIGHT, DEFAULT_DUNGEON_WIDTH};
use crate::utils::filled_circle;
use crate::{DelveResult, Map, Position};
use log::info;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Configuration for procedural generation.
///
/// Controls map size, how hard the dungeon generator tries before giving
/// up, and the tunables of the secondary generators. Loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Map width including the world border
    pub width: u32,
    /// Map height including the world border
    pub height: u32,
    /// Room placement samples per dungeon attempt
    pub room_attempts: u32,
    /// Share of sampled rooms that are circular (0.0 to 1.0)
    pub circular_room_chance: f64,
    /// Whole-map attempts before generation fails
    pub max_map_retries: u32,
    /// Region repair passes per attempt
    pub max_repair_passes: u32,
    /// Relative weight of closed doors when connecting a room
    pub closed_door_weight: u32,
    /// Relative weight of locked doors when connecting a room
    pub locked_door_weight: u32,
    /// Longest probing tunnel out of a circular room
    pub max_tunnel_length: u32,
    /// Chance to open a redundant connector during region repair
    pub extra_connector_chance: f64,
    /// Chance per pair of neighbouring rooms to get an extra door
    pub extra_loop_chance: f64,
    /// Widest a river may grow
    pub max_river_width: u32,
    /// Chance a river segment widens
    pub river_widen_chance: f64,
    /// Smallest room interior a tower split may leave
    pub tower_min_room: u32,
    /// Chance to merge two equal-sided neighbouring tower rooms
    pub tower_merge_chance: f64,
    /// Chance to trim each outer tower room
    pub tower_trim_chance: f64,
    /// Chance of an extra door between already connected tower rooms
    pub tower_extra_door_chance: f64,
    /// Number of stacked cave levels
    pub cave_levels: u32,
    /// Initial wall share of a cave grid
    pub cave_fill: f64,
    /// Cellular-automaton smoothing passes
    pub cave_smoothing_passes: u32,
    /// Smallest open share a cave level must keep
    pub cave_min_open: f64,
    /// Monsters per 100 floor tiles
    pub monster_density: f64,
    /// Items per 100 floor tiles
    pub item_density: f64,
}

impl GenerationConfig {
    /// Creates the default configuration for a seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.room_attempts, 75);
    /// assert!(config.width > 20);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: DEFAULT_DUNGEON_WIDTH,
            height: DEFAULT_DUNGEON_HEIGHT,
            room_attempts: 75,
            circular_room_chance: 0.2,
            max_map_retries: 20,
            max_repair_passes: 50,
            closed_door_weight: 4,
            locked_door_weight: 1,
            max_tunnel_length: 4,
            extra_connector_chance: 0.05,
            extra_loop_chance: 0.15,
            max_river_width: 3,
            river_widen_chance: 0.25,
            tower_min_room: 3,
            tower_merge_chance: 0.2,
            tower_trim_chance: 0.35,
            tower_extra_door_chance: 0.15,
            cave_levels: 3,
            cave_fill: 0.45,
            cave_smoothing_passes: 5,
            cave_min_open: 0.3,
            monster_density: 1.0,
            item_density: 0.8,
        }
    }

    /// Creates a configuration for testing with smaller levels.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            width: 41,
            height: 25,
            room_attempts: 40,
            monster_density: 0.5,
            item_density: 0.5,
            ..Self::new(seed)
        }
    }

    /// Loads a configuration from a JSON file. Missing fields take their
    /// defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        info!("Loaded generation config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> DelveResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Outline of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomShape {
    Rectangular,
    Circular,
}

/// A room stamped during generation.
///
/// Holds its floor cells and its perimeter, the ring of non-floor cells
/// touching the floor (diagonals included). Rooms only live as long as the
/// generator that built them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: usize,
    pub shape: RoomShape,
    pub floor: BTreeSet<Position>,
    pub perimeter: BTreeSet<Position>,
    /// Top-left and bottom-right floor corners of the bounding box
    pub bounds: (Position, Position),
}

impl Room {
    fn from_floor(id: usize, shape: RoomShape, floor: BTreeSet<Position>) -> Self {
        let perimeter = floor
            .iter()
            .flat_map(|p| p.adjacent_positions())
            .filter(|p| !floor.contains(p))
            .collect();
        let min_x = floor.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = floor.iter().map(|p| p.y).min().unwrap_or(0);
        let max_x = floor.iter().map(|p| p.x).max().unwrap_or(0);
        let max_y = floor.iter().map(|p| p.y).max().unwrap_or(0);
        Self {
            id,
            shape,
            floor,
            perimeter,
            bounds: (Position::new(min_x, min_y), Position::new(max_x, max_y)),
        }
    }

    /// A rectangle of floor with its top-left corner at `top_left`.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Position, Room};
    ///
    /// let room = Room::rectangular(0, Position::new(1, 1), 5, 3);
    /// assert_eq!(room.floor.len(), 15);
    /// assert_eq!(room.perimeter.len(), 7 * 5 - 15);
    /// assert!(room.is_perimeter(Position::new(0, 0)));
    /// ```
    pub fn rectangular(id: usize, top_left: Position, width: u32, height: u32) -> Self {
        let floor = (0..height as i32)
            .flat_map(|dy| (0..width as i32).map(move |dx| top_left + Position::new(dx, dy)))
            .collect();
        Self::from_floor(id, RoomShape::Rectangular, floor)
    }

    /// A disc: the midpoint-circle outline plus every cell inside it.
    pub fn circular(id: usize, center: Position, radius: i32) -> Self {
        let floor = filled_circle(center, radius).into_iter().collect();
        Self::from_floor(id, RoomShape::Circular, floor)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.floor.contains(&pos)
    }

    pub fn is_perimeter(&self, pos: Position) -> bool {
        self.perimeter.contains(&pos)
    }

    /// Whether stamping the room would break into anything already carved.
    ///
    /// Every floor cell must lie strictly inside the map and every floor and
    /// perimeter cell must still be solid wall.
    pub fn overlaps_map(&self, map: &Map) -> bool {
        let inside = |p: &Position| map.is_valid_position(*p) && !map.is_edge(*p);
        if !self.floor.iter().all(inside) {
            return true;
        }
        self.floor
            .iter()
            .chain(self.perimeter.iter())
            .any(|&p| map.get_tile(p).map_or(true, |t| !t.is_wall_like()))
    }

    pub fn center(&self) -> Position {
        let (min, max) = self.bounds;
        Position::new((min.x + max.x) / 2, (min.y + max.y) / 2)
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number
    /// generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DelveResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Helpers shared by the generators.
pub mod utils {
    use crate::{DelveError, DelveResult, Map, Position, TileType};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use super::GenerationConfig;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }

    fn is_plain_floor(tile: TileType) -> bool {
        matches!(tile, TileType::Floor | TileType::Underwater)
    }

    /// Puts one up and one down staircase on two distinct floor cells.
    ///
    /// Returns `(up, down)`.
    pub fn place_stairs(map: &mut Map, rng: &mut StdRng) -> DelveResult<(Position, Position)> {
        let floors = map.positions_where(is_plain_floor);
        let picked: Vec<Position> = floors.choose_multiple(rng, 2).copied().collect();
        let &[up, down] = picked.as_slice() else {
            return Err(DelveError::GenerationFailed(
                "not enough floor for two staircases".to_string(),
            ));
        };
        map.set_tile(up, TileType::UpStairs)?;
        map.set_tile(down, TileType::DownStairs)?;
        Ok((up, down))
    }

    /// A random plain floor cell.
    pub fn random_floor(map: &Map, rng: &mut StdRng) -> Option<Position> {
        map.positions_where(is_plain_floor).choose(rng).copied()
    }

    /// Seals the outermost ring of a map with world border.
    pub fn seal_border(map: &mut Map) -> DelveResult<()> {
        let edge: Vec<Position> = map.positions().filter(|&p| map.is_edge(p)).collect();
        for pos in edge {
            map.set_tile(pos, TileType::WorldBorder)?;
        }
        Ok(())
    }

    /// Checks that a finished level is sealed by world border and that its
    /// walkable cells form a single region.
    pub fn validate_level(map: &Map) -> DelveResult<()> {
        if let Some(breach) = map
            .positions()
            .find(|&p| map.is_edge(p) && map.tile_or_border(p) != TileType::WorldBorder)
        {
            return Err(DelveError::GenerationFailed(format!(
                "border breached at {}",
                breach
            )));
        }
        let regions = map.regions(TileType::is_open_ground);
        match regions.count() {
            0 => Err(DelveError::GenerationFailed("level has no floor".to_string())),
            1 => Ok(()),
            n => Err(DelveError::GenerationFailed(format!(
                "level split into {} regions",
                n
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileType;

    #[test]
    fn test_config_presets() {
        let config = GenerationConfig::new(3);
        assert_eq!(config.seed, 3);
        assert_eq!(config.cave_levels, 3);
        let small = GenerationConfig::for_testing(3);
        assert!(small.width < config.width);
        assert_eq!(small.max_map_retries, config.max_map_retries);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GenerationConfig = serde_json::from_str(r#"{"seed": 99, "width": 31}"#).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.width, 31);
        assert_eq!(config.room_attempts, 75);
    }

    #[test]
    fn test_circular_room_shape() {
        let room = Room::circular(1, Position::new(10, 10), 3);
        assert_eq!(room.shape, RoomShape::Circular);
        assert!(room.contains(Position::new(10, 10)));
        assert!(room.contains(Position::new(13, 10)));
        assert!(!room.contains(Position::new(14, 10)));
        assert!(room.is_perimeter(Position::new(14, 10)));
        assert_eq!(room.bounds, (Position::new(7, 7), Position::new(13, 13)));
    }

    #[test]
    fn test_overlap_checks() {
        let mut map = Map::new(20, 12, TileType::Wall);
        let room = Room::rectangular(0, Position::new(1, 1), 5, 5);
        assert!(!room.overlaps_map(&map));
        for &p in &room.floor {
            map.set_tile(p, TileType::Floor).unwrap();
        }
        // floor on the first room's perimeter is an overlap, a shared wall is not
        assert!(Room::rectangular(1, Position::new(6, 1), 5, 5).overlaps_map(&map));
        assert!(!Room::rectangular(1, Position::new(7, 1), 5, 5).overlaps_map(&map));
        // running off the grid too
        assert!(Room::rectangular(2, Position::new(15, 1), 5, 5).overlaps_map(&map));
    }

    #[test]
    fn test_validate_level() {
        let mut map = Map::new(8, 6, TileType::Floor);
        utils::seal_border(&mut map).unwrap();
        assert!(utils::validate_level(&map).is_ok());

        map.set_tile(Position::new(0, 3), TileType::Floor).unwrap();
        assert!(utils::validate_level(&map).is_err());

        utils::seal_border(&mut map).unwrap();
        for y in 1..5 {
            map.set_tile(Position::new(4, y), TileType::Wall).unwrap();
        }
        assert!(utils::validate_level(&map).is_err());
    }
}
