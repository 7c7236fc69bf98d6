//! # Navigation
//!
//! Terrain cost tables, A* paths and Dijkstra distance fields for monster
//! movement, built on the `pathfinding` crate.

use crate::{GameObject, Map, Position, Tag, TileBehaviour, TileType};
use pathfinding::prelude::{astar, dijkstra, dijkstra_all};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Extra cost of stepping into a closed door for door-aware movers.
pub const DOOR_COST: u32 = 3;

/// Movement families sharing one escape map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveClass {
    Walker,
    DoorOpener,
    Flyer,
    Swimmer,
}

/// Per-mover terrain cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelCosts {
    /// Cost of a closed door, `None` when the mover cannot open doors
    pub doors: Option<u32>,
    pub flying: bool,
    pub swimming: bool,
}

impl TravelCosts {
    pub fn walker() -> Self {
        Self {
            doors: None,
            flying: false,
            swimming: false,
        }
    }

    /// Builds the table from an actor's tags.
    pub fn for_object(obj: &GameObject) -> Self {
        let traits = &obj.traits;
        Self {
            doors: if traits.has_tag(Tag::Intelligent) {
                Some(DOOR_COST)
            } else {
                None
            },
            flying: traits.has_tag(Tag::Flying) || traits.has_tag(Tag::Floating),
            swimming: traits.has_tag(Tag::Swimmer),
        }
    }

    pub fn for_class(class: MoveClass) -> Self {
        match class {
            MoveClass::Walker => Self::walker(),
            MoveClass::DoorOpener => Self {
                doors: Some(DOOR_COST),
                ..Self::walker()
            },
            MoveClass::Flyer => Self {
                flying: true,
                ..Self::walker()
            },
            MoveClass::Swimmer => Self {
                swimming: true,
                ..Self::walker()
            },
        }
    }

    pub fn move_class(&self) -> MoveClass {
        if self.flying {
            MoveClass::Flyer
        } else if self.swimming {
            MoveClass::Swimmer
        } else if self.doors.is_some() {
            MoveClass::DoorOpener
        } else {
            MoveClass::Walker
        }
    }

    /// Cost of entering a tile, `None` if it cannot be entered.
    pub fn cost(&self, tile: TileType) -> Option<u32> {
        let props = tile.props();
        if tile == TileType::ClosedDoor {
            return self.doors;
        }
        if props.passable {
            let wading = props.behaviour == TileBehaviour::Water && !(self.flying || self.swimming);
            return Some(if wading { 2 } else { 1 });
        }
        if (self.flying && props.flyable) || (self.swimming && props.swimmable) {
            return Some(1);
        }
        None
    }

    /// Whether the mover can stand on the tile right now, without opening it.
    pub fn can_enter(&self, tile: TileType) -> bool {
        tile != TileType::ClosedDoor && self.cost(tile).is_some()
    }
}

fn successors(map: &Map, costs: &TravelCosts, pos: Position, goals: &HashSet<Position>) -> Vec<(Position, u32)> {
    map.neighbours(pos)
        .into_iter()
        .filter_map(|next| {
            if goals.contains(&next) {
                return Some((next, 1));
            }
            costs.cost(map.tile_or_border(next)).map(|c| (next, c))
        })
        .collect()
}

/// Shortest 8-way path from `from` to `to`, excluding the start cell.
///
/// The goal cell itself is always enterable, so a path can end on an
/// occupied or impassable target.
pub fn find_path(map: &Map, from: Position, to: Position, costs: &TravelCosts) -> Option<Vec<Position>> {
    if from == to {
        return Some(Vec::new());
    }
    let goals: HashSet<Position> = [to].into_iter().collect();
    let (path, _) = astar(
        &from,
        |&p| successors(map, costs, p, &goals),
        |&p| p.chebyshev_distance(to),
        |&p| p == to,
    )?;
    Some(path.into_iter().skip(1).collect())
}

/// Shortest path to whichever goal is closest, excluding the start cell.
pub fn find_path_to_nearest(
    map: &Map,
    from: Position,
    goals: &HashSet<Position>,
    costs: &TravelCosts,
) -> Option<Vec<Position>> {
    if goals.is_empty() {
        return None;
    }
    if goals.contains(&from) {
        return Some(Vec::new());
    }
    let (path, _) = dijkstra(
        &from,
        |&p| successors(map, costs, p, goals),
        |p| goals.contains(p),
    )?;
    Some(path.into_iter().skip(1).collect())
}

/// Distances from one origin to every reachable cell.
#[derive(Debug, Clone)]
pub struct DijkstraMap {
    pub origin: Position,
    distances: HashMap<Position, u32>,
}

impl DijkstraMap {
    pub fn new(map: &Map, origin: Position, costs: &TravelCosts) -> Self {
        let none = HashSet::new();
        let mut distances: HashMap<Position, u32> =
            dijkstra_all(&origin, |&p| successors(map, costs, p, &none))
                .into_iter()
                .map(|(pos, (_, cost))| (pos, cost))
                .collect();
        distances.insert(origin, 0);
        Self { origin, distances }
    }

    pub fn distance(&self, pos: Position) -> Option<u32> {
        self.distances.get(&pos).copied()
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Next step away from the origin.
    ///
    /// Looks for the farthest reachable cell within `radius` of `from` and
    /// returns the free neighbour that heads towards it. `None` when
    /// cornered.
    pub fn escape_step<F>(&self, from: Position, radius: i32, blocked: F) -> Option<Position>
    where
        F: Fn(Position) -> bool,
    {
        let here = self.distance(from).unwrap_or(0);
        let mut best: Option<(u32, Position)> = None;
        for y in (from.y - radius)..=(from.y + radius) {
            for x in (from.x - radius)..=(from.x + radius) {
                let cell = Position::new(x, y);
                if let Some(d) = self.distance(cell) {
                    let better = match best {
                        None => true,
                        Some((bd, bp)) => d > bd || (d == bd && cell < bp),
                    };
                    if better {
                        best = Some((d, cell));
                    }
                }
            }
        }
        let (target_distance, target) = best?;
        if target_distance <= here {
            return None;
        }

        from.adjacent_positions()
            .into_iter()
            .filter(|&n| !blocked(n))
            .filter_map(|n| self.distance(n).map(|d| (n, d)))
            .filter(|&(_, d)| d >= here)
            .min_by_key(|&(n, d)| (n.chebyshev_distance(target), u32::MAX - d, n))
            .map(|(n, _)| n)
    }

    /// Neighbour of `from` closest to the origin.
    pub fn approach_step<F>(&self, from: Position, blocked: F) -> Option<Position>
    where
        F: Fn(Position) -> bool,
    {
        let here = self.distance(from)?;
        from.adjacent_positions()
            .into_iter()
            .filter(|&n| !blocked(n) || n == self.origin)
            .filter_map(|n| self.distance(n).map(|d| (n, d)))
            .filter(|&(_, d)| d < here)
            .min_by_key(|&(n, d)| (d, n))
            .map(|(n, _)| n)
    }
}
