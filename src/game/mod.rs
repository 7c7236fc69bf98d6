//! # Game Module
//!
//! Core world representation shared by the generators, the trait system and
//! the planner.
//!
//! This module contains the fundamental building blocks of Delve:
//! - Tiles and the spatial map
//! - The object directory holding actors and items
//! - The event bus that drives periodic trait effects
//! - Actions and the turn runner

pub mod actions;
pub mod events;
pub mod map;
pub mod objects;
pub mod state;
pub mod tile;
pub mod turns;

pub use actions::*;
pub use events::*;
pub use map::*;
pub use objects::*;
pub use state::*;
pub use tile::*;
pub use turns::*;

use serde::{Deserialize, Serialize};

/// Represents a 2D coordinate in the game world.
///
/// # Examples
///
/// ```
/// use delve::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
///
/// let adjacent = pos.adjacent_positions();
/// assert_eq!(adjacent.len(), 8); // All 8 surrounding positions
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the origin position (0, 0).
    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// Chessboard distance, the number of 8-way steps between two cells.
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        (self.x - other.x).abs().max((self.y - other.y).abs()) as u32
    }

    /// Calculates the Euclidean distance to another position.
    pub fn euclidean_distance(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when the two positions touch, diagonals included.
    pub fn is_adjacent(self, other: Position) -> bool {
        self != other && self.chebyshev_distance(other) == 1
    }

    /// Returns all 8 adjacent positions (including diagonals).
    pub fn adjacent_positions(self) -> Vec<Position> {
        vec![
            Position::new(self.x - 1, self.y - 1), // NW
            Position::new(self.x, self.y - 1),     // N
            Position::new(self.x + 1, self.y - 1), // NE
            Position::new(self.x - 1, self.y),     // W
            Position::new(self.x + 1, self.y),     // E
            Position::new(self.x - 1, self.y + 1), // SW
            Position::new(self.x, self.y + 1),     // S
            Position::new(self.x + 1, self.y + 1), // SE
        ]
    }

    /// Returns only the 4 cardinal adjacent positions (no diagonals).
    pub fn cardinal_adjacent_positions(self) -> Vec<Position> {
        vec![
            Position::new(self.x, self.y - 1), // N
            Position::new(self.x - 1, self.y), // W
            Position::new(self.x + 1, self.y), // E
            Position::new(self.x, self.y + 1), // S
        ]
    }

    /// Moves one step in the given direction.
    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Directions for movement and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    /// Converts a direction to a position delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Direction, Position};
    ///
    /// let delta = Direction::North.to_delta();
    /// assert_eq!(delta, Position::new(0, -1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(0, -1),
            Direction::South => Position::new(0, 1),
            Direction::East => Position::new(1, 0),
            Direction::West => Position::new(-1, 0),
            Direction::Northeast => Position::new(1, -1),
            Direction::Northwest => Position::new(-1, -1),
            Direction::Southeast => Position::new(1, 1),
            Direction::Southwest => Position::new(-1, 1),
        }
    }

    /// Converts a position delta to a direction.
    ///
    /// Returns None if the delta doesn't correspond to a valid direction.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        match (delta.x, delta.y) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            (1, -1) => Some(Direction::Northeast),
            (-1, -1) => Some(Direction::Northwest),
            (1, 1) => Some(Direction::Southeast),
            (-1, 1) => Some(Direction::Southwest),
            _ => None,
        }
    }

    /// Returns all 8 directions.
    pub fn all() -> Vec<Direction> {
        vec![
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::Northeast,
            Direction::Northwest,
            Direction::Southeast,
            Direction::Southwest,
        ]
    }

    /// Returns only the 4 cardinal directions.
    pub fn cardinal() -> Vec<Direction> {
        vec![
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ]
    }
}

/// Stable numeric identifier for actors and items.
pub type ObjId = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_creation() {
        let pos = Position::new(5, 10);
        assert_eq!(pos.x, 5);
        assert_eq!(pos.y, 10);
    }

    #[test]
    fn test_position_distances() {
        let pos1 = Position::new(0, 0);
        let pos2 = Position::new(3, 4);
        assert_eq!(pos1.manhattan_distance(pos2), 7);
        assert_eq!(pos1.chebyshev_distance(pos2), 4);
        assert_eq!(pos1.euclidean_distance(pos2), 5.0);
    }

    #[test]
    fn test_position_adjacency() {
        let pos = Position::new(5, 5);
        assert!(pos.is_adjacent(Position::new(6, 6)));
        assert!(!pos.is_adjacent(Position::new(7, 5)));
        assert!(!pos.is_adjacent(pos));

        let cardinal = pos.cardinal_adjacent_positions();
        assert_eq!(cardinal.len(), 4);
        assert!(cardinal.contains(&Position::new(5, 4)));
        assert!(!cardinal.contains(&Position::new(4, 4)));
    }

    #[test]
    fn test_position_arithmetic() {
        let pos1 = Position::new(5, 10);
        let pos2 = Position::new(3, 2);
        assert_eq!(pos1 + pos2, Position::new(8, 12));
        assert_eq!(pos1 - pos2, Position::new(2, 8));
        assert_eq!(pos1.step(Direction::Southwest), Position::new(4, 11));
    }

    #[test]
    fn test_direction_round_trip() {
        for direction in Direction::all() {
            assert_eq!(Direction::from_delta(direction.to_delta()), Some(direction));
        }
        assert_eq!(Direction::from_delta(Position::new(2, 0)), None);
    }
}
