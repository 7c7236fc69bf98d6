//! # Utilities Module
//!
//! Grid mathematics, field of view and pathfinding services used by the
//! generators, the trait system and the planner.

pub mod fov;
pub mod math;
pub mod navigation;

pub use self::fov::*;
pub use self::math::*;
pub use self::navigation::*;
