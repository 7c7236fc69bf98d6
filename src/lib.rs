//! # Delve
//!
//! Rules and simulation core for a single-player, turn-based dungeon crawler.
//!
//! ## Architecture Overview
//!
//! The core is made of three subsystems that share one mutable world aggregate,
//! the [`GameState`]:
//!
//! - **Generation**: procedural levels (room-and-maze dungeons, rivers, towers,
//!   underwater caves), produced as freshly owned [`Map`] values
//! - **Traits**: the status-effect system attached to actors and items, with a
//!   textual serialization format and a factory to rebuild instances
//! - **AI**: behaviour trees that pick exactly one action per monster turn
//!
//! The event bus delivers the end-of-round phase to every registered trait
//! after all actors have acted. Nothing here is threaded; generators only touch
//! their own grid and the RNG they are handed, so a level can be built elsewhere
//! and moved into the game by value.

pub mod ai;
pub mod game;
pub mod generation;
pub mod traits;
pub mod utils;

// Core module re-exports
pub use ai::*;
pub use game::*;
pub use generation::*;
pub use traits::*;
pub use utils::*;

// Explicit re-exports for commonly used types
pub use game::{
    Action, ActionResult, Attitude, Attribute, Direction, EventBus, EventType, GameObject,
    GameState, ListenerId, Map, ObjId, ObjectDb, ObjectKind, Position, Stat, TileType, TurnRunner,
};

pub use generation::{
    DungeonGenerator, GenerationConfig, Generator, Room, RoomShape, TowerGenerator,
    UnderwaterCaveGenerator,
};

pub use traits::{DamageType, Tag, Trait, TraitFactory};

/// Core error type for the Delve engine.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Generation exhausted its retry budget
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// A trait's text could not be turned back into a trait
    #[error("Cannot parse trait '{text}': {reason}")]
    TraitParse { text: String, reason: String },

    /// A map coordinate outside the grid
    #[error("Position ({x}, {y}) is outside the map")]
    OutOfBounds { x: i32, y: i32 },
}

impl DelveError {
    pub(crate) fn trait_parse(text: &str, reason: impl Into<String>) -> Self {
        DelveError::TraitParse {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine-wide constants.
pub mod config {
    /// Default dungeon width in tiles
    pub const DEFAULT_DUNGEON_WIDTH: u32 = 81;

    /// Default dungeon height in tiles
    pub const DEFAULT_DUNGEON_HEIGHT: u32 = 33;

    /// Default player starting health
    pub const DEFAULT_PLAYER_HEALTH: i32 = 30;

    /// Sight radius used when nothing else reduces it
    pub const DEFAULT_VISION_RADIUS: i32 = 9;

    /// Vision radius while blind
    pub const BLIND_VISION_RADIUS: i32 = 1;

    /// Game clock minute at turn zero (09:00)
    pub const CLOCK_START_MINUTE: u64 = 9 * 60;

    /// How far a fleeing monster looks for a safer cell
    pub const FLEE_LOOKAHEAD: i32 = 4;

    /// Light radius of a lit torch
    pub const TORCH_LIGHT_RADIUS: i32 = 10;

    /// Upper bound on behaviour node evaluations in one monster turn
    pub const MAX_NODE_EVALUATIONS: u32 = 512;
}
