//! # AI Module
//!
//! Behaviour trees that choose one action per monster turn.
//!
//! Trees are composed from:
//! - composites ([`Sequence`], [`Selector`], [`RepeatWhile`], [`Not`],
//!   [`PickRandom`], [`PickWithOdds`]) that keep a cursor across turns
//! - condition leaves that only read the game state
//! - task leaves that issue exactly one [`crate::Action`]
//!
//! A plan is a tree built once per monster from a named archetype and kept
//! by the [`Planner`] for as long as the monster lives, so cursors and cached
//! paths carry over from one turn to the next.

pub mod composite;
pub mod conditions;
pub mod node;
pub mod paths;
pub mod planner;
pub mod plans;
pub mod tasks;

pub use composite::*;
pub use conditions::*;
pub use node::*;
pub use paths::*;
pub use planner::*;
pub use plans::*;
pub use tasks::*;
