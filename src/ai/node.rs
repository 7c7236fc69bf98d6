//! Core node trait and evaluation status.

use crate::config::MAX_NODE_EVALUATIONS;
use crate::{GameState, ObjId};
use log::warn;

/// Result of evaluating a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
    /// The node has more to do and wants to be resumed next turn
    Running,
}

/// A node of a behaviour tree.
///
/// Nodes may keep state between calls (a cursor, a remembered path); that
/// state belongs to the monster whose plan holds the node.
pub trait BehaviourNode {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status;
}

/// Owned, dynamically dispatched node.
pub type Node = Box<dyn BehaviourNode>;

impl BehaviourNode for Box<dyn BehaviourNode> {
    #[inline]
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        (**self).execute(actor, gs)
    }
}

/// Evaluates a child, charging it to the turn's evaluation budget.
///
/// Once the budget is spent every further child fails, which unwinds the
/// tree to the planner's fallback.
pub fn tick(node: &mut dyn BehaviourNode, actor: ObjId, gs: &mut GameState) -> Status {
    if gs.node_evaluations >= MAX_NODE_EVALUATIONS {
        if gs.node_evaluations == MAX_NODE_EVALUATIONS {
            warn!("Object {} exhausted its behaviour budget", actor);
            gs.node_evaluations += 1;
        }
        return Status::Failure;
    }
    gs.node_evaluations += 1;
    node.execute(actor, gs)
}

/// Leaf built from a closure, for one-off checks and tests.
pub struct FnNode<F>
where
    F: FnMut(ObjId, &mut GameState) -> Status,
{
    f: F,
}

impl<F> FnNode<F>
where
    F: FnMut(ObjId, &mut GameState) -> Status,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> BehaviourNode for FnNode<F>
where
    F: FnMut(ObjId, &mut GameState) -> Status,
{
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        (self.f)(actor, gs)
    }
}

/// Boxes a closure leaf.
pub fn leaf<F>(f: F) -> Node
where
    F: FnMut(ObjId, &mut GameState) -> Status + 'static,
{
    Box::new(FnNode::new(f))
}

/// Maps a boolean to `Success`/`Failure`.
pub fn status_of(ok: bool) -> Status {
    if ok {
        Status::Success
    } else {
        Status::Failure
    }
}
