//! Composite nodes.
//!
//! `Sequence` and `Selector` remember where they stopped: a child returning
//! `Running` is resumed first on the next call, instead of re-evaluating its
//! earlier siblings.

use super::node::{tick, BehaviourNode, Node, Status};
use crate::{GameState, ObjId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Runs children in order until one fails.
///
/// Failure resets the cursor and fails; running off the end resets it and
/// succeeds.
pub struct Sequence {
    children: Vec<Node>,
    cursor: usize,
}

impl Sequence {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children, cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl BehaviourNode for Sequence {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        while self.cursor < self.children.len() {
            match tick(self.children[self.cursor].as_mut(), actor, gs) {
                Status::Success => self.cursor += 1,
                Status::Failure => {
                    self.cursor = 0;
                    return Status::Failure;
                }
                Status::Running => return Status::Running,
            }
        }
        self.cursor = 0;
        Status::Success
    }
}

/// Runs children in order until one succeeds.
pub struct Selector {
    children: Vec<Node>,
    cursor: usize,
}

impl Selector {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children, cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn insert(&mut self, index: usize, child: Node) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    pub(crate) fn push(&mut self, child: Node) {
        self.children.push(child);
    }
}

impl BehaviourNode for Selector {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        while self.cursor < self.children.len() {
            match tick(self.children[self.cursor].as_mut(), actor, gs) {
                Status::Failure => self.cursor += 1,
                Status::Success => {
                    self.cursor = 0;
                    return Status::Success;
                }
                Status::Running => return Status::Running,
            }
        }
        self.cursor = 0;
        Status::Failure
    }
}

/// Runs the child while the condition holds, re-checked on every call.
pub struct RepeatWhile {
    condition: Node,
    child: Node,
}

impl RepeatWhile {
    pub fn new(condition: Node, child: Node) -> Self {
        Self { condition, child }
    }
}

impl BehaviourNode for RepeatWhile {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        match tick(self.condition.as_mut(), actor, gs) {
            Status::Success => tick(self.child.as_mut(), actor, gs),
            _ => Status::Failure,
        }
    }
}

/// Inverts its child. `Running` counts as success.
pub struct Not {
    child: Node,
}

impl Not {
    pub fn new(child: Node) -> Self {
        Self { child }
    }
}

impl BehaviourNode for Not {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        match tick(self.child.as_mut(), actor, gs) {
            Status::Success => Status::Failure,
            Status::Failure | Status::Running => Status::Success,
        }
    }
}

/// Succeeds whatever its child does.
pub struct Succeed {
    child: Node,
}

impl Succeed {
    pub fn new(child: Node) -> Self {
        Self { child }
    }
}

impl BehaviourNode for Succeed {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        match tick(self.child.as_mut(), actor, gs) {
            Status::Running => Status::Running,
            _ => Status::Success,
        }
    }
}

/// Runs one child picked uniformly at random. A running child is resumed
/// before a new pick is made.
pub struct PickRandom {
    children: Vec<Node>,
    running: Option<usize>,
}

impl PickRandom {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            running: None,
        }
    }
}

impl BehaviourNode for PickRandom {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        if self.children.is_empty() {
            return Status::Failure;
        }
        let index = match self.running.take() {
            Some(index) => index,
            None => gs.rng.gen_range(0..self.children.len()),
        };
        let status = tick(self.children[index].as_mut(), actor, gs);
        if status == Status::Running {
            self.running = Some(index);
        }
        status
    }
}

/// Runs one child picked with weighted odds.
pub struct PickWithOdds {
    children: Vec<Node>,
    odds: Option<WeightedIndex<u32>>,
    running: Option<usize>,
}

impl PickWithOdds {
    /// Children paired with their relative weights. All-zero weights make
    /// the node fail.
    pub fn new(weighted: Vec<(u32, Node)>) -> Self {
        let (weights, children): (Vec<u32>, Vec<Node>) = weighted.into_iter().unzip();
        Self {
            children,
            odds: WeightedIndex::new(weights).ok(),
            running: None,
        }
    }
}

impl BehaviourNode for PickWithOdds {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        let index = match (self.running.take(), &self.odds) {
            (Some(index), _) => index,
            (None, Some(odds)) => odds.sample(&mut gs.rng),
            (None, None) => return Status::Failure,
        };
        let status = tick(self.children[index].as_mut(), actor, gs);
        if status == Status::Running {
            self.running = Some(index);
        }
        status
    }
}

/// Creates a sequence node.
#[inline]
pub fn sequence(children: Vec<Node>) -> Node {
    Box::new(Sequence::new(children))
}

/// Creates a selector node.
#[inline]
pub fn selector(children: Vec<Node>) -> Node {
    Box::new(Selector::new(children))
}

#[inline]
pub fn repeat_while(condition: Node, child: Node) -> Node {
    Box::new(RepeatWhile::new(condition, child))
}

#[inline]
pub fn not(child: Node) -> Node {
    Box::new(Not::new(child))
}

#[inline]
pub fn succeed(child: Node) -> Node {
    Box::new(Succeed::new(child))
}

#[inline]
pub fn pick_random(children: Vec<Node>) -> Node {
    Box::new(PickRandom::new(children))
}

#[inline]
pub fn pick_with_odds(weighted: Vec<(u32, Node)>) -> Node {
    Box::new(PickWithOdds::new(weighted))
}
