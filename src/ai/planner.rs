//! # Planner
//!
//! Owns one [`Plan`] per monster and runs it once per monster turn.
//!
//! Plans are built lazily from the monster's `plan` name the first time it
//! acts and kept for as long as the monster lives, so cursors and cached
//! paths carry over between turns. The planner guarantees exactly one
//! action per turn: a tree that issued none is followed by a pass.

use super::node::Status;
use super::plans::Plan;
use crate::{Action, GameState, ObjId};
use log::{debug, trace};
use std::collections::HashMap;
use std::fmt;

#[derive(Default)]
pub struct Planner {
    plans: HashMap<ObjId, Plan>,
}

impl fmt::Debug for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("plans", &self.plans.len())
            .finish()
    }
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn has_plan(&self, actor: ObjId) -> bool {
        self.plans.contains_key(&actor)
    }

    pub fn forget(&mut self, actor: ObjId) -> Option<Plan> {
        self.plans.remove(&actor)
    }

    /// Keeps only the plans of actors matching the predicate. Returns how
    /// many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(ObjId) -> bool,
    {
        let before = self.plans.len();
        self.plans.retain(|&id, _| keep(id));
        before - self.plans.len()
    }

    /// Runs one turn for a monster.
    ///
    /// Returns the root status. Objects that are gone or are not actors get
    /// `Failure` and nothing happens.
    pub fn take_turn(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        let Some(obj) = gs.objects.get(actor).filter(|o| o.is_actor()) else {
            return Status::Failure;
        };
        let name = obj.plan.clone().unwrap_or_else(|| "basic".to_string());

        gs.begin_turn();
        let plan = self.plans.entry(actor).or_insert_with(|| {
            debug!("Building {} plan for object {}", name, actor);
            Plan::named(&name)
        });
        let status = plan.execute(actor, gs);
        trace!(
            "Object {} finished its plan with {:?} after {} nodes",
            actor,
            status,
            gs.node_evaluations
        );

        if !gs.has_acted_this_turn() && gs.objects.contains(actor) {
            if let Err(err) = gs.execute(actor, Action::Pass) {
                debug!("Object {} could not pass: {}", actor, err);
            }
        }
        status
    }
}
