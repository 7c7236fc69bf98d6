//! Path builders and the path-following task.
//!
//! A path builder turns a [`PathGoal`] into a stack of waypoints with A* or
//! Dijkstra over the monster's own terrain costs. [`FollowPath`] keeps that
//! stack between turns and throws it away when the monster has been pushed
//! off course or the goal has moved.

use super::node::{BehaviourNode, Node, Status};
use super::tasks::act;
use crate::{
    find_path_to_nearest, Action, Direction, GameState, ItemCategory, ObjId, Position, TileType,
    Trait,
};
use log::trace;
use std::collections::HashSet;

/// Where a monster wants to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathGoal {
    /// Closest item on the floor, optionally of one category
    NearestItem(Option<ItemCategory>),
    /// Any cell of a named area
    Area(String),
    /// A staircase tile
    Stairs(TileType),
    Position(Position),
    /// Next to another actor
    Actor(ObjId),
    Player,
    /// Next to the master named by the monster's companion trait
    CompanionMaster,
    /// Next to the altar the monster worships at
    Altar,
}

impl PathGoal {
    /// Whether reaching a neighbouring cell is enough.
    fn needs_adjacency(&self) -> bool {
        matches!(
            self,
            PathGoal::Actor(_) | PathGoal::Player | PathGoal::CompanionMaster | PathGoal::Altar
        )
    }

    /// Goal cells for an actor. Empty when the goal does not exist.
    pub fn targets(&self, actor: ObjId, gs: &GameState) -> HashSet<Position> {
        match self {
            PathGoal::NearestItem(category) => gs
                .objects
                .floor_items()
                .into_iter()
                .filter(|&(id, _)| {
                    category.map_or(true, |c| gs.objects.get(id).map_or(false, |o| o.category == c))
                })
                .map(|(_, pos)| pos)
                .collect(),
            PathGoal::Area(name) => gs
                .areas
                .get(name)
                .map(|cells| cells.iter().copied().collect())
                .unwrap_or_default(),
            PathGoal::Stairs(tile) => gs.map.positions_where(|t| t == *tile).into_iter().collect(),
            PathGoal::Position(pos) => [*pos].into_iter().collect(),
            PathGoal::Actor(id) => gs.position_of(*id).into_iter().collect(),
            PathGoal::Player => gs.player_position().into_iter().collect(),
            PathGoal::CompanionMaster => gs
                .objects
                .get(actor)
                .and_then(|o| {
                    o.traits.iter().find_map(|t| match t {
                        Trait::Companion(c) => Some(c.master),
                        _ => None,
                    })
                })
                .and_then(|master| gs.position_of(master))
                .into_iter()
                .collect(),
            PathGoal::Altar => gs
                .objects
                .get(actor)
                .and_then(|o| {
                    o.traits.iter().find_map(|t| match t {
                        Trait::Worshipper(w) => Some(w.altar),
                        _ => None,
                    })
                })
                .into_iter()
                .collect(),
        }
    }

    /// Whether an actor standing at `here` has reached the goal.
    pub fn is_reached(&self, here: Position, targets: &HashSet<Position>) -> bool {
        if targets.contains(&here) {
            return true;
        }
        self.needs_adjacency() && targets.iter().any(|&t| t.is_adjacent(here))
    }
}

/// Builds a waypoint stack towards a goal. The next step is on top.
pub fn build_path(goal: &PathGoal, actor: ObjId, gs: &GameState) -> Option<Vec<Position>> {
    let here = gs.position_of(actor)?;
    let targets = goal.targets(actor, gs);
    let costs = gs.travel_costs(actor);
    let mut path = find_path_to_nearest(&gs.map, here, &targets, &costs)?;
    if goal.needs_adjacency() {
        path.pop();
    }
    path.reverse();
    Some(path)
}

/// Walks towards a goal over several turns.
///
/// Returns `Running` while under way, `Success` once the goal is reached and
/// `Failure` when there is no goal or no way there.
pub struct FollowPath {
    goal: PathGoal,
    waypoints: Vec<Position>,
    expected: Option<Position>,
}

impl FollowPath {
    pub fn new(goal: PathGoal) -> Self {
        Self {
            goal,
            waypoints: Vec::new(),
            expected: None,
        }
    }

    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    fn reset(&mut self) {
        self.waypoints.clear();
        self.expected = None;
    }

    fn is_stale(&self, here: Position, targets: &HashSet<Position>) -> bool {
        let Some(&next) = self.waypoints.last() else {
            return true;
        };
        let diverged = self
            .expected
            .map_or(false, |expected| expected.chebyshev_distance(here) > 1);
        let destination = self.waypoints.first().copied().unwrap_or(next);
        let goal_moved = !targets.contains(&destination)
            && !(self.goal.needs_adjacency() && targets.iter().any(|t| t.is_adjacent(destination)));
        diverged || !next.is_adjacent(here) || goal_moved
    }
}

impl BehaviourNode for FollowPath {
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        if gs.has_acted_this_turn() {
            return Status::Running;
        }
        let Some(here) = gs.position_of(actor) else {
            return Status::Failure;
        };
        let targets = self.goal.targets(actor, gs);
        if targets.is_empty() {
            self.reset();
            return Status::Failure;
        }
        if self.goal.is_reached(here, &targets) {
            self.reset();
            return Status::Success;
        }

        if self.is_stale(here, &targets) {
            trace!("Object {} plans a new path to {:?}", actor, self.goal);
            match build_path(&self.goal, actor, gs) {
                Some(path) if !path.is_empty() => self.waypoints = path,
                _ => {
                    self.reset();
                    return Status::Failure;
                }
            }
        }

        let Some(&next) = self.waypoints.last() else {
            return Status::Failure;
        };
        if gs.objects.occupant_at(next).is_some() {
            self.reset();
            return Status::Failure;
        }
        if gs.map.get_tile(next) == Some(TileType::ClosedDoor) {
            self.expected = Some(here);
            return match act(actor, gs, Action::OpenDoor(next)) {
                Status::Failure => {
                    self.reset();
                    Status::Failure
                }
                _ => Status::Running,
            };
        }
        let Some(direction) = Direction::from_delta(next - here) else {
            self.reset();
            return Status::Failure;
        };
        match act(actor, gs, Action::Move(direction)) {
            Status::Failure => {
                self.reset();
                Status::Failure
            }
            _ => {
                let now = gs.position_of(actor).unwrap_or(here);
                if now == next {
                    self.waypoints.pop();
                }
                self.expected = Some(now);
                if self.goal.is_reached(now, &targets) {
                    self.reset();
                    Status::Success
                } else {
                    Status::Running
                }
            }
        }
    }
}

pub fn follow_path(goal: PathGoal) -> Node {
    Box::new(FollowPath::new(goal))
}
