//! Task leaves.
//!
//! Every task issues at most one action. A task reached after the monster
//! already acted this turn answers `Running`, so the enclosing composite
//! resumes it next turn instead of acting twice.

use super::node::{BehaviourNode, Node, Status};
use crate::config::FLEE_LOOKAHEAD;
use crate::{
    find_path, Action, ActionResult, Attitude, Direction, GameState, ObjId, Position, TileType,
    Trait,
};
use log::debug;
use rand::seq::SliceRandom;

/// Issues an action for the actor, mapping the outcome to a status.
pub fn act(actor: ObjId, gs: &mut GameState, action: Action) -> Status {
    if gs.has_acted_this_turn() {
        return Status::Running;
    }
    match gs.execute(actor, action) {
        Ok(ActionResult::Done) => Status::Success,
        Ok(ActionResult::Failed(why)) => {
            debug!("Object {} could not act: {}", actor, why);
            Status::Failure
        }
        Err(err) => {
            debug!("Object {} action error: {}", actor, err);
            Status::Failure
        }
    }
}

/// Leaf that decides on an action from the current state.
pub struct Task<F>
where
    F: Fn(ObjId, &mut GameState) -> Option<Action>,
{
    decide: F,
}

impl<F> BehaviourNode for Task<F>
where
    F: Fn(ObjId, &mut GameState) -> Option<Action>,
{
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        if gs.has_acted_this_turn() {
            return Status::Running;
        }
        match (self.decide)(actor, gs) {
            Some(action) => act(actor, gs, action),
            None => Status::Failure,
        }
    }
}

/// Boxes a task from its decision function.
pub fn task<F>(decide: F) -> Node
where
    F: Fn(ObjId, &mut GameState) -> Option<Action> + 'static,
{
    Box::new(Task { decide })
}

fn step_towards(gs: &GameState, actor: ObjId, here: Position, next: Position) -> Option<Action> {
    if gs.map.get_tile(next) == Some(TileType::ClosedDoor) {
        return Some(Action::OpenDoor(next));
    }
    if let Some(occupant) = gs.objects.occupant_at(next) {
        if occupant != actor && !gs.is_player(occupant) {
            return None;
        }
    }
    Direction::from_delta(next - here).map(Action::Move)
}

pub fn pass_turn() -> Node {
    task(|_, _| Some(Action::Pass))
}

/// Steps onto a random free neighbouring cell.
pub fn wander() -> Node {
    task(|actor, gs| {
        let here = gs.position_of(actor)?;
        let costs = gs.travel_costs(actor);
        let options: Vec<Direction> = Direction::all()
            .into_iter()
            .filter(|&d| {
                let to = here.step(d);
                costs.can_enter(gs.map.tile_or_border(to)) && gs.objects.occupant_at(to).is_none()
            })
            .collect();
        options.choose(&mut gs.rng).copied().map(Action::Move)
    })
}

pub fn attack_player() -> Node {
    task(|actor, gs| {
        let player = gs.player_id?;
        let (here, there) = (gs.position_of(actor)?, gs.position_of(player)?);
        here.is_adjacent(there).then_some(Action::Attack { target: player })
    })
}

/// Takes one step along the shortest path to the player.
pub fn chase_player() -> Node {
    task(|actor, gs| {
        let here = gs.position_of(actor)?;
        let target = gs.player_position()?;
        let costs = gs.travel_costs(actor);
        let path = find_path(&gs.map, here, target, &costs)?;
        let next = *path.first()?;
        step_towards(gs, actor, here, next)
    })
}

/// Steps away from the player along the escape field for the monster's
/// movement class.
pub fn flee() -> Node {
    task(|actor, gs| {
        let here = gs.position_of(actor)?;
        let costs = gs.travel_costs(actor);
        let class = costs.move_class();
        gs.escape_map(class)?;
        let field = gs.cached_escape_map(class)?;
        let next = field.escape_step(here, FLEE_LOOKAHEAD, |cell| {
            !costs.can_enter(gs.map.tile_or_border(cell)) || gs.objects.occupant_at(cell).is_some()
        })?;
        Direction::from_delta(next - here).map(Action::Move)
    })
}

/// Picks up the first item lying under the actor.
pub fn pick_up_here() -> Node {
    task(|actor, gs| {
        let here = gs.position_of(actor)?;
        gs.objects.items_at(here).first().copied().map(Action::PickUp)
    })
}

pub fn drop_carried() -> Node {
    task(|actor, gs| {
        gs.objects
            .get(actor)?
            .inventory
            .first()
            .copied()
            .map(Action::Drop)
    })
}

/// Hands the first carried item to the companion's master when next to it.
pub fn give_to_master() -> Node {
    task(|actor, gs| {
        let obj = gs.objects.get(actor)?;
        let master = obj.traits.iter().find_map(|t| match t {
            Trait::Companion(c) => Some(c.master),
            _ => None,
        })?;
        let item = obj.inventory.first().copied()?;
        let (here, there) = (obj.position, gs.position_of(master)?);
        here.is_adjacent(there).then_some(Action::Give { item, to: master })
    })
}

pub fn chant() -> Node {
    task(|_, _| Some(Action::Chant))
}

pub fn reveal() -> Node {
    task(|_, _| Some(Action::Reveal))
}

/// Changes the actor's attitude. Not an action; always succeeds.
pub fn set_attitude(attitude: Attitude) -> Node {
    super::node::leaf(move |actor, gs| {
        if let Some(obj) = gs.objects.get_mut(actor) {
            if obj.attitude != attitude {
                debug!("Object {} becomes {}", actor, attitude);
                obj.attitude = attitude;
            }
        }
        Status::Success
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameObject, ItemCategory, Map};

    fn field() -> GameState {
        let mut map = Map::new(12, 12, TileType::Wall);
        for y in 1..11 {
            for x in 1..11 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        GameState::new(map, 21)
    }

    #[test]
    fn test_flee_moves_away() {
        let mut gs = field();
        gs.spawn_player(Position::new(3, 3));
        let hare = gs.spawn(GameObject::actor("hare", 'h', Position::new(5, 5), 3));
        gs.begin_turn();
        assert_eq!(flee().execute(hare, &mut gs), Status::Success);
        let after = gs.position_of(hare).unwrap();
        assert!(after.chebyshev_distance(Position::new(3, 3)) > 2);
    }

    #[test]
    fn test_cornered_monster_cannot_flee() {
        let mut gs = field();
        gs.spawn_player(Position::new(2, 2));
        let rat = gs.spawn(GameObject::actor("rat", 'r', Position::new(1, 1), 3));
        gs.spawn(GameObject::actor("crate", '#', Position::new(2, 1), 3));
        gs.spawn(GameObject::actor("crate", '#', Position::new(1, 2), 3));
        gs.begin_turn();
        assert_eq!(flee().execute(rat, &mut gs), Status::Failure);
    }

    #[test]
    fn test_chase_and_attack() {
        let mut gs = field();
        let player = gs.spawn_player(Position::new(2, 2));
        let ogre = gs.spawn(GameObject::actor("ogre", 'O', Position::new(6, 2), 20));
        gs.begin_turn();
        assert_eq!(attack_player().execute(ogre, &mut gs), Status::Failure);
        assert_eq!(chase_player().execute(ogre, &mut gs), Status::Success);
        let stepped = gs.position_of(ogre).unwrap();
        assert_eq!(stepped.x, 5);
        assert_eq!(stepped.chebyshev_distance(Position::new(2, 2)), 3);

        gs.objects.set_position(ogre, Position::new(3, 2)).unwrap();
        gs.begin_turn();
        assert_eq!(attack_player().execute(ogre, &mut gs), Status::Success);
        assert!(gs.objects.contains(player));
    }

    #[test]
    fn test_second_action_waits_for_next_turn() {
        let mut gs = field();
        let magpie = gs.spawn(GameObject::actor("magpie", 'm', Position::new(4, 4), 3));
        gs.spawn(GameObject::item("ring", '=', ItemCategory::Valuable, Position::new(4, 4)));
        gs.begin_turn();
        assert_eq!(pass_turn().execute(magpie, &mut gs), Status::Success);
        assert_eq!(pick_up_here().execute(magpie, &mut gs), Status::Running);
        gs.begin_turn();
        assert_eq!(pick_up_here().execute(magpie, &mut gs), Status::Success);
        assert_eq!(gs.objects.get(magpie).unwrap().inventory.len(), 1);
    }
}
