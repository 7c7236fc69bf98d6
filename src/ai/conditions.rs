//! Condition leaves.
//!
//! Conditions read the game state and answer `Success` or `Failure`. Apart
//! from [`chance`], which draws from the session RNG, they never mutate.

use super::node::{status_of, BehaviourNode, Node, Status};
use crate::{AilmentKind, Attitude, Attribute, GameState, ItemCategory, ObjId, Position, Tag, Trait};

/// Leaf wrapping a read-only predicate.
pub struct Condition<F>
where
    F: Fn(ObjId, &GameState) -> bool,
{
    predicate: F,
}

impl<F> Condition<F>
where
    F: Fn(ObjId, &GameState) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> BehaviourNode for Condition<F>
where
    F: Fn(ObjId, &GameState) -> bool,
{
    fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        status_of((self.predicate)(actor, gs))
    }
}

/// Boxes a read-only predicate.
pub fn condition<F>(predicate: F) -> Node
where
    F: Fn(ObjId, &GameState) -> bool + 'static,
{
    Box::new(Condition::new(predicate))
}

/// Paralyzed, or rooted to the spot.
pub fn is_immobilized() -> Node {
    condition(|actor, gs| {
        gs.has_ailment(actor, AilmentKind::Paralyzed) || gs.has_tag(actor, Tag::Immobile)
    })
}

pub fn has_attitude(attitude: Attitude) -> Node {
    condition(move |actor, gs| {
        gs.objects
            .get(actor)
            .map_or(false, |o| o.attitude == attitude)
    })
}

pub fn has_tag(tag: Tag) -> Node {
    condition(move |actor, gs| gs.has_tag(actor, tag))
}

/// Whether the actor carries a trait of the given kind.
pub fn has_trait(kind: &'static str) -> Node {
    condition(move |actor, gs| {
        gs.objects
            .get(actor)
            .map_or(false, |o| o.traits.iter().any(|t| t.kind() == kind))
    })
}

/// Whether the actor wants to run: scared, or badly hurt without courage.
pub fn actor_is_frightened(actor: ObjId, gs: &GameState) -> bool {
    if gs.has_ailment(actor, AilmentKind::Frightened) {
        return true;
    }
    let Some(obj) = gs.objects.get(actor) else {
        return false;
    };
    let max = obj.stats.max(Attribute::HP);
    let hurt = max > 0 && obj.hp() * 4 < max;
    hurt && !obj.has_tag(Tag::Brave) && !obj.has_tag(Tag::Undead)
}

pub fn is_frightened() -> Node {
    condition(actor_is_frightened)
}

pub fn is_adjacent_to_player() -> Node {
    condition(|actor, gs| match (gs.position_of(actor), gs.player_position()) {
        (Some(here), Some(player)) => here.is_adjacent(player),
        _ => false,
    })
}

pub fn can_see_player() -> Node {
    condition(|actor, gs| gs.player_position().map_or(false, |p| gs.can_see(actor, p)))
}

/// Succeeds with the given percentage.
pub struct Chance {
    percent: u32,
}

impl BehaviourNode for Chance {
    fn execute(&mut self, _actor: ObjId, gs: &mut GameState) -> Status {
        status_of(crate::percent_roll(&mut gs.rng, self.percent))
    }
}

pub fn chance(percent: u32) -> Node {
    Box::new(Chance { percent })
}

/// Whether the game clock's hour lies in `[start, end)`, wrapping past
/// midnight when `start > end`.
pub fn hour_between(start: u32, end: u32) -> Node {
    condition(move |_, gs| {
        let hour = gs.hour();
        if start <= end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    })
}

pub fn is_carrying_anything() -> Node {
    condition(|actor, gs| gs.objects.get(actor).map_or(false, |o| !o.inventory.is_empty()))
}

pub fn is_carrying(category: ItemCategory) -> Node {
    condition(move |actor, gs| {
        gs.objects.get(actor).map_or(false, |o| {
            o.inventory
                .iter()
                .filter_map(|&i| gs.objects.get(i))
                .any(|item| item.category == category)
        })
    })
}

pub fn is_at(position: Position) -> Node {
    condition(move |actor, gs| gs.position_of(actor) == Some(position))
}

/// Whether the actor stands inside a named area.
pub fn is_in_area(name: &'static str) -> Node {
    condition(move |actor, gs| match (gs.position_of(actor), gs.areas.get(name)) {
        (Some(here), Some(cells)) => cells.contains(&here),
        _ => false,
    })
}

pub fn is_disguised() -> Node {
    condition(|actor, gs| {
        gs.objects.get(actor).map_or(false, |o| {
            o.traits.iter().any(|t| matches!(t, Trait::Disguise(_)))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameObject, Map, TileType};

    #[test]
    fn test_hour_window_wraps() {
        let mut gs = GameState::new(Map::new(4, 4, TileType::Floor), 1);
        let mut night = hour_between(22, 6);
        let mut day = hour_between(8, 18);
        assert_eq!(night.execute(1, &mut gs), Status::Failure);
        assert_eq!(day.execute(1, &mut gs), Status::Success);

        gs.turn = 15 * 60;
        assert_eq!(night.execute(1, &mut gs), Status::Success);
        assert_eq!(day.execute(1, &mut gs), Status::Failure);
    }

    #[test]
    fn test_fear_and_adjacency() {
        let mut gs = GameState::new(Map::new(6, 6, TileType::Floor), 1);
        gs.spawn_player(Position::new(1, 1));
        let goblin = gs.spawn(GameObject::actor("goblin", 'g', Position::new(2, 2), 8));
        assert_eq!(is_adjacent_to_player().execute(goblin, &mut gs), Status::Success);
        assert_eq!(is_frightened().execute(goblin, &mut gs), Status::Failure);

        gs.change_hp(goblin, -7);
        assert_eq!(is_frightened().execute(goblin, &mut gs), Status::Success);
    }
}
