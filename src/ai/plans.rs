//! # Plans
//!
//! A plan is the behaviour tree of one monster. Every plan starts from the
//! same skeleton, a selector over labelled [`Slot`]s tried in order:
//!
//! 1. `Immobilized`: paralysed or rooted monsters pass
//! 2. `Inactive`: dormant monsters may wake on seeing the player
//! 3. `Indifferent`: idle monsters wander or loiter
//! 4. `Frightened`: scared or badly hurt monsters flee
//! 5. `Aggressive`: attack when adjacent, chase when the player is in view
//! 6. `Default`: pass
//!
//! Archetypes splice subtrees in front of a slot, into a slot, or replace a
//! slot outright, through [`PlanBuilder`].
//!
//! ```
//! use delve::{Plan, Archetype};
//!
//! let plan = Plan::for_archetype(Archetype::Greedy);
//! assert_eq!(plan.archetype(), Archetype::Greedy);
//! ```

use super::composite::{not, pick_with_odds, repeat_while, selector, sequence, succeed, Selector};
use super::conditions::{
    can_see_player, chance, has_attitude, has_trait, hour_between, is_adjacent_to_player,
    is_carrying_anything, is_disguised, is_frightened, is_immobilized, is_in_area,
};
use super::node::{tick, Node, Status};
use super::paths::{follow_path, PathGoal};
use super::tasks::{
    attack_player, chant, chase_player, flee, give_to_master, pass_turn, pick_up_here, reveal,
    set_attitude, wander,
};
use crate::{Attitude, GameState, ItemCategory, ObjId};
use log::warn;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// Percent chance per turn that a dormant monster in view of the player wakes.
const WAKE_CHANCE: u32 = 30;
/// Percent chance per turn that a worshipper at its altar chants.
const CHANT_CHANCE: u32 = 25;

/// Labelled insertion points of the skeleton, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Slot {
    Immobilized,
    Inactive,
    Indifferent,
    Frightened,
    Aggressive,
    Default,
}

/// Named monster behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Archetype {
    Basic,
    /// Collects valuables lying around
    Greedy,
    /// Walks to its altar and chants there
    Worshipper,
    /// Sits disguised until the player comes close
    Mimic,
    /// Fetches items and brings them to its master
    Watchdog,
    /// Keeps a daily schedule between market, tavern and home
    Villager,
}

enum Entry {
    Slot(Slot, Selector),
    Spliced(Node),
}

/// Assembles a plan from the skeleton plus archetype splices.
pub struct PlanBuilder {
    entries: Vec<Entry>,
}

impl PlanBuilder {
    /// The generic monster skeleton.
    pub fn skeleton() -> Self {
        let immobilized = sequence(vec![is_immobilized(), pass_turn()]);
        let inactive = sequence(vec![
            has_attitude(Attitude::Inactive),
            succeed(sequence(vec![
                can_see_player(),
                chance(WAKE_CHANCE),
                set_attitude(Attitude::Aggressive),
            ])),
            pass_turn(),
        ]);
        let indifferent = sequence(vec![
            has_attitude(Attitude::Indifferent),
            pick_with_odds(vec![(1, wander()), (3, pass_turn())]),
        ]);
        let frightened = sequence(vec![is_frightened(), flee()]);
        let aggressive = sequence(vec![
            has_attitude(Attitude::Aggressive),
            selector(vec![
                attack_player(),
                sequence(vec![can_see_player(), chase_player()]),
                wander(),
            ]),
        ]);

        Self {
            entries: vec![
                Entry::Slot(Slot::Immobilized, Selector::new(vec![immobilized])),
                Entry::Slot(Slot::Inactive, Selector::new(vec![inactive])),
                Entry::Slot(Slot::Indifferent, Selector::new(vec![indifferent])),
                Entry::Slot(Slot::Frightened, Selector::new(vec![frightened])),
                Entry::Slot(Slot::Aggressive, Selector::new(vec![aggressive])),
                Entry::Slot(Slot::Default, Selector::new(vec![pass_turn()])),
            ],
        }
    }

    fn slot_index(&self, slot: Slot) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(e, Entry::Slot(s, _) if *s == slot))
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut Selector> {
        self.entries.iter_mut().find_map(|e| match e {
            Entry::Slot(s, branches) if *s == slot => Some(branches),
            _ => None,
        })
    }

    /// Splices a subtree into the root, just before a slot.
    pub fn insert_before(mut self, slot: Slot, node: Node) -> Self {
        match self.slot_index(slot) {
            Some(index) => self.entries.insert(index, Entry::Spliced(node)),
            None => self.entries.push(Entry::Spliced(node)),
        }
        self
    }

    /// Adds a branch in front of a slot's existing branches.
    pub fn prepend_to(mut self, slot: Slot, node: Node) -> Self {
        if let Some(branches) = self.slot_mut(slot) {
            branches.insert(0, node);
        }
        self
    }

    /// Adds a branch after a slot's existing branches.
    pub fn append_to(mut self, slot: Slot, node: Node) -> Self {
        if let Some(branches) = self.slot_mut(slot) {
            branches.push(node);
        }
        self
    }

    /// Throws away a slot's branches and puts new ones in their place.
    pub fn replace(mut self, slot: Slot, nodes: Vec<Node>) -> Self {
        if let Some(branches) = self.slot_mut(slot) {
            *branches = Selector::new(nodes);
        }
        self
    }

    /// Number of subtrees under the root.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self, archetype: Archetype) -> Plan {
        let children = self
            .entries
            .into_iter()
            .map(|e| match e {
                Entry::Slot(_, branches) => Box::new(branches) as Node,
                Entry::Spliced(node) => node,
            })
            .collect();
        Plan {
            archetype,
            root: Selector::new(children),
        }
    }
}

/// A monster's behaviour tree.
pub struct Plan {
    archetype: Archetype,
    root: Selector,
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("archetype", &self.archetype)
            .field("branches", &self.root.len())
            .finish()
    }
}

impl Plan {
    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Plan by name; unknown names fall back to the basic monster.
    pub fn named(name: &str) -> Self {
        match Archetype::from_str(name) {
            Ok(archetype) => Self::for_archetype(archetype),
            Err(_) => {
                warn!("Unknown plan '{}', using basic", name);
                Self::for_archetype(Archetype::Basic)
            }
        }
    }

    pub fn for_archetype(archetype: Archetype) -> Self {
        let builder = PlanBuilder::skeleton();
        let builder = match archetype {
            Archetype::Basic => builder,
            Archetype::Greedy => builder.insert_before(Slot::Indifferent, greedy()),
            Archetype::Worshipper => builder.insert_before(Slot::Indifferent, worship()),
            Archetype::Mimic => builder.replace(Slot::Inactive, vec![lurk()]),
            Archetype::Watchdog => builder.insert_before(Slot::Indifferent, fetch()),
            Archetype::Villager => builder.insert_before(Slot::Indifferent, daily_schedule()),
        };
        builder.build(archetype)
    }

    /// Evaluates the tree once for the actor.
    pub fn execute(&mut self, actor: ObjId, gs: &mut GameState) -> Status {
        tick(&mut self.root, actor, gs)
    }
}

/// Goes after valuables while idle.
fn greedy() -> Node {
    repeat_while(
        has_attitude(Attitude::Indifferent),
        sequence(vec![
            follow_path(PathGoal::NearestItem(Some(ItemCategory::Valuable))),
            pick_up_here(),
        ]),
    )
}

/// Walks to the altar, then chants now and then.
fn worship() -> Node {
    repeat_while(
        has_attitude(Attitude::Indifferent),
        sequence(vec![
            has_trait("Worshipper"),
            follow_path(PathGoal::Altar),
            selector(vec![sequence(vec![chance(CHANT_CHANCE), chant()]), pass_turn()]),
        ]),
    )
}

/// Keeps still until the player is next to it, then drops the disguise.
fn lurk() -> Node {
    sequence(vec![
        has_attitude(Attitude::Inactive),
        selector(vec![
            sequence(vec![is_disguised(), is_adjacent_to_player(), reveal()]),
            pass_turn(),
        ]),
    ])
}

/// Brings whatever it carries to its master, otherwise fetches the
/// nearest item.
fn fetch() -> Node {
    repeat_while(
        sequence(vec![
            has_trait("Companion"),
            not(has_attitude(Attitude::Aggressive)),
        ]),
        selector(vec![
            sequence(vec![
                is_carrying_anything(),
                follow_path(PathGoal::CompanionMaster),
                give_to_master(),
            ]),
            sequence(vec![follow_path(PathGoal::NearestItem(None)), pick_up_here()]),
        ]),
    )
}

/// Stays in an area once there, walks to it otherwise.
fn go_to(area: &'static str) -> Node {
    selector(vec![
        sequence(vec![
            is_in_area(area),
            pick_with_odds(vec![(1, wander()), (4, pass_turn())]),
        ]),
        follow_path(PathGoal::Area(area.to_string())),
    ])
}

/// Market by day, tavern in the evening, home at night.
fn daily_schedule() -> Node {
    repeat_while(
        not(has_attitude(Attitude::Aggressive)),
        selector(vec![
            sequence(vec![hour_between(8, 18), go_to("market")]),
            sequence(vec![hour_between(18, 23), go_to("tavern")]),
            go_to("home"),
        ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameObject, Map, Position, TileType, Trait};
    use strum::IntoEnumIterator;

    fn hall() -> GameState {
        let mut map = Map::new(14, 9, TileType::Wall);
        for y in 1..8 {
            for x in 1..13 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        GameState::new(map, 17)
    }

    #[test]
    fn test_splicing_adds_root_branches() {
        let skeleton = PlanBuilder::skeleton();
        assert_eq!(skeleton.len(), Slot::iter().count());
        let spliced = skeleton.insert_before(Slot::Frightened, pass_turn());
        assert_eq!(spliced.len(), Slot::iter().count() + 1);
        let unchanged = PlanBuilder::skeleton().append_to(Slot::Default, wander());
        assert_eq!(unchanged.len(), Slot::iter().count());
    }

    #[test]
    fn test_unknown_plan_falls_back() {
        assert_eq!(Plan::named("greedy").archetype(), Archetype::Greedy);
        assert_eq!(Plan::named("dragon").archetype(), Archetype::Basic);
    }

    #[test]
    fn test_every_archetype_acts_once() {
        for archetype in Archetype::iter() {
            let mut gs = hall();
            gs.spawn_player(Position::new(2, 2));
            let monster = gs.spawn(GameObject::actor("thing", 't', Position::new(9, 5), 6));
            let mut plan = Plan::for_archetype(archetype);
            for _ in 0..5 {
                gs.begin_turn();
                let before = gs.actions_taken;
                plan.execute(monster, &mut gs);
                assert!(gs.actions_taken - before <= 1, "{} acted twice", archetype);
            }
        }
    }

    #[test]
    fn test_greedy_fetches_valuables() {
        let mut gs = hall();
        let magpie = gs.spawn(GameObject::actor("magpie", 'm', Position::new(2, 4), 4));
        let gem = gs.spawn(GameObject::item("gem", '*', ItemCategory::Valuable, Position::new(6, 4)));
        let mut plan = Plan::for_archetype(Archetype::Greedy);
        for _ in 0..8 {
            gs.begin_turn();
            plan.execute(magpie, &mut gs);
        }
        assert_eq!(gs.objects.get(gem).unwrap().holder, Some(magpie));
    }

    #[test]
    fn test_mimic_reveals_next_to_player() {
        let mut gs = hall();
        gs.spawn_player(Position::new(4, 4));
        let chest = gs.spawn(
            GameObject::actor("mimic", 'M', Position::new(7, 4), 10)
                .with_attitude(Attitude::Inactive)
                .with_trait(Trait::Disguise(crate::DisguiseTrait {
                    name: "chest".into(),
                    glyph: '=',
                })),
        );
        let mut plan = Plan::for_archetype(Archetype::Mimic);
        gs.begin_turn();
        plan.execute(chest, &mut gs);
        assert_eq!(gs.objects.get(chest).unwrap().attitude, Attitude::Inactive);

        gs.objects.set_position(chest, Position::new(5, 4)).unwrap();
        gs.begin_turn();
        plan.execute(chest, &mut gs);
        let obj = gs.objects.get(chest).unwrap();
        assert_eq!(obj.attitude, Attitude::Aggressive);
        assert!(!obj.traits.iter().any(|t| matches!(t, Trait::Disguise(_))));
    }

    #[test]
    fn test_villager_heads_to_market_by_day() {
        let mut gs = hall();
        gs.areas.insert(
            "market".into(),
            (9..12).map(|x| Position::new(x, 6)).collect(),
        );
        let baker = gs.spawn(GameObject::actor("baker", 'b', Position::new(2, 2), 6));
        let mut plan = Plan::for_archetype(Archetype::Villager);
        assert!(gs.hour() >= 8 && gs.hour() < 18);
        for _ in 0..12 {
            gs.begin_turn();
            plan.execute(baker, &mut gs);
        }
        let here = gs.position_of(baker).unwrap();
        assert!(here.chebyshev_distance(Position::new(10, 6)) <= 2);
    }
}
