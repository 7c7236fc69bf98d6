//! # Actions
//!
//! Concrete things an actor can do on its turn. Both the player and the
//! planner go through [`GameState::execute`], which validates the action,
//! applies it and counts it.

use crate::{
    percent_roll, roll_dice, AilmentKind, Attitude, Attribute, DamageType, DelveError,
    DelveResult, Direction, GameState, ObjId, Position, TileType, Trait,
    TraitFactory,
};
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Extra melee damage while raging.
const RAGE_BONUS: i32 = 2;

/// Something an actor does with its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    Attack { target: ObjId },
    Pass,
    OpenDoor(Position),
    CloseDoor(Position),
    PickUp(ObjId),
    Drop(ObjId),
    Give { item: ObjId, to: ObjId },
    Chant,
    Reveal,
    UseTorch(ObjId),
    Equip(ObjId),
    Unequip(ObjId),
}

/// Outcome of an attempted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Done,
    /// The action was not possible; nothing changed
    Failed(String),
}

impl ActionResult {
    pub fn is_done(&self) -> bool {
        matches!(self, ActionResult::Done)
    }
}

fn failed(why: impl Into<String>) -> DelveResult<ActionResult> {
    Ok(ActionResult::Failed(why.into()))
}

impl GameState {
    /// Performs an action for an actor.
    ///
    /// Impossible actions return [`ActionResult::Failed`] without changing
    /// anything. Only completed actions count towards `actions_taken`.
    pub fn execute(&mut self, actor: ObjId, action: Action) -> DelveResult<ActionResult> {
        let is_actor = self.objects.get(actor).map(|o| o.is_actor());
        match is_actor {
            None => {
                return Err(DelveError::InvalidState(format!(
                    "No actor with id {}",
                    actor
                )))
            }
            Some(false) => {
                return Err(DelveError::InvalidAction(format!(
                    "Object {} is not an actor",
                    actor
                )))
            }
            Some(true) => {}
        }
        if action != Action::Pass && self.has_ailment(actor, AilmentKind::Paralyzed) {
            return failed("You cannot move!");
        }

        trace!("Object {} performs {:?}", actor, action);
        let result = match action {
            Action::Move(direction) => self.move_actor(actor, direction)?,
            Action::Attack { target } => self.attack(actor, target)?,
            Action::Pass => ActionResult::Done,
            Action::OpenDoor(pos) => self.open_door(actor, pos)?,
            Action::CloseDoor(pos) => self.close_door(actor, pos)?,
            Action::PickUp(item) => self.pick_up(actor, item)?,
            Action::Drop(item) => self.drop_item(actor, item)?,
            Action::Give { item, to } => self.give(actor, item, to)?,
            Action::Chant => self.chant(actor)?,
            Action::Reveal => self.reveal(actor)?,
            Action::UseTorch(item) => self.use_torch(actor, item)?,
            Action::Equip(item) => {
                let messages = self.equip(actor, item)?;
                messages.into_iter().for_each(|m| self.alert_player(m));
                ActionResult::Done
            }
            Action::Unequip(item) => {
                let messages = self.unequip(actor, item)?;
                messages.into_iter().for_each(|m| self.alert_player(m));
                ActionResult::Done
            }
        };
        if result.is_done() {
            self.actions_taken += 1;
        }
        Ok(result)
    }

    fn actor_position(&self, actor: ObjId) -> DelveResult<Position> {
        self.position_of(actor)
            .ok_or_else(|| DelveError::InvalidState(format!("No object with id {}", actor)))
    }

    fn move_actor(&mut self, actor: ObjId, direction: Direction) -> DelveResult<ActionResult> {
        let mut direction = direction;
        if self.has_ailment(actor, AilmentKind::Confused) && self.rng.gen_bool(0.5) {
            if let Some(&stumble) = Direction::all().choose(&mut self.rng) {
                direction = stumble;
            }
        }
        if self.has_ailment(actor, AilmentKind::Nauseous) && percent_roll(&mut self.rng, 25) {
            self.narrate_to_player(actor, "You retch.", |n| format!("The {} retches.", n));
            return Ok(ActionResult::Done);
        }

        let from = self.actor_position(actor)?;
        let to = from.step(direction);
        if let Some(occupant) = self.objects.occupant_at(to) {
            if self.is_player(actor) || self.is_player(occupant) {
                return self.attack(actor, occupant);
            }
            return failed("The way is blocked.");
        }

        let tile = self.map.tile_or_border(to);
        let costs = self.travel_costs(actor);
        if tile == TileType::ClosedDoor && (self.is_player(actor) || costs.doors.is_some()) {
            return self.open_door(actor, to);
        }
        let enterable = if self.is_player(actor) {
            tile.is_passable()
        } else {
            costs.can_enter(tile)
        };
        if !enterable {
            return failed(format!("You cannot walk into the {}.", tile.name()));
        }

        self.objects.set_position(actor, to)?;
        if self.is_player(actor) {
            self.refresh_visibility();
        }
        Ok(ActionResult::Done)
    }

    fn open_door(&mut self, actor: ObjId, pos: Position) -> DelveResult<ActionResult> {
        let here = self.actor_position(actor)?;
        if !here.is_adjacent(pos) {
            return failed("That door is too far away.");
        }
        match self.map.get_tile(pos) {
            Some(TileType::ClosedDoor) => {
                self.map.set_tile(pos, TileType::OpenDoor)?;
                self.narrate_to_player(actor, "You open the door.", |n| {
                    format!("The {} opens a door.", n)
                });
                if self.visible.contains(&pos) || self.is_player(actor) {
                    self.refresh_visibility();
                }
                Ok(ActionResult::Done)
            }
            Some(TileType::LockedDoor) => failed("The door is locked."),
            _ => failed("There is no closed door there."),
        }
    }

    fn close_door(&mut self, actor: ObjId, pos: Position) -> DelveResult<ActionResult> {
        let here = self.actor_position(actor)?;
        if !here.is_adjacent(pos) {
            return failed("That door is too far away.");
        }
        if self.map.get_tile(pos) != Some(TileType::OpenDoor) {
            return failed("There is no open door there.");
        }
        if self.objects.occupant_at(pos).is_some() || !self.objects.items_at(pos).is_empty() {
            return failed("Something is in the way.");
        }
        self.map.set_tile(pos, TileType::ClosedDoor)?;
        self.refresh_visibility();
        Ok(ActionResult::Done)
    }

    fn pick_up(&mut self, actor: ObjId, item: ObjId) -> DelveResult<ActionResult> {
        let here = self.actor_position(actor)?;
        if !self.objects.items_at(here).contains(&item) {
            return failed("There is nothing like that here.");
        }
        self.objects.move_to_inventory(item, actor)?;
        let name = self.display_name(item);
        self.narrate_to_player(actor, &format!("You pick up the {}.", name), |n| {
            format!("The {} picks up the {}.", n, name)
        });
        Ok(ActionResult::Done)
    }

    fn drop_item(&mut self, actor: ObjId, item: ObjId) -> DelveResult<ActionResult> {
        let carried = self.objects.get(item).map(|o| o.holder) == Some(Some(actor));
        if !carried {
            return failed("You are not carrying that.");
        }
        let here = self.actor_position(actor)?;
        self.unequip_silently(actor, item);
        self.objects.drop_to_floor(item, here)?;
        let name = self.display_name(item);
        self.narrate_to_player(actor, &format!("You drop the {}.", name), |n| {
            format!("The {} drops the {}.", n, name)
        });
        Ok(ActionResult::Done)
    }

    fn give(&mut self, actor: ObjId, item: ObjId, to: ObjId) -> DelveResult<ActionResult> {
        let carried = self.objects.get(item).map(|o| o.holder) == Some(Some(actor));
        if !carried {
            return failed("You are not carrying that.");
        }
        let here = self.actor_position(actor)?;
        let Some(there) = self.position_of(to) else {
            return failed("There is nobody to give it to.");
        };
        if !here.is_adjacent(there) {
            return failed("They are too far away.");
        }
        self.unequip_silently(actor, item);
        self.objects.drop_to_floor(item, there)?;
        self.objects.move_to_inventory(item, to)?;
        let (item_name, to_name) = (self.display_name(item), self.display_name(to));
        if self.is_player(to) {
            let giver = self.display_name(actor);
            self.alert_player(format!("The {} gives you the {}.", giver, item_name));
        } else {
            self.narrate_to_player(actor, &format!("You give the {} to the {}.", item_name, to_name), |n| {
                format!("The {} gives the {} to the {}.", n, item_name, to_name)
            });
        }
        Ok(ActionResult::Done)
    }

    fn chant(&mut self, actor: ObjId) -> DelveResult<ActionResult> {
        let chant = self.objects.get(actor).and_then(|o| {
            o.traits.iter().find_map(|t| match t {
                Trait::Worshipper(w) => Some(w.chant.clone()),
                _ => None,
            })
        });
        let Some(chant) = chant else {
            return failed("You know no chants.");
        };
        self.narrate_to_player(actor, &format!("You chant: \"{}\"", chant), |n| {
            format!("The {} chants: \"{}\"", n, chant)
        });
        Ok(ActionResult::Done)
    }

    fn reveal(&mut self, actor: ObjId) -> DelveResult<ActionResult> {
        let disguise = self
            .objects
            .get(actor)
            .and_then(|o| o.traits.find(|t| matches!(t, Trait::Disguise(_))).cloned());
        let Some(disguise) = disguise else {
            return failed("Nothing to reveal.");
        };
        let fake = self.display_name(actor);
        self.remove_trait(actor, &disguise);
        if let Some(obj) = self.objects.get_mut(actor) {
            obj.attitude = Attitude::Aggressive;
        }
        let real = self.display_name(actor);
        self.narrate_to_player(actor, "You reveal yourself.", |_| {
            format!("The {} was a {} all along!", fake, real)
        });
        Ok(ActionResult::Done)
    }

    /// Items whose damage an attacker uses: equipped gear with damage, or
    /// nothing when fighting bare-handed.
    fn wielded_damage(&self, attacker: ObjId) -> (Option<ObjId>, Vec<(u32, u32, DamageType)>) {
        let damage_of = |id: ObjId| -> Vec<(u32, u32, DamageType)> {
            self.objects
                .get(id)
                .map(|o| {
                    o.traits
                        .iter()
                        .filter_map(|t| match t {
                            Trait::Damage(d) => Some((d.dice, d.sides, d.damage_type)),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        let inventory = self
            .objects
            .get(attacker)
            .map(|o| o.inventory.clone())
            .unwrap_or_default();
        for item in inventory {
            let equipped = self.objects.get(item).map(|o| o.equipped).unwrap_or(false);
            let dice = damage_of(item);
            if equipped && !dice.is_empty() {
                return (Some(item), dice);
            }
        }
        let own = damage_of(attacker);
        if own.is_empty() {
            (None, vec![(1, 2, DamageType::Blunt)])
        } else {
            (None, own)
        }
    }

    fn attack(&mut self, attacker: ObjId, target: ObjId) -> DelveResult<ActionResult> {
        if self.has_ailment(attacker, AilmentKind::Frightened) {
            return failed("You are too scared to fight!");
        }
        let from = self.actor_position(attacker)?;
        let Some(to) = self.position_of(target) else {
            return failed("There is nothing to attack.");
        };
        if !from.is_adjacent(to) {
            return failed("The target is out of reach.");
        }
        if !self.is_player(target) {
            if let Some(obj) = self.objects.get_mut(target) {
                obj.attitude = Attitude::Aggressive;
            }
        }

        let (to_hit, armour) = match (self.objects.get(attacker), self.objects.get(target)) {
            (Some(a), Some(t)) => (a.stats.modifier(Attribute::Dex), t.stats.curr(Attribute::AC)),
            _ => return failed("There is nothing to attack."),
        };
        let roll = self.rng.gen_range(1..=20) + to_hit;
        let (attacker_name, target_name) = (self.display_name(attacker), self.display_name(target));
        if roll < armour {
            debug!("Object {} misses {} ({} vs AC {})", attacker, target, roll, armour);
            self.describe_blow(attacker, target, &attacker_name, &target_name, false);
            return Ok(ActionResult::Done);
        }

        let (weapon, dice) = self.wielded_damage(attacker);
        let mut bonus = self
            .objects
            .get(attacker)
            .map(|o| o.stats.modifier(Attribute::Str))
            .unwrap_or(0);
        let raging = self.objects.get(attacker).map_or(false, |o| {
            o.traits
                .iter()
                .any(|t| matches!(t, Trait::Rage(_)) && t.is_active(self))
        });
        if raging {
            bonus += RAGE_BONUS;
        }

        self.describe_blow(attacker, target, &attacker_name, &target_name, true);
        let mut total = 0;
        for (n, sides, damage_type) in dice {
            let amount = (roll_dice(&mut self.rng, n, sides) + bonus).max(1);
            bonus = 0;
            total += self.deal_damage(target, amount, damage_type);
            if !self.objects.contains(target) {
                break;
            }
        }
        debug!("Object {} hits {} for {}", attacker, target, total);

        if self.objects.contains(target) {
            self.apply_coating(weapon.unwrap_or(attacker), target)?;
        }
        Ok(ActionResult::Done)
    }

    fn describe_blow(&mut self, attacker: ObjId, target: ObjId, attacker_name: &str, target_name: &str, hit: bool) {
        let text = match (self.is_player(attacker), self.is_player(target), hit) {
            (true, _, true) => format!("You hit the {}.", target_name),
            (true, _, false) => format!("You miss the {}.", target_name),
            (false, true, true) => format!("The {} hits you.", attacker_name),
            (false, true, false) => format!("The {} misses you.", attacker_name),
            (false, false, _) => {
                let seen = self.position_of(target).map_or(false, |p| self.visible.contains(&p));
                if !seen {
                    return;
                }
                let verb = if hit { "hits" } else { "misses" };
                format!("The {} {} the {}.", attacker_name, verb, target_name)
            }
        };
        self.alert_player(text);
    }

    /// Rolls a coating on the striking object and passes its effect on.
    fn apply_coating(&mut self, carrier: ObjId, victim: ObjId) -> DelveResult<()> {
        let coating = self.objects.get(carrier).and_then(|o| {
            o.traits.iter().find_map(|t| match t {
                Trait::Coating(c) if c.charges > 0 => Some(c.clone()),
                _ => None,
            })
        });
        let Some(coating) = coating else {
            return Ok(());
        };
        if !percent_roll(&mut self.rng, coating.chance) {
            return Ok(());
        }

        let effect = TraitFactory::from_text(&coating.effect, Some(victim))?;
        let messages = self.apply_trait(effect, victim)?;
        messages.into_iter().for_each(|m| self.alert_player(m));

        let spent = self.objects.get_mut(carrier).and_then(|o| {
            o.traits.find_mut(|t| matches!(t, Trait::Coating(_))).map(|t| {
                if let Trait::Coating(c) = t {
                    c.charges = c.charges.saturating_sub(1);
                    c.charges == 0
                } else {
                    false
                }
            })
        });
        if spent == Some(true) {
            self.remove_traits_where(carrier, |t| matches!(t, Trait::Coating(_)));
            if self.objects.get(carrier).and_then(|o| o.holder).map_or(false, |h| self.is_player(h)) {
                self.alert_player("The coating has worn off.");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AilmentTrait, CoatingTrait, GameObject, ItemCategory, Map};

    fn hall() -> GameState {
        let mut map = Map::new(10, 7, TileType::Wall);
        for y in 1..6 {
            for x in 1..9 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        map.set_tile(Position::new(5, 3), TileType::ClosedDoor).unwrap();
        GameState::new(map, 11)
    }

    #[test]
    fn test_move_and_bump_open_door() {
        let mut gs = hall();
        let player = gs.spawn_player(Position::new(4, 3));
        assert_eq!(gs.execute(player, Action::Move(Direction::East)).unwrap(), ActionResult::Done);
        assert_eq!(gs.map.get_tile(Position::new(5, 3)), Some(TileType::OpenDoor));
        assert_eq!(gs.player_position(), Some(Position::new(4, 3)));

        gs.execute(player, Action::Move(Direction::East)).unwrap();
        assert_eq!(gs.player_position(), Some(Position::new(5, 3)));
        assert_eq!(gs.actions_taken, 2);
    }

    #[test]
    fn test_walls_block_movement() {
        let mut gs = hall();
        let player = gs.spawn_player(Position::new(1, 1));
        let result = gs.execute(player, Action::Move(Direction::North)).unwrap();
        assert!(!result.is_done());
        assert_eq!(gs.actions_taken, 0);
    }

    #[test]
    fn test_paralysis_only_allows_passing() {
        let mut gs = hall();
        let player = gs.spawn_player(Position::new(2, 2));
        gs.apply_trait(Trait::Ailment(AilmentTrait::new(AilmentKind::Paralyzed, 0, 3)), player)
            .unwrap();
        assert!(!gs.execute(player, Action::Move(Direction::South)).unwrap().is_done());
        assert!(gs.execute(player, Action::Pass).unwrap().is_done());
    }

    #[test]
    fn test_pick_up_and_drop() {
        let mut gs = hall();
        let player = gs.spawn_player(Position::new(2, 2));
        let gem = gs.spawn(GameObject::item("gem", '*', ItemCategory::Valuable, Position::new(2, 2)));
        gs.execute(player, Action::PickUp(gem)).unwrap();
        assert_eq!(gs.player().unwrap().inventory, vec![gem]);

        gs.execute(player, Action::Move(Direction::East)).unwrap();
        gs.execute(player, Action::Drop(gem)).unwrap();
        assert_eq!(gs.objects.items_at(Position::new(3, 2)), vec![gem]);
        assert!(gs.messages.iter().any(|m| m == "You drop the gem."));
    }

    #[test]
    fn test_coating_poisons_the_victim() {
        let mut gs = hall();
        let player = gs.spawn_player(Position::new(2, 2));
        if let Some(p) = gs.objects.get_mut(player) {
            p.stats.set(Attribute::Dex, crate::Stat::new(40));
        }
        let dagger = gs.spawn(
            GameObject::item("dagger", ')', ItemCategory::Weapon, Position::new(2, 2))
                .with_trait(Trait::damage(1, 1, DamageType::Piercing))
                .with_trait(Trait::Coating(CoatingTrait {
                    chance: 100,
                    charges: 1,
                    effect: "Poisoned#0#1#5#owner#-".to_string(),
                })),
        );
        gs.objects.move_to_inventory(dagger, player).unwrap();
        gs.equip(player, dagger).unwrap();
        let troll = gs.spawn(GameObject::actor("troll", 'T', Position::new(3, 2), 50));

        gs.execute(player, Action::Attack { target: troll }).unwrap();
        let victim = gs.objects.get(troll).unwrap();
        assert!(victim.hp() < 50);
        assert!(victim.traits.iter().any(|t| t.kind() == "Poisoned"));
        assert_eq!(victim.attitude, Attitude::Aggressive);
        assert!(!gs
            .objects
            .get(dagger)
            .unwrap()
            .traits
            .iter()
            .any(|t| matches!(t, Trait::Coating(_))));
    }
}
