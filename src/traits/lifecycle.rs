//! # Trait Lifecycle
//!
//! Applying, ticking and removing traits, implemented on [`GameState`].
//!
//! Applying a trait goes through, in order: the immunity check, merging into
//! an existing instance with the same merge key, the saving throw, and
//! finally attachment, which runs the entry effect and subscribes the trait
//! to its event. Removal always unsubscribes before the exit effect runs.

use super::{Disposition, Trait, TraitEntry, TraitFactory};
use crate::config::TORCH_LIGHT_RADIUS;
use crate::{
    ActionResult, AilmentKind, DamageTrait, DamageType, DelveError, DelveResult, EventType,
    GameState, ItemCategory, LightSourceTrait, ListenerId, ObjId, Tag,
};
use log::{debug, trace, warn};

impl GameState {
    /// Applies a trait to a target, returning narrative for the player.
    ///
    /// Nothing happens when the target is immune or passes its saving throw.
    /// A repeated application of an already present kind only extends it.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{GameObject, GameState, Map, Position, TileType, Trait};
    ///
    /// let mut gs = GameState::new(Map::new(8, 8, TileType::Floor), 1);
    /// let player = gs.spawn_player(Position::new(2, 2));
    /// let messages = gs.apply_trait(Trait::poisoned(0, 2, 4), player).unwrap();
    /// assert_eq!(messages, vec!["You are poisoned!".to_string()]);
    /// ```
    pub fn apply_trait(&mut self, incoming: Trait, target: ObjId) -> DelveResult<Vec<String>> {
        if !self.objects.contains(target) {
            return Err(DelveError::InvalidState(format!(
                "Cannot apply {} to missing object {}",
                incoming.kind(),
                target
            )));
        }

        if let Some(damage_type) = incoming.affliction_type() {
            if self.has_immunity(target, damage_type) {
                debug!("Object {} is immune to {}", target, incoming.kind());
                return Ok(Vec::new());
            }
        }
        if matches!(&incoming, Trait::Ailment(a) if a.kind == AilmentKind::Frightened)
            && self.has_tag(target, Tag::Brave)
        {
            return Ok(Vec::new());
        }

        if let Some(key) = incoming.merge_key() {
            let mut stamped = incoming.clone();
            stamped.stamp_expiry(self.turn);
            if let Some(existing) = self
                .objects
                .get_mut(target)
                .and_then(|o| o.traits.find_mut(|t| t.merge_key().as_deref() == Some(key.as_str())))
            {
                existing.merge_from(&stamped);
                trace!("Merged {} into object {}", key, target);
                return Ok(Vec::new());
            }
        }

        if let Some((dc, attr)) = incoming.saving_throw() {
            if self.saving_throw(target, dc, attr) {
                debug!("Object {} resisted {}", target, incoming.kind());
                return Ok(Vec::new());
            }
        }

        Ok(self.attach_trait(incoming, target))
    }

    /// Attaches a trait unconditionally: binds the owner, stamps the expiry,
    /// runs the entry effect and subscribes it.
    pub fn attach_trait(&mut self, value: Trait, owner: ObjId) -> Vec<String> {
        self.bind_trait(value, owner, false)
    }

    /// Shared attach path. `keep_expiry` leaves an already stamped expiry
    /// alone, for traits that arrive bound to a freshly spawned object.
    pub(crate) fn bind_trait(
        &mut self,
        mut value: Trait,
        owner: ObjId,
        keep_expiry: bool,
    ) -> Vec<String> {
        value.set_owner(owner);
        if !keep_expiry || value.expires().is_none() {
            value.stamp_expiry(self.turn);
        }
        let messages = value.on_attach(owner, self);
        let listener = value
            .subscription()
            .map(|event| self.events.register(event, owner));
        match self.objects.get_mut(owner) {
            Some(obj) => obj.traits.push(value, listener),
            None => {
                if let Some(id) = listener {
                    self.events.unregister(id);
                }
            }
        }
        messages
    }

    fn detach_entries(&mut self, owner: ObjId, entries: Vec<TraitEntry>) -> usize {
        let count = entries.len();
        for entry in entries {
            if let Some(id) = entry.listener {
                self.events.unregister(id);
            }
            entry.value.on_detach(owner, self);
        }
        count
    }

    /// Removes every trait equal to `value`. Returns how many went.
    pub fn remove_trait(&mut self, owner: ObjId, value: &Trait) -> usize {
        self.remove_traits_where(owner, |t| t == value)
    }

    /// Removes every trait matching a predicate, running exit effects.
    pub fn remove_traits_where<P>(&mut self, owner: ObjId, predicate: P) -> usize
    where
        P: Fn(&Trait) -> bool,
    {
        let taken = match self.objects.get_mut(owner) {
            Some(obj) => obj.traits.take_where(predicate),
            None => return 0,
        };
        if taken.is_empty() {
            debug!("Nothing to remove from object {}", owner);
        }
        self.detach_entries(owner, taken)
    }

    /// Revokes everything an item granted to an owner.
    pub fn remove_traits_from_source(&mut self, owner: ObjId, source: ObjId) -> usize {
        self.remove_traits_where(owner, |t| t.source() == Some(source))
    }

    /// Runs the end-of-round phase and advances the turn counter.
    ///
    /// Every trait subscribed when the phase starts is delivered once, in
    /// registration order. A trait unsubscribed by an earlier one is skipped.
    pub fn end_of_round(&mut self) {
        for (id, owner) in self.events.listeners(EventType::EndOfRound) {
            if self.events.is_registered(id) {
                self.deliver(id, owner, EventType::EndOfRound);
            }
        }
        self.turn += 1;
        trace!("Turn {} begins", self.turn);
    }

    /// Delivers the death of `id` to its own death listeners.
    pub fn dispatch_death(&mut self, id: ObjId) {
        let listeners: Vec<ListenerId> = self
            .events
            .listeners(EventType::Death)
            .into_iter()
            .filter(|&(_, owner)| owner == id)
            .map(|(listener, _)| listener)
            .collect();
        for listener in listeners {
            self.deliver(listener, id, EventType::Death);
        }
    }

    fn deliver(&mut self, id: ListenerId, owner: ObjId, event: EventType) {
        let taken = self
            .objects
            .get_mut(owner)
            .and_then(|o| o.traits.take_by_listener(id));
        let Some((index, entry)) = taken else {
            warn!("Dropping stale listener {:?} of object {}", id, owner);
            self.events.unregister(id);
            return;
        };

        let mut value = entry.value;
        let disposition = match event {
            EventType::EndOfRound => value.on_end_of_round(owner, self),
            EventType::Death => {
                value.on_death(owner, self);
                Disposition::Keep
            }
        };

        if !self.objects.contains(owner) {
            self.events.unregister(id);
            return;
        }
        match disposition {
            Disposition::Keep => self.reinsert(owner, index, value, Some(id)),
            Disposition::Unsubscribe => {
                self.events.unregister(id);
                self.reinsert(owner, index, value, None);
            }
            Disposition::Remove => {
                self.events.unregister(id);
                trace!("{} expired on object {}", value.kind(), owner);
                value.on_detach(owner, self);
            }
        }
    }

    fn reinsert(&mut self, owner: ObjId, index: usize, value: Trait, listener: Option<ListenerId>) {
        if let Some(obj) = self.objects.get_mut(owner) {
            obj.traits.insert(index, TraitEntry { value, listener });
        }
    }

    fn carried_item(&self, actor: ObjId, item: ObjId) -> DelveResult<()> {
        let held = self
            .objects
            .get(item)
            .map(|o| o.holder == Some(actor))
            .unwrap_or(false);
        if held {
            Ok(())
        } else {
            Err(DelveError::InvalidAction(format!(
                "Object {} does not carry item {}",
                actor, item
            )))
        }
    }

    /// Equips a carried item and applies the traits it grants.
    ///
    /// Granted traits carry the item as their source, so unequipping removes
    /// exactly those.
    pub fn equip(&mut self, actor: ObjId, item: ObjId) -> DelveResult<Vec<String>> {
        self.carried_item(actor, item)?;
        let Some(obj) = self.objects.get(item) else {
            return Ok(Vec::new());
        };
        if obj.equipped {
            return Ok(Vec::new());
        }
        let category = obj.category;
        let texts: Vec<String> = obj
            .traits
            .iter()
            .filter_map(|t| match t {
                Trait::Grants(g) => Some(g.traits.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        let granted = TraitFactory::from_texts(&texts, Some(actor))?;

        let mut messages = Vec::new();
        if category == ItemCategory::Weapon {
            let wielded: Vec<ObjId> = self
                .objects
                .get(actor)
                .map(|a| a.inventory.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|&i| {
                    i != item
                        && self
                            .objects
                            .get(i)
                            .map(|o| o.equipped && o.category == ItemCategory::Weapon)
                            .unwrap_or(false)
                })
                .collect();
            for other in wielded {
                messages.extend(self.unequip(actor, other)?);
            }
        }

        if let Some(obj) = self.objects.get_mut(item) {
            obj.equipped = true;
        }
        for value in granted {
            if !value.is_grantable() {
                warn!("Item {} cannot grant {}", item, value.kind());
                continue;
            }
            messages.extend(self.attach_trait(value.with_source(item), actor));
        }
        if self.is_player(actor) {
            let verb = if category == ItemCategory::Weapon { "wielding" } else { "wearing" };
            messages.push(format!("You are now {} the {}.", verb, self.display_name(item)));
        }
        Ok(messages)
    }

    /// Unequips an item and revokes everything it granted.
    pub fn unequip(&mut self, actor: ObjId, item: ObjId) -> DelveResult<Vec<String>> {
        self.carried_item(actor, item)?;
        let was_equipped = self.objects.get(item).map(|o| o.equipped).unwrap_or(false);
        if !was_equipped {
            return Ok(Vec::new());
        }
        self.unequip_silently(actor, item);
        let mut messages = Vec::new();
        if self.is_player(actor) {
            messages.push(format!("You take off the {}.", self.display_name(item)));
        }
        Ok(messages)
    }

    pub(crate) fn unequip_silently(&mut self, actor: ObjId, item: ObjId) {
        let Some(obj) = self.objects.get_mut(item) else {
            return;
        };
        if !obj.equipped {
            return;
        }
        obj.equipped = false;
        self.remove_traits_from_source(actor, item);
    }

    /// Lights or extinguishes a carried torch.
    ///
    /// A lit torch sheds light and burns whoever it hits, and spends one unit
    /// of fuel per round. A burnt out torch cannot be lit again.
    pub fn use_torch(&mut self, actor: ObjId, item: ObjId) -> DelveResult<ActionResult> {
        self.carried_item(actor, item)?;
        let state = self.objects.get(item).and_then(|o| {
            o.traits.iter().find_map(|t| match t {
                Trait::Torch(torch) => Some((torch.lit, torch.fuel)),
                _ => None,
            })
        });
        let Some((lit, fuel)) = state else {
            return Err(DelveError::InvalidAction(format!("Item {} is not a torch", item)));
        };

        if lit {
            let listener = self.set_torch_lit(item, false, None);
            if let Some(id) = listener {
                self.events.unregister(id);
            }
            self.remove_traits_from_source(item, item);
            if self.is_player(actor) {
                self.alert_player("You extinguish the torch.");
            }
            return Ok(ActionResult::Done);
        }

        if fuel == 0 {
            return Ok(ActionResult::Failed("The torch is burnt out.".to_string()));
        }

        let listener = self.events.register(EventType::EndOfRound, item);
        self.set_torch_lit(item, true, Some(listener));
        self.attach_trait(
            Trait::LightSource(LightSourceTrait {
                owner: None,
                radius: TORCH_LIGHT_RADIUS,
                source: None,
            })
            .with_source(item),
            item,
        );
        self.attach_trait(
            Trait::Damage(DamageTrait {
                dice: 1,
                sides: 4,
                damage_type: DamageType::Fire,
                source: None,
            })
            .with_source(item),
            item,
        );
        if self.is_player(actor) {
            self.alert_player("You light the torch.");
            self.refresh_visibility();
        }
        Ok(ActionResult::Done)
    }

    /// Flips a torch and swaps its listener, returning the previous one.
    fn set_torch_lit(&mut self, item: ObjId, lit: bool, listener: Option<ListenerId>) -> Option<ListenerId> {
        let entry = self
            .objects
            .get_mut(item)?
            .traits
            .find_entry_mut(|t| matches!(t, Trait::Torch(_)))?;
        if let Trait::Torch(torch) = &mut entry.value {
            torch.lit = lit;
            torch.owner = Some(item);
        }
        std::mem::replace(&mut entry.listener, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AilmentTrait, Attribute, GameObject, GrantsTrait, Map, Position, RetributionTrait,
        TileType, WardTrait,
    };

    fn arena() -> GameState {
        let mut map = Map::new(10, 10, TileType::Wall);
        for y in 1..9 {
            for x in 1..9 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        GameState::new(map, 3)
    }

    #[test]
    fn test_poison_runs_its_course_without_killing() {
        let mut gs = arena();
        let player = gs.spawn_player(Position::new(2, 2));
        if let Some(p) = gs.objects.get_mut(player) {
            p.stats.set(Attribute::HP, crate::Stat::new(10));
        }

        let messages = gs.apply_trait(Trait::poisoned(0, 3, 5), player).unwrap();
        assert_eq!(messages, vec!["You are poisoned!".to_string()]);

        let mut hp = Vec::new();
        for _ in 0..5 {
            gs.end_of_round();
            hp.push(gs.hp(player));
        }
        assert_eq!(hp, vec![7, 4, 1, 1, 1]);
        assert!(gs.objects.get(player).unwrap().traits.iter().any(|t| t.kind() == "Poisoned"));

        gs.end_of_round();
        let player_obj = gs.objects.get(player).unwrap();
        assert!(!player_obj.traits.iter().any(|t| t.kind() == "Poisoned"));
        assert!(gs.messages.iter().any(|m| m == "You feel better."));
        assert_eq!(gs.events.listeners(EventType::EndOfRound).len(), 0);
    }

    #[test]
    fn test_repeat_application_extends() {
        let mut gs = arena();
        let rat = gs.spawn(GameObject::actor("rat", 'r', Position::new(3, 3), 8));
        gs.apply_trait(Trait::poisoned(0, 1, 3), rat).unwrap();
        gs.turn = 2;
        gs.apply_trait(Trait::poisoned(0, 5, 4), rat).unwrap();

        let obj = gs.objects.get(rat).unwrap();
        assert_eq!(obj.traits.count(|t| t.kind() == "Poisoned"), 1);
        match obj.traits.find(|t| t.kind() == "Poisoned") {
            Some(Trait::Poisoned(p)) => {
                assert_eq!(p.strength, 1);
                assert_eq!(p.expires, Some(6));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(gs.events.len(), 1);
    }

    #[test]
    fn test_immunity_blocks_application() {
        let mut gs = arena();
        let golem = gs.spawn(
            GameObject::actor("golem", 'g', Position::new(4, 4), 20)
                .with_trait(Trait::Immunity(WardTrait::permanent(DamageType::Paralysis))),
        );
        let applied = gs
            .apply_trait(Trait::Ailment(AilmentTrait::new(AilmentKind::Paralyzed, 0, 5)), golem)
            .unwrap();
        assert!(applied.is_empty());
        assert!(!gs.has_ailment(golem, AilmentKind::Paralyzed));
        assert!(gs.events.is_empty());
    }

    #[test]
    fn test_timed_stat_buff_is_undone() {
        let mut gs = arena();
        let player = gs.spawn_player(Position::new(2, 2));
        let before = gs.objects.get(player).unwrap().stats.curr(Attribute::Str);
        gs.apply_trait(Trait::stat_buff(Attribute::Str, 2, Some(2)), player)
            .unwrap();
        assert_eq!(gs.objects.get(player).unwrap().stats.curr(Attribute::Str), before + 2);
        gs.end_of_round();
        gs.end_of_round();
        gs.end_of_round();
        assert_eq!(gs.objects.get(player).unwrap().stats.curr(Attribute::Str), before);
    }

    #[test]
    fn test_spawned_stat_buff_applies_and_rolls_back() {
        let mut gs = arena();
        let ogre = gs.spawn(
            GameObject::actor("ogre", 'O', Position::new(3, 3), 12)
                .with_stat(Attribute::Str, 10)
                .with_trait(Trait::stat_buff(Attribute::Str, 2, Some(2))),
        );
        assert_eq!(gs.objects.get(ogre).unwrap().stats.curr(Attribute::Str), 12);
        for _ in 0..4 {
            gs.end_of_round();
        }
        let obj = gs.objects.get(ogre).unwrap();
        assert_eq!(obj.stats.curr(Attribute::Str), 10);
        assert_eq!(obj.traits.count(|t| t.kind() == "StatBuff"), 0);
    }

    #[test]
    fn test_equipment_grants_are_scoped_to_their_source() {
        let mut gs = arena();
        let player = gs.spawn_player(Position::new(2, 2));
        let ring_of = |gs: &mut GameState| {
            let ring = gs.spawn(
                GameObject::item("ring", '=', ItemCategory::Armour, Position::new(2, 2)).with_trait(
                    Trait::Grants(GrantsTrait {
                        traits: vec!["Resistance#Fire#-#owner#-".to_string()],
                    }),
                ),
            );
            gs.objects.move_to_inventory(ring, player).unwrap();
            ring
        };
        let first = ring_of(&mut gs);
        let second = ring_of(&mut gs);
        gs.equip(player, first).unwrap();
        gs.equip(player, second).unwrap();
        assert_eq!(
            gs.objects.get(player).unwrap().traits.count(|t| t.kind() == "Resistance"),
            2
        );

        gs.unequip(player, first).unwrap();
        assert!(gs.has_resistance(player, DamageType::Fire));
        gs.unequip(player, second).unwrap();
        assert!(!gs.has_resistance(player, DamageType::Fire));
    }

    #[test]
    fn test_torch_burns_out() {
        let mut gs = arena();
        let player = gs.spawn_player(Position::new(2, 2));
        let torch = gs.spawn(
            GameObject::item("torch", '(', ItemCategory::Tool, Position::new(2, 2))
                .with_trait(Trait::torch(2)),
        );
        gs.objects.move_to_inventory(torch, player).unwrap();

        assert_eq!(gs.use_torch(player, torch).unwrap(), ActionResult::Done);
        assert!(gs.vision_radius(player) >= TORCH_LIGHT_RADIUS);
        assert_eq!(gs.objects.get(torch).unwrap().traits.len(), 3);

        gs.end_of_round();
        gs.end_of_round();
        let item = gs.objects.get(torch).unwrap();
        assert_eq!(item.traits.len(), 1);
        assert!(matches!(item.traits.iter().next(), Some(Trait::Torch(t)) if !t.lit && t.fuel == 0));
        assert!(gs.messages.iter().any(|m| m == "Your torch burns out."));
        assert!(gs.events.is_empty());

        let turn = gs.turn;
        let result = gs.use_torch(player, torch).unwrap();
        assert!(matches!(result, ActionResult::Failed(ref why) if why.contains("burnt out")));
        assert_eq!(gs.turn, turn);
        assert!(gs.events.is_empty());
    }

    #[test]
    fn test_retribution_fires_on_death() {
        let mut gs = arena();
        let player = gs.spawn_player(Position::new(2, 2));
        let spore = gs.spawn(
            GameObject::actor("spore", 'e', Position::new(3, 2), 1).with_trait(Trait::Retribution(
                RetributionTrait {
                    dice: 2,
                    sides: 1,
                    damage_type: DamageType::Acid,
                    owner: None,
                },
            )),
        );
        let before = gs.hp(player);
        gs.deal_damage(spore, 5, DamageType::Slashing);
        assert!(!gs.objects.contains(spore));
        assert_eq!(gs.hp(player), before - 2);
        assert!(gs.events.is_empty());
    }

    #[test]
    fn test_countdown_removes_owner() {
        let mut gs = arena();
        let spirit = gs.spawn(
            GameObject::actor("spirit", 's', Position::new(5, 5), 3)
                .with_trait(TraitFactory::from_text("Countdown#1#-#-", None).unwrap()),
        );
        gs.end_of_round();
        assert!(gs.objects.contains(spirit));
        gs.end_of_round();
        assert!(!gs.objects.contains(spirit));
        assert!(gs.events.is_empty());
    }
}
