//! # Objects
//!
//! Actors and items, their stat bags, and the object directory that owns
//! them all.
//!
//! Every object carries a stable numeric [`ObjId`] handed out by the
//! [`ObjectDb`] on insertion. Items held in an inventory have no map position
//! of their own; they travel with their holder.

use crate::{DelveError, DelveResult, ObjId, Position, Tag, Trait, TraitSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::{Display, EnumIter, EnumString};

/// Named numeric statistics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Attribute {
    HP,
    Str,
    Dex,
    Con,
    Int,
    Wis,
    AC,
}

/// Current and maximum value of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub curr: i32,
    pub max: i32,
}

impl Stat {
    pub fn new(value: i32) -> Self {
        Self {
            curr: value,
            max: value,
        }
    }
}

/// Attribute bag of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    values: BTreeMap<Attribute, Stat>,
}

impl Stats {
    pub fn get(&self, attr: Attribute) -> Option<Stat> {
        self.values.get(&attr).copied()
    }

    /// Current value, or the neutral default when the attribute is absent.
    pub fn curr(&self, attr: Attribute) -> i32 {
        self.get(attr).map(|s| s.curr).unwrap_or(match attr {
            Attribute::HP => 0,
            _ => 10,
        })
    }

    pub fn max(&self, attr: Attribute) -> i32 {
        self.get(attr).map(|s| s.max).unwrap_or(self.curr(attr))
    }

    pub fn set(&mut self, attr: Attribute, stat: Stat) {
        self.values.insert(attr, stat);
    }

    /// Adds to the current value, capped at the maximum.
    pub fn change_curr(&mut self, attr: Attribute, delta: i32) -> i32 {
        let default = self.curr(attr);
        let stat = self.values.entry(attr).or_insert(Stat::new(default));
        stat.curr = (stat.curr + delta).min(stat.max);
        stat.curr
    }

    /// Shifts both current and maximum value.
    pub fn shift(&mut self, attr: Attribute, delta: i32) {
        let default = self.curr(attr);
        let stat = self.values.entry(attr).or_insert(Stat::new(default));
        stat.curr += delta;
        stat.max += delta;
    }

    /// Standard ability modifier, `(value - 10) / 2` rounded down.
    pub fn modifier(&self, attr: Attribute) -> i32 {
        (self.curr(attr) - 10).div_euclid(2)
    }
}

/// Broad class of object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Actor,
    Item,
}

/// Disposition of an actor towards the player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Attitude {
    Indifferent,
    Aggressive,
    /// Asleep or otherwise dormant
    Inactive,
    Friendly,
}

/// What kind of item an object is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ItemCategory {
    Weapon,
    Armour,
    Tool,
    Consumable,
    Valuable,
    Other,
}

/// An actor or item in the world.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: ObjId,
    pub name: String,
    pub glyph: char,
    pub kind: ObjectKind,
    pub position: Position,
    pub stats: Stats,
    pub traits: TraitSet,
    pub attitude: Attitude,
    /// Items carried by an actor
    pub inventory: Vec<ObjId>,
    /// Actor carrying this item
    pub holder: Option<ObjId>,
    pub equipped: bool,
    pub category: ItemCategory,
    /// Behaviour plan archetype for monsters
    pub plan: Option<String>,
}

impl GameObject {
    /// Creates an actor with the given hit points.
    pub fn actor(name: &str, glyph: char, position: Position, hp: i32) -> Self {
        let mut stats = Stats::default();
        stats.set(Attribute::HP, Stat::new(hp));
        Self {
            id: 0,
            name: name.to_string(),
            glyph,
            kind: ObjectKind::Actor,
            position,
            stats,
            traits: TraitSet::default(),
            attitude: Attitude::Indifferent,
            inventory: Vec::new(),
            holder: None,
            equipped: false,
            category: ItemCategory::Other,
            plan: None,
        }
    }

    /// Creates an item lying at a position.
    pub fn item(name: &str, glyph: char, category: ItemCategory, position: Position) -> Self {
        Self {
            kind: ObjectKind::Item,
            category,
            ..Self::actor(name, glyph, position, 0)
        }
    }

    pub fn with_stat(mut self, attr: Attribute, value: i32) -> Self {
        self.stats.set(attr, Stat::new(value));
        self
    }

    pub fn with_attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = attitude;
        self
    }

    pub fn with_trait(mut self, t: Trait) -> Self {
        self.traits.push(t, None);
        self
    }

    pub fn with_plan(mut self, plan: &str) -> Self {
        self.plan = Some(plan.to_string());
        self
    }

    pub fn is_actor(&self) -> bool {
        self.kind == ObjectKind::Actor
    }

    pub fn is_item(&self) -> bool {
        self.kind == ObjectKind::Item
    }

    pub fn hp(&self) -> i32 {
        self.stats.curr(Attribute::HP)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.traits.has_tag(tag)
    }
}

/// Directory of every object in the game, with a spatial index of the ones
/// lying on the map.
#[derive(Debug, Clone, Default)]
pub struct ObjectDb {
    next_id: ObjId,
    objects: HashMap<ObjId, GameObject>,
    position_index: HashMap<Position, Vec<ObjId>>,
}

impl ObjectDb {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Inserts an object, assigning it a fresh id.
    pub fn add(&mut self, mut obj: GameObject) -> ObjId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        obj.id = id;
        if obj.holder.is_none() {
            self.position_index.entry(obj.position).or_default().push(id);
        }
        self.objects.insert(id, obj);
        id
    }

    pub fn get(&self, id: ObjId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    /// Mutable access. Positions must be changed through [`ObjectDb::set_position`].
    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut GameObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Removes an object from the directory and the spatial index.
    pub fn remove(&mut self, id: ObjId) -> Option<GameObject> {
        let obj = self.objects.remove(&id)?;
        self.unindex(id, obj.position);
        if let Some(holder) = obj.holder.and_then(|h| self.objects.get_mut(&h)) {
            holder.inventory.retain(|&i| i != id);
        }
        Some(obj)
    }

    fn unindex(&mut self, id: ObjId, pos: Position) {
        if let Some(ids) = self.position_index.get_mut(&pos) {
            ids.retain(|&i| i != id);
            if ids.is_empty() {
                self.position_index.remove(&pos);
            }
        }
    }

    /// The actor standing on a cell, if any.
    pub fn occupant_at(&self, pos: Position) -> Option<ObjId> {
        self.position_index.get(&pos).and_then(|ids| {
            ids.iter()
                .copied()
                .find(|id| self.objects.get(id).map(|o| o.is_actor()).unwrap_or(false))
        })
    }

    /// Items lying on a cell, oldest first.
    pub fn items_at(&self, pos: Position) -> Vec<ObjId> {
        self.position_index
            .get(&pos)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.objects.get(id).map(|o| o.is_item()).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every item lying on the map.
    pub fn floor_items(&self) -> Vec<(ObjId, Position)> {
        let mut items: Vec<_> = self
            .objects
            .values()
            .filter(|o| o.is_item() && o.holder.is_none())
            .map(|o| (o.id, o.position))
            .collect();
        items.sort();
        items
    }

    pub fn set_position(&mut self, id: ObjId, pos: Position) -> DelveResult<()> {
        let obj = self
            .objects
            .get_mut(&id)
            .ok_or_else(|| DelveError::InvalidState(format!("No object with id {}", id)))?;
        let old = obj.position;
        let held = obj.holder.is_some();
        obj.position = pos;
        let carried = obj.inventory.clone();
        if !held {
            self.unindex(id, old);
            self.position_index.entry(pos).or_default().push(id);
        }
        for item in carried {
            if let Some(item) = self.objects.get_mut(&item) {
                item.position = pos;
            }
        }
        Ok(())
    }

    /// Moves a floor item into an actor's inventory.
    pub fn move_to_inventory(&mut self, item: ObjId, holder: ObjId) -> DelveResult<()> {
        let holder_pos = self
            .objects
            .get(&holder)
            .map(|o| o.position)
            .ok_or_else(|| DelveError::InvalidState(format!("No holder with id {}", holder)))?;
        let obj = self
            .objects
            .get_mut(&item)
            .ok_or_else(|| DelveError::InvalidState(format!("No item with id {}", item)))?;
        if let Some(previous) = obj.holder {
            return Err(DelveError::InvalidAction(format!(
                "Item {} is already held by {}",
                item, previous
            )));
        }
        let old = obj.position;
        obj.holder = Some(holder);
        obj.position = holder_pos;
        self.unindex(item, old);
        if let Some(h) = self.objects.get_mut(&holder) {
            h.inventory.push(item);
        }
        Ok(())
    }

    /// Takes an item out of its holder's inventory and lays it on a cell.
    pub fn drop_to_floor(&mut self, item: ObjId, pos: Position) -> DelveResult<()> {
        let obj = self
            .objects
            .get_mut(&item)
            .ok_or_else(|| DelveError::InvalidState(format!("No item with id {}", item)))?;
        let holder = obj.holder.take();
        obj.equipped = false;
        obj.position = pos;
        if let Some(h) = holder.and_then(|h| self.objects.get_mut(&h)) {
            h.inventory.retain(|&i| i != item);
        }
        self.position_index.entry(pos).or_default().push(item);
        Ok(())
    }

    /// Ids of every actor, ascending.
    pub fn actor_ids(&self) -> Vec<ObjId> {
        let mut ids: Vec<_> = self
            .objects
            .values()
            .filter(|o| o.is_actor())
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.values()
    }
}
