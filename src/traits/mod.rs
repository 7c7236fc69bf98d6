//! # Traits
//!
//! Status effects, equipment properties and AI markers attached to actors
//! and items.
//!
//! [`Trait`] is a closed sum type. Each variant wraps a payload struct with
//! strongly typed fields, and every variant has a stable text form
//! `<Kind>#<field>#...` produced by [`Trait::as_text`] and read back by
//! [`TraitFactory::from_text`]. Two traits are equal when their texts are.
//!
//! Traits fall into three groups:
//! - static ones that are pure data (tags, weapon damage, grants)
//! - temporary ones with an owner and an expiry turn, ticked at end of round
//! - reactive ones that listen for events without expiring (lit torches,
//!   retribution on death)
//!
//! The lifecycle (apply, tick, removal) lives in [`lifecycle`] as methods on
//! the game state.

pub mod effects;
pub mod factory;
pub mod lifecycle;
pub mod passive;
pub mod temporary;
pub mod text;

pub use factory::*;
pub use passive::*;
pub use temporary::*;

use crate::{Attribute, EventType, GameState, ListenerId, ObjId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Kinds of damage and of afflictions an immunity can block.
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
pub enum DamageType {
    Slashing,
    Piercing,
    Blunt,
    Fire,
    Cold,
    Poison,
    Acid,
    Electric,
    Necrotic,
    Fear,
    Paralysis,
    Confusion,
    Nausea,
    Blindness,
}

/// Flag-like properties.
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
pub enum Tag {
    Axe,
    Sword,
    Polearm,
    Dagger,
    Cleave,
    Impale,
    Finesse,
    Flying,
    Floating,
    Swimmer,
    Intelligent,
    Immobile,
    Plant,
    Undead,
    Brave,
    Flammable,
    Metal,
    Wooden,
}

/// Conditions that hinder an actor without damaging it.
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
pub enum AilmentKind {
    Paralyzed,
    Confused,
    Nauseous,
    Blind,
    Frightened,
}

impl AilmentKind {
    /// Damage type an immunity must cover to block this ailment.
    pub fn damage_type(self) -> DamageType {
        match self {
            AilmentKind::Paralyzed => DamageType::Paralysis,
            AilmentKind::Confused => DamageType::Confusion,
            AilmentKind::Nauseous => DamageType::Nausea,
            AilmentKind::Blind => DamageType::Blindness,
            AilmentKind::Frightened => DamageType::Fear,
        }
    }

    /// Attribute used for the saving throw.
    pub fn save_attribute(self) -> Attribute {
        match self {
            AilmentKind::Paralyzed | AilmentKind::Nauseous => Attribute::Con,
            AilmentKind::Confused | AilmentKind::Frightened => Attribute::Wis,
            AilmentKind::Blind => Attribute::Dex,
        }
    }
}

/// What the dispatcher does with a trait after delivering an event to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Stay attached and subscribed
    Keep,
    /// Detach, unsubscribe and run the exit effect
    Remove,
    /// Stay attached but stop listening
    Unsubscribe,
}

/// A status effect or property.
#[derive(Debug, Clone)]
pub enum Trait {
    Tag(TagTrait),
    Damage(DamageTrait),
    Immunity(WardTrait),
    Resistance(WardTrait),
    Rage(RageTrait),
    LightSource(LightSourceTrait),
    Worshipper(WorshipperTrait),
    Disguise(DisguiseTrait),
    Companion(CompanionTrait),
    Grants(GrantsTrait),
    Coating(CoatingTrait),
    Retribution(RetributionTrait),
    Poisoned(AfflictionTrait),
    OnFire(AfflictionTrait),
    Ailment(AilmentTrait),
    Regenerating(RegeneratingTrait),
    StatBuff(StatBuffTrait),
    Countdown(CountdownTrait),
    Torch(TorchTrait),
    Aura(AuraTrait),
}

impl PartialEq for Trait {
    fn eq(&self, other: &Self) -> bool {
        self.as_text() == other.as_text()
    }
}

impl Eq for Trait {}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl Trait {
    pub fn tag(tag: Tag) -> Self {
        Trait::Tag(TagTrait { tag, source: None })
    }

    pub fn damage(dice: u32, sides: u32, damage_type: DamageType) -> Self {
        Trait::Damage(DamageTrait {
            dice,
            sides,
            damage_type,
            source: None,
        })
    }

    pub fn poisoned(dc: i32, strength: i32, duration: u64) -> Self {
        Trait::Poisoned(AfflictionTrait::new(dc, strength, duration))
    }

    pub fn on_fire(dc: i32, strength: i32, duration: u64) -> Self {
        Trait::OnFire(AfflictionTrait::new(dc, strength, duration))
    }

    pub fn ailment(kind: AilmentKind, dc: i32, duration: u64) -> Self {
        Trait::Ailment(AilmentTrait::new(kind, dc, duration))
    }

    pub fn stat_buff(attr: Attribute, amount: i32, duration: Option<u64>) -> Self {
        Trait::StatBuff(StatBuffTrait {
            attr,
            amount,
            duration,
            owner: None,
            expires: None,
            source: None,
        })
    }

    pub fn torch(fuel: u32) -> Self {
        Trait::Torch(TorchTrait {
            owner: None,
            lit: false,
            fuel,
        })
    }

    pub fn aura(damage_type: DamageType, radius: i32, magnitude: i32, duration: u64) -> Self {
        Trait::Aura(AuraTrait {
            damage_type,
            radius,
            magnitude,
            duration,
            owner: None,
            expires: None,
        })
    }

    /// Stable kind tag used as the first field of the text form.
    pub fn kind(&self) -> &'static str {
        match self {
            Trait::Tag(_) => "Tag",
            Trait::Damage(_) => "Damage",
            Trait::Immunity(_) => "Immunity",
            Trait::Resistance(_) => "Resistance",
            Trait::Rage(_) => "Rage",
            Trait::LightSource(_) => "LightSource",
            Trait::Worshipper(_) => "Worshipper",
            Trait::Disguise(_) => "Disguise",
            Trait::Companion(_) => "Companion",
            Trait::Grants(_) => "Grants",
            Trait::Coating(_) => "Coating",
            Trait::Retribution(_) => "Retribution",
            Trait::Poisoned(_) => "Poisoned",
            Trait::OnFire(_) => "OnFire",
            Trait::Ailment(a) => match a.kind {
                AilmentKind::Paralyzed => "Paralyzed",
                AilmentKind::Confused => "Confused",
                AilmentKind::Nauseous => "Nauseous",
                AilmentKind::Blind => "Blind",
                AilmentKind::Frightened => "Frightened",
            },
            Trait::Regenerating(_) => "Regenerating",
            Trait::StatBuff(_) => "StatBuff",
            Trait::Countdown(_) => "Countdown",
            Trait::Torch(_) => "Torch",
            Trait::Aura(_) => "Aura",
        }
    }

    /// Canonical text form. Depends only on the trait's own fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{DamageType, Trait};
    ///
    /// assert_eq!(Trait::damage(2, 6, DamageType::Fire).as_text(), "Damage#2#6#Fire");
    /// ```
    pub fn as_text(&self) -> String {
        let fields = match self {
            Trait::Tag(t) => t.fields(),
            Trait::Damage(t) => t.fields(),
            Trait::Immunity(t) | Trait::Resistance(t) => t.fields(),
            Trait::Rage(t) => t.fields(),
            Trait::LightSource(t) => t.fields(),
            Trait::Worshipper(t) => t.fields(),
            Trait::Disguise(t) => t.fields(),
            Trait::Companion(t) => t.fields(),
            Trait::Grants(t) => t.fields(),
            Trait::Coating(t) => t.fields(),
            Trait::Retribution(t) => t.fields(),
            Trait::Poisoned(t) | Trait::OnFire(t) => t.fields(),
            Trait::Ailment(t) => t.fields(),
            Trait::Regenerating(t) => t.fields(),
            Trait::StatBuff(t) => t.fields(),
            Trait::Countdown(t) => t.fields(),
            Trait::Torch(t) => t.fields(),
            Trait::Aura(t) => t.fields(),
        };
        text::join(self.kind(), fields)
    }

    pub fn owner(&self) -> Option<ObjId> {
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => t.owner,
            Trait::Rage(t) => Some(t.owner),
            Trait::LightSource(t) => t.owner,
            Trait::Retribution(t) => t.owner,
            Trait::Poisoned(t) | Trait::OnFire(t) => t.owner,
            Trait::Ailment(t) => t.owner,
            Trait::Regenerating(t) => t.owner,
            Trait::StatBuff(t) => t.owner,
            Trait::Countdown(t) => t.owner,
            Trait::Torch(t) => t.owner,
            Trait::Aura(t) => t.owner,
            _ => None,
        }
    }

    /// Stamps the owner on kinds that record one.
    pub fn set_owner(&mut self, owner: ObjId) {
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => t.owner = Some(owner),
            Trait::Rage(t) => t.owner = owner,
            Trait::LightSource(t) => t.owner = Some(owner),
            Trait::Retribution(t) => t.owner = Some(owner),
            Trait::Poisoned(t) | Trait::OnFire(t) => t.owner = Some(owner),
            Trait::Ailment(t) => t.owner = Some(owner),
            Trait::Regenerating(t) => t.owner = Some(owner),
            Trait::StatBuff(t) => t.owner = Some(owner),
            Trait::Countdown(t) => t.owner = Some(owner),
            Trait::Torch(t) => t.owner = Some(owner),
            Trait::Aura(t) => t.owner = Some(owner),
            _ => {}
        }
    }

    /// Object that granted this trait, for source-scoped removal.
    pub fn source(&self) -> Option<ObjId> {
        match self {
            Trait::Tag(t) => t.source,
            Trait::Damage(t) => t.source,
            Trait::Immunity(t) | Trait::Resistance(t) => t.source,
            Trait::LightSource(t) => t.source,
            Trait::Regenerating(t) => t.source,
            Trait::StatBuff(t) => t.source,
            _ => None,
        }
    }

    /// Whether this kind can carry a granting source.
    pub fn is_grantable(&self) -> bool {
        matches!(
            self,
            Trait::Tag(_)
                | Trait::Damage(_)
                | Trait::Immunity(_)
                | Trait::Resistance(_)
                | Trait::LightSource(_)
                | Trait::Regenerating(_)
                | Trait::StatBuff(_)
        )
    }

    pub fn with_source(mut self, source: ObjId) -> Self {
        match &mut self {
            Trait::Tag(t) => t.source = Some(source),
            Trait::Damage(t) => t.source = Some(source),
            Trait::Immunity(t) | Trait::Resistance(t) => t.source = Some(source),
            Trait::LightSource(t) => t.source = Some(source),
            Trait::Regenerating(t) => t.source = Some(source),
            Trait::StatBuff(t) => t.source = Some(source),
            _ => {}
        }
        self
    }

    /// Turn at which the trait runs out, `None` for never.
    pub fn expires(&self) -> Option<u64> {
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => t.expires,
            Trait::Poisoned(t) | Trait::OnFire(t) => t.expires,
            Trait::Ailment(t) => t.expires,
            Trait::Regenerating(t) => t.expires,
            Trait::StatBuff(t) => t.expires,
            Trait::Countdown(t) => t.expires,
            Trait::Aura(t) => t.expires,
            _ => None,
        }
    }

    fn duration(&self) -> Option<u64> {
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => t.duration,
            Trait::Poisoned(t) | Trait::OnFire(t) => Some(t.duration),
            Trait::Ailment(t) => Some(t.duration),
            Trait::Regenerating(t) => t.duration,
            Trait::StatBuff(t) => t.duration,
            Trait::Countdown(t) => Some(t.duration),
            Trait::Aura(t) => Some(t.duration),
            _ => None,
        }
    }

    /// Sets the expiry from the duration, counting from `turn`.
    pub fn stamp_expiry(&mut self, turn: u64) {
        let Some(duration) = self.duration() else {
            return;
        };
        let expires = Some(turn + duration);
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => t.expires = expires,
            Trait::Poisoned(t) | Trait::OnFire(t) => t.expires = expires,
            Trait::Ailment(t) => t.expires = expires,
            Trait::Regenerating(t) => t.expires = expires,
            Trait::StatBuff(t) => t.expires = expires,
            Trait::Countdown(t) => t.expires = expires,
            Trait::Aura(t) => t.expires = expires,
            _ => {}
        }
    }

    fn set_expires(&mut self, expires: Option<u64>) {
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => t.expires = expires,
            Trait::Poisoned(t) | Trait::OnFire(t) => t.expires = expires,
            Trait::Ailment(t) => t.expires = expires,
            Trait::Regenerating(t) => t.expires = expires,
            Trait::StatBuff(t) => t.expires = expires,
            Trait::Countdown(t) => t.expires = expires,
            Trait::Aura(t) => t.expires = expires,
            _ => {}
        }
    }

    /// Key under which at most one instance may sit on an owner.
    ///
    /// `None` means the kind stacks freely (weapon damage, grants).
    pub fn merge_key(&self) -> Option<String> {
        let source = text::opt_to_text(self.source());
        match self {
            Trait::Tag(t) => Some(format!("Tag:{}:{}", t.tag, source)),
            Trait::Immunity(t) => Some(format!("Immunity:{}:{}", t.damage_type, source)),
            Trait::Resistance(t) => Some(format!("Resistance:{}:{}", t.damage_type, source)),
            Trait::StatBuff(t) => Some(format!("StatBuff:{}:{}", t.attr, source)),
            Trait::Regenerating(_) => Some(format!("Regenerating:{}", source)),
            Trait::Aura(t) => Some(format!("Aura:{}", t.damage_type)),
            Trait::Damage(_) | Trait::Grants(_) | Trait::LightSource(_) => None,
            _ => Some(self.kind().to_string()),
        }
    }

    /// Folds a repeated application into this instance.
    ///
    /// The later expiry wins and the original magnitude is kept, except for
    /// auras, which add up.
    pub fn merge_from(&mut self, incoming: &Trait) {
        let expires = match (self.expires(), incoming.expires()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        if self.duration().is_some() {
            self.set_expires(expires);
        }
        if let (Trait::Aura(mine), Trait::Aura(theirs)) = (self, incoming) {
            mine.magnitude += theirs.magnitude;
        }
    }

    /// Event the trait listens to while attached, if any.
    pub fn subscription(&self) -> Option<EventType> {
        match self {
            Trait::Immunity(t) | Trait::Resistance(t) => {
                t.duration.map(|_| EventType::EndOfRound)
            }
            Trait::StatBuff(t) => t.duration.map(|_| EventType::EndOfRound),
            Trait::Poisoned(_)
            | Trait::OnFire(_)
            | Trait::Ailment(_)
            | Trait::Regenerating(_)
            | Trait::Countdown(_)
            | Trait::Aura(_) => Some(EventType::EndOfRound),
            Trait::Torch(t) if t.lit => Some(EventType::EndOfRound),
            Trait::Retribution(_) => Some(EventType::Death),
            _ => None,
        }
    }

    /// Difficulty and attribute of the saving throw guarding the target.
    pub fn saving_throw(&self) -> Option<(i32, Attribute)> {
        match self {
            Trait::Poisoned(t) if t.dc > 0 => Some((t.dc, Attribute::Con)),
            Trait::OnFire(t) if t.dc > 0 => Some((t.dc, Attribute::Dex)),
            Trait::Ailment(t) if t.dc > 0 => Some((t.dc, t.kind.save_attribute())),
            _ => None,
        }
    }

    /// Damage type an immunity must match to block this trait.
    pub fn affliction_type(&self) -> Option<DamageType> {
        match self {
            Trait::Poisoned(_) => Some(DamageType::Poison),
            Trait::OnFire(_) => Some(DamageType::Fire),
            Trait::Ailment(t) => Some(t.kind.damage_type()),
            _ => None,
        }
    }

    /// Whether the trait currently has any effect.
    pub fn is_active(&self, gs: &GameState) -> bool {
        match self {
            Trait::Rage(t) => gs
                .objects
                .get(t.owner)
                .and_then(|o| o.stats.get(Attribute::HP))
                .map(|hp| hp.curr * 2 < hp.max)
                .unwrap_or(false),
            Trait::Torch(t) => t.lit,
            Trait::Coating(t) => t.charges > 0,
            _ => !temporary::is_expired(self.expires(), gs.turn),
        }
    }
}

/// One attached trait and its listener handle while subscribed.
#[derive(Debug, Clone)]
pub struct TraitEntry {
    pub value: Trait,
    pub listener: Option<ListenerId>,
}

/// Ordered traits of one object.
#[derive(Debug, Clone, Default)]
pub struct TraitSet {
    entries: Vec<TraitEntry>,
}

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Trait, listener: Option<ListenerId>) {
        self.entries.push(TraitEntry { value, listener });
    }

    pub fn insert(&mut self, index: usize, entry: TraitEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trait> {
        self.entries.iter().map(|e| &e.value)
    }

    pub fn entries(&self) -> &[TraitEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Membership by value equality.
    pub fn contains(&self, value: &Trait) -> bool {
        self.iter().any(|t| t == value)
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.iter()
            .any(|t| matches!(t, Trait::Tag(TagTrait { tag: found, .. }) if *found == tag))
    }

    pub fn find<P>(&self, predicate: P) -> Option<&Trait>
    where
        P: Fn(&Trait) -> bool,
    {
        self.iter().find(|t| predicate(t))
    }

    pub fn find_mut<P>(&mut self, predicate: P) -> Option<&mut Trait>
    where
        P: Fn(&Trait) -> bool,
    {
        self.entries
            .iter_mut()
            .map(|e| &mut e.value)
            .find(|t| predicate(t))
    }

    pub fn find_entry_mut<P>(&mut self, predicate: P) -> Option<&mut TraitEntry>
    where
        P: Fn(&Trait) -> bool,
    {
        self.entries.iter_mut().find(|e| predicate(&e.value))
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Trait) -> bool,
    {
        self.iter().filter(|t| predicate(t)).count()
    }

    /// Takes out the entry subscribed under a listener id, with its index.
    pub fn take_by_listener(&mut self, id: ListenerId) -> Option<(usize, TraitEntry)> {
        let index = self.entries.iter().position(|e| e.listener == Some(id))?;
        Some((index, self.entries.remove(index)))
    }

    /// Takes out every entry matching a predicate, in order.
    pub fn take_where<P>(&mut self, predicate: P) -> Vec<TraitEntry>
    where
        P: Fn(&Trait) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if predicate(&entry.value) {
                taken.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        taken
    }
}
