//! Payloads of traits that live on the end-of-round clock: afflictions,
//! timed buffs, countdowns, torches and auras.
//!
//! Durations count from the turn the trait is applied. A trait applied
//! during turn `t` with duration `d` expires at the end-of-round phase of
//! turn `t + d`, so it ticks `d` times before that.

use super::text::{opt_to_text, Fields};
use super::{AilmentKind, DamageType};
use crate::{Attribute, DelveResult, ObjId};

/// True once the turn counter has reached the expiry turn.
pub fn is_expired(expires: Option<u64>, turn: u64) -> bool {
    expires.map(|e| turn >= e).unwrap_or(false)
}

/// Damage over time of one flavour.
#[derive(Debug, Clone)]
pub struct AfflictionTrait {
    /// Difficulty of the saving throw, zero for none
    pub dc: i32,
    /// Damage per round
    pub strength: i32,
    pub duration: u64,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
}

impl AfflictionTrait {
    pub fn new(dc: i32, strength: i32, duration: u64) -> Self {
        Self {
            dc,
            strength,
            duration,
            owner: None,
            expires: None,
        }
    }

    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            self.dc.to_string(),
            self.strength.to_string(),
            self.duration.to_string(),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            dc: f.next()?,
            strength: f.next()?,
            duration: f.next()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AilmentTrait {
    pub kind: AilmentKind,
    pub dc: i32,
    pub duration: u64,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
}

impl AilmentTrait {
    pub fn new(kind: AilmentKind, dc: i32, duration: u64) -> Self {
        Self {
            kind,
            dc,
            duration,
            owner: None,
            expires: None,
        }
    }

    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            self.dc.to_string(),
            self.duration.to_string(),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ]
    }

    pub(crate) fn parse(kind: AilmentKind, f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            kind,
            dc: f.next()?,
            duration: f.next()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegeneratingTrait {
    pub amount: i32,
    pub duration: Option<u64>,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
    pub source: Option<ObjId>,
}

impl RegeneratingTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.amount.to_string(),
            opt_to_text(self.duration),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ];
        if let Some(source) = self.source {
            fields.push(source.to_string());
        }
        fields
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            amount: f.next()?,
            duration: f.next_opt()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
            source: f.next_trailing_opt()?,
        })
    }
}

/// Temporary or equipment-granted change to one attribute.
#[derive(Debug, Clone)]
pub struct StatBuffTrait {
    pub attr: Attribute,
    pub amount: i32,
    pub duration: Option<u64>,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
    pub source: Option<ObjId>,
}

impl StatBuffTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.attr.to_string(),
            self.amount.to_string(),
            opt_to_text(self.duration),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ];
        if let Some(source) = self.source {
            fields.push(source.to_string());
        }
        fields
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            attr: f.next()?,
            amount: f.next()?,
            duration: f.next_opt()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
            source: f.next_trailing_opt()?,
        })
    }
}

/// Removes its owner from the game when it runs out.
#[derive(Debug, Clone)]
pub struct CountdownTrait {
    pub duration: u64,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
}

impl CountdownTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            self.duration.to_string(),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            duration: f.next()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
        })
    }
}

/// Fuel-burning light carried on a torch item. `owner` is the item.
#[derive(Debug, Clone)]
pub struct TorchTrait {
    pub owner: Option<ObjId>,
    pub lit: bool,
    pub fuel: u32,
}

impl TorchTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            opt_to_text(self.owner),
            self.lit.to_string(),
            self.fuel.to_string(),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            owner: f.next_owner()?,
            lit: f.next()?,
            fuel: f.next()?,
        })
    }
}

/// Harms every actor near its owner each round.
#[derive(Debug, Clone)]
pub struct AuraTrait {
    pub damage_type: DamageType,
    pub radius: i32,
    pub magnitude: i32,
    pub duration: u64,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
}

impl AuraTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            self.damage_type.to_string(),
            self.radius.to_string(),
            self.magnitude.to_string(),
            self.duration.to_string(),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            damage_type: f.next()?,
            radius: f.next()?,
            magnitude: f.next()?,
            duration: f.next()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
        })
    }
}
