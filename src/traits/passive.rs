//! Payloads of traits that mostly describe rather than act: weapon damage,
//! tags, resistances, equipment grants and the monster-specific markers.

use super::text::{escape, opt_to_text, Fields};
use super::{DamageType, Tag};
use crate::{DelveError, DelveResult, ObjId, Position};

fn push_source(fields: &mut Vec<String>, source: Option<ObjId>) {
    if let Some(source) = source {
        fields.push(source.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct TagTrait {
    pub tag: Tag,
    pub source: Option<ObjId>,
}

impl TagTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        let mut fields = vec![self.tag.to_string()];
        push_source(&mut fields, self.source);
        fields
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            tag: f.next()?,
            source: f.next_trailing_opt()?,
        })
    }
}

/// Dice rolled when the carrier hits something.
#[derive(Debug, Clone)]
pub struct DamageTrait {
    pub dice: u32,
    pub sides: u32,
    pub damage_type: DamageType,
    pub source: Option<ObjId>,
}

impl DamageTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.dice.to_string(),
            self.sides.to_string(),
            self.damage_type.to_string(),
        ];
        push_source(&mut fields, self.source);
        fields
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            dice: f.next()?,
            sides: f.next()?,
            damage_type: f.next()?,
            source: f.next_trailing_opt()?,
        })
    }
}

/// Protection against one damage type, permanent or timed.
///
/// Shared by immunities (all damage and afflictions of the type are ignored)
/// and resistances (damage of the type is halved).
#[derive(Debug, Clone)]
pub struct WardTrait {
    pub damage_type: DamageType,
    pub duration: Option<u64>,
    pub owner: Option<ObjId>,
    pub expires: Option<u64>,
    pub source: Option<ObjId>,
}

impl WardTrait {
    pub fn permanent(damage_type: DamageType) -> Self {
        Self {
            damage_type,
            duration: None,
            owner: None,
            expires: None,
            source: None,
        }
    }

    pub fn timed(damage_type: DamageType, duration: u64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::permanent(damage_type)
        }
    }

    pub(crate) fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.damage_type.to_string(),
            opt_to_text(self.duration),
            opt_to_text(self.owner),
            opt_to_text(self.expires),
        ];
        push_source(&mut fields, self.source);
        fields
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            damage_type: f.next()?,
            duration: f.next_opt()?,
            owner: f.next_owner()?,
            expires: f.next_opt()?,
            source: f.next_trailing_opt()?,
        })
    }
}

/// Extra melee damage while the owner is badly hurt.
#[derive(Debug, Clone)]
pub struct RageTrait {
    pub owner: ObjId,
}

impl RageTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![self.owner.to_string()]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            owner: f.next_required_owner()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LightSourceTrait {
    pub owner: Option<ObjId>,
    pub radius: i32,
    pub source: Option<ObjId>,
}

impl LightSourceTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        let mut fields = vec![opt_to_text(self.owner), self.radius.to_string()];
        push_source(&mut fields, self.source);
        fields
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            owner: f.next_owner()?,
            radius: f.next()?,
            source: f.next_trailing_opt()?,
        })
    }
}

/// Marks a cultist bound to an altar.
#[derive(Debug, Clone)]
pub struct WorshipperTrait {
    pub altar: Position,
    pub chant: String,
}

impl WorshipperTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            format!("{},{}", self.altar.x, self.altar.y),
            escape(&self.chant),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        let coords: Vec<i32> = f.next_list()?;
        let &[x, y] = coords.as_slice() else {
            return Err(DelveError::trait_parse(f.text(), "altar needs two coordinates"));
        };
        Ok(Self {
            altar: Position::new(x, y),
            chant: f.next_text()?,
        })
    }
}

/// False appearance worn by a shape-shifter until revealed.
#[derive(Debug, Clone)]
pub struct DisguiseTrait {
    pub name: String,
    pub glyph: char,
}

impl DisguiseTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![escape(&self.name), (self.glyph as u32).to_string()]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        let name = f.next_text()?;
        let code: u32 = f.next()?;
        let glyph = char::from_u32(code)
            .ok_or_else(|| DelveError::trait_parse(f.text(), format!("bad glyph code {}", code)))?;
        Ok(Self { name, glyph })
    }
}

/// Follower that serves another actor.
#[derive(Debug, Clone)]
pub struct CompanionTrait {
    pub master: ObjId,
}

impl CompanionTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![self.master.to_string()]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            master: f.next_required_owner()?,
        })
    }
}

/// Traits an item bestows on whoever equips it, kept as trait texts.
#[derive(Debug, Clone)]
pub struct GrantsTrait {
    pub traits: Vec<String>,
}

impl GrantsTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        self.traits.iter().map(|t| escape(t)).collect()
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        let traits = f.rest_as_text();
        if traits.is_empty() {
            return Err(DelveError::trait_parse(f.text(), "grants nothing"));
        }
        Ok(Self { traits })
    }
}

/// Substance on a weapon that may inflict a further trait on each hit.
#[derive(Debug, Clone)]
pub struct CoatingTrait {
    /// Percent chance per hit
    pub chance: u32,
    pub charges: u32,
    /// Text of the trait inflicted on the victim
    pub effect: String,
}

impl CoatingTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            self.chance.to_string(),
            self.charges.to_string(),
            escape(&self.effect),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            chance: f.next()?,
            charges: f.next()?,
            effect: f.next_text()?,
        })
    }
}

/// Damage dealt to everything adjacent when the owner dies.
#[derive(Debug, Clone)]
pub struct RetributionTrait {
    pub dice: u32,
    pub sides: u32,
    pub damage_type: DamageType,
    pub owner: Option<ObjId>,
}

impl RetributionTrait {
    pub(crate) fn fields(&self) -> Vec<String> {
        vec![
            self.dice.to_string(),
            self.sides.to_string(),
            self.damage_type.to_string(),
            opt_to_text(self.owner),
        ]
    }

    pub(crate) fn parse(f: &mut Fields) -> DelveResult<Self> {
        Ok(Self {
            dice: f.next()?,
            sides: f.next()?,
            damage_type: f.next()?,
            owner: f.next_owner()?,
        })
    }
}
