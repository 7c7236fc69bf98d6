//! # Trait Factory
//!
//! Rebuilds traits from their text form.
//!
//! A registry maps each kind tag to a constructor over the positional fields
//! that follow it. Owner fields may hold the `owner` sentinel, which resolves
//! to the container object the trait is being loaded onto.

use super::text::Fields;
use super::{
    AfflictionTrait, AilmentKind, AilmentTrait, AuraTrait, CoatingTrait, CompanionTrait,
    CountdownTrait, DamageTrait, DisguiseTrait, GrantsTrait, LightSourceTrait, RageTrait,
    RegeneratingTrait, RetributionTrait, StatBuffTrait, TagTrait, TorchTrait, Trait, WardTrait,
    WorshipperTrait,
};
use crate::{DelveError, DelveResult, ObjId};
use log::trace;
use std::collections::HashMap;
use std::sync::OnceLock;

type Constructor = fn(&mut Fields) -> DelveResult<Trait>;

fn registry() -> &'static HashMap<&'static str, Constructor> {
    static REGISTRY: OnceLock<HashMap<&'static str, Constructor>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, Constructor> = HashMap::new();
        map.insert("Tag", |f| Ok(Trait::Tag(TagTrait::parse(f)?)));
        map.insert("Damage", |f| Ok(Trait::Damage(DamageTrait::parse(f)?)));
        map.insert("Immunity", |f| Ok(Trait::Immunity(WardTrait::parse(f)?)));
        map.insert("Resistance", |f| Ok(Trait::Resistance(WardTrait::parse(f)?)));
        map.insert("Rage", |f| Ok(Trait::Rage(RageTrait::parse(f)?)));
        map.insert("LightSource", |f| {
            Ok(Trait::LightSource(LightSourceTrait::parse(f)?))
        });
        map.insert("Worshipper", |f| {
            Ok(Trait::Worshipper(WorshipperTrait::parse(f)?))
        });
        map.insert("Disguise", |f| Ok(Trait::Disguise(DisguiseTrait::parse(f)?)));
        map.insert("Companion", |f| {
            Ok(Trait::Companion(CompanionTrait::parse(f)?))
        });
        map.insert("Grants", |f| Ok(Trait::Grants(GrantsTrait::parse(f)?)));
        map.insert("Coating", |f| Ok(Trait::Coating(CoatingTrait::parse(f)?)));
        map.insert("Retribution", |f| {
            Ok(Trait::Retribution(RetributionTrait::parse(f)?))
        });
        map.insert("Poisoned", |f| Ok(Trait::Poisoned(AfflictionTrait::parse(f)?)));
        map.insert("OnFire", |f| Ok(Trait::OnFire(AfflictionTrait::parse(f)?)));
        map.insert("Paralyzed", |f| {
            Ok(Trait::Ailment(AilmentTrait::parse(AilmentKind::Paralyzed, f)?))
        });
        map.insert("Confused", |f| {
            Ok(Trait::Ailment(AilmentTrait::parse(AilmentKind::Confused, f)?))
        });
        map.insert("Nauseous", |f| {
            Ok(Trait::Ailment(AilmentTrait::parse(AilmentKind::Nauseous, f)?))
        });
        map.insert("Blind", |f| {
            Ok(Trait::Ailment(AilmentTrait::parse(AilmentKind::Blind, f)?))
        });
        map.insert("Frightened", |f| {
            Ok(Trait::Ailment(AilmentTrait::parse(AilmentKind::Frightened, f)?))
        });
        map.insert("Regenerating", |f| {
            Ok(Trait::Regenerating(RegeneratingTrait::parse(f)?))
        });
        map.insert("StatBuff", |f| Ok(Trait::StatBuff(StatBuffTrait::parse(f)?)));
        map.insert("Countdown", |f| {
            Ok(Trait::Countdown(CountdownTrait::parse(f)?))
        });
        map.insert("Torch", |f| Ok(Trait::Torch(TorchTrait::parse(f)?)));
        map.insert("Aura", |f| Ok(Trait::Aura(AuraTrait::parse(f)?)));
        map
    })
}

/// Entry point for turning trait text back into traits.
pub struct TraitFactory;

impl TraitFactory {
    /// Parses a trait text.
    ///
    /// `container` is the object the trait will live on; it stands in for
    /// the `owner` sentinel.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::TraitFactory;
    ///
    /// let rage = TraitFactory::from_text("Rage#owner", Some(12)).unwrap();
    /// assert_eq!(rage.as_text(), "Rage#12");
    /// assert!(TraitFactory::from_text("Sparkles#1", None).is_err());
    /// ```
    pub fn from_text(text: &str, container: Option<ObjId>) -> DelveResult<Trait> {
        let (kind, mut fields) = Fields::split(text, container)?;
        let constructor = registry()
            .get(kind)
            .ok_or_else(|| DelveError::trait_parse(text, format!("unknown kind '{}'", kind)))?;
        let value = constructor(&mut fields)?;
        fields.finish()?;
        trace!("Parsed trait {}", value);
        Ok(value)
    }

    /// Parses a list of trait texts, failing on the first bad one.
    pub fn from_texts<S: AsRef<str>>(texts: &[S], container: Option<ObjId>) -> DelveResult<Vec<Trait>> {
        texts
            .iter()
            .map(|t| Self::from_text(t.as_ref(), container))
            .collect()
    }

    pub fn is_known(kind: &str) -> bool {
        registry().contains_key(kind)
    }

    /// Every registered kind tag, sorted.
    pub fn known_kinds() -> Vec<&'static str> {
        let mut kinds: Vec<_> = registry().keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, DamageType, Position, Tag};

    fn samples() -> Vec<Trait> {
        vec![
            Trait::tag(Tag::Axe),
            Trait::tag(Tag::Flying).with_source(8),
            Trait::damage(2, 6, DamageType::Slashing),
            Trait::Immunity(WardTrait {
                damage_type: DamageType::Poison,
                duration: Some(10),
                owner: Some(3),
                expires: Some(14),
                source: None,
            }),
            Trait::Resistance(WardTrait::permanent(DamageType::Fire)).with_source(5),
            Trait::Rage(RageTrait { owner: 3 }),
            Trait::LightSource(LightSourceTrait {
                owner: Some(3),
                radius: 4,
                source: None,
            }),
            Trait::Worshipper(WorshipperTrait {
                altar: Position::new(12, 7),
                chant: "Hail #1\nHail the deep".to_string(),
            }),
            Trait::Disguise(DisguiseTrait {
                name: "treasure chest".to_string(),
                glyph: '#',
            }),
            Trait::Companion(CompanionTrait { master: 2 }),
            Trait::Grants(GrantsTrait {
                traits: vec![
                    "Resistance#Fire#-#owner#-".to_string(),
                    "Tag#Floating".to_string(),
                ],
            }),
            Trait::Coating(CoatingTrait {
                chance: 30,
                charges: 5,
                effect: "Poisoned#12#2#4#owner#-".to_string(),
            }),
            Trait::Retribution(RetributionTrait {
                dice: 2,
                sides: 4,
                damage_type: DamageType::Acid,
                owner: Some(6),
            }),
            Trait::poisoned(12, 3, 5),
            Trait::on_fire(0, 2, 3),
            Trait::ailment(AilmentKind::Paralyzed, 14, 2),
            Trait::ailment(AilmentKind::Frightened, 0, 6),
            Trait::Regenerating(RegeneratingTrait {
                amount: 1,
                duration: None,
                owner: Some(3),
                expires: None,
                source: Some(11),
            }),
            Trait::stat_buff(Attribute::Str, -2, Some(20)),
            Trait::Countdown(CountdownTrait {
                duration: 30,
                owner: Some(9),
                expires: Some(42),
            }),
            Trait::torch(40),
            Trait::aura(DamageType::Cold, 2, 3, 10),
        ]
    }

    #[test]
    fn test_round_trip_every_kind() {
        let samples = samples();
        let mut kinds: Vec<_> = samples.iter().map(|t| t.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        // every kind except the three ailments not sampled above
        assert_eq!(kinds.len(), TraitFactory::known_kinds().len() - 3);

        for original in samples {
            let text = original.as_text();
            let parsed = TraitFactory::from_text(&text, Some(3)).unwrap();
            assert_eq!(parsed, original, "round trip of {}", text);
        }
    }

    #[test]
    fn test_owner_sentinel_resolves_to_container() {
        let light = TraitFactory::from_text("LightSource#owner#3", Some(21)).unwrap();
        assert_eq!(light.owner(), Some(21));
        assert!(TraitFactory::from_text("LightSource#owner#3", None).is_err());
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        match TraitFactory::from_text("Glittering#1", None) {
            Err(DelveError::TraitParse { reason, .. }) => assert!(reason.contains("unknown")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_fields_are_errors() {
        assert!(TraitFactory::from_text("Damage#1#6", None).is_err());
        assert!(TraitFactory::from_text("Damage#one#6#Fire", None).is_err());
        assert!(TraitFactory::from_text("Damage#1#6#Plasma", None).is_err());
        assert!(TraitFactory::from_text("Rage#1#2", None).is_err());
        assert!(TraitFactory::from_text("Worshipper#3#chant", None).is_err());
        assert!(TraitFactory::from_text("Grants", None).is_err());
    }

    #[test]
    fn test_trailing_source_is_optional() {
        let plain = TraitFactory::from_text("Tag#Sword", None).unwrap();
        assert_eq!(plain.source(), None);
        let granted = TraitFactory::from_text("Tag#Sword#4", None).unwrap();
        assert_eq!(granted.source(), Some(4));
    }
}
