//! Per-kind behaviour of traits: what happens when one is attached, at each
//! end-of-round phase, when it is detached and when its owner dies.

use super::{AilmentKind, Disposition, Trait};
use crate::{roll_dice, Attribute, DamageType, GameState, ObjId, Position, Tag};
use rand::Rng;

/// Chance per round that a burning actor ignites a flammable neighbour.
const FIRE_SPREAD_PERCENT: u32 = 25;

fn attribute_feeling(attr: Attribute, gain: bool) -> &'static str {
    match (attr, gain) {
        (Attribute::Str, true) => "stronger",
        (Attribute::Str, false) => "weaker",
        (Attribute::Dex, true) => "more agile",
        (Attribute::Dex, false) => "clumsy",
        (Attribute::Con, true) => "tougher",
        (Attribute::Con, false) => "frail",
        (Attribute::Int, true) => "clever",
        (Attribute::Int, false) => "dull",
        (Attribute::Wis, true) => "wise",
        (Attribute::Wis, false) => "foolish",
        (Attribute::AC, true) => "well protected",
        (Attribute::AC, false) => "exposed",
        (Attribute::HP, true) => "hale",
        (Attribute::HP, false) => "sickly",
    }
}

fn ailment_onset(kind: AilmentKind) -> (&'static str, &'static str) {
    match kind {
        AilmentKind::Paralyzed => ("You are paralyzed!", "is paralyzed!"),
        AilmentKind::Confused => ("You feel confused.", "looks confused."),
        AilmentKind::Nauseous => ("You feel nauseous.", "looks queasy."),
        AilmentKind::Blind => ("You are blinded!", "is blinded!"),
        AilmentKind::Frightened => ("You are terrified!", "turns to flee!"),
    }
}

fn ailment_recovery(kind: AilmentKind) -> &'static str {
    match kind {
        AilmentKind::Paralyzed => "You can move again.",
        AilmentKind::Confused => "You feel less confused.",
        AilmentKind::Nauseous => "You feel less queasy.",
        AilmentKind::Blind => "You can see again.",
        AilmentKind::Frightened => "You regain your courage.",
    }
}

fn damage_word(damage_type: DamageType) -> String {
    damage_type.to_string().to_lowercase()
}

impl Trait {
    /// Entry effect. Returns narrative for the player.
    pub(crate) fn on_attach(&self, owner: ObjId, gs: &mut GameState) -> Vec<String> {
        let message = match self {
            Trait::Poisoned(_) => {
                gs.narrate(owner, "You are poisoned!", |n| format!("The {} is poisoned.", n))
            }
            Trait::OnFire(_) => {
                gs.narrate(owner, "You catch fire!", |n| format!("The {} catches fire!", n))
            }
            Trait::Ailment(a) => {
                let (you, other) = ailment_onset(a.kind);
                gs.narrate(owner, you, |n| format!("The {} {}", n, other))
            }
            Trait::StatBuff(b) => {
                if let Some(obj) = gs.objects.get_mut(owner) {
                    obj.stats.shift(b.attr, b.amount);
                }
                if gs.is_player(owner) && b.source.is_none() && b.amount != 0 {
                    Some(format!("You feel {}.", attribute_feeling(b.attr, b.amount > 0)))
                } else {
                    None
                }
            }
            Trait::Regenerating(r) if r.source.is_none() && gs.is_player(owner) => {
                Some("You feel your wounds begin to close.".to_string())
            }
            Trait::Resistance(w) if w.source.is_none() && gs.is_player(owner) => Some(format!(
                "You feel resistant to {}.",
                damage_word(w.damage_type)
            )),
            Trait::Immunity(w) if w.source.is_none() && gs.is_player(owner) => Some(format!(
                "You feel immune to {}.",
                damage_word(w.damage_type)
            )),
            Trait::Aura(a) => {
                let kind = damage_word(a.damage_type);
                gs.narrate(owner, &format!("A {} aura surrounds you.", kind), |n| {
                    format!("A {} aura surrounds the {}.", kind, n)
                })
            }
            _ => None,
        };
        message.into_iter().collect()
    }

    /// Reaction to the end-of-round phase.
    pub(crate) fn on_end_of_round(&mut self, owner: ObjId, gs: &mut GameState) -> Disposition {
        if super::is_expired(self.expires(), gs.turn) {
            return match self {
                Trait::Countdown(_) => {
                    gs.narrate_to_player(owner, "You fade away.", |n| {
                        format!("The {} fades away.", n)
                    });
                    gs.vanish(owner);
                    Disposition::Keep
                }
                _ => Disposition::Remove,
            };
        }

        match self {
            Trait::Poisoned(p) => {
                // poison wears its victim down but never finishes it
                let hp = gs.hp(owner);
                let damage = gs
                    .damage_after_defences(owner, p.strength, DamageType::Poison)
                    .min(hp - 1)
                    .max(0);
                if damage > 0 {
                    gs.change_hp(owner, -damage);
                }
                Disposition::Keep
            }
            Trait::OnFire(f) => {
                let spread = f.clone();
                let dealt = gs.deal_damage(owner, f.strength, DamageType::Fire);
                if dealt > 0 && gs.objects.contains(owner) {
                    gs.narrate_to_player(owner, "You burn!", |n| format!("The {} burns.", n));
                }
                if let Some(pos) = gs.position_of(owner) {
                    spread_fire(gs, owner, pos, spread);
                }
                Disposition::Keep
            }
            Trait::Regenerating(r) => {
                gs.change_hp(owner, r.amount);
                Disposition::Keep
            }
            Trait::Torch(t) => {
                t.fuel = t.fuel.saturating_sub(1);
                if t.fuel > 0 {
                    return Disposition::Keep;
                }
                t.lit = false;
                gs.remove_traits_from_source(owner, owner);
                let holder = gs.objects.get(owner).and_then(|o| o.holder);
                match holder {
                    Some(h) if gs.is_player(h) => gs.alert_player("Your torch burns out."),
                    _ => gs.narrate_to_player(owner, "Your torch burns out.", |_| {
                        "The torch burns out.".to_string()
                    }),
                }
                Disposition::Unsubscribe
            }
            Trait::Aura(a) => {
                let Some(center) = gs.position_of(owner) else {
                    return Disposition::Keep;
                };
                let victims: Vec<ObjId> = gs
                    .objects
                    .actor_ids()
                    .into_iter()
                    .filter(|&id| id != owner)
                    .filter(|&id| {
                        gs.position_of(id)
                            .map(|p| p.chebyshev_distance(center) as i32 <= a.radius)
                            .unwrap_or(false)
                    })
                    .collect();
                for victim in victims {
                    let dealt = gs.deal_damage(victim, a.magnitude, a.damage_type);
                    if dealt > 0 && gs.is_player(victim) {
                        let source = gs.display_name(owner);
                        gs.alert_player(format!("The {}'s aura hurts you!", source));
                    }
                }
                Disposition::Keep
            }
            _ => Disposition::Keep,
        }
    }

    /// Exit effect, run once when the trait leaves its owner.
    pub(crate) fn on_detach(&self, owner: ObjId, gs: &mut GameState) {
        let player = gs.is_player(owner);
        match self {
            Trait::StatBuff(b) => {
                if let Some(obj) = gs.objects.get_mut(owner) {
                    obj.stats.shift(b.attr, -b.amount);
                }
                if player && b.source.is_none() && b.amount != 0 {
                    gs.alert_player(format!(
                        "You no longer feel {}.",
                        attribute_feeling(b.attr, b.amount > 0)
                    ));
                }
            }
            Trait::Poisoned(_) if player => gs.alert_player("You feel better."),
            Trait::OnFire(_) if player => gs.alert_player("You are no longer on fire."),
            Trait::Ailment(a) if player => gs.alert_player(ailment_recovery(a.kind)),
            Trait::Regenerating(r) if player && r.source.is_none() => {
                gs.alert_player("Your wounds stop closing.")
            }
            Trait::Resistance(w) if player && w.source.is_none() => gs.alert_player(format!(
                "You feel less resistant to {}.",
                damage_word(w.damage_type)
            )),
            Trait::Immunity(w) if player && w.source.is_none() => gs.alert_player(format!(
                "You feel vulnerable to {} again.",
                damage_word(w.damage_type)
            )),
            Trait::Aura(a) if player => gs.alert_player(format!(
                "The {} aura around you fades.",
                damage_word(a.damage_type)
            )),
            Trait::Torch(t) if t.lit => {
                gs.remove_traits_from_source(owner, owner);
            }
            _ => {}
        }
    }

    /// Reaction to the owner's death.
    pub(crate) fn on_death(&self, owner: ObjId, gs: &mut GameState) {
        if let Trait::Retribution(r) = self {
            let Some(center) = gs.position_of(owner) else {
                return;
            };
            gs.narrate_to_player(owner, "You burst!", |n| format!("The {} bursts!", n));
            let victims: Vec<ObjId> = center
                .adjacent_positions()
                .into_iter()
                .filter_map(|p| gs.objects.occupant_at(p))
                .collect();
            for victim in victims {
                let damage = roll_dice(&mut gs.rng, r.dice, r.sides);
                let dealt = gs.deal_damage(victim, damage, r.damage_type);
                if dealt > 0 && gs.is_player(victim) {
                    gs.alert_player(format!(
                        "You are hit by the blast for {} {} damage.",
                        dealt,
                        damage_word(r.damage_type)
                    ));
                }
            }
        }
    }
}

fn spread_fire(gs: &mut GameState, owner: ObjId, pos: Position, fire: super::AfflictionTrait) {
    let neighbours: Vec<ObjId> = pos
        .adjacent_positions()
        .into_iter()
        .filter_map(|p| gs.objects.occupant_at(p))
        .filter(|&id| id != owner && gs.has_tag(id, Tag::Flammable))
        .collect();
    for neighbour in neighbours {
        if gs.rng.gen_range(0..100) < FIRE_SPREAD_PERCENT {
            let ignition = Trait::on_fire(fire.dc, fire.strength, fire.duration);
            match gs.apply_trait(ignition, neighbour) {
                Ok(messages) => messages.into_iter().for_each(|m| gs.alert_player(m)),
                Err(err) => log::warn!("Fire could not spread to {}: {}", neighbour, err),
            }
        }
    }
}
