//! # Encounter Generation
//!
//! Monster templates and populating a fresh level with them.
//!
//! A template names the monster's stats, the traits it is born with (as
//! trait text) and the behaviour plan it runs. Some archetypes need a little
//! world set up around them: worshippers get an altar, watchdogs a master.

use super::GenerationConfig;
use crate::{
    Archetype, Attitude, Attribute, DelveError, DelveResult, GameObject, GameState, ObjId,
    Position, TileType, TraitFactory,
};
use crate::traits::text::escape;
use log::{debug, info, warn};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Free floor cells per monster at density 1.0.
const CELLS_PER_MONSTER: f64 = 60.0;
/// Monsters are never placed this close to the player.
const SAFE_RADIUS: u32 = 4;

const CHANTS: &[&str] = &[
    "Ia! Ia! The deep stirs!",
    "Blood for the drowned altar!",
    "Hear us, sleeper below.",
];

/// Blueprint for one kind of monster.
#[derive(Debug, Clone, Copy)]
pub struct MonsterTemplate {
    pub name: &'static str,
    pub glyph: char,
    pub hp: i32,
    pub str: i32,
    pub dex: i32,
    pub attitude: Attitude,
    pub plan: Archetype,
    pub traits: &'static [&'static str],
    /// Relative frequency when populating; zero keeps it out of random
    /// encounters
    pub weight: u32,
}

static BESTIARY: &[MonsterTemplate] = &[
    MonsterTemplate {
        name: "rat",
        glyph: 'r',
        hp: 4,
        str: 6,
        dex: 14,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &["Damage#1#3#Piercing"],
        weight: 6,
    },
    MonsterTemplate {
        name: "cave bat",
        glyph: 'b',
        hp: 3,
        str: 4,
        dex: 16,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &["Damage#1#2#Piercing", "Tag#Flying"],
        weight: 4,
    },
    MonsterTemplate {
        name: "goblin",
        glyph: 'g',
        hp: 7,
        str: 10,
        dex: 12,
        attitude: Attitude::Indifferent,
        plan: Archetype::Greedy,
        traits: &["Damage#1#6#Slashing", "Tag#Intelligent"],
        weight: 5,
    },
    MonsterTemplate {
        name: "zombie",
        glyph: 'z',
        hp: 12,
        str: 13,
        dex: 6,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &[
            "Damage#1#6#Blunt",
            "Tag#Undead",
            "Immunity#Poison#-#owner#-",
        ],
        weight: 3,
    },
    MonsterTemplate {
        name: "berserker",
        glyph: 'B',
        hp: 14,
        str: 15,
        dex: 10,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &["Damage#1#8#Slashing", "Rage#owner", "Tag#Brave", "Tag#Intelligent"],
        weight: 2,
    },
    MonsterTemplate {
        name: "fire beetle",
        glyph: 'f',
        hp: 6,
        str: 8,
        dex: 10,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &[
            "Damage#1#4#Fire",
            "Resistance#Fire#-#owner#-",
            "LightSource#owner#2",
        ],
        weight: 3,
    },
    MonsterTemplate {
        name: "acid blob",
        glyph: 'j',
        hp: 8,
        str: 8,
        dex: 4,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &["Damage#1#4#Acid", "Retribution#1#6#Acid#owner"],
        weight: 2,
    },
    MonsterTemplate {
        name: "troll",
        glyph: 'T',
        hp: 20,
        str: 17,
        dex: 8,
        attitude: Attitude::Aggressive,
        plan: Archetype::Basic,
        traits: &["Damage#2#6#Slashing", "Regenerating#1#-#owner#-"],
        weight: 1,
    },
    MonsterTemplate {
        name: "mimic",
        glyph: 'm',
        hp: 15,
        str: 14,
        dex: 8,
        attitude: Attitude::Inactive,
        plan: Archetype::Mimic,
        traits: &["Damage#2#4#Blunt", "Disguise#treasure chest#36"],
        weight: 1,
    },
    MonsterTemplate {
        name: "cultist",
        glyph: 'c',
        hp: 8,
        str: 10,
        dex: 10,
        attitude: Attitude::Indifferent,
        plan: Archetype::Worshipper,
        traits: &["Damage#1#4#Slashing", "Tag#Intelligent"],
        weight: 2,
    },
    MonsterTemplate {
        name: "guard dog",
        glyph: 'd',
        hp: 9,
        str: 12,
        dex: 14,
        attitude: Attitude::Friendly,
        plan: Archetype::Watchdog,
        traits: &["Damage#1#6#Piercing"],
        weight: 0,
    },
    MonsterTemplate {
        name: "villager",
        glyph: 'v',
        hp: 6,
        str: 10,
        dex: 10,
        attitude: Attitude::Friendly,
        plan: Archetype::Villager,
        traits: &["Tag#Intelligent"],
        weight: 0,
    },
];

/// Every monster template.
pub fn bestiary() -> &'static [MonsterTemplate] {
    BESTIARY
}

pub fn monster_template(name: &str) -> Option<&'static MonsterTemplate> {
    BESTIARY.iter().find(|t| t.name == name)
}

/// Builds the bare body of a monster: stats, attitude and plan.
///
/// Its traits are loaded by [`spawn_monster`], once the monster has an id
/// for their `owner` fields to resolve to.
pub fn build_monster(template: &MonsterTemplate, pos: Position) -> GameObject {
    GameObject::actor(template.name, template.glyph, pos, template.hp)
        .with_stat(Attribute::Str, template.str)
        .with_stat(Attribute::Dex, template.dex)
        .with_attitude(template.attitude)
        .with_plan(&template.plan.to_string())
}

fn check_free(gs: &GameState, name: &str, pos: Position) -> DelveResult<()> {
    if !gs.map.is_passable(pos) || gs.objects.occupant_at(pos).is_some() {
        return Err(DelveError::InvalidAction(format!(
            "No room for a {} at {}",
            name, pos
        )));
    }
    Ok(())
}

/// Parses trait texts against `id` and attaches them.
fn load_traits<S: AsRef<str>>(gs: &mut GameState, id: ObjId, texts: &[S]) -> DelveResult<()> {
    let traits = match TraitFactory::from_texts(texts, Some(id)) {
        Ok(traits) => traits,
        Err(e) => {
            gs.vanish(id);
            return Err(e);
        }
    };
    for t in traits {
        gs.attach_trait(t, id);
    }
    Ok(())
}

fn spawn_with<S: AsRef<str>>(
    gs: &mut GameState,
    name: &str,
    pos: Position,
    extra: &[S],
) -> DelveResult<ObjId> {
    let template = monster_template(name)
        .ok_or_else(|| DelveError::InvalidState(format!("No monster template named '{}'", name)))?;
    check_free(gs, name, pos)?;
    let id = gs.spawn(build_monster(template, pos));
    load_traits(gs, id, template.traits)?;
    load_traits(gs, id, extra)?;
    Ok(id)
}

/// Creates a monster from a template at `pos`.
pub fn spawn_monster(gs: &mut GameState, name: &str, pos: Position) -> DelveResult<ObjId> {
    spawn_with::<&str>(gs, name, pos, &[])
}

/// Creates a monster that serves `master`.
pub fn spawn_companion(
    gs: &mut GameState,
    name: &str,
    pos: Position,
    master: ObjId,
) -> DelveResult<ObjId> {
    spawn_with(gs, name, pos, &[format!("Companion#{}", master)])
}

/// Creates a worshipper devoted to the altar at `altar`.
pub fn spawn_worshipper(
    gs: &mut GameState,
    name: &str,
    pos: Position,
    altar: Position,
    chant: &str,
) -> DelveResult<ObjId> {
    let devotion = format!(
        "Worshipper#{},{}#{}",
        altar.x,
        altar.y,
        escape(chant)
    );
    spawn_with(gs, name, pos, &[devotion])
}

/// Populates a level with random monsters.
#[derive(Debug, Clone, Default)]
pub struct EncounterGenerator {
    pub config: GenerationConfig,
}

impl EncounterGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// How many monsters a level with this many free cells gets.
    pub fn monster_count(&self, free_cells: usize) -> usize {
        (free_cells as f64 / CELLS_PER_MONSTER * self.config.monster_density.max(0.0)).round()
            as usize
    }

    /// Places random monsters on free floor away from the player. Returns
    /// the new monster ids.
    pub fn populate(&self, gs: &mut GameState, rng: &mut StdRng) -> DelveResult<Vec<ObjId>> {
        let pool: Vec<&MonsterTemplate> = BESTIARY.iter().filter(|t| t.weight > 0).collect();
        let weights = WeightedIndex::new(pool.iter().map(|t| t.weight))
            .map_err(|e| DelveError::InvalidState(format!("Bad monster weights: {}", e)))?;

        let player = gs.player_position();
        let mut free: Vec<Position> = gs
            .map
            .positions_where(|t| t == TileType::Floor || t == TileType::Underwater)
            .into_iter()
            .filter(|&p| gs.objects.occupant_at(p).is_none())
            .filter(|&p| player.map_or(true, |pp| pp.chebyshev_distance(p) > SAFE_RADIUS))
            .collect();
        free.shuffle(rng);
        let count = self.monster_count(free.len()).min(free.len());

        let mut spawned = Vec::with_capacity(count);
        let mut cells = free.into_iter();
        while spawned.len() < count {
            let Some(pos) = cells.next() else {
                break;
            };
            let template = pool[weights.sample(rng)];
            let id = if template.plan == Archetype::Worshipper {
                let Some(altar) = cells.next() else {
                    warn!("No room left for an altar, skipping {}", template.name);
                    continue;
                };
                gs.map.set_tile(altar, TileType::Altar)?;
                let chant = CHANTS.choose(rng).copied().unwrap_or_default();
                spawn_worshipper(gs, template.name, pos, altar, chant)?
            } else {
                spawn_monster(gs, template.name, pos)?
            };
            debug!("Placed {} at {}", template.name, pos);
            spawned.push(id);
        }
        info!("Level holds {} monsters", spawned.len());
        Ok(spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Map, Tag, Trait};

    fn hall() -> GameState {
        let mut map = Map::new(22, 14, TileType::Wall);
        for y in 1..13 {
            for x in 1..21 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        GameState::new(map, 23)
    }

    #[test]
    fn test_every_template_spawns() {
        let mut gs = hall();
        for (i, template) in bestiary().iter().enumerate() {
            let pos = Position::new(1 + i as i32, 1);
            let id = spawn_monster(&mut gs, template.name, pos).unwrap();
            let monster = gs.objects.get(id).unwrap();
            assert_eq!(monster.traits.len(), template.traits.len(), "{}", template.name);
            assert_eq!(monster.hp(), template.hp);
            assert_eq!(monster.plan.as_deref(), Some(template.plan.to_string().as_str()));
        }
    }

    #[test]
    fn test_spawned_traits_are_bound_to_the_monster() {
        let mut gs = hall();
        let zombie = spawn_monster(&mut gs, "zombie", Position::new(5, 5)).unwrap();
        assert!(gs.has_tag(zombie, Tag::Undead));
        assert!(gs.has_immunity(zombie, crate::DamageType::Poison));

        let berserker = spawn_monster(&mut gs, "berserker", Position::new(6, 5)).unwrap();
        let obj = gs.objects.get(berserker).unwrap();
        assert!(obj
            .traits
            .iter()
            .any(|t| matches!(t, Trait::Rage(rage) if rage.owner == berserker)));
    }

    #[test]
    fn test_occupied_cell_is_refused() {
        let mut gs = hall();
        spawn_monster(&mut gs, "rat", Position::new(3, 3)).unwrap();
        assert!(spawn_monster(&mut gs, "rat", Position::new(3, 3)).is_err());
        assert!(spawn_monster(&mut gs, "rat", Position::new(0, 0)).is_err());
        assert!(spawn_monster(&mut gs, "dragon", Position::new(4, 4)).is_err());
    }

    #[test]
    fn test_companion_and_worshipper_setup() {
        let mut gs = hall();
        let player = gs.spawn_player(Position::new(2, 2));
        let dog = spawn_companion(&mut gs, "guard dog", Position::new(3, 2), player).unwrap();
        assert!(gs
            .objects
            .get(dog)
            .unwrap()
            .traits
            .iter()
            .any(|t| t.as_text() == format!("Companion#{}", player)));

        let altar = Position::new(15, 8);
        let cultist =
            spawn_worshipper(&mut gs, "cultist", Position::new(12, 8), altar, "Praise #1").unwrap();
        let devotion = gs
            .objects
            .get(cultist)
            .unwrap()
            .traits
            .iter()
            .find_map(|t| match t {
                Trait::Worshipper(w) => Some(w.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(devotion.altar, altar);
        assert_eq!(devotion.chant, "Praise #1");
    }

    #[test]
    fn test_multiline_chant_survives_the_trait_text() {
        let mut gs = hall();
        let chant = "Ia! #deep\nthe sleeper wakes";
        let cultist =
            spawn_worshipper(&mut gs, "cultist", Position::new(12, 8), Position::new(15, 8), chant)
                .unwrap();
        let devotion = gs
            .objects
            .get(cultist)
            .unwrap()
            .traits
            .iter()
            .find(|t| t.kind() == "Worshipper")
            .cloned()
            .unwrap();
        assert!(!devotion.as_text().contains('\n'));
        match devotion {
            Trait::Worshipper(w) => assert_eq!(w.chant, chant),
            other => panic!("unexpected trait {:?}", other),
        }
    }

    #[test]
    fn test_populate_keeps_clear_of_the_player() {
        let mut gs = hall();
        gs.spawn_player(Position::new(10, 6));
        let generator = EncounterGenerator::new(GenerationConfig::new(4));
        let mut rng = StdRng::seed_from_u64(4);
        let monsters = generator.populate(&mut gs, &mut rng).unwrap();
        assert!(!monsters.is_empty());
        for id in monsters {
            let pos = gs.position_of(id).unwrap();
            assert!(pos.chebyshev_distance(Position::new(10, 6)) > SAFE_RADIUS);
        }
    }
}
