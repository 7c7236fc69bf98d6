//! # Item Generation
//!
//! Item templates and scattering loot over a fresh level.
//!
//! Templates carry their traits as text, so every item on the floor goes
//! through the same [`TraitFactory`] path as a loaded one.

use super::GenerationConfig;
use crate::{
    DelveError, DelveResult, GameObject, GameState, ItemCategory, ObjId, Position, TraitFactory,
};
use log::{debug, info};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Free floor cells per item at density 1.0.
const CELLS_PER_ITEM: f64 = 80.0;

/// Blueprint for one kind of item.
#[derive(Debug, Clone, Copy)]
pub struct ItemTemplate {
    pub name: &'static str,
    pub glyph: char,
    pub category: ItemCategory,
    pub traits: &'static [&'static str],
    /// Relative frequency when scattering; zero keeps it out of random loot
    pub weight: u32,
}

static ARMOURY: &[ItemTemplate] = &[
    ItemTemplate {
        name: "torch",
        glyph: '(',
        category: ItemCategory::Tool,
        traits: &["Torch#-#false#60"],
        weight: 6,
    },
    ItemTemplate {
        name: "dagger",
        glyph: ')',
        category: ItemCategory::Weapon,
        traits: &["Damage#1#4#Piercing", "Tag#Dagger", "Tag#Finesse"],
        weight: 4,
    },
    ItemTemplate {
        name: "envenomed dagger",
        glyph: ')',
        category: ItemCategory::Weapon,
        traits: &[
            "Damage#1#4#Piercing",
            "Tag#Dagger",
            "Coating#30#5#Poisoned&12&2&4&owner&-",
        ],
        weight: 1,
    },
    ItemTemplate {
        name: "longsword",
        glyph: ')',
        category: ItemCategory::Weapon,
        traits: &["Damage#1#8#Slashing", "Tag#Sword", "Tag#Metal"],
        weight: 3,
    },
    ItemTemplate {
        name: "battle axe",
        glyph: ')',
        category: ItemCategory::Weapon,
        traits: &["Damage#1#10#Slashing", "Tag#Axe", "Tag#Cleave"],
        weight: 2,
    },
    ItemTemplate {
        name: "ring of fire warding",
        glyph: '=',
        category: ItemCategory::Armour,
        traits: &["Grants#Resistance&Fire&-&owner&-"],
        weight: 1,
    },
    ItemTemplate {
        name: "boots of levitation",
        glyph: '[',
        category: ItemCategory::Armour,
        traits: &["Grants#Tag&Floating"],
        weight: 1,
    },
    ItemTemplate {
        name: "gauntlets of might",
        glyph: '[',
        category: ItemCategory::Armour,
        traits: &["Grants#StatBuff&Str&2&-&owner&-"],
        weight: 1,
    },
    ItemTemplate {
        name: "gem",
        glyph: '*',
        category: ItemCategory::Valuable,
        traits: &[],
        weight: 3,
    },
    ItemTemplate {
        name: "gold coins",
        glyph: '$',
        category: ItemCategory::Valuable,
        traits: &[],
        weight: 5,
    },
    ItemTemplate {
        name: "rock",
        glyph: '*',
        category: ItemCategory::Other,
        traits: &[],
        weight: 0,
    },
];

/// Every item template.
pub fn armoury() -> &'static [ItemTemplate] {
    ARMOURY
}

pub fn item_template(name: &str) -> Option<&'static ItemTemplate> {
    ARMOURY.iter().find(|t| t.name == name)
}

/// Builds an item from a template, without placing it in a game.
pub fn build_item(name: &str, pos: Position) -> DelveResult<GameObject> {
    let template = item_template(name)
        .ok_or_else(|| DelveError::InvalidState(format!("No item template named '{}'", name)))?;
    let mut item = GameObject::item(template.name, template.glyph, template.category, pos);
    for t in TraitFactory::from_texts(template.traits, None)? {
        item = item.with_trait(t);
    }
    Ok(item)
}

/// Creates an item from a template on the floor at `pos`.
pub fn spawn_item(gs: &mut GameState, name: &str, pos: Position) -> DelveResult<ObjId> {
    if !gs.map.is_passable(pos) {
        return Err(DelveError::InvalidAction(format!(
            "Cannot drop a {} at {}",
            name, pos
        )));
    }
    let item = build_item(name, pos)?;
    Ok(gs.spawn(item))
}

/// Scatters random loot over a level.
#[derive(Debug, Clone, Default)]
pub struct ItemGenerator {
    pub config: GenerationConfig,
}

impl ItemGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// How many items a level with this many free cells gets.
    pub fn item_count(&self, free_cells: usize) -> usize {
        (free_cells as f64 / CELLS_PER_ITEM * self.config.item_density.max(0.0)).round() as usize
    }

    /// Drops random items on free floor cells. Returns the new item ids.
    pub fn scatter_items(&self, gs: &mut GameState, rng: &mut StdRng) -> DelveResult<Vec<ObjId>> {
        let pool: Vec<&ItemTemplate> = ARMOURY.iter().filter(|t| t.weight > 0).collect();
        let weights = WeightedIndex::new(pool.iter().map(|t| t.weight))
            .map_err(|e| DelveError::InvalidState(format!("Bad item weights: {}", e)))?;

        let mut free: Vec<Position> = gs
            .map
            .positions_where(|t| t.is_passable())
            .into_iter()
            .filter(|&p| gs.objects.items_at(p).is_empty())
            .collect();
        free.shuffle(rng);
        let count = self.item_count(free.len()).min(free.len());

        let mut spawned = Vec::with_capacity(count);
        for pos in free.into_iter().take(count) {
            let template = pool[weights.sample(rng)];
            spawned.push(spawn_item(gs, template.name, pos)?);
        }
        debug!("Scattered {} items", spawned.len());
        info!("Level holds {} items", spawned.len());
        Ok(spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Map, TileType, Trait};

    fn room() -> GameState {
        let mut map = Map::new(12, 12, TileType::Wall);
        for y in 1..11 {
            for x in 1..11 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        GameState::new(map, 17)
    }

    #[test]
    fn test_every_template_parses() {
        for template in armoury() {
            let item = build_item(template.name, Position::new(1, 1)).unwrap();
            assert_eq!(item.traits.len(), template.traits.len(), "{}", template.name);
        }
    }

    #[test]
    fn test_torch_starts_unlit() {
        let mut gs = room();
        let torch = spawn_item(&mut gs, "torch", Position::new(2, 2)).unwrap();
        let obj = gs.objects.get(torch).unwrap();
        assert!(obj.traits.iter().any(|t| matches!(t, Trait::Torch(torch) if !torch.lit && torch.fuel == 60)));
    }

    #[test]
    fn test_unknown_item_and_bad_floor() {
        let mut gs = room();
        assert!(spawn_item(&mut gs, "vorpal spoon", Position::new(2, 2)).is_err());
        assert!(spawn_item(&mut gs, "gem", Position::new(0, 0)).is_err());
    }

    #[test]
    fn test_scatter_respects_density() {
        let mut gs = room();
        let mut config = GenerationConfig::for_testing(1);
        config.item_density = 1.0;
        let generator = ItemGenerator::new(config);
        let mut rng = StdRng::seed_from_u64(1);
        let items = generator.scatter_items(&mut gs, &mut rng).unwrap();
        assert_eq!(items.len(), generator.item_count(100));
        assert_eq!(items.len(), 1);
        for id in items {
            let obj = gs.objects.get(id).unwrap();
            assert!(obj.is_item());
            assert!(gs.map.is_passable(obj.position));
        }
    }
}
