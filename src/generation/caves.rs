//! # Underwater Caves
//!
//! A stack of flooded cave levels joined by staircases.
//!
//! Every level is grown by a cellular automaton: random fill, a handful of
//! smoothing passes with the 4-5 rule, then everything outside the largest
//! open region is filled back in. The down staircase of one level sits on
//! the same cell as the up staircase of the level below it.

use super::utils::{random_floor, seal_border, validate_level};
use super::{GenerationConfig, Generator};
use crate::utils::cardinal_line;
use crate::{DelveError, DelveResult, Map, Position, TileType};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;

#[derive(Debug, Clone, Default)]
pub struct UnderwaterCaveGenerator {
    pub config: GenerationConfig,
}

impl UnderwaterCaveGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// Draws `config.cave_levels` levels with aligned stairs.
    ///
    /// Level 0 also gets an up staircase for the way back out.
    pub fn draw_levels(&self, width: u32, height: u32, rng: &mut StdRng) -> DelveResult<Vec<Map>> {
        if width < 10 || height < 10 {
            return Err(DelveError::GenerationFailed(format!(
                "a {}x{} map is too small for a cave",
                width, height
            )));
        }
        let depth = self.config.cave_levels.max(1) as usize;
        let mut levels = Vec::with_capacity(depth);
        for _ in 0..depth {
            levels.push(self.draw_cave(width, height, rng)?);
        }

        let entry = random_floor(&levels[0], rng).ok_or_else(|| {
            DelveError::GenerationFailed("top cave level has no floor".to_string())
        })?;
        levels[0].set_tile(entry, TileType::UpStairs)?;

        for i in 0..depth - 1 {
            let (upper, lower) = levels.split_at_mut(i + 1);
            let upper = &mut upper[i];
            let lower = &mut lower[0];
            let site = random_floor(upper, rng).ok_or_else(|| {
                DelveError::GenerationFailed(format!("cave level {} has no room for stairs", i))
            })?;
            upper.set_tile(site, TileType::DownStairs)?;
            open_landing(lower, site)?;
            lower.set_tile(site, TileType::UpStairs)?;
            debug!("Stairs between cave levels {} and {} at {}", i, i + 1, site);
        }

        for (i, level) in levels.iter().enumerate() {
            validate_level(level).map_err(|e| {
                DelveError::GenerationFailed(format!("cave level {}: {}", i, e))
            })?;
        }
        info!("Generated {} cave levels of {}x{}", depth, width, height);
        Ok(levels)
    }

    /// One flooded cave level, sealed by world border.
    pub fn draw_cave(&self, width: u32, height: u32, rng: &mut StdRng) -> DelveResult<Map> {
        let interior = (width.saturating_sub(2) * height.saturating_sub(2)).max(1) as f64;
        for attempt in 1..=self.config.max_map_retries {
            let mut map = self.grow(width, height, rng)?;
            keep_largest_region(&mut map)?;
            let open = map.count(TileType::Floor) as f64 / interior;
            if open < self.config.cave_min_open {
                debug!(
                    "Cave attempt {} only {:.0}% open, retrying",
                    attempt,
                    open * 100.0
                );
                continue;
            }
            let floors = map.positions_where(|t| t == TileType::Floor);
            for pos in floors {
                map.set_tile(pos, TileType::Underwater)?;
            }
            seal_border(&mut map)?;
            return Ok(map);
        }
        Err(DelveError::GenerationFailed(format!(
            "no cave opened past {:.0}% after {} attempts",
            self.config.cave_min_open * 100.0,
            self.config.max_map_retries
        )))
    }

    fn grow(&self, width: u32, height: u32, rng: &mut StdRng) -> DelveResult<Map> {
        let fill = self.config.cave_fill.clamp(0.0, 1.0);
        let mut map = Map::new(width, height, TileType::Wall);
        let cells: Vec<Position> = map.positions().filter(|&p| !map.is_edge(p)).collect();
        for &pos in &cells {
            if !rng.gen_bool(fill) {
                map.set_tile(pos, TileType::Floor)?;
            }
        }
        for _ in 0..self.config.cave_smoothing_passes {
            map = smooth(&map, &cells)?;
        }
        Ok(map)
    }
}

impl Generator<Vec<Map>> for UnderwaterCaveGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<Vec<Map>> {
        UnderwaterCaveGenerator::new(config.clone()).draw_levels(config.width, config.height, rng)
    }

    fn validate(&self, content: &Vec<Map>, _config: &GenerationConfig) -> DelveResult<()> {
        for level in content {
            validate_level(level)?;
        }
        for pair in content.windows(2) {
            let downs = pair[0].positions_where(|t| t == TileType::DownStairs);
            if downs.is_empty()
                || downs
                    .iter()
                    .any(|&p| pair[1].get_tile(p) != Some(TileType::UpStairs))
            {
                return Err(DelveError::GenerationFailed(
                    "cave stairs do not line up".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "UnderwaterCaveGenerator"
    }
}

/// One pass of the 4-5 rule: a cell is rock when five or more of its eight
/// neighbours are, or when it is rock already and four are.
fn smooth(map: &Map, cells: &[Position]) -> DelveResult<Map> {
    let mut next = map.clone();
    for &pos in cells {
        let rock = pos
            .adjacent_positions()
            .into_iter()
            .filter(|&n| map.tile_or_border(n) != TileType::Floor)
            .count();
        let was_rock = map.tile_or_border(pos) != TileType::Floor;
        let tile = if rock >= 5 || (was_rock && rock >= 4) {
            TileType::Wall
        } else {
            TileType::Floor
        };
        next.set_tile(pos, tile)?;
    }
    Ok(next)
}

fn keep_largest_region(map: &mut Map) -> DelveResult<()> {
    let regions = map.regions(|t| t == TileType::Floor);
    let Some(main) = regions.largest() else {
        return Ok(());
    };
    for (label, region) in regions.regions.iter().enumerate() {
        if label == main {
            continue;
        }
        for &pos in region {
            map.set_tile(pos, TileType::Wall)?;
        }
    }
    Ok(())
}

/// Clears the cells around `site` and tunnels from there to the nearest
/// open cell outside the clearing.
fn open_landing(map: &mut Map, site: Position) -> DelveResult<()> {
    let open = |t: TileType| t.is_open_ground();
    let before: Vec<Position> = map.positions_where(open);
    let landing: Vec<Position> = std::iter::once(site)
        .chain(site.adjacent_positions())
        .filter(|&p| map.is_valid_position(p) && !map.is_edge(p))
        .collect();
    for &pos in &landing {
        if map.tile_or_border(pos).is_wall_like() {
            map.set_tile(pos, TileType::Underwater)?;
        }
    }

    let Some(target) = before
        .into_iter()
        .filter(|p| !landing.contains(p))
        .min_by_key(|&p| (p.chebyshev_distance(site), p))
    else {
        return Ok(());
    };
    for cell in cardinal_line(site, target) {
        if !map.is_edge(cell) && map.tile_or_border(cell).is_wall_like() {
            map.set_tile(cell, TileType::Underwater)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn generator() -> UnderwaterCaveGenerator {
        UnderwaterCaveGenerator::new(GenerationConfig::for_testing(9))
    }

    #[test]
    fn test_stairs_line_up_between_levels() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(9);
        let levels = generator.draw_levels(41, 25, &mut rng).unwrap();
        assert_eq!(levels.len(), 3);
        assert!(generator.validate(&levels, &generator.config).is_ok());

        assert_eq!(levels[0].count(TileType::UpStairs), 1);
        for pair in levels.windows(2) {
            let downs = pair[0].positions_where(|t| t == TileType::DownStairs);
            assert_eq!(downs.len(), 1);
            assert_eq!(pair[1].get_tile(downs[0]), Some(TileType::UpStairs));
        }
        assert_eq!(levels[2].count(TileType::DownStairs), 0);
    }

    #[test]
    fn test_every_level_is_flooded_and_connected() {
        let generator = generator();
        for seed in 0..4 {
            let mut rng = StdRng::seed_from_u64(seed);
            for level in generator.draw_levels(41, 25, &mut rng).unwrap() {
                assert_eq!(level.count(TileType::Floor), 0);
                assert!(level.count(TileType::Underwater) > 0);
                assert!(validate_level(&level).is_ok());
            }
        }
    }

    #[test]
    fn test_landing_joins_a_sealed_pocket() {
        let mut map = Map::new(20, 10, TileType::Wall);
        for x in 2..6 {
            map.set_tile(Position::new(x, 4), TileType::Underwater).unwrap();
        }
        seal_border(&mut map).unwrap();
        let site = Position::new(14, 5);
        open_landing(&mut map, site).unwrap();
        assert!(validate_level(&map).is_ok());
        assert_eq!(map.tile_or_border(site), TileType::Underwater);
    }

    #[test]
    fn test_impossible_openness_fails() {
        let mut config = GenerationConfig::for_testing(1);
        config.cave_min_open = 0.99;
        config.max_map_retries = 3;
        let generator = UnderwaterCaveGenerator::new(config);
        let err = generator
            .draw_cave(30, 20, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(err.to_string().contains("3 attempts"));
    }
}
