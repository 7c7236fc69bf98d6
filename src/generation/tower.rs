//! # Tower Generation
//!
//! Mansions and towers standing in open grass.
//!
//! The footprint is cut by binary space partition into rooms, alternating
//! vertical and horizontal cuts. Some neighbouring rooms are merged, a random
//! set of outer rooms is trimmed away for an irregular outline, and the
//! survivors are joined by a spanning tree of doors plus a few extras. One
//! door in the outer wall lets visitors in.

use super::utils::validate_level;
use super::{GenerationConfig, Generator};
use crate::{DelveError, DelveResult, Direction, Map, Position, TileType};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, VecDeque};

/// Grass left between the building and the edge of the map.
const MARGIN: i32 = 3;

/// Rectangle given by its wall lines, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl Block {
    fn inner_width(&self) -> i32 {
        self.x1 - self.x0 - 1
    }

    fn inner_height(&self) -> i32 {
        self.y1 - self.y0 - 1
    }

    fn interior(&self) -> impl Iterator<Item = Position> + '_ {
        ((self.y0 + 1)..self.y1)
            .flat_map(move |y| ((self.x0 + 1)..self.x1).map(move |x| Position::new(x, y)))
    }

    fn outline(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        for x in self.x0..=self.x1 {
            cells.push(Position::new(x, self.y0));
            cells.push(Position::new(x, self.y1));
        }
        for y in (self.y0 + 1)..self.y1 {
            cells.push(Position::new(self.x0, y));
            cells.push(Position::new(self.x1, y));
        }
        cells
    }

    fn contains_inside(&self, pos: Position) -> bool {
        pos.x > self.x0 && pos.x < self.x1 && pos.y > self.y0 && pos.y < self.y1
    }

    /// Wall cells two blocks share where a door would join their interiors.
    fn shared_door_sites(&self, other: &Block) -> Vec<Position> {
        let lo_y = self.y0.max(other.y0) + 1;
        let hi_y = self.y1.min(other.y1) - 1;
        let lo_x = self.x0.max(other.x0) + 1;
        let hi_x = self.x1.min(other.x1) - 1;
        if self.x1 == other.x0 || self.x0 == other.x1 {
            let x = if self.x1 == other.x0 { self.x1 } else { self.x0 };
            (lo_y..=hi_y).map(|y| Position::new(x, y)).collect()
        } else if self.y1 == other.y0 || self.y0 == other.y1 {
            let y = if self.y1 == other.y0 { self.y1 } else { self.y0 };
            (lo_x..=hi_x).map(|x| Position::new(x, y)).collect()
        } else {
            Vec::new()
        }
    }

    /// The union of two blocks sharing a whole side, if they do.
    fn merged_with(&self, other: &Block) -> Option<Block> {
        let same_rows = self.y0 == other.y0 && self.y1 == other.y1;
        let same_cols = self.x0 == other.x0 && self.x1 == other.x1;
        if same_rows && (self.x1 == other.x0 || other.x1 == self.x0) {
            Some(Block {
                x0: self.x0.min(other.x0),
                x1: self.x1.max(other.x1),
                ..*self
            })
        } else if same_cols && (self.y1 == other.y0 || other.y1 == self.y0) {
            Some(Block {
                y0: self.y0.min(other.y0),
                y1: self.y1.max(other.y1),
                ..*self
            })
        } else {
            None
        }
    }
}

/// BSP tower generator.
#[derive(Debug, Clone, Default)]
pub struct TowerGenerator {
    pub config: GenerationConfig,
}

impl TowerGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// Draws a tower level of the given size, border included.
    pub fn draw_tower(&self, width: u32, height: u32, rng: &mut StdRng) -> DelveResult<Map> {
        let min_side = (2 * MARGIN + 2 * self.config.tower_min_room as i32 + 5) as u32;
        if width < min_side || height < min_side {
            return Err(DelveError::GenerationFailed(format!(
                "a {}x{} map is too small for a tower",
                width, height
            )));
        }
        for attempt in 1..=self.config.max_map_retries {
            let map = self.attempt(width - 2, height - 2, rng)?;
            match validate_level(&map) {
                Ok(()) => {
                    info!("Generated {}x{} tower on attempt {}", width, height, attempt);
                    return Ok(map);
                }
                Err(e) => debug!("Tower attempt {} abandoned: {}", attempt, e),
            }
        }
        Err(DelveError::GenerationFailed(format!(
            "no valid tower after {} attempts",
            self.config.max_map_retries
        )))
    }

    fn attempt(&self, width: u32, height: u32, rng: &mut StdRng) -> DelveResult<Map> {
        let footprint = Block {
            x0: MARGIN,
            y0: MARGIN,
            x1: width as i32 - 1 - MARGIN,
            y1: height as i32 - 1 - MARGIN,
        };
        let mut blocks = Vec::new();
        self.split(footprint, rng.gen_bool(0.5), rng, &mut blocks);
        let blocks = self.merge(blocks, rng);
        let blocks = self.trim(blocks, &footprint, rng);
        let doors = self.doors(&blocks, rng);
        debug!("Tower with {} rooms and {} inner doors", blocks.len(), doors.len());

        let mut grid = Map::new(width, height, TileType::Grass);
        for block in &blocks {
            for cell in block.outline() {
                grid.set_tile(cell, TileType::Wall)?;
            }
        }
        for block in &blocks {
            for cell in block.interior() {
                grid.set_tile(cell, TileType::Floor)?;
            }
        }
        for door in doors {
            grid.set_tile(door, TileType::ClosedDoor)?;
        }
        if let Some(entrance) = entrance_site(&grid, &blocks, rng) {
            grid.set_tile(entrance, TileType::ClosedDoor)?;
        }
        Ok(grid.embed_in_border())
    }

    /// Recursive binary space partition, alternating cut direction.
    fn split(&self, block: Block, vertical: bool, rng: &mut StdRng, leaves: &mut Vec<Block>) {
        let min = self.config.tower_min_room as i32;
        let can_cut = |inner: i32| inner >= 2 * min + 1;
        let vertical = match (can_cut(block.inner_width()), can_cut(block.inner_height())) {
            (true, true) => vertical,
            (true, false) => true,
            (false, true) => false,
            (false, false) => {
                leaves.push(block);
                return;
            }
        };
        // stop early on smaller blocks now and then
        let roomy = block.inner_width().max(block.inner_height()) > 4 * min;
        if !roomy && rng.gen_bool(0.25) {
            leaves.push(block);
            return;
        }

        if vertical {
            let cut = rng.gen_range((block.x0 + min + 1)..=(block.x1 - min - 1));
            self.split(Block { x1: cut, ..block }, false, rng, leaves);
            self.split(Block { x0: cut, ..block }, false, rng, leaves);
        } else {
            let cut = rng.gen_range((block.y0 + min + 1)..=(block.y1 - min - 1));
            self.split(Block { y1: cut, ..block }, true, rng, leaves);
            self.split(Block { y0: cut, ..block }, true, rng, leaves);
        }
    }

    fn merge(&self, mut blocks: Vec<Block>, rng: &mut StdRng) -> Vec<Block> {
        let chance = self.config.tower_merge_chance.clamp(0.0, 1.0);
        let mut i = 0;
        while i < blocks.len() {
            let partner = (i + 1..blocks.len()).find_map(|j| blocks[i].merged_with(&blocks[j]).map(|m| (j, m)));
            match partner {
                Some((j, merged)) if rng.gen_bool(chance) => {
                    blocks[i] = merged;
                    blocks.remove(j);
                }
                _ => i += 1,
            }
        }
        blocks
    }

    /// Deletes a random set of rooms on the outer wall, never one whose loss
    /// would cut the rest apart.
    fn trim(&self, mut blocks: Vec<Block>, footprint: &Block, rng: &mut StdRng) -> Vec<Block> {
        let chance = self.config.tower_trim_chance.clamp(0.0, 1.0);
        let mut outer: Vec<Block> = blocks
            .iter()
            .copied()
            .filter(|b| {
                b.x0 == footprint.x0 || b.y0 == footprint.y0 || b.x1 == footprint.x1 || b.y1 == footprint.y1
            })
            .collect();
        outer.shuffle(rng);

        for victim in outer {
            if blocks.len() <= 2 || !rng.gen_bool(chance) {
                continue;
            }
            let remaining: Vec<Block> = blocks.iter().copied().filter(|b| *b != victim).collect();
            if is_connected(&remaining) {
                blocks = remaining;
            }
        }
        blocks
    }

    /// Spanning-tree doors between neighbouring rooms plus a few extras.
    fn doors(&self, blocks: &[Block], rng: &mut StdRng) -> Vec<Position> {
        let mut edges: Vec<(usize, usize, Vec<Position>)> = Vec::new();
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                let sites = blocks[i].shared_door_sites(&blocks[j]);
                if !sites.is_empty() {
                    edges.push((i, j, sites));
                }
            }
        }
        edges.shuffle(rng);

        let extra = self.config.tower_extra_door_chance.clamp(0.0, 1.0);
        let mut group: Vec<usize> = (0..blocks.len()).collect();
        let mut doors = Vec::new();
        for (a, b, sites) in edges {
            let (ga, gb) = (group[a], group[b]);
            let joins = ga != gb;
            if joins || rng.gen_bool(extra) {
                if let Some(&door) = sites.choose(rng) {
                    doors.push(door);
                }
                if joins {
                    for g in group.iter_mut() {
                        if *g == gb {
                            *g = ga;
                        }
                    }
                }
            }
        }
        doors
    }
}

impl Generator<Map> for TowerGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<Map> {
        TowerGenerator::new(config.clone()).draw_tower(config.width, config.height, rng)
    }

    fn validate(&self, content: &Map, _config: &GenerationConfig) -> DelveResult<()> {
        validate_level(content)
    }

    fn generator_type(&self) -> &'static str {
        "TowerGenerator"
    }
}

fn is_connected(blocks: &[Block]) -> bool {
    if blocks.is_empty() {
        return false;
    }
    let mut seen = BTreeSet::from([0]);
    let mut queue = VecDeque::from([0]);
    while let Some(i) = queue.pop_front() {
        for j in 0..blocks.len() {
            if !seen.contains(&j) && !blocks[i].shared_door_sites(&blocks[j]).is_empty() {
                seen.insert(j);
                queue.push_back(j);
            }
        }
    }
    seen.len() == blocks.len()
}

/// An outer wall cell with a room on one side and grass on the other.
fn entrance_site(grid: &Map, blocks: &[Block], rng: &mut StdRng) -> Option<Position> {
    let sites: Vec<Position> = blocks
        .iter()
        .flat_map(|b| {
            b.outline().into_iter().filter_map(move |cell| {
                Direction::cardinal().into_iter().find_map(|d| {
                    let inward = cell + d.to_delta();
                    let outward = cell - d.to_delta();
                    let fits = b.contains_inside(inward)
                        && grid.get_tile(outward) == Some(TileType::Grass);
                    fits.then_some(cell)
                })
            })
        })
        .collect();
    sites.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_tower_is_connected_with_an_entrance() {
        let generator = TowerGenerator::new(GenerationConfig::for_testing(2));
        for seed in 0..6 {
            let mut rng = StdRng::seed_from_u64(seed);
            let map = generator.draw_tower(45, 31, &mut rng).unwrap();
            assert!(validate_level(&map).is_ok());
            assert!(map.count(TileType::Grass) > 0);
            assert!(map.count(TileType::Floor) > 0);
            assert!(map.count(TileType::ClosedDoor) >= 1);
        }
    }

    #[test]
    fn test_split_respects_minimum_room() {
        let generator = TowerGenerator::new(GenerationConfig::new(1));
        let mut leaves = Vec::new();
        let block = Block { x0: 0, y0: 0, x1: 40, y1: 20 };
        generator.split(block, true, &mut StdRng::seed_from_u64(1), &mut leaves);
        assert!(leaves.len() > 1);
        for leaf in &leaves {
            assert!(leaf.inner_width() >= 3 && leaf.inner_height() >= 3, "{:?}", leaf);
        }
        let area: i32 = leaves.iter().map(|b| (b.x1 - b.x0) * (b.y1 - b.y0)).sum();
        assert_eq!(area, 40 * 20);
    }

    #[test]
    fn test_merge_and_door_sites() {
        let left = Block { x0: 0, y0: 0, x1: 4, y1: 4 };
        let right = Block { x0: 4, y0: 0, x1: 8, y1: 4 };
        assert_eq!(left.merged_with(&right), Some(Block { x0: 0, y0: 0, x1: 8, y1: 4 }));
        assert_eq!(left.shared_door_sites(&right).len(), 3);

        let below = Block { x0: 2, y0: 4, x1: 8, y1: 9 };
        assert_eq!(left.merged_with(&below), None);
        assert_eq!(left.shared_door_sites(&below), vec![Position::new(3, 4)]);
    }

    #[test]
    fn test_too_small_is_an_error() {
        let generator = TowerGenerator::default();
        assert!(generator.draw_tower(10, 10, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
