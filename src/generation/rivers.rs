//! # Rivers
//!
//! Cuts a river of deep water across a finished level, then lays bridges so
//! the walkable part of the level stays in one piece.

use super::GenerationConfig;
use crate::utils::cardinal_line;
use crate::{DelveError, DelveResult, Map, Position, TileType};
use log::{debug, trace};
use pathfinding::prelude::dijkstra;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;

/// Walking over deep water while routing a bridge costs this much per cell,
/// so bridges stay short.
const WATER_COST: u32 = 6;
/// Bridge passes before the level is declared unbridgeable.
const MAX_BRIDGES: usize = 64;

fn is_walkable(tile: TileType) -> bool {
    tile.is_open_ground()
}

/// Draws a river from one edge of the map to the opposite edge.
///
/// The river walks in segments with random sideways drift, is rasterised
/// with side-connected Bresenham lines and widens now and then up to
/// `config.max_river_width`. It never touches the world border. Returns the
/// number of cells turned into deep water.
pub fn carve_river(
    map: &mut Map,
    rng: &mut StdRng,
    config: &GenerationConfig,
) -> DelveResult<usize> {
    let (w, h) = (map.width as i32, map.height as i32);
    if w < 5 || h < 5 {
        return Ok(0);
    }
    let vertical = rng.gen_bool(0.5);
    let (length, breadth) = if vertical { (h, w) } else { (w, h) };
    let to_cell = |along: i32, across: i32| {
        if vertical {
            Position::new(across, along)
        } else {
            Position::new(along, across)
        }
    };

    let mut across = rng.gen_range(breadth / 4..=breadth * 3 / 4);
    let mut along = 0;
    let mut width = 1;
    let mut drift = 0;
    let mut stamped = 0;
    while along < length - 1 {
        let step = rng.gen_range(3..=7).min(length - 1 - along);
        drift = (drift + rng.gen_range(-1..=1)).clamp(-2, 2);
        let next_across = (across + drift).clamp(2, breadth - 3);
        if rng.gen_bool(config.river_widen_chance.clamp(0.0, 1.0)) {
            width = (width + 1).min(config.max_river_width.max(1) as i32);
        }

        for cell in cardinal_line(to_cell(along, across), to_cell(along + step, next_across)) {
            for offset in 0..width {
                let wet = if vertical {
                    Position::new(cell.x + offset, cell.y)
                } else {
                    Position::new(cell.x, cell.y + offset)
                };
                if map.is_valid_position(wet)
                    && !map.is_edge(wet)
                    && map.tile_or_border(wet) != TileType::DeepWater
                {
                    map.set_tile(wet, TileType::DeepWater)?;
                    stamped += 1;
                }
            }
        }
        along += step;
        across = next_across;
    }
    trace!("River stamped {} cells", stamped);
    Ok(stamped)
}

/// Routes the cheapest crossing from `start` to any cell of `goal`, walking
/// on ground and wading through deep water.
fn bridge_route(map: &Map, start: Position, goal: &HashSet<Position>) -> Option<Vec<Position>> {
    let (path, _) = dijkstra(
        &start,
        |&p| {
            map.cardinal_neighbours(p)
                .into_iter()
                .filter_map(|n| match map.tile_or_border(n) {
                    TileType::DeepWater => Some((n, WATER_COST)),
                    t if is_walkable(t) => Some((n, 1)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        },
        |p| goal.contains(p),
    )?;
    Some(path)
}

/// Lays bridges over deep water until the walkable cells form one region.
///
/// Each pass routes from the smallest stranded region to the largest one
/// and turns the deep water along the route into bridge. Returns the number
/// of bridges laid.
pub fn build_bridges(map: &mut Map) -> DelveResult<usize> {
    for bridges in 0..MAX_BRIDGES {
        let regions = map.regions(is_walkable);
        if regions.count() <= 1 {
            return Ok(bridges);
        }
        let Some(main) = regions.largest() else {
            return Ok(bridges);
        };
        let Some(stranded) = (0..regions.count())
            .filter(|&label| label != main)
            .min_by_key(|&label| regions.regions[label].len())
        else {
            return Ok(bridges);
        };
        let goal: HashSet<Position> = regions.regions[main].iter().copied().collect();
        let start = regions.regions[stranded][0];
        let route = bridge_route(map, start, &goal).ok_or_else(|| {
            DelveError::GenerationFailed(format!("no crossing from {} to the mainland", start))
        })?;
        let mut laid = 0;
        for cell in route {
            if map.tile_or_border(cell) == TileType::DeepWater {
                map.set_tile(cell, TileType::Bridge)?;
                laid += 1;
            }
        }
        debug!("Bridge of {} cells from {}", laid, start);
    }
    Err(DelveError::GenerationFailed(format!(
        "river still splits the level after {} bridges",
        MAX_BRIDGES
    )))
}

/// Cuts a river through the map and bridges it.
///
/// # Examples
///
/// ```
/// use delve::{draw_river, GenerationConfig, Map, TileType};
/// use delve::generation::utils::seal_border;
/// use rand::SeedableRng;
///
/// let mut map = Map::new(30, 20, TileType::Floor);
/// seal_border(&mut map).unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(5);
/// draw_river(&mut map, &mut rng, &GenerationConfig::new(5)).unwrap();
/// assert!(map.count(TileType::DeepWater) > 0);
/// ```
pub fn draw_river(map: &mut Map, rng: &mut StdRng, config: &GenerationConfig) -> DelveResult<()> {
    carve_river(map, rng, config)?;
    let bridges = build_bridges(map)?;
    debug!("River drawn with {} bridges", bridges);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::utils::{seal_border, validate_level};
    use crate::DungeonGenerator;
    use rand::SeedableRng;

    #[test]
    fn test_river_crosses_open_field() {
        let mut map = Map::new(40, 24, TileType::Floor);
        seal_border(&mut map).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let stamped = carve_river(&mut map, &mut rng, &GenerationConfig::new(12)).unwrap();
        assert!(stamped >= 20);
        assert_eq!(map.count(TileType::WorldBorder), 2 * 40 + 2 * 22);
        assert!(map.regions(is_walkable).count() >= 2);

        build_bridges(&mut map).unwrap();
        assert!(map.count(TileType::Bridge) > 0);
        assert!(validate_level(&map).is_ok());
    }

    #[test]
    fn test_river_dungeon_stays_connected() {
        let config = GenerationConfig::for_testing(6);
        for seed in 0..4 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut map = DungeonGenerator::new(config.clone())
                .draw_level(config.width, config.height, &mut rng)
                .unwrap();
            draw_river(&mut map, &mut rng, &config).unwrap();
            assert!(validate_level(&map).is_ok());
        }
    }

    #[test]
    fn test_bridges_are_short() {
        let mut map = Map::new(21, 9, TileType::Floor);
        seal_border(&mut map).unwrap();
        for y in 1..8 {
            map.set_tile(Position::new(10, y), TileType::DeepWater).unwrap();
        }
        assert_eq!(build_bridges(&mut map).unwrap(), 1);
        assert_eq!(map.count(TileType::Bridge), 1);
    }
}
