//! # Dungeon Generation
//!
//! Room-and-maze dungeons.
//!
//! One attempt runs these steps on a wall-filled working grid two cells
//! smaller than the requested map:
//!
//! 1. place rectangular and circular rooms at odd-aligned offsets
//! 2. fill the solid rock between them with growing-tree mazes
//! 3. give every room a door (or a short tunnel for circular rooms)
//! 4. repair connectivity until one region is left
//! 5. prune dead ends to convergence
//! 6. open a few extra doors between neighbouring rooms
//! 7. wrap the grid in world border and drop doors that separate nothing
//!
//! An attempt that cannot finish is thrown away and the next one starts
//! from scratch.

use super::utils::validate_level;
use super::{GenerationConfig, Generator, Room, RoomShape};
use crate::{DelveError, DelveResult, Direction, Map, Position, TileType};
use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Probes fired out of a circular room before giving up on it.
const TUNNEL_PROBES: u32 = 16;

/// Room-and-maze dungeon generator.
#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator {
    pub config: GenerationConfig,
}

/// Result of one attempt. `GenerationFailed` abandons the attempt; any
/// other error ends generation.
type Attempt<T> = DelveResult<T>;

fn abandon(reason: impl Into<String>) -> DelveError {
    DelveError::GenerationFailed(reason.into())
}

impl DungeonGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// Draws a dungeon level of the given size, border included.
    ///
    /// Retries whole attempts up to `max_map_retries` times.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{DungeonGenerator, GenerationConfig, TileType};
    /// use rand::SeedableRng;
    ///
    /// let generator = DungeonGenerator::new(GenerationConfig::for_testing(1));
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    /// let map = generator.draw_level(41, 25, &mut rng).unwrap();
    /// assert_eq!(map.get_tile(delve::Position::new(0, 0)), Some(TileType::WorldBorder));
    /// ```
    pub fn draw_level(&self, width: u32, height: u32, rng: &mut StdRng) -> DelveResult<Map> {
        if width < 3 || height < 3 {
            return Err(DelveError::GenerationFailed(format!(
                "a {}x{} map has no interior",
                width, height
            )));
        }
        for attempt in 1..=self.config.max_map_retries {
            match self.attempt(width - 2, height - 2, rng) {
                Ok(map) => {
                    info!("Generated {}x{} dungeon on attempt {}", width, height, attempt);
                    return Ok(map);
                }
                Err(DelveError::GenerationFailed(reason)) => {
                    debug!("Dungeon attempt {} abandoned: {}", attempt, reason)
                }
                Err(e) => return Err(e),
            }
        }
        Err(DelveError::GenerationFailed(format!(
            "no valid {}x{} dungeon after {} attempts",
            width, height, self.config.max_map_retries
        )))
    }

    fn attempt(&self, width: u32, height: u32, rng: &mut StdRng) -> Attempt<Map> {
        let mut grid = Map::new(width, height, TileType::Wall);
        let rooms = self.place_rooms(&mut grid, rng)?;
        if rooms.is_empty() {
            return Err(abandon("no room fits"));
        }
        carve_mazes(&mut grid, rng)?;
        for room in &rooms {
            self.connect_room(&mut grid, room, rng)?;
        }
        self.repair_regions(&mut grid, rng)?;
        prune_dead_ends(&mut grid)?;
        self.add_loops(&mut grid, &rooms, rng)?;

        let mut map = grid.embed_in_border();
        clean_up_doors(&mut map)?;
        validate_level(&map)?;
        Ok(map)
    }

    fn sample_room(&self, id: usize, grid: &Map, rng: &mut StdRng) -> Option<Room> {
        let (w, h) = (grid.width as i32, grid.height as i32);
        if rng.gen_bool(self.config.circular_room_chance.clamp(0.0, 1.0)) {
            let radius = rng.gen_range(3..=5);
            let span = w - 2 - 2 * radius;
            let rise = h - 2 - 2 * radius;
            if span < 1 || rise < 1 {
                return None;
            }
            let cx = odd_offset(rng, span) + radius;
            let cy = odd_offset(rng, rise) + radius;
            Some(Room::circular(id, Position::new(cx, cy), radius))
        } else {
            let room_w = rng.gen_range(2..=9) * 2 + 1;
            let room_h = rng.gen_range(2..=4) * 2 + 1;
            let span = w - 1 - room_w;
            let rise = h - 1 - room_h;
            if span < 1 || rise < 1 {
                return None;
            }
            let top_left = Position::new(odd_offset(rng, span), odd_offset(rng, rise));
            Some(Room::rectangular(id, top_left, room_w as u32, room_h as u32))
        }
    }

    fn place_rooms(&self, grid: &mut Map, rng: &mut StdRng) -> DelveResult<Vec<Room>> {
        let mut rooms = Vec::new();
        for _ in 0..self.config.room_attempts {
            let Some(room) = self.sample_room(rooms.len(), grid, rng) else {
                continue;
            };
            if room.overlaps_map(grid) {
                continue;
            }
            for &cell in &room.floor {
                grid.set_tile(cell, TileType::Floor)?;
            }
            rooms.push(room);
        }
        debug!("Placed {} rooms", rooms.len());
        Ok(rooms)
    }

    fn door_tile(&self, rng: &mut StdRng) -> TileType {
        let weights = [self.config.closed_door_weight, self.config.locked_door_weight];
        match WeightedIndex::new(weights) {
            Ok(odds) if odds.sample(rng) == 1 => TileType::LockedDoor,
            _ => TileType::ClosedDoor,
        }
    }

    fn connect_room(&self, grid: &mut Map, room: &Room, rng: &mut StdRng) -> Attempt<()> {
        match room.shape {
            RoomShape::Rectangular => {
                let candidates: Vec<Position> = room
                    .perimeter
                    .iter()
                    .copied()
                    .filter(|&p| is_valid_door(grid, p))
                    .filter(|p| p.cardinal_adjacent_positions().iter().any(|n| room.contains(*n)))
                    .collect();
                let door = candidates
                    .choose(rng)
                    .copied()
                    .ok_or_else(|| abandon(format!("room {} has no door site", room.id)))?;
                let tile = self.door_tile(rng);
                grid.set_tile(door, tile)
            }
            RoomShape::Circular => self.tunnel_out(grid, room, rng),
        }
    }

    /// Fires short tunnels out of a circular room until one hits foreign
    /// floor, then floors it and caps both ends with doors.
    fn tunnel_out(&self, grid: &mut Map, room: &Room, rng: &mut StdRng) -> Attempt<()> {
        let reach = self.config.max_tunnel_length as i32;
        for _ in 0..TUNNEL_PROBES {
            let direction = *Direction::cardinal()
                .choose(rng)
                .ok_or_else(|| abandon("no directions"))?;
            let delta = direction.to_delta();
            // floor cells that face outwards in this direction
            let faces: Vec<Position> = room
                .floor
                .iter()
                .copied()
                .filter(|&p| !room.contains(p + delta))
                .collect();
            let Some(&start) = faces.choose(rng) else {
                continue;
            };

            let mut tunnel = Vec::new();
            let mut cell = start + delta;
            let mut hit = false;
            for _ in 0..=reach {
                if !grid.is_valid_position(cell) || grid.is_edge(cell) {
                    break;
                }
                if grid.tile_or_border(cell).is_open_ground() {
                    hit = !room.contains(cell);
                    break;
                }
                tunnel.push(cell);
                cell = cell + delta;
            }
            if !hit || tunnel.is_empty() || tunnel.len() > reach as usize {
                continue;
            }

            for &p in &tunnel {
                grid.set_tile(p, TileType::Floor)?;
            }
            let (first, last) = (tunnel[0], tunnel[tunnel.len() - 1]);
            grid.set_tile(first, TileType::ClosedDoor)?;
            grid.set_tile(last, TileType::ClosedDoor)?;
            return Ok(());
        }
        Err(abandon(format!(
            "circular room {} found nothing to tunnel to",
            room.id
        )))
    }

    /// Merges regions through connector walls until one region is left,
    /// falling back to straight corridors when no connector exists.
    fn repair_regions(&self, grid: &mut Map, rng: &mut StdRng) -> Attempt<()> {
        for pass in 0..self.config.max_repair_passes {
            let regions = grid.regions(TileType::is_open_ground);
            if regions.count() <= 1 {
                debug!("Regions joined after {} repair passes", pass);
                return Ok(());
            }

            let mut connectors: Vec<(Position, Vec<usize>)> = grid
                .positions()
                .filter(|&p| !grid.is_edge(p) && grid.tile_or_border(p).is_wall_like())
                .filter_map(|p| {
                    let labels: BTreeSet<usize> = p
                        .cardinal_adjacent_positions()
                        .into_iter()
                        .filter_map(|n| regions.label_at(n))
                        .collect();
                    (labels.len() >= 2).then(|| (p, labels.into_iter().collect()))
                })
                .collect();

            if connectors.is_empty() {
                carve_corridor(grid, &regions.regions)?;
                continue;
            }

            connectors.shuffle(rng);
            let mut sets = UnionFind::new(regions.count());
            for (cell, labels) in connectors {
                let joins = labels.windows(2).any(|pair| sets.find(pair[0]) != sets.find(pair[1]));
                if joins || rng.gen_bool(self.config.extra_connector_chance.clamp(0.0, 1.0)) {
                    for pair in labels.windows(2) {
                        sets.union(pair[0], pair[1]);
                    }
                    grid.set_tile(cell, TileType::Floor)?;
                }
            }
        }
        if grid.regions(TileType::is_open_ground).count() <= 1 {
            Ok(())
        } else {
            Err(abandon("regions still split after repair"))
        }
    }

    /// Opens extra doors in walls that separate two different rooms.
    fn add_loops(&self, grid: &mut Map, rooms: &[Room], rng: &mut StdRng) -> DelveResult<()> {
        let owner: BTreeMap<Position, usize> = rooms
            .iter()
            .flat_map(|r| r.floor.iter().map(move |&p| (p, r.id)))
            .collect();
        let room_at = |p: Position| {
            owner
                .get(&p)
                .copied()
                .filter(|_| grid.tile_or_border(p).is_passable())
        };

        let mut sites: BTreeMap<(usize, usize), Vec<Position>> = BTreeMap::new();
        for p in grid.positions() {
            if grid.is_edge(p) || !grid.tile_or_border(p).is_wall_like() {
                continue;
            }
            for (a, b) in [
                (Position::new(p.x, p.y - 1), Position::new(p.x, p.y + 1)),
                (Position::new(p.x - 1, p.y), Position::new(p.x + 1, p.y)),
            ] {
                if let (Some(ra), Some(rb)) = (room_at(a), room_at(b)) {
                    if ra != rb {
                        sites.entry((ra.min(rb), ra.max(rb))).or_default().push(p);
                    }
                }
            }
        }

        let chance = self.config.extra_loop_chance.clamp(0.0, 1.0);
        let mut opened = 0;
        for cells in sites.values() {
            if rng.gen_bool(chance) {
                if let Some(&door) = cells.choose(rng) {
                    grid.set_tile(door, TileType::ClosedDoor)?;
                    opened += 1;
                }
            }
        }
        debug!("Opened {} extra loops", opened);
        Ok(())
    }
}

impl Generator<Map> for DungeonGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<Map> {
        DungeonGenerator::new(config.clone()).draw_level(config.width, config.height, rng)
    }

    fn validate(&self, content: &Map, _config: &GenerationConfig) -> DelveResult<()> {
        validate_level(content)
    }

    fn generator_type(&self) -> &'static str {
        "DungeonGenerator"
    }
}

/// A random odd offset in `1..=limit`.
fn odd_offset(rng: &mut StdRng, limit: i32) -> i32 {
    rng.gen_range(0..=(limit - 1) / 2) * 2 + 1
}

fn is_floor_at(grid: &Map, pos: Position) -> bool {
    grid.tile_or_border(pos).is_open_ground()
}

/// A wall with floor on both sides of one axis.
fn is_valid_door(grid: &Map, pos: Position) -> bool {
    let north_south = is_floor_at(grid, Position::new(pos.x, pos.y - 1))
        && is_floor_at(grid, Position::new(pos.x, pos.y + 1));
    let east_west = is_floor_at(grid, Position::new(pos.x - 1, pos.y))
        && is_floor_at(grid, Position::new(pos.x + 1, pos.y));
    grid.tile_or_border(pos).is_wall_like() && (north_south || east_west)
}

fn no_floor_around(grid: &Map, pos: Position) -> bool {
    pos.adjacent_positions().into_iter().all(|n| !is_floor_at(grid, n))
}

/// Fills the solid rock with growing-tree mazes on the odd lattice.
fn carve_mazes(grid: &mut Map, rng: &mut StdRng) -> DelveResult<()> {
    let (w, h) = (grid.width as i32, grid.height as i32);
    let mut mazes = 0;
    loop {
        let seed = (1..h - 1)
            .step_by(2)
            .flat_map(|y| (1..w - 1).step_by(2).map(move |x| Position::new(x, y)))
            .find(|&p| grid.tile_or_border(p).is_wall_like() && no_floor_around(grid, p));
        let Some(seed) = seed else {
            break;
        };
        mazes += 1;

        grid.set_tile(seed, TileType::Floor)?;
        let mut stack = vec![seed];
        while let Some(&cell) = stack.last() {
            let options: Vec<Position> = Direction::cardinal()
                .into_iter()
                .map(|d| d.to_delta())
                .filter(|&d| {
                    let next = cell + d + d;
                    next.x >= 1
                        && next.y >= 1
                        && next.x < w - 1
                        && next.y < h - 1
                        && grid.tile_or_border(next).is_wall_like()
                        && no_floor_around(grid, next)
                })
                .collect();
            match options.choose(rng) {
                Some(&d) => {
                    grid.set_tile(cell + d, TileType::Floor)?;
                    grid.set_tile(cell + d + d, TileType::Floor)?;
                    stack.push(cell + d + d);
                }
                None => {
                    stack.pop();
                }
            }
        }
    }
    debug!("Carved {} mazes", mazes);
    Ok(())
}

/// Digs a straight corridor from the smallest region to the nearest floor of
/// another region.
fn carve_corridor(grid: &mut Map, regions: &[Vec<Position>]) -> Attempt<()> {
    let Some((smallest, cells)) = regions.iter().enumerate().min_by_key(|(_, r)| r.len()) else {
        return Err(abandon("no regions to join"));
    };
    let own: BTreeSet<Position> = cells.iter().copied().collect();

    let mut best: Option<Vec<Position>> = None;
    for &start in cells {
        for direction in Direction::cardinal() {
            let delta = direction.to_delta();
            let mut dug = Vec::new();
            let mut cell = start + delta;
            while grid.is_valid_position(cell) && !grid.is_edge(cell) {
                if is_floor_at(grid, cell) {
                    if !own.contains(&cell) && !dug.is_empty() {
                        let shorter = best.as_ref().map_or(true, |b| dug.len() < b.len());
                        if shorter {
                            best = Some(dug.clone());
                        }
                    }
                    break;
                }
                dug.push(cell);
                cell = cell + delta;
            }
        }
    }

    let corridor = best.ok_or_else(|| abandon(format!("region {} is sealed in", smallest)))?;
    debug!("Dug a {}-cell corridor out of region {}", corridor.len(), smallest);
    for p in corridor {
        grid.set_tile(p, TileType::Floor)?;
    }
    Ok(())
}

/// Walls up every open cell with a single open cardinal neighbour until
/// none is left.
pub fn prune_dead_ends(grid: &mut Map) -> DelveResult<()> {
    loop {
        let dead: Vec<Position> = grid
            .positions()
            .filter(|&p| is_floor_at(grid, p))
            .filter(|&p| {
                p.cardinal_adjacent_positions()
                    .into_iter()
                    .filter(|&n| is_floor_at(grid, n))
                    .count()
                    <= 1
            })
            .collect();
        if dead.is_empty() {
            return Ok(());
        }
        for p in dead {
            grid.set_tile(p, TileType::Wall)?;
        }
    }
}

/// Turns doors that do not sit between walls on exactly one axis into floor.
pub fn clean_up_doors(map: &mut Map) -> DelveResult<()> {
    let blocked = |map: &Map, p: Position| !map.tile_or_border(p).is_open_ground();
    let stray: Vec<Position> = map
        .positions()
        .filter(|&p| map.tile_or_border(p).is_door())
        .filter(|&p| {
            let north_south = blocked(map, Position::new(p.x, p.y - 1))
                && blocked(map, Position::new(p.x, p.y + 1));
            let east_west = blocked(map, Position::new(p.x - 1, p.y))
                && blocked(map, Position::new(p.x + 1, p.y));
            north_south == east_west
        })
        .collect();
    for p in stray {
        map.set_tile(p, TileType::Floor)?;
    }
    Ok(())
}

/// Disjoint sets over region labels.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn generator() -> DungeonGenerator {
        DungeonGenerator::new(GenerationConfig::for_testing(11))
    }

    #[test]
    fn test_dungeon_is_connected_and_sealed() {
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let map = generator().draw_level(41, 25, &mut rng).unwrap();
            assert_eq!((map.width, map.height), (41, 25));
            assert!(validate_level(&map).is_ok());
            assert!(map.count(TileType::Floor) > 50);
        }
    }

    #[test]
    fn test_no_dead_ends_survive() {
        let mut rng = StdRng::seed_from_u64(4);
        let map = generator().draw_level(51, 31, &mut rng).unwrap();
        for p in map.positions().filter(|&p| map.tile_or_border(p).is_open_ground()) {
            let open = p
                .cardinal_adjacent_positions()
                .into_iter()
                .filter(|&n| map.tile_or_border(n).is_open_ground())
                .count();
            assert!(open >= 2, "dead end at {}", p);
        }
    }

    #[test]
    fn test_same_seed_same_dungeon() {
        let a = generator().draw_level(41, 25, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = generator().draw_level(41, 25, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.to_ascii(), b.to_ascii());
    }

    #[test]
    fn test_doors_sit_between_walls() {
        let mut rng = StdRng::seed_from_u64(2);
        let map = generator().draw_level(61, 31, &mut rng).unwrap();
        for p in map.positions().filter(|&p| map.tile_or_border(p).is_door()) {
            let wall = |q: Position| !map.tile_or_border(q).is_open_ground();
            let ns = wall(Position::new(p.x, p.y - 1)) && wall(Position::new(p.x, p.y + 1));
            let ew = wall(Position::new(p.x - 1, p.y)) && wall(Position::new(p.x + 1, p.y));
            assert!(ns != ew, "stray door at {}", p);
        }
    }

    #[test]
    fn test_too_small_fails_cleanly() {
        let mut rng = StdRng::seed_from_u64(1);
        match generator().draw_level(8, 8, &mut rng) {
            Err(DelveError::GenerationFailed(reason)) => assert!(reason.contains("attempts")),
            other => panic!("unexpected {:?}", other.map(|m| m.to_ascii())),
        }
        assert!(generator().draw_level(2, 9, &mut rng).is_err());
    }

    #[test]
    fn test_maze_fills_rock_on_odd_lattice() {
        let mut grid = Map::new(11, 9, TileType::Wall);
        carve_mazes(&mut grid, &mut StdRng::seed_from_u64(3)).unwrap();
        for y in (1..8).step_by(2) {
            for x in (1..10).step_by(2) {
                assert_eq!(grid.get_tile(Position::new(x, y)), Some(TileType::Floor));
            }
        }
        assert_eq!(grid.regions(TileType::is_open_ground).count(), 1);
    }

    #[test]
    fn test_pruning_erases_stubs() {
        let mut grid = Map::new(9, 5, TileType::Wall);
        for x in 1..8 {
            grid.set_tile(Position::new(x, 2), TileType::Floor).unwrap();
        }
        prune_dead_ends(&mut grid).unwrap();
        assert_eq!(grid.count(TileType::Floor), 0);
    }

    #[test]
    fn test_stray_door_becomes_floor() -> DelveResult<()> {
        let mut map = Map::new(7, 7, TileType::Floor);
        crate::generation::utils::seal_border(&mut map)?;
        map.set_tile(Position::new(3, 3), TileType::ClosedDoor)?;
        clean_up_doors(&mut map)?;
        assert_eq!(map.get_tile(Position::new(3, 3)), Some(TileType::Floor));
        assert_eq!(map.count(TileType::WorldBorder), 24);
        Ok(())
    }
}
