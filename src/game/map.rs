//! # Map
//!
//! Rectangular grid of tiles with bounds checking and region queries.

use crate::{DelveError, DelveResult, Position, TileType};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A fixed-size 2D grid of tiles.
///
/// Coordinates run from `(0, 0)` in the top-left corner to
/// `(width - 1, height - 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    pub width: u32,
    pub height: u32,
    tiles: Vec<TileType>,
}

/// Partition of the cells matching a predicate into 4-connected regions.
#[derive(Debug, Clone)]
pub struct RegionMap {
    width: u32,
    labels: Vec<Option<usize>>,
    /// Cells of each region, indexed by label
    pub regions: Vec<Vec<Position>>,
}

impl RegionMap {
    /// Region label at a position, if the cell belongs to one.
    pub fn label_at(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width {
            return None;
        }
        let index = pos.y as usize * self.width as usize + pos.x as usize;
        self.labels.get(index).copied().flatten()
    }

    pub fn count(&self) -> usize {
        self.regions.len()
    }

    /// Label of the region with the most cells.
    pub fn largest(&self) -> Option<usize> {
        (0..self.regions.len()).max_by_key(|&label| (self.regions[label].len(), usize::MAX - label))
    }

    /// Label of the region with the fewest cells.
    pub fn smallest(&self) -> Option<usize> {
        (0..self.regions.len()).min_by_key(|&label| (self.regions[label].len(), label))
    }
}

impl Map {
    /// Creates a map filled with a single tile type.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Map, Position, TileType};
    ///
    /// let map = Map::new(10, 5, TileType::Wall);
    /// assert_eq!(map.get_tile(Position::new(9, 4)), Some(TileType::Wall));
    /// assert_eq!(map.get_tile(Position::new(10, 0)), None);
    /// ```
    pub fn new(width: u32, height: u32, fill: TileType) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; (width * height) as usize],
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.is_valid_position(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Checks whether a position lies on the grid.
    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// True for cells on the outermost row or column.
    pub fn is_edge(&self, pos: Position) -> bool {
        pos.x == 0 || pos.y == 0 || pos.x == self.width as i32 - 1 || pos.y == self.height as i32 - 1
    }

    pub fn get_tile(&self, pos: Position) -> Option<TileType> {
        self.index(pos).map(|index| self.tiles[index])
    }

    /// Tile at a position, treating off-map cells as world border.
    pub fn tile_or_border(&self, pos: Position) -> TileType {
        self.get_tile(pos).unwrap_or(TileType::WorldBorder)
    }

    pub fn set_tile(&mut self, pos: Position, tile: TileType) -> DelveResult<()> {
        let index = self
            .index(pos)
            .ok_or(DelveError::OutOfBounds { x: pos.x, y: pos.y })?;
        self.tiles[index] = tile;
        Ok(())
    }

    /// Walkable on foot. Off-map cells are never passable.
    pub fn is_passable(&self, pos: Position) -> bool {
        self.get_tile(pos).map(TileType::is_passable).unwrap_or(false)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    /// Positions whose tile matches the predicate.
    pub fn positions_where<F>(&self, predicate: F) -> Vec<Position>
    where
        F: Fn(TileType) -> bool,
    {
        self.positions()
            .filter(|&pos| predicate(self.tile_or_border(pos)))
            .collect()
    }

    pub fn count(&self, tile: TileType) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }

    /// In-bounds cardinal neighbours.
    pub fn cardinal_neighbours(&self, pos: Position) -> Vec<Position> {
        pos.cardinal_adjacent_positions()
            .into_iter()
            .filter(|&p| self.is_valid_position(p))
            .collect()
    }

    /// In-bounds neighbours, diagonals included.
    pub fn neighbours(&self, pos: Position) -> Vec<Position> {
        pos.adjacent_positions()
            .into_iter()
            .filter(|&p| self.is_valid_position(p))
            .collect()
    }

    /// Labels 4-connected regions of cells whose tile satisfies the predicate.
    ///
    /// Regions are numbered in the row-major order of their first cell.
    pub fn regions<F>(&self, predicate: F) -> RegionMap
    where
        F: Fn(TileType) -> bool,
    {
        let mut labels = vec![None; self.tiles.len()];
        let mut regions = Vec::new();

        for start in self.positions() {
            let Some(start_index) = self.index(start) else {
                continue;
            };
            if labels[start_index].is_some() || !predicate(self.tiles[start_index]) {
                continue;
            }

            let label = regions.len();
            let mut cells = Vec::new();
            let mut queue = VecDeque::new();
            labels[start_index] = Some(label);
            queue.push_back(start);

            while let Some(pos) = queue.pop_front() {
                cells.push(pos);
                for next in pos.cardinal_adjacent_positions() {
                    let Some(next_index) = self.index(next) else {
                        continue;
                    };
                    if labels[next_index].is_none() && predicate(self.tiles[next_index]) {
                        labels[next_index] = Some(label);
                        queue.push_back(next);
                    }
                }
            }

            regions.push(cells);
        }

        RegionMap {
            width: self.width,
            labels,
            regions,
        }
    }

    /// Returns a copy two cells larger in each dimension, wrapped in an
    /// indestructible world-border ring.
    pub fn embed_in_border(&self) -> Map {
        let mut wrapped = Map::new(self.width + 2, self.height + 2, TileType::WorldBorder);
        for pos in self.positions() {
            let index = pos.y as usize * self.width as usize + pos.x as usize;
            let target = Position::new(pos.x + 1, pos.y + 1);
            if let Some(target_index) = wrapped.index(target) {
                wrapped.tiles[target_index] = self.tiles[index];
            }
        }
        wrapped
    }

    /// Renders the map with one glyph per tile, one line per row.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                out.push(self.tile_or_border(Position::new(x, y)).glyph());
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_from(rows: &[&str]) -> Map {
        let mut map = Map::new(rows[0].len() as u32, rows.len() as u32, TileType::Wall);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = match ch {
                    '.' => TileType::Floor,
                    '+' => TileType::ClosedDoor,
                    _ => TileType::Wall,
                };
                map.set_tile(Position::new(x as i32, y as i32), tile).unwrap();
            }
        }
        map
    }

    #[test]
    fn test_bounds() {
        let mut map = Map::new(4, 3, TileType::Wall);
        assert!(map.is_valid_position(Position::new(3, 2)));
        assert!(!map.is_valid_position(Position::new(-1, 0)));
        assert!(map.set_tile(Position::new(4, 0), TileType::Floor).is_err());
        assert!(map.is_edge(Position::new(0, 1)));
        assert!(!map.is_edge(Position::new(1, 1)));
    }

    #[test]
    fn test_regions_split_by_walls() {
        let map = map_from(&["#####", "#.#.#", "#.#.#", "#####"]);
        let regions = map.regions(TileType::is_open_ground);
        assert_eq!(regions.count(), 2);
        assert_eq!(regions.label_at(Position::new(1, 1)), Some(0));
        assert_eq!(regions.label_at(Position::new(3, 2)), Some(1));
        assert_eq!(regions.label_at(Position::new(2, 1)), None);
    }

    #[test]
    fn test_regions_join_through_doors() {
        let map = map_from(&["#####", "#.+.#", "#####"]);
        assert_eq!(map.regions(TileType::is_open_ground).count(), 1);
        assert_eq!(map.regions(TileType::is_passable).count(), 2);
    }

    #[test]
    fn test_regions_ignore_diagonals() {
        let map = map_from(&["####", "#.##", "##.#", "####"]);
        assert_eq!(map.regions(TileType::is_open_ground).count(), 2);
    }

    #[test]
    fn test_largest_and_smallest() {
        let map = map_from(&["######", "#...##", "####.#", "#.####", "######"]);
        let regions = map.regions(TileType::is_open_ground);
        assert_eq!(regions.count(), 3);
        assert_eq!(regions.largest(), Some(0));
        assert_eq!(regions.regions[regions.smallest().unwrap()].len(), 1);
    }

    #[test]
    fn test_embed_in_border() {
        let map = map_from(&["...", "..."]);
        let wrapped = map.embed_in_border();
        assert_eq!((wrapped.width, wrapped.height), (5, 4));
        assert_eq!(wrapped.get_tile(Position::new(0, 0)), Some(TileType::WorldBorder));
        assert_eq!(wrapped.get_tile(Position::new(1, 1)), Some(TileType::Floor));
        assert_eq!(wrapped.get_tile(Position::new(4, 3)), Some(TileType::WorldBorder));
        assert_eq!(wrapped.count(TileType::Floor), 6);
    }

    #[test]
    fn test_ascii() {
        let map = map_from(&["#.#"]);
        assert_eq!(map.to_ascii(), "#.#\n");
    }
}
