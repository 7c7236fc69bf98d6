//! # Field of View
//!
//! Ray-cast visibility over the map. Rays run from the viewer to every cell
//! on the edge of the view square and stop at the first opaque tile, which
//! is itself visible.

use crate::{bresenham_line, Map, Position};
use std::collections::HashSet;

/// Cells visible from `origin` within `radius`.
pub fn calc_visible(radius: i32, origin: Position, map: &Map) -> HashSet<Position> {
    let mut visible = HashSet::new();
    if !map.is_valid_position(origin) {
        return visible;
    }
    visible.insert(origin);
    if radius <= 0 {
        return visible;
    }

    let mut edge = Vec::new();
    for d in -radius..=radius {
        edge.push(Position::new(origin.x + d, origin.y - radius));
        edge.push(Position::new(origin.x + d, origin.y + radius));
        edge.push(Position::new(origin.x - radius, origin.y + d));
        edge.push(Position::new(origin.x + radius, origin.y + d));
    }

    for target in edge {
        for cell in bresenham_line(origin, target).into_iter().skip(1) {
            if !map.is_valid_position(cell) || origin.euclidean_distance(cell) > radius as f64 + 0.5 {
                break;
            }
            visible.insert(cell);
            if map.tile_or_border(cell).is_opaque() {
                break;
            }
        }
    }

    visible
}

/// Whether nothing opaque stands strictly between two cells.
pub fn has_line_of_sight(map: &Map, from: Position, to: Position) -> bool {
    let line = bresenham_line(from, to);
    let inner = line.len().saturating_sub(1);
    line.iter()
        .take(inner)
        .skip(1)
        .all(|&cell| !map.tile_or_border(cell).is_opaque())
}
