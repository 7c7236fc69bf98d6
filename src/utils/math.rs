//! # Game Mathematics
//!
//! Grid rasterisation and dice helpers shared by the generators, field of
//! view and combat.

use crate::Position;
use rand::Rng;

/// Cells on the Bresenham line from `from` to `to`, both ends included.
///
/// # Examples
///
/// ```
/// use delve::{bresenham_line, Position};
///
/// let line = bresenham_line(Position::new(0, 0), Position::new(3, 1));
/// assert_eq!(line.first(), Some(&Position::new(0, 0)));
/// assert_eq!(line.last(), Some(&Position::new(3, 1)));
/// assert_eq!(line.len(), 4);
/// ```
pub fn bresenham_line(from: Position, to: Position) -> Vec<Position> {
    let mut line = Vec::new();
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - x).abs();
    let dy = -(to.y - y).abs();
    let sx = if x < to.x { 1 } else { -1 };
    let sy = if y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        line.push(Position::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    line
}

/// A Bresenham line with every diagonal step filled in, so consecutive
/// cells always share a side.
pub fn cardinal_line(from: Position, to: Position) -> Vec<Position> {
    let line = bresenham_line(from, to);
    let mut cells = Vec::with_capacity(line.len() * 2);
    for (i, &cell) in line.iter().enumerate() {
        if let Some(&prev) = i.checked_sub(1).and_then(|j| line.get(j)) {
            if prev.x != cell.x && prev.y != cell.y {
                cells.push(Position::new(cell.x, prev.y));
            }
        }
        cells.push(cell);
    }
    cells
}

/// Outline of a circle from the midpoint algorithm.
pub fn circle_outline(center: Position, radius: i32) -> Vec<Position> {
    let mut cells = Vec::new();
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;

    while x >= y {
        for (dx, dy) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            let cell = Position::new(center.x + dx, center.y + dy);
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }

    cells
}

/// Cells of a filled disc: the outline plus every cell inside it by distance.
pub fn filled_circle(center: Position, radius: i32) -> Vec<Position> {
    let mut cells = circle_outline(center, radius);
    let limit = (radius as f64 + 0.5) * (radius as f64 + 0.5);
    for y in -radius..=radius {
        for x in -radius..=radius {
            let cell = Position::new(center.x + x, center.y + y);
            if ((x * x + y * y) as f64) < limit && !cells.contains(&cell) {
                cells.push(cell);
            }
        }
    }
    cells
}

/// Sum of `dice` rolls of a `sides`-sided die.
pub fn roll_dice<R: Rng>(rng: &mut R, dice: u32, sides: u32) -> i32 {
    if sides == 0 {
        return 0;
    }
    (0..dice).map(|_| rng.gen_range(1..=sides) as i32).sum()
}

/// Percentile check: true with `chance` percent probability.
pub fn percent_roll<R: Rng>(rng: &mut R, chance: u32) -> bool {
    chance > 0 && rng.gen_range(0..100) < chance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_line_is_contiguous() {
        let line = bresenham_line(Position::new(2, 9), Position::new(11, 3));
        for pair in line.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
        }
    }

    #[test]
    fn test_cardinal_line_has_no_diagonal_steps() {
        let line = cardinal_line(Position::new(0, 0), Position::new(4, 3));
        assert_eq!(line.first(), Some(&Position::new(0, 0)));
        assert_eq!(line.last(), Some(&Position::new(4, 3)));
        for pair in line.windows(2) {
            let d = pair[1] - pair[0];
            assert_eq!(d.x.abs() + d.y.abs(), 1);
        }
    }

    #[test]
    fn test_single_point_line() {
        let p = Position::new(4, 4);
        assert_eq!(bresenham_line(p, p), vec![p]);
    }

    #[test]
    fn test_circle_outline_radius() {
        let center = Position::new(10, 10);
        for cell in circle_outline(center, 4) {
            let d = center.euclidean_distance(cell);
            assert!((3.4..=4.6).contains(&d), "{} at {}", cell, d);
        }
    }

    #[test]
    fn test_filled_circle_contains_center_and_outline() {
        let center = Position::new(5, 5);
        let disc = filled_circle(center, 3);
        assert!(disc.contains(&center));
        for cell in circle_outline(center, 3) {
            assert!(disc.contains(&cell));
        }
    }

    #[test]
    fn test_dice_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let roll = roll_dice(&mut rng, 2, 6);
            assert!((2..=12).contains(&roll));
        }
        assert_eq!(roll_dice(&mut rng, 3, 0), 0);
        assert!(!percent_roll(&mut rng, 0));
        assert!(percent_roll(&mut rng, 100));
    }
}
