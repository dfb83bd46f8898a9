//! Bitmap decomposition into a list of closed contours

use log::debug;

use crate::bitmap::Bitmap;
use crate::error::TraceResult;
use crate::geometry::Point;
use crate::params::{Params, TurnPolicy};
use crate::path::{Sign, TracedPath};
use crate::progress::Progress;

/// Deterministic pseudo-random bit derived from a coordinate pair; the same
/// `(x, y)` always yields the same bit.
fn det_rand(x: i32, y: i32) -> bool {
    let z = ((x as u32).wrapping_mul(0x04B3_E375) ^ (y as u32)).wrapping_mul(0x05A8_EF93);
    z.count_ones() & 1 == 1
}

/// Majority color around `(x, y)`, sampled on growing rings in a fixed
/// position-dependent order; an exhausted tie falls back to `det_rand`.
fn majority(bm: &Bitmap, x: i32, y: i32) -> bool {
    for i in 2..5 {
        let mut ct = 0i32;
        for a in -i + 1..=i - 1 {
            ct += if bm.get(x + a, y + i - 1) { 1 } else { -1 };
            ct += if bm.get(x + i - 1, y + a - 1) { 1 } else { -1 };
            ct += if bm.get(x + a - 1, y - i) { 1 } else { -1 };
            ct += if bm.get(x - i, y + a) { 1 } else { -1 };
        }
        if ct > 0 {
            return true;
        }
        if ct < 0 {
            return false;
        }
    }
    det_rand(x, y)
}

/// Walk the edge between foreground and background starting at the top-left
/// corner of the pixel at `start`, turning per the turn policy at ambiguous
/// 2x2 configurations. `scratch` drives the walk; `original` only supplies
/// the sign (regions already erased from the scratch read inverted there).
fn find_path(
    scratch: &Bitmap,
    original: &Bitmap,
    start: Point,
    turn_policy: TurnPolicy,
) -> TracedPath {
    let sign = if original.get(start.x, start.y) {
        Sign::Plus
    } else {
        Sign::Minus
    };

    let mut points = Vec::new();
    let mut area = 0i64;
    let mut min = start;
    let mut max = start;

    let (mut x, mut y) = (start.x, start.y);
    let (mut dirx, mut diry) = (0i32, 1i32);

    loop {
        points.push(Point::new(x, y));
        min.x = min.x.min(x);
        min.y = min.y.min(y);
        max.x = max.x.max(x);
        max.y = max.y.max(y);

        x += dirx;
        y += diry;
        area -= x as i64 * diry as i64;

        if x == start.x && y == start.y {
            break;
        }

        let left = scratch.get(x + (dirx + diry - 1) / 2, y + (diry - dirx - 1) / 2);
        let right = scratch.get(x + (dirx - diry - 1) / 2, y + (diry + dirx - 1) / 2);

        if right && !left {
            // ambiguous: exactly one diagonal pair is foreground
            let turn_right = match turn_policy {
                TurnPolicy::Right => true,
                TurnPolicy::Left => false,
                TurnPolicy::Black => sign == Sign::Plus,
                TurnPolicy::White => sign == Sign::Minus,
                TurnPolicy::Majority => majority(scratch, x, y),
                TurnPolicy::Minority => !majority(scratch, x, y),
            };
            if turn_right {
                (dirx, diry) = (-diry, dirx);
            } else {
                (dirx, diry) = (diry, -dirx);
            }
        } else if right {
            (dirx, diry) = (-diry, dirx);
        } else if !left {
            (dirx, diry) = (diry, -dirx);
        }
    }

    TracedPath {
        points,
        area,
        sign,
        min,
        max,
        children: Vec::new(),
    }
}

/// Erase the traced region from the scratch bitmap by XOR-ing every
/// scanline between the contour and the vertical line through its first
/// point. Interior bits flip an odd number of times, exterior bits an even
/// number, so the region inverts exactly once.
fn xor_path(scratch: &mut Bitmap, path: &TracedPath) {
    let xa = path.points[0].x;
    let mut y1 = path.points[path.points.len() - 1].y;
    for p in &path.points {
        if p.y != y1 {
            scratch.flip_range(p.y.min(y1), p.x, xa);
            y1 = p.y;
        }
    }
}

/// Decompose a bitmap into its contour paths.
///
/// Scans for foreground pixels in raster order, traces the contour of each
/// newly met region, erases it from a scratch copy and keeps the contour
/// when its enclosed area exceeds `turd_size`.
pub fn bitmap_to_pathlist(
    bitmap: &Bitmap,
    params: &Params,
    progress: &mut Progress<'_>,
) -> TraceResult<Vec<TracedPath>> {
    let mut scratch = bitmap.clone();
    let mut paths = Vec::new();
    let height = bitmap.height().max(1) as f64;

    let mut current = Point::new(0, 0);
    while let Some(found) = scratch.find_next(current) {
        let path = find_path(&scratch, bitmap, found, params.turn_policy);
        xor_path(&mut scratch, &path);

        if path.area > params.turd_size as i64 {
            paths.push(path);
        }

        progress.report(found.y as f64 / height);
        current = found;
    }

    debug!(
        "decomposed {}x{} bitmap into {} paths",
        bitmap.width(),
        bitmap.height(),
        paths.len()
    );
    build_tree(&mut paths);
    progress.report(1.0);
    Ok(paths)
}

/// Attach each path to the innermost earlier path containing it.
///
/// Discovery order is raster order, so every container precedes its
/// contents and the innermost container is the latest one; probing the
/// first pixel of each contour is enough.
fn build_tree(paths: &mut [TracedPath]) {
    for i in 1..paths.len() {
        let probe = paths[i].points[0];
        let parent = (0..i)
            .rev()
            .find(|&j| paths[j].contains_pixel(probe.x, probe.y));
        if let Some(j) = parent {
            paths[j].children.push(i);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_from_rows(rows: &[&str]) -> Bitmap {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut bm = Bitmap::new(width, height).unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    bm.set(x as i32, y as i32);
                }
            }
        }
        bm
    }

    fn decompose(bm: &Bitmap, params: &Params) -> Vec<TracedPath> {
        bitmap_to_pathlist(bm, params, &mut Progress::none()).unwrap()
    }

    fn params_keeping_everything() -> Params {
        Params {
            turd_size: 0,
            ..Params::default()
        }
    }

    #[test]
    fn test_single_square() {
        let bm = bitmap_from_rows(&[
            "..........",
            "..........",
            "..#####...",
            "..#####...",
            "..#####...",
            "..#####...",
            "..#####...",
            "..........",
            "..........",
            "..........",
        ]);
        let paths = decompose(&bm, &Params::default());
        assert_eq!(paths.len(), 1);
        let p = &paths[0];
        assert_eq!(p.sign, Sign::Plus);
        assert_eq!(p.area, 25);
        assert_eq!(p.len(), 20);
        assert_eq!(p.polygon_area(), p.area);
        assert_eq!(p.points[0], Point::new(2, 2));
        // closed ring of unit cardinal steps
        for i in 0..p.len() {
            let a = p.points[i];
            let b = p.points[(i + 1) % p.len()];
            assert_eq!((a.x - b.x).abs() + (a.y - b.y).abs(), 1);
        }
    }

    #[test]
    fn test_empty_bitmap_yields_no_paths() {
        let bm = Bitmap::new(10, 10).unwrap();
        assert!(decompose(&bm, &Params::default()).is_empty());
    }

    #[test]
    fn test_turd_size_filters_small_regions() {
        let bm = bitmap_from_rows(&["#....", ".....", "..###", "..###"]);
        let paths = decompose(&bm, &Params::default()); // turd_size = 2
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].area, 6);

        let paths = decompose(&bm, &params_keeping_everything());
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_checkerboard_majority_policy() {
        let bm = bitmap_from_rows(&["#.", ".#"]);
        let params = Params {
            turn_policy: TurnPolicy::Majority,
            ..params_keeping_everything()
        };
        let paths = decompose(&bm, &params);
        assert_eq!(paths.len(), 2);
        for p in &paths {
            assert_eq!(p.sign, Sign::Plus);
            assert_eq!(p.area, 1);
            assert!(p.children.is_empty());
        }
    }

    #[test]
    fn test_hole_gets_minus_sign_and_parent() {
        let bm = bitmap_from_rows(&[
            "......",
            ".####.",
            ".#..#.",
            ".#..#.",
            ".####.",
            "......",
        ]);
        let paths = decompose(&bm, &params_keeping_everything());
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].sign, Sign::Plus);
        assert_eq!(paths[0].area, 16);
        assert_eq!(paths[1].sign, Sign::Minus);
        assert_eq!(paths[1].area, 4);
        assert_eq!(paths[0].children, vec![1]);
        assert!(paths[1].children.is_empty());
    }

    #[test]
    fn test_nested_island_alternates_signs() {
        let bm = bitmap_from_rows(&[
            ".........",
            ".#######.",
            ".#.....#.",
            ".#.###.#.",
            ".#.###.#.",
            ".#.###.#.",
            ".#.....#.",
            ".#######.",
            ".........",
        ]);
        let paths = decompose(&bm, &params_keeping_everything());
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].sign, Sign::Plus);
        assert_eq!(paths[1].sign, Sign::Minus);
        assert_eq!(paths[2].sign, Sign::Plus);
        assert_eq!(paths[0].children, vec![1]);
        assert_eq!(paths[1].children, vec![2]);
        // area accounting: enclosed foreground = sum(+) - sum(-)
        let net: i64 = paths
            .iter()
            .map(|p| if p.sign == Sign::Plus { p.area } else { -p.area })
            .sum();
        assert_eq!(net, bm.count_ones() as i64);
    }

    #[test]
    fn test_erase_terminates_on_full_bitmap() {
        let mut bm = Bitmap::new(64, 64).unwrap();
        bm.fill(true);
        let paths = decompose(&bm, &params_keeping_everything());
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].area, 64 * 64);
    }

    #[test]
    fn test_det_rand_is_stable() {
        assert_eq!(det_rand(17, 93), det_rand(17, 93));
        // not constant over coordinates
        let bits: Vec<bool> = (0..64).map(|i| det_rand(i, 7 * i + 3)).collect();
        assert!(bits.iter().any(|&b| b));
        assert!(bits.iter().any(|&b| !b));
    }
}
