//! Optimal polygon fitting over a jagged contour

use crate::geometry::{cyclic, cyclic_mod, sign_i64, xprod, Point};

/// Cumulative point sums enabling O(1) least-squares over any sub-arc
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Sum {
    pub x: i64,
    pub y: i64,
    pub xy: i64,
    pub x2: i64,
    pub y2: i64,
}

/// Prefix sums of the contour points, relative to the first point.
///
/// `sums[0]` is zero and `sums[len]` holds the totals, so any cyclic range
/// reduces to at most two subtractions.
pub(crate) fn calc_sums(pt: &[Point]) -> Vec<Sum> {
    let x0 = pt[0].x as i64;
    let y0 = pt[0].y as i64;

    let mut sums = Vec::with_capacity(pt.len() + 1);
    sums.push(Sum::default());
    for (i, p) in pt.iter().enumerate() {
        let x = p.x as i64 - x0;
        let y = p.y as i64 - y0;
        let prev = sums[i];
        sums.push(Sum {
            x: prev.x + x,
            y: prev.y + y,
            xy: prev.xy + x * y,
            x2: prev.x2 + x * x,
            y2: prev.y2 + y * y,
        });
    }
    sums
}

/// For each vertex, the farthest cyclic index reachable by a single
/// straight sub-path.
///
/// Walks forward maintaining the pair of constraint vectors that bound the
/// admissible directions; a sub-path stops being straight when all four
/// cardinal directions have occurred or a new point leaves the constraint
/// cone. A final pass makes the result cyclically monotone.
pub(crate) fn calc_lon(pt: &[Point]) -> Vec<usize> {
    let n = pt.len();
    let mut pivk = vec![0usize; n];
    let mut nc = vec![0usize; n];
    let mut lon = vec![0usize; n];

    // nc[i]: next direction change at or after i + 1
    let mut k = 0usize;
    for i in (0..n).rev() {
        if pt[i].x != pt[k].x && pt[i].y != pt[k].y {
            k = i + 1;
        }
        nc[i] = k;
    }

    for i in (0..n).rev() {
        let mut ct = [0i32; 4];
        let dir =
            (3 + 3 * (pt[(i + 1) % n].x - pt[i].x) + (pt[(i + 1) % n].y - pt[i].y)) / 2;
        ct[dir as usize] += 1;

        let mut constraint0 = Point::new(0, 0);
        let mut constraint1 = Point::new(0, 0);

        let mut k = nc[i];
        let mut k1 = i;
        let mut found = false;
        loop {
            let dir = (3
                + 3 * sign_i64((pt[k].x - pt[k1].x) as i64)
                + sign_i64((pt[k].y - pt[k1].y) as i64))
                / 2;
            ct[dir as usize] += 1;

            // all four directions seen: the sub-path necessarily ends here
            if ct[0] != 0 && ct[1] != 0 && ct[2] != 0 && ct[3] != 0 {
                pivk[i] = k1;
                found = true;
                break;
            }

            let cur = Point::new(pt[k].x - pt[i].x, pt[k].y - pt[i].y);
            if xprod(constraint0, cur) < 0 || xprod(constraint1, cur) > 0 {
                break;
            }

            if cur.x.abs() > 1 || cur.y.abs() > 1 {
                let off = Point::new(
                    cur.x + if cur.y >= 0 && (cur.y > 0 || cur.x < 0) { 1 } else { -1 },
                    cur.y + if cur.x <= 0 && (cur.x < 0 || cur.y < 0) { 1 } else { -1 },
                );
                if xprod(constraint0, off) >= 0 {
                    constraint0 = off;
                }
                let off = Point::new(
                    cur.x + if cur.y <= 0 && (cur.y < 0 || cur.x < 0) { 1 } else { -1 },
                    cur.y + if cur.x >= 0 && (cur.x > 0 || cur.y < 0) { 1 } else { -1 },
                );
                if xprod(constraint1, off) <= 0 {
                    constraint1 = off;
                }
            }

            k1 = k;
            k = nc[k1];
            if !cyclic(k, i, k1) {
                break;
            }
        }

        if !found {
            // the constraint broke mid-edge: slide along the last edge
            // direction as far as the cone allows
            let dk = Point::new(
                sign_i64((pt[k].x - pt[k1].x) as i64),
                sign_i64((pt[k].y - pt[k1].y) as i64),
            );
            let cur = Point::new(pt[k1].x - pt[i].x, pt[k1].y - pt[i].y);

            let a = xprod(constraint0, cur);
            let b = xprod(constraint0, dk);
            let c = xprod(constraint1, cur);
            let d = xprod(constraint1, dk);

            let mut j = 10_000_000i64;
            if b < 0 {
                j = a.div_euclid(-b);
            }
            if d > 0 {
                j = j.min((-c).div_euclid(d));
            }
            pivk[i] = cyclic_mod(k1 as i64 + j, n);
        }
    }

    // make lon cyclically monotone so every start sees its global best
    let mut j = pivk[n - 1];
    lon[n - 1] = j;
    for i in (0..n - 1).rev() {
        if cyclic(i + 1, pivk[i], j) {
            j = pivk[i];
        }
        lon[i] = j;
    }
    for i in (0..n).rev() {
        if cyclic((i + 1) % n, j, lon[i]) {
            lon[i] = j;
        } else {
            break;
        }
    }

    lon
}

/// RMS orthogonal deviation of the contour points between `i` and `j` from
/// the chord through them, in O(1) from the prefix sums. `j` may exceed the
/// length to express wrap-around.
pub(crate) fn penalty3(pt: &[Point], sums: &[Sum], i: usize, j: usize) -> f64 {
    let n = pt.len();
    let (j, wrapped) = if j >= n { (j - n, true) } else { (j, false) };

    let (x, y, xy, x2, y2, k) = if !wrapped {
        (
            (sums[j + 1].x - sums[i].x) as f64,
            (sums[j + 1].y - sums[i].y) as f64,
            (sums[j + 1].xy - sums[i].xy) as f64,
            (sums[j + 1].x2 - sums[i].x2) as f64,
            (sums[j + 1].y2 - sums[i].y2) as f64,
            (j + 1 - i) as f64,
        )
    } else {
        (
            (sums[j + 1].x - sums[i].x + sums[n].x) as f64,
            (sums[j + 1].y - sums[i].y + sums[n].y) as f64,
            (sums[j + 1].xy - sums[i].xy + sums[n].xy) as f64,
            (sums[j + 1].x2 - sums[i].x2 + sums[n].x2) as f64,
            (sums[j + 1].y2 - sums[i].y2 + sums[n].y2) as f64,
            (j + 1 + n - i) as f64,
        )
    };

    let px = (pt[i].x + pt[j].x) as f64 / 2.0 - pt[0].x as f64;
    let py = (pt[i].y + pt[j].y) as f64 / 2.0 - pt[0].y as f64;
    let ey = (pt[j].x - pt[i].x) as f64;
    let ex = -((pt[j].y - pt[i].y) as f64);

    let a = (x2 - 2.0 * x * px) / k + px * px;
    let b = (xy - x * py - y * px) / k + px * py;
    let c = (y2 - 2.0 * y * py) / k + py * py;

    (ex * ex * a + 2.0 * ex * ey * b + ey * ey * c).sqrt()
}

/// Choose the optimal polygon `po` over the contour: minimal segment count
/// within the `lon` bounds, ties broken by cumulative `penalty3`.
///
/// Modeled as a shortest path on the cyclic DAG of admissible chords, run
/// in two passes over the segment-count bounds `seg0`/`seg1`.
pub(crate) fn best_polygon(pt: &[Point], sums: &[Sum], lon: &[usize]) -> Vec<usize> {
    let n = pt.len();
    let mut pen = vec![0f64; n + 1];
    let mut prev = vec![0usize; n + 1];
    let mut clip0 = vec![0usize; n];
    let mut clip1 = vec![0usize; n + 1];
    let mut seg0 = vec![0usize; n + 1];
    let mut seg1 = vec![0usize; n + 1];

    // clip0[i]: longest segment from i that stays within lon bounds
    for i in 0..n {
        let mut c = cyclic_mod(lon[cyclic_mod(i as i64 - 1, n)] as i64 - 1, n);
        if c == i {
            c = (i + 1) % n;
        }
        clip0[i] = if c < i { n } else { c };
    }

    // clip1[j]: the smallest i whose clip0 reaches at least j
    let mut j = 1usize;
    for i in 0..n {
        while j <= clip0[i] {
            clip1[j] = i;
            j += 1;
        }
    }

    // seg0[j]: greedy forward reach after j segments; m = minimal count
    let mut i = 0usize;
    let mut j = 0usize;
    while i < n {
        seg0[j] = i;
        i = clip0[i];
        j += 1;
    }
    seg0[j] = n;
    let m = j;

    // seg1[j]: backward reach, bounding where the j-th vertex may sit
    let mut i = n;
    for j in (1..=m).rev() {
        seg1[j] = i;
        i = clip1[i];
    }
    seg1[0] = 0;

    // second pass: among minimal-count chains, minimize total penalty
    pen[0] = 0.0;
    for j in 1..=m {
        for i in seg1[j]..=seg0[j] {
            let mut best = -1.0f64;
            for k in (clip1[i]..=seg0[j - 1]).rev() {
                let this_pen = penalty3(pt, sums, k, i) + pen[k];
                if best < 0.0 || this_pen < best {
                    prev[i] = k;
                    best = this_pen;
                }
            }
            pen[i] = best;
        }
    }

    let mut po = vec![0usize; m];
    let mut i = n;
    for j in (0..m).rev() {
        i = prev[i];
        po[j] = i;
    }
    po
}
