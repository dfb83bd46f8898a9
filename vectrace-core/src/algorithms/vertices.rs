//! Sub-pixel refinement of the optimal polygon vertices

use nalgebra::{Matrix3, Vector3};

use crate::algorithms::polygon::Sum;
use crate::geometry::{cyclic_mod, DPoint, Point};

/// Least-squares line fit over the cyclic point range `[i, j]`: center of
/// mass and unit direction of the dominant axis. Indices may lie outside
/// `0..n`; each full wrap adds the totals once more.
fn pointslope(pt: &[Point], sums: &[Sum], mut i: i64, mut j: i64) -> (DPoint, DPoint) {
    let n = pt.len() as i64;
    let mut r = 0i64;

    while j >= n {
        j -= n;
        r += 1;
    }
    while i >= n {
        i -= n;
        r -= 1;
    }
    while j < 0 {
        j += n;
        r -= 1;
    }
    while i < 0 {
        i += n;
        r += 1;
    }
    let (iu, ju) = (i as usize, j as usize);
    let total = sums[n as usize];
    let rf = r as f64;

    let x = (sums[ju + 1].x - sums[iu].x) as f64 + rf * total.x as f64;
    let y = (sums[ju + 1].y - sums[iu].y) as f64 + rf * total.y as f64;
    let x2 = (sums[ju + 1].x2 - sums[iu].x2) as f64 + rf * total.x2 as f64;
    let xy = (sums[ju + 1].xy - sums[iu].xy) as f64 + rf * total.xy as f64;
    let y2 = (sums[ju + 1].y2 - sums[iu].y2) as f64 + rf * total.y2 as f64;
    let k = (j + 1 - i + r * n) as f64;

    let ctr = DPoint::new(x / k, y / k);

    let mut a = (x2 - x * x / k) / k;
    let b = (xy - x * y / k) / k;
    let mut c = (y2 - y * y / k) / k;

    // larger eigenvalue of the covariance matrix picks the dominant axis
    let lambda2 = (a + c + ((a - c) * (a - c) + 4.0 * b * b).sqrt()) / 2.0;
    a -= lambda2;
    c -= lambda2;

    let mut dir = DPoint::default();
    let l;
    if a.abs() >= c.abs() {
        l = (a * a + b * b).sqrt();
        if l != 0.0 {
            dir = DPoint::new(-b / l, a / l);
        }
    } else {
        l = (c * c + b * b).sqrt();
        if l != 0.0 {
            dir = DPoint::new(-c / l, b / l);
        }
    }
    (ctr, dir)
}

fn quadform(q: &Matrix3<f64>, w: DPoint) -> f64 {
    let v = [w.x, w.y, 1.0];
    let mut sum = 0.0;
    for (i, vi) in v.iter().enumerate() {
        for (j, vj) in v.iter().enumerate() {
            sum += vi * q[(i, j)] * vj;
        }
    }
    sum
}

/// Refine each polygon corner to the sub-pixel point minimizing the summed
/// squared distance to the two incident edges' fitted lines, constrained to
/// the closed unit square centered on the integer corner.
pub(crate) fn adjust_vertices(pt: &[Point], sums: &[Sum], po: &[usize]) -> Vec<DPoint> {
    let m = po.len();
    let n = pt.len();
    let x0 = pt[0].x as f64;
    let y0 = pt[0].y as f64;

    // fitted line per polygon edge
    let mut ctr = vec![DPoint::default(); m];
    let mut dir = vec![DPoint::default(); m];
    for i in 0..m {
        let j = po[(i + 1) % m];
        let j = cyclic_mod(j as i64 - po[i] as i64, n) + po[i];
        let (c, d) = pointslope(pt, sums, po[i] as i64, j as i64);
        ctr[i] = c;
        dir[i] = d;
    }

    // quadratic form measuring squared distance to each fitted line
    let mut q = vec![Matrix3::<f64>::zeros(); m];
    for i in 0..m {
        let d = dir[i].x * dir[i].x + dir[i].y * dir[i].y;
        if d != 0.0 {
            let v = Vector3::new(
                dir[i].y,
                -dir[i].x,
                dir[i].x * ctr[i].y - dir[i].y * ctr[i].x,
            );
            for l in 0..3 {
                for k in 0..3 {
                    q[i][(l, k)] = v[l] * v[k] / d;
                }
            }
        }
    }

    let mut vertices = Vec::with_capacity(m);
    for i in 0..m {
        // corner relative to the path origin
        let s = DPoint::new(pt[po[i]].x as f64 - x0, pt[po[i]].y as f64 - y0);
        let j = (i + m - 1) % m;
        let mut qq = q[j] + q[i];
        let mut w = DPoint::default();

        loop {
            let det = qq[(0, 0)] * qq[(1, 1)] - qq[(0, 1)] * qq[(1, 0)];
            if det != 0.0 {
                w = DPoint::new(
                    (-qq[(0, 2)] * qq[(1, 1)] + qq[(1, 2)] * qq[(0, 1)]) / det,
                    (qq[(0, 2)] * qq[(1, 0)] - qq[(1, 2)] * qq[(0, 0)]) / det,
                );
                break;
            }

            // singular: both lines are parallel; pin the free direction
            // through the corner and solve again
            let (vx, vy) = if qq[(0, 0)] > qq[(1, 1)] {
                (-qq[(0, 1)], qq[(0, 0)])
            } else if qq[(1, 1)] != 0.0 {
                (-qq[(1, 1)], qq[(1, 0)])
            } else {
                (1.0, 0.0)
            };
            let d = vx * vx + vy * vy;
            let v = Vector3::new(vx, vy, -vy * s.y - vx * s.x);
            for l in 0..3 {
                for k in 0..3 {
                    qq[(l, k)] += v[l] * v[k] / d;
                }
            }
        }

        let dx = (w.x - s.x).abs();
        let dy = (w.y - s.y).abs();
        if dx <= 0.5 && dy <= 0.5 {
            vertices.push(DPoint::new(w.x + x0, w.y + y0));
            continue;
        }

        // unconstrained minimum escaped the unit square: take the best of
        // the four edge minimizers and four corners
        let mut min = quadform(&qq, s);
        let mut xmin = s.x;
        let mut ymin = s.y;

        if qq[(0, 0)] != 0.0 {
            for z in 0..2 {
                let wy = s.y - 0.5 + z as f64;
                let wx = -(qq[(0, 1)] * wy + qq[(0, 2)]) / qq[(0, 0)];
                let cand = quadform(&qq, DPoint::new(wx, wy));
                if (wx - s.x).abs() <= 0.5 && cand < min {
                    min = cand;
                    xmin = wx;
                    ymin = wy;
                }
            }
        }

        if qq[(1, 1)] != 0.0 {
            for z in 0..2 {
                let wx = s.x - 0.5 + z as f64;
                let wy = -(qq[(1, 0)] * wx + qq[(1, 2)]) / qq[(1, 1)];
                let cand = quadform(&qq, DPoint::new(wx, wy));
                if (wy - s.y).abs() <= 0.5 && cand < min {
                    min = cand;
                    xmin = wx;
                    ymin = wy;
                }
            }
        }

        for l in 0..2 {
            for k in 0..2 {
                let cand_p = DPoint::new(s.x - 0.5 + l as f64, s.y - 0.5 + k as f64);
                let cand = quadform(&qq, cand_p);
                if cand < min {
                    min = cand;
                    xmin = cand_p.x;
                    ymin = cand_p.y;
                }
            }
        }

        vertices.push(DPoint::new(xmin + x0, ymin + y0));
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::decompose::test_support::trace_single_region;
    use crate::algorithms::polygon::{best_polygon, calc_lon, calc_sums};

    fn fit(rows: &[&str]) -> (Vec<Point>, Vec<usize>, Vec<DPoint>) {
        let pt = trace_single_region(rows);
        let sums = calc_sums(&pt);
        let lon = calc_lon(&pt);
        let po = best_polygon(&pt, &sums, &lon);
        let vertices = adjust_vertices(&pt, &sums, &po);
        (pt, po, vertices)
    }

    #[test]
    fn test_square_vertices_land_on_corners() {
        let (_, po, vertices) = fit(&["#####", "#####", "#####", "#####", "#####"]);
        assert_eq!(vertices.len(), po.len());
        let expected = [(0.0, 0.0), (0.0, 5.0), (5.0, 5.0), (5.0, 0.0)];
        for corner in expected {
            assert!(
                vertices
                    .iter()
                    .any(|v| (v.x - corner.0).abs() < 1e-9 && (v.y - corner.1).abs() < 1e-9),
                "missing corner {corner:?} in {vertices:?}"
            );
        }
    }

    #[test]
    fn test_vertices_stay_in_unit_squares() {
        let (pt, po, vertices) = fit(&[
            "..####..",
            ".######.",
            "########",
            "########",
            ".######.",
            "..####..",
        ]);
        for (k, v) in vertices.iter().enumerate() {
            let corner = pt[po[k]];
            assert!(
                (v.x - corner.x as f64).abs() <= 0.5 + 1e-9
                    && (v.y - corner.y as f64).abs() <= 0.5 + 1e-9,
                "vertex {v:?} escapes unit square around {corner:?}"
            );
        }
    }

    #[test]
    fn test_pointslope_on_axis_run() {
        let pt = trace_single_region(&["#####", "#####", "#####", "#####", "#####"]);
        let sums = calc_sums(&pt);
        // left edge points 0..=5 lie on x = 0
        let (ctr, dir) = pointslope(&pt, &sums, 0, 5);
        assert!(ctr.x.abs() < 1e-9);
        assert!(dir.x.abs() < 1e-9);
        assert!((dir.y.abs() - 1.0).abs() < 1e-9);
    }
}
