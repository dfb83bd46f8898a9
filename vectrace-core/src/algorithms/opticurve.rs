//! Merging adjacent Bezier segments under a deviation tolerance

use log::trace;

use crate::curve::{Curve, SegTag, Segment};
use crate::geometry::{
    bezier, cprod, ddist, dpara, interval, iprod, iprod1, sign_f64, tangent, DPoint,
};

// cos(179 degrees): spans bending back on themselves are never merged
const COS_179: f64 = -0.999_847_695_156;

// a merged segment may not bulge further than this overall alpha
const OPT_ALPHA_MAX: f64 = 4.0 / 3.0;

/// Candidate single Bezier replacing the span `(i, j)`
#[derive(Debug, Clone, Default)]
struct Opti {
    pen: f64,
    c: [DPoint; 2],
    t: f64,
    s: f64,
    alpha: f64,
}

/// Try to fit one cubic over the span `(i, j)`, returning its penalty data
/// or `None` when the span cannot be merged.
fn opti_penalty(
    curve: &Curve,
    i: usize,
    j: usize,
    opt_tolerance: f64,
    convc: &[i32],
    areac: &[f64],
) -> Option<Opti> {
    let m = curve.len();
    let vertex = |k: usize| curve.segments[k % m].vertex;
    let endpoint = |k: usize| curve.segments[k % m].c[2];

    if i == j {
        // a full loop is never a single segment
        return None;
    }

    // the whole span must be corner-free, consistently convex and must
    // never bend back by ~180 degrees
    let i1 = (i + 1) % m;
    let mut k = i;
    let mut k1 = (k + 1) % m;
    let conv = convc[k1];
    if conv == 0 {
        return None;
    }
    let d = ddist(vertex(i), vertex(i1));
    k = k1;
    while k != j {
        k1 = (k + 1) % m;
        let k2 = (k + 2) % m;
        if convc[k1] != conv {
            return None;
        }
        if sign_f64(cprod(vertex(i), vertex(i1), vertex(k1), vertex(k2))) != conv {
            return None;
        }
        if iprod1(vertex(i), vertex(i1), vertex(k1), vertex(k2))
            < d * ddist(vertex(k1), vertex(k2)) * COS_179
        {
            return None;
        }
        k = k1;
    }

    let p0 = endpoint(i);
    let mut p1 = vertex(i + 1);
    let mut p2 = vertex(j);
    let p3 = endpoint(j);

    // signed area between the span and its chord, from the prefix table
    let mut area = areac[j] - areac[i];
    area -= dpara(curve.segments[0].vertex, endpoint(i), endpoint(j)) / 2.0;
    if i >= j {
        area += areac[m];
    }

    // intersection o of p0p1 and p2p3: o = interval(t, p0, p1)
    // = interval(s, p3, p2); the candidate bulges through o by alpha
    let a1 = dpara(p0, p1, p2);
    let a2 = dpara(p0, p1, p3);
    let a3 = dpara(p0, p2, p3);
    let a4 = a1 + a3 - a2;

    if a2 == a1 {
        return None;
    }

    let t = a3 / (a3 - a4);
    let s = a2 / (a2 - a1);

    let a = a2 * t / 2.0;
    if a == 0.0 {
        return None;
    }

    let relative = area / a;
    let disc = 4.0 - relative / 0.3;
    if disc < 0.0 {
        return None;
    }
    let alpha = 2.0 - disc.sqrt();
    if !(0.0..=OPT_ALPHA_MAX).contains(&alpha) {
        return None;
    }

    let mut res = Opti {
        c: [interval(t * alpha, p0, p1), interval(s * alpha, p3, p2)],
        t,
        s,
        alpha,
        pen: 0.0,
    };

    p1 = res.c[0];
    p2 = res.c[1];

    // deviation at every original vertex tangency
    let mut k = (i + 1) % m;
    while k != j {
        let k1 = (k + 1) % m;
        let t = tangent(p0, p1, p2, p3, vertex(k), vertex(k1));
        if t < -0.5 {
            return None;
        }
        let pt = bezier(t, p0, p1, p2, p3);
        let d = ddist(vertex(k), vertex(k1));
        if d == 0.0 {
            return None;
        }
        let d1 = dpara(vertex(k), vertex(k1), pt) / d;
        if d1.abs() > opt_tolerance {
            return None;
        }
        if iprod(vertex(k), vertex(k1), pt) < 0.0 || iprod(vertex(k1), vertex(k), pt) < 0.0 {
            return None;
        }
        res.pen += d1 * d1;
        k = k1;
    }

    // deviation at every original segment endpoint
    let mut k = i;
    while k != j {
        let k1 = (k + 1) % m;
        let t = tangent(p0, p1, p2, p3, endpoint(k), endpoint(k1));
        if t < -0.5 {
            return None;
        }
        let pt = bezier(t, p0, p1, p2, p3);
        let d = ddist(endpoint(k), endpoint(k1));
        if d == 0.0 {
            return None;
        }
        let mut d1 = dpara(endpoint(k), endpoint(k1), pt) / d;
        let mut d2 = dpara(endpoint(k), endpoint(k1), vertex(k1)) / d;
        d2 *= 0.75 * curve.segments[k1 % m].alpha;
        if d2 < 0.0 {
            d1 = -d1;
            d2 = -d2;
        }
        if d1 < d2 - opt_tolerance {
            return None;
        }
        if d1 < d2 {
            res.pen += (d1 - d2) * (d1 - d2);
        }
        k = k1;
    }

    Some(res)
}

/// Merge runs of Bezier segments into single cubics wherever the merged
/// curve stays within `opt_tolerance` of the original, minimizing segment
/// count and then total penalty by dynamic programming.
///
/// Returns `None` when there is nothing to optimize; the caller keeps the
/// unoptimized curve.
pub(crate) fn opti_curve(curve: &Curve, opt_tolerance: f64) -> Option<Curve> {
    let m = curve.len();
    if m == 0 {
        return None;
    }

    // convexity class per segment; corners break every span
    let mut convc = vec![0i32; m];
    for i in 0..m {
        convc[i] = if curve.segments[i].tag == SegTag::Curve {
            sign_f64(dpara(
                curve.segments[(i + m - 1) % m].vertex,
                curve.segments[i].vertex,
                curve.segments[(i + 1) % m].vertex,
            ))
        } else {
            0
        };
    }

    // cumulative signed area relative to the start vertex
    let mut area = 0.0;
    let mut areac = vec![0.0; m + 1];
    let origin = curve.segments[0].vertex;
    for i in 0..m {
        let i1 = (i + 1) % m;
        if curve.segments[i1].tag == SegTag::Curve {
            let alpha = curve.segments[i1].alpha;
            area += 0.3
                * alpha
                * (4.0 - alpha)
                * dpara(
                    curve.segments[i].c[2],
                    curve.segments[i1].vertex,
                    curve.segments[i1].c[2],
                )
                / 2.0;
            area += dpara(origin, curve.segments[i].c[2], curve.segments[i1].c[2]) / 2.0;
        }
        areac[i + 1] = area;
    }

    // shortest-chain DP over span endpoints 0..m
    let mut pt = vec![-1i64; m + 1];
    let mut pen = vec![0f64; m + 1];
    let mut len = vec![0usize; m + 1];
    let mut opt: Vec<Option<Opti>> = vec![None; m + 1];

    for j in 1..=m {
        pt[j] = j as i64 - 1;
        pen[j] = pen[j - 1];
        len[j] = len[j - 1] + 1;

        for i in (0..j.saturating_sub(1)).rev() {
            let Some(o) = opti_penalty(curve, i, j % m, opt_tolerance, &convc, &areac) else {
                break;
            };
            if len[j] > len[i] + 1 || (len[j] == len[i] + 1 && pen[j] > pen[i] + o.pen) {
                pt[j] = i as i64;
                pen[j] = pen[i] + o.pen;
                len[j] = len[i] + 1;
                opt[j] = Some(o);
            }
        }
    }

    let om = len[m];
    if om == m {
        trace!("opticurve kept all {m} segments");
    }

    let mut segments = vec![Segment::new(DPoint::default()); om];
    let mut s = vec![0f64; om];
    let mut t = vec![0f64; om];

    let mut j = m as i64;
    for i in (0..om).rev() {
        let jm = (j as usize) % m;
        if pt[j as usize] == j - 1 {
            segments[i] = curve.segments[jm];
            s[i] = 1.0;
            t[i] = 1.0;
        } else {
            let o = opt[j as usize].as_ref()?;
            segments[i] = Segment::new(interval(o.s, curve.segments[jm].c[2], curve.segments[jm].vertex));
            segments[i].tag = SegTag::Curve;
            segments[i].c = [o.c[0], o.c[1], curve.segments[jm].c[2]];
            segments[i].alpha = o.alpha;
            segments[i].alpha0 = o.alpha;
            s[i] = o.s;
            t[i] = o.t;
        }
        j = pt[j as usize];
    }

    // re-parameterize beta over the merged segments
    for i in 0..om {
        let i1 = (i + 1) % om;
        let denom = s[i] + t[i1];
        segments[i].beta = if denom != 0.0 { s[i] / denom } else { 0.5 };
    }

    Some(Curve { segments })
}
