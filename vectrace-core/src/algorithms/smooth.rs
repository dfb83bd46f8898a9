//! Corner detection and Bezier smoothing of the refined polygon

use crate::curve::{Curve, SegTag};
use crate::geometry::{ddenom, dpara, interval, DPoint};

/// Build the smoothed curve over the refined vertices.
///
/// Each vertex triple yields a smoothing parameter `alpha`; at or above
/// `alpha_max` the middle vertex stays a corner, below it the segment
/// becomes a Bezier whose endpoint is the midpoint to the next vertex.
pub(crate) fn smooth(vertices: Vec<DPoint>, alpha_max: f64) -> Curve {
    let m = vertices.len();
    let mut curve = Curve::with_vertices(vertices);

    for i in 0..m {
        let j = (i + 1) % m;
        let k = (i + 2) % m;
        let vi = curve.segments[i].vertex;
        let vj = curve.segments[j].vertex;
        let vk = curve.segments[k].vertex;

        let p4 = interval(0.5, vk, vj);

        let denom = ddenom(vi, vk);
        let mut alpha = if denom != 0.0 {
            let dd = (dpara(vi, vj, vk) / denom).abs();
            let base = if dd > 1.0 { 1.0 - 1.0 / dd } else { 0.0 };
            base / 0.75
        } else {
            4.0 / 3.0
        };
        curve.segments[j].alpha0 = alpha;

        if alpha >= alpha_max {
            curve.segments[j].tag = SegTag::Corner;
            curve.segments[j].c[1] = vj;
            curve.segments[j].c[2] = p4;
        } else {
            alpha = alpha.clamp(0.55, 1.0);
            curve.segments[j].tag = SegTag::Curve;
            curve.segments[j].c = [
                interval(0.5 + 0.5 * alpha, vi, vj),
                interval(0.5 + 0.5 * alpha, vk, vj),
                p4,
            ];
        }
        curve.segments[j].alpha = alpha;
        curve.segments[j].beta = 0.5;
    }
    curve
}
