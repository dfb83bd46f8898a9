//! The per-path tracing pipeline: jagged contour in, smooth curve out

use log::{debug, warn};

use crate::algorithms::opticurve::opti_curve;
use crate::algorithms::polygon::{best_polygon, calc_lon, calc_sums};
use crate::algorithms::smooth::smooth;
use crate::algorithms::vertices::adjust_vertices;
use crate::curve::Curve;
use crate::error::TraceError;
use crate::params::Params;
use crate::path::{Sign, TracedPath};
use crate::progress::Progress;

/// Run every decomposed path through polygon fitting, vertex adjustment,
/// smoothing and optional curve optimization.
///
/// Holes are reversed before smoothing so all emitted curves share one
/// winding. A failed optimization falls back to the unoptimized curve.
pub(crate) fn process_paths(
    paths: &[TracedPath],
    params: &Params,
    progress: &mut Progress<'_>,
) -> Vec<Curve> {
    let total = paths.len().max(1) as f64;
    let mut curves = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        let mut stage = progress.subrange(index as f64 / total, (index + 1) as f64 / total);

        let sums = calc_sums(&path.points);
        stage.report(0.2);

        let lon = calc_lon(&path.points);
        stage.report(0.4);

        let po = best_polygon(&path.points, &sums, &lon);
        stage.report(0.6);

        let mut vertices = adjust_vertices(&path.points, &sums, &po);
        if path.sign == Sign::Minus {
            vertices.reverse();
        }
        stage.report(0.8);

        let mut curve = smooth(vertices, params.alpha_max);

        if params.opt_curve {
            match opti_curve(&curve, params.opt_tolerance) {
                Some(optimized) => curve = optimized,
                None => warn!("path {index}: {}", TraceError::OptimizationIncomplete),
            }
        }
        stage.report(1.0);
        curves.push(curve);
    }

    debug!(
        "processed {} paths into {} curves",
        paths.len(),
        curves.len()
    );
    curves
}
