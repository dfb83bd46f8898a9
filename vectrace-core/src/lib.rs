//! # vectrace-core
//!
//! Raster-to-vector tracing: decomposes a thresholded bitmap into closed
//! contours, fits each contour with straight segments and cubic Beziers,
//! and emits the result as SVG paths. A posterizer runs the tracer at
//! several histogram-chosen thresholds and stacks the layers.

pub mod algorithms;
pub mod bitmap;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod histogram;
pub mod luminance;
pub mod params;
pub mod path;
pub mod posterizer;
pub mod potrace;
pub mod progress;
mod svg;

pub use bitmap::Bitmap;
pub use curve::{Curve, SegTag, Segment};
pub use error::{TraceError, TraceResult};
pub use geometry::{DPoint, Point};
pub use histogram::{Channel, Histogram, LevelStats};
pub use luminance::LuminanceData;
pub use params::{
    FillStrategy, Params, ParamsPatch, PosterizerParams, PosterizerParamsPatch,
    RangeDistribution, Steps, TurnPolicy, COLOR_AUTO, COLOR_TRANSPARENT, STEPS_AUTO,
    THRESHOLD_AUTO,
};
pub use path::{Sign, TracedPath};
pub use posterizer::{ColorStop, Posterizer};
pub use potrace::Potrace;
pub use progress::Progress;
