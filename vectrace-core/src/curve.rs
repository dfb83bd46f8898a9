//! Smoothed curves: per-segment corner/Bezier data

use crate::geometry::DPoint;

/// Segment classification after smoothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegTag {
    Corner,
    Curve,
}

/// One curve segment.
///
/// For `Corner`, `c[1]` is the corner vertex and `c[2]` the outgoing
/// endpoint (`c[0]` is unused). For `Curve`, `c[0]` and `c[1]` are the
/// Bezier control points and `c[2]` the endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub tag: SegTag,
    pub c: [DPoint; 3],
    pub vertex: DPoint,
    pub alpha: f64,
    pub alpha0: f64,
    pub beta: f64,
}

impl Segment {
    pub(crate) fn new(vertex: DPoint) -> Self {
        Self {
            tag: SegTag::Corner,
            c: [DPoint::default(); 3],
            vertex,
            alpha: 0.0,
            alpha0: 0.0,
            beta: 0.5,
        }
    }

    /// Endpoint of this segment (also the next segment's start point)
    pub fn endpoint(&self) -> DPoint {
        self.c[2]
    }
}

/// A closed sequence of segments tracing one contour
#[derive(Debug, Clone, Default)]
pub struct Curve {
    pub segments: Vec<Segment>,
}

impl Curve {
    pub(crate) fn with_vertices(vertices: Vec<DPoint>) -> Self {
        Self {
            segments: vertices.into_iter().map(Segment::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Start point of the closed curve: the final segment's endpoint
    pub fn start_point(&self) -> Option<DPoint> {
        self.segments.last().map(Segment::endpoint)
    }
}
