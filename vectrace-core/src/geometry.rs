//! Integer and floating point geometry primitives shared by the fitting stages

use serde::{Deserialize, Serialize};

/// Pixel-edge coordinate on the integer lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Double precision point used for control points and smoothed geometry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DPoint {
    pub x: f64,
    pub y: f64,
}

impl DPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for DPoint {
    fn from(p: Point) -> Self {
        DPoint::new(p.x as f64, p.y as f64)
    }
}

/// Euclidean remainder, safe for negative indices into cyclic arrays
pub fn cyclic_mod(a: i64, n: usize) -> usize {
    debug_assert!(n > 0);
    a.rem_euclid(n as i64) as usize
}

/// True iff `b` lies in the cyclic half-open interval `[a, c)` modulo the array length
pub fn cyclic(a: usize, b: usize, c: usize) -> bool {
    if a <= c {
        a <= b && b < c
    } else {
        a <= b || b < c
    }
}

pub fn sign_i64(v: i64) -> i32 {
    match v.cmp(&0) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

pub fn sign_f64(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Integer cross product of two displacement vectors
pub fn xprod(p1: Point, p2: Point) -> i64 {
    p1.x as i64 * p2.y as i64 - p1.y as i64 * p2.x as i64
}

/// Twice the signed area of the triangle (p0, p1, p2)
pub fn dpara(p0: DPoint, p1: DPoint, p2: DPoint) -> f64 {
    let x1 = p1.x - p0.x;
    let y1 = p1.y - p0.y;
    let x2 = p2.x - p0.x;
    let y2 = p2.y - p0.y;
    x1 * y2 - x2 * y1
}

/// Cross product (p1 - p0) x (p3 - p2)
pub fn cprod(p0: DPoint, p1: DPoint, p2: DPoint, p3: DPoint) -> f64 {
    let x1 = p1.x - p0.x;
    let y1 = p1.y - p0.y;
    let x2 = p3.x - p2.x;
    let y2 = p3.y - p2.y;
    x1 * y2 - x2 * y1
}

/// Inner product (p1 - p0) . (p2 - p0)
pub fn iprod(p0: DPoint, p1: DPoint, p2: DPoint) -> f64 {
    let x1 = p1.x - p0.x;
    let y1 = p1.y - p0.y;
    let x2 = p2.x - p0.x;
    let y2 = p2.y - p0.y;
    x1 * x2 + y1 * y2
}

/// Inner product (p1 - p0) . (p3 - p2)
pub fn iprod1(p0: DPoint, p1: DPoint, p2: DPoint, p3: DPoint) -> f64 {
    let x1 = p1.x - p0.x;
    let y1 = p1.y - p0.y;
    let x2 = p3.x - p2.x;
    let y2 = p3.y - p2.y;
    x1 * x2 + y1 * y2
}

/// Euclidean distance between p and q
pub fn ddist(p: DPoint, q: DPoint) -> f64 {
    ((p.x - q.x) * (p.x - q.x) + (p.y - q.y) * (p.y - q.y)).sqrt()
}

/// Orthogonal direction quantized to the 8-neighborhood, used by `ddenom`
fn dorth_infty(p0: DPoint, p2: DPoint) -> Point {
    Point::new(-sign_f64(p2.y - p0.y), sign_f64(p2.x - p0.x))
}

/// Area-based denominator for the smoothing parameter: |p2 - p0| measured
/// against the l-infinity orthogonal direction
pub fn ddenom(p0: DPoint, p2: DPoint) -> f64 {
    let r = dorth_infty(p0, p2);
    r.y as f64 * (p2.x - p0.x) - r.x as f64 * (p2.y - p0.y)
}

/// Linear interpolation: a + lambda * (b - a)
pub fn interval(lambda: f64, a: DPoint, b: DPoint) -> DPoint {
    DPoint::new(a.x + lambda * (b.x - a.x), a.y + lambda * (b.y - a.y))
}

/// Point on the cubic Bezier (p0, p1, p2, p3) at parameter t
pub fn bezier(t: f64, p0: DPoint, p1: DPoint, p2: DPoint, p3: DPoint) -> DPoint {
    let s = 1.0 - t;
    // Horner-free form keeps this readable; the compiler folds the powers.
    DPoint::new(
        s * s * s * p0.x + 3.0 * (s * s * t) * p1.x + 3.0 * (t * t * s) * p2.x + t * t * t * p3.x,
        s * s * s * p0.y + 3.0 * (s * s * t) * p1.y + 3.0 * (t * t * s) * p2.y + t * t * t * p3.y,
    )
}

/// Parameter t in [0, 1] where the Bezier (p0..p3) is tangent to the
/// direction q1 - q0, or -1.0 when no such parameter exists
pub fn tangent(p0: DPoint, p1: DPoint, p2: DPoint, p3: DPoint, q0: DPoint, q1: DPoint) -> f64 {
    // (1-t)^2 A + 2(1-t)t B + t^2 C = 0, rewritten as a quadratic in t
    let a_cross = cprod(p0, p1, q0, q1);
    let b_cross = cprod(p1, p2, q0, q1);
    let c_cross = cprod(p2, p3, q0, q1);

    let a = a_cross - 2.0 * b_cross + c_cross;
    let b = -2.0 * a_cross + 2.0 * b_cross;
    let c = a_cross;

    let d = b * b - 4.0 * a * c;
    if a == 0.0 || d < 0.0 {
        return -1.0;
    }

    let s = d.sqrt();
    let r1 = (-b + s) / (2.0 * a);
    let r2 = (-b - s) / (2.0 * a);

    if (0.0..=1.0).contains(&r1) {
        r1
    } else if (0.0..=1.0).contains(&r2) {
        r2
    } else {
        -1.0
    }
}
