//! Jagged contour paths produced by bitmap decomposition

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Contour orientation: `Plus` encloses foreground, `Minus` is a hole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn as_char(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        }
    }
}

/// A closed polyline of pixel-edge points bounding one connected region.
///
/// Successive points differ by a unit step in a cardinal direction and the
/// sequence closes back at the start. Containment is stored as child
/// indices into the owning path vector; paths never point back at their
/// parent.
#[derive(Debug, Clone)]
pub struct TracedPath {
    pub points: Vec<Point>,
    pub area: i64,
    pub sign: Sign,
    pub min: Point,
    pub max: Point,
    pub children: Vec<usize>,
}

impl TracedPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed shoelace area of the jagged polygon, in pixels.
    ///
    /// The tracer walks every contour with the same handedness, so this is
    /// non-negative for traced paths regardless of sign.
    pub fn polygon_area(&self) -> i64 {
        let n = self.points.len();
        let mut area = 0i64;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
        }
        -area / 2
    }

    /// Even-odd test for a half-integer probe point `(px + 0.5, py + 0.5)`.
    ///
    /// Probing at pixel centers keeps the ray strictly between lattice rows,
    /// so no crossing can pass through a vertex.
    pub fn contains_pixel(&self, px: i32, py: i32) -> bool {
        if px < self.min.x - 1 || px >= self.max.x || py < self.min.y - 1 || py >= self.max.y {
            return false;
        }
        let n = self.points.len();
        let mut inside = false;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            if a.x == b.x {
                // vertical unit edge spanning [min(ay,by), min+1]
                let edge_y = a.y.min(b.y);
                if edge_y == py && a.x > px {
                    inside = !inside;
                }
            }
        }
        inside
    }
}
