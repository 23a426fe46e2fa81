//! Spatial point and bounding box primitives

use nalgebra::{Point3, Vector3};
use rmoc_utils::{f, ValueExt};

/// A location in the global or a lattice-local coordinate frame
pub type Point = Point3<f64>;

/// Axis-aligned box bounding a spatial domain
///
/// Membership follows the same convention as the surface halfspace tie-break:
/// faces on the minimum side are inside the box, faces on the maximum side
/// are outside. An axis may be unbounded (`-inf`/`+inf`), which is how 2D
/// geometries treat z.
///
/// ```rust
/// # use rmoc_geometry::{BoundingBox, Point};
/// let bbox = BoundingBox::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0));
///
/// assert!(bbox.contains(&Point::new(0.0, 0.5, 0.5)));
/// assert!(!bbox.contains(&Point::new(1.0, 0.5, 0.5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Point,
    /// Maximum corner
    pub max: Point,
}

impl BoundingBox {
    /// Initialise from the minimum and maximum corners
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// True if the point is inside the box
    ///
    /// Closed on the minimum faces, open on the maximum faces.
    pub fn contains(&self, point: &Point) -> bool {
        (0..3).all(|a| point[a] >= self.min[a] && point[a] < self.max[a])
    }

    /// Midpoint of the box
    ///
    /// The centre of an unbounded axis is taken as 0.
    pub fn centre(&self) -> Point {
        let mut centre = Point::origin();
        for a in 0..3 {
            let extent = self.max[a] - self.min[a];
            if extent.is_finite() {
                centre[a] = self.min[a] + extent / 2.0;
            }
        }
        centre
    }

    /// Side length along each axis
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // sci() needs a finite value; unbounded axes print as inf
        let bound = |value: f64| {
            if value.is_finite() {
                value.sci(4, 2)
            } else {
                f!("{value}")
            }
        };
        let mut s = String::new();
        for (a, axis) in ['x', 'y', 'z'].into_iter().enumerate() {
            s += &f!("{axis}: {:>12} - {:>12}\n", bound(self.min[a]), bound(self.max[a]));
        }
        write!(f, "{}", s.trim_end())
    }
}
