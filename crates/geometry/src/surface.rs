//! Implicit analytic surfaces and signed halfspaces

use crate::point::Point;

/// Arena index of a [Surface] registered with a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) usize);

impl SurfaceId {
    /// Position in the geometry surface arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The side of a surface a point falls on
///
/// The sign of [Surface::evaluate] decides the halfspace, with the zero case
/// pinned to [Halfspace::Positive] (see [Surface::halfspace_of]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Halfspace {
    /// `evaluate(point) < 0`
    Negative,
    /// `evaluate(point) >= 0`
    Positive,
}

impl Halfspace {
    /// The opposite side
    pub fn other(&self) -> Self {
        match self {
            Halfspace::Negative => Halfspace::Positive,
            Halfspace::Positive => Halfspace::Negative,
        }
    }
}

impl std::fmt::Display for Halfspace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Halfspace::Negative => write!(f, "-"),
            Halfspace::Positive => write!(f, "+"),
        }
    }
}

/// Physical treatment of a domain-bounding surface
///
/// Consumed by the boundary-crossing logic of the transport collaborator.
/// Only meaningful on surfaces that bound the outer domain; everything else
/// keeps the [BoundaryType::Interior] default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryType {
    /// Not a domain boundary
    #[default]
    Interior,
    /// Particles crossing the surface are lost
    Vacuum,
    /// Particles are reflected back into the domain
    Reflective,
    /// Particles re-enter from the opposite face
    Periodic,
}

/// Analytic kind and coefficients of a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    /// Plane perpendicular to the x axis at `x`
    XPlane { x: f64 },
    /// Plane perpendicular to the y axis at `y`
    YPlane { y: f64 },
    /// Plane perpendicular to the z axis at `z`
    ZPlane { z: f64 },
    /// Infinite cylinder parallel to the z axis
    ZCylinder { x: f64, y: f64, radius: f64 },
}

/// An implicit analytic boundary partitioning space into two halfspaces
///
/// Construction is by named kind, mirroring the classic reactor modelling
/// surface cards, with optional name and boundary condition tags:
///
/// ```rust
/// # use rmoc_geometry::{BoundaryType, Surface};
/// let xmin = Surface::x_plane(-32.13)
///     .named("xmin")
///     .with_boundary(BoundaryType::Reflective);
///
/// let fuel = Surface::z_cylinder(0.0, 0.0, 0.54).named("fuel radius");
/// ```
///
/// A surface is sealed once any cell references it: geometries refuse to
/// change its boundary condition afterwards, so shared surfaces cannot be
/// mutated behind the back of the regions using them.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    name: Option<String>,
    kind: SurfaceKind,
    boundary: BoundaryType,
}

impl Surface {
    /// Plane perpendicular to the x axis
    pub fn x_plane(x: f64) -> Self {
        Self::from_kind(SurfaceKind::XPlane { x })
    }

    /// Plane perpendicular to the y axis
    pub fn y_plane(y: f64) -> Self {
        Self::from_kind(SurfaceKind::YPlane { y })
    }

    /// Plane perpendicular to the z axis
    pub fn z_plane(z: f64) -> Self {
        Self::from_kind(SurfaceKind::ZPlane { z })
    }

    /// Infinite cylinder parallel to the z axis, centred at `(x, y)`
    ///
    /// This is the circle of 2D geometries; in 3D it extends over all z.
    pub fn z_cylinder(x: f64, y: f64, radius: f64) -> Self {
        Self::from_kind(SurfaceKind::ZCylinder { x, y, radius })
    }

    fn from_kind(kind: SurfaceKind) -> Self {
        Self {
            name: None,
            kind,
            boundary: BoundaryType::default(),
        }
    }

    /// Attach a human-readable name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tag with a boundary condition
    pub fn with_boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = boundary;
        self
    }

    /// Optional name given at construction
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Analytic kind and coefficients
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Boundary condition tag
    pub fn boundary(&self) -> BoundaryType {
        self.boundary
    }

    pub(crate) fn set_boundary(&mut self, boundary: BoundaryType) {
        self.boundary = boundary;
    }

    /// Signed evaluation of the surface equation at a point
    ///
    /// Planes return the signed distance along their axis from the plane
    /// offset. The cylinder returns the squared radial distance minus the
    /// radius squared, projected onto the xy plane. Either way the sign
    /// decides the halfspace and zero is the surface itself.
    ///
    /// ```rust
    /// # use rmoc_geometry::{Point, Surface};
    /// let plane = Surface::x_plane(2.0);
    /// assert_eq!(plane.evaluate(&Point::new(3.5, 0.0, 0.0)), 1.5);
    ///
    /// let cylinder = Surface::z_cylinder(0.0, 0.0, 2.0);
    /// assert_eq!(cylinder.evaluate(&Point::new(0.0, 0.0, 9.9)), -4.0);
    /// ```
    pub fn evaluate(&self, point: &Point) -> f64 {
        match self.kind {
            SurfaceKind::XPlane { x } => point.x - x,
            SurfaceKind::YPlane { y } => point.y - y,
            SurfaceKind::ZPlane { z } => point.z - z,
            SurfaceKind::ZCylinder { x, y, radius } => {
                let dx = point.x - x;
                let dy = point.y - y;
                dx * dx + dy * dy - radius * radius
            }
        }
    }

    /// Which halfspace the point occupies
    ///
    /// Tie-break: a point exactly on the surface (`evaluate == 0`) belongs to
    /// the **positive** halfspace, always. This makes regions closed on
    /// surfaces they require positive and open on surfaces they require
    /// negative, and it is the single rule the rest of the crate builds on.
    ///
    /// ```rust
    /// # use rmoc_geometry::{Halfspace, Point, Surface};
    /// let plane = Surface::y_plane(1.0);
    /// assert_eq!(plane.halfspace_of(&Point::new(0.0, 0.5, 0.0)), Halfspace::Negative);
    /// assert_eq!(plane.halfspace_of(&Point::new(0.0, 1.0, 0.0)), Halfspace::Positive);
    /// assert_eq!(plane.halfspace_of(&Point::new(0.0, 1.5, 0.0)), Halfspace::Positive);
    /// ```
    pub fn halfspace_of(&self, point: &Point) -> Halfspace {
        if self.evaluate(point) >= 0.0 {
            Halfspace::Positive
        } else {
            Halfspace::Negative
        }
    }

    /// Display label, falling back to the kind for unnamed surfaces
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{:?}", self.kind),
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} [{:?}]", self.label(), self.boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_signed_distance() {
        let plane = Surface::z_plane(-3.0);
        assert_eq!(plane.evaluate(&Point::new(0.0, 0.0, -4.0)), -1.0);
        assert_eq!(plane.evaluate(&Point::new(0.0, 0.0, -3.0)), 0.0);
        assert_eq!(plane.evaluate(&Point::new(100.0, -5.0, 0.0)), 3.0);
    }

    #[test]
    fn cylinder_ignores_z() {
        let cylinder = Surface::z_cylinder(1.0, 0.0, 0.5);
        for z in [-10.0, 0.0, 7.5] {
            assert_eq!(cylinder.evaluate(&Point::new(1.0, 0.0, z)), -0.25);
            assert_eq!(
                cylinder.halfspace_of(&Point::new(1.5, 0.0, z)),
                Halfspace::Positive
            );
        }
    }

    #[test]
    fn tie_break_is_positive_and_deterministic() {
        let surfaces = [
            Surface::x_plane(0.25),
            Surface::z_cylinder(0.0, 0.0, 0.25),
        ];
        let on_both = Point::new(0.25, 0.0, 0.0);
        for surface in &surfaces {
            assert_eq!(surface.evaluate(&on_both), 0.0);
            for _ in 0..10 {
                assert_eq!(surface.halfspace_of(&on_both), Halfspace::Positive);
            }
        }
    }
}
