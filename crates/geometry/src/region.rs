//! Boolean intersections of signed surface halfspaces

use crate::surface::{Halfspace, Surface, SurfaceId};
use crate::point::Point;

/// A CSG primitive volume: the intersection of signed halfspaces
///
/// A region holds `(surface, required sign)` pairs in declaration order. A
/// point is inside the region iff it lies in the required halfspace of every
/// surface. The empty region contains every point, which is how unbounded
/// catch-all cells (reflectors, root cells of infinite 2D problems) are
/// expressed.
///
/// Surfaces are referenced by id, never owned, so many regions can share one
/// surface (e.g. every pin cell's moderator ring referencing the same fuel
/// cylinder).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    terms: Vec<(SurfaceId, Halfspace)>,
}

impl Region {
    /// An empty region, containing every point
    pub fn new() -> Self {
        Self::default()
    }

    /// Intersect with one more signed halfspace
    pub fn intersect(mut self, surface: SurfaceId, halfspace: Halfspace) -> Self {
        self.terms.push((surface, halfspace));
        self
    }

    /// The `(surface, required sign)` pairs in declaration order
    pub fn terms(&self) -> &[(SurfaceId, Halfspace)] {
        &self.terms
    }

    /// True for the catch-all region with no bounding surfaces
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// First surface required with both signs, if any
    ///
    /// Such a region is the empty set and is rejected at cell registration.
    pub(crate) fn contradiction(&self) -> Option<SurfaceId> {
        self.terms
            .iter()
            .find(|(surface, halfspace)| self.terms.contains(&(*surface, halfspace.other())))
            .map(|(surface, _)| *surface)
    }

    /// True iff the point satisfies every `(surface, sign)` pair
    ///
    /// `surfaces` is the arena the ids index into, i.e.
    /// [Geometry::surfaces](crate::Geometry::surfaces).
    pub fn contains(&self, surfaces: &[Surface], point: &Point) -> bool {
        self.terms
            .iter()
            .all(|(surface, halfspace)| surfaces[surface.index()].halfspace_of(point) == *halfspace)
    }
}
