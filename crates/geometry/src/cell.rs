//! Cells: named regions with a material or nested fill

use crate::lattice::LatticeId;
use crate::point::Point;
use crate::region::Region;
use crate::surface::{Halfspace, Surface, SurfaceId};
use crate::universe::UniverseId;

/// Arena index of a [Cell] registered with a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) usize);

impl CellId {
    /// Position in the geometry cell arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Opaque handle to a material owned by the external materials collaborator
///
/// The geometry core never interprets this value; it only carries it through
/// to the flat region table so the transport solver can map regions to
/// cross sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// What a cell is filled with
///
/// Exactly one variant at a time; setting a new fill discards the previous
/// one. Nested fills recurse into the named universe or lattice during point
/// location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fill {
    /// Leaf cell containing a physical material
    Material(MaterialId),
    /// Cell filled by another universe, sharing the same coordinate frame
    Universe(UniverseId),
    /// Cell filled by a lattice, recursed into with a translated frame
    Lattice(LatticeId),
}

/// A named volume: one [Region] plus one [Fill]
///
/// ```rust
/// # use rmoc_geometry::{Cell, Fill, MaterialId};
/// // an unbounded reflector cell
/// let cell = Cell::named("moderator").fill_material(MaterialId(4));
///
/// assert_eq!(cell.fill(), Some(Fill::Material(MaterialId(4))));
/// assert!(cell.region().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    name: Option<String>,
    region: Region,
    fill: Option<Fill>,
}

impl Cell {
    /// A new unbounded, unfilled cell
    pub fn new() -> Self {
        Self::default()
    }

    /// A new unbounded, unfilled cell with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Replace the region wholesale
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Intersect the region with one more signed halfspace
    pub fn intersect(mut self, surface: SurfaceId, halfspace: Halfspace) -> Self {
        self.region = self.region.intersect(surface, halfspace);
        self
    }

    /// Fill with a material, discarding any previous fill
    pub fn fill_material(mut self, material: MaterialId) -> Self {
        self.fill = Some(Fill::Material(material));
        self
    }

    /// Fill with a universe, discarding any previous fill
    pub fn fill_universe(mut self, universe: UniverseId) -> Self {
        self.fill = Some(Fill::Universe(universe));
        self
    }

    /// Fill with a lattice, discarding any previous fill
    pub fn fill_lattice(mut self, lattice: LatticeId) -> Self {
        self.fill = Some(Fill::Lattice(lattice));
        self
    }

    pub(crate) fn set_fill(&mut self, fill: Fill) {
        self.fill = Some(fill);
    }

    /// Optional name given at construction
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The bounding region
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Current fill, `None` only before registration
    pub fn fill(&self) -> Option<Fill> {
        self.fill
    }

    /// Delegates to [Region::contains]
    pub fn contains(&self, surfaces: &[Surface], point: &Point) -> bool {
        self.region.contains(surfaces, point)
    }

    /// Display label, falling back to "unnamed" for anonymous cells
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "unnamed".to_string())
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let fill = match self.fill {
            Some(Fill::Material(m)) => format!("material {m}"),
            Some(Fill::Universe(u)) => format!("universe {u}"),
            Some(Fill::Lattice(l)) => format!("lattice {l}"),
            None => "no fill".to_string(),
        };
        write!(f, "{} [{} surfaces, {}]", self.label(), self.region.terms().len(), fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_replacement_is_exclusive() {
        let mut cell = Cell::named("pin").fill_material(MaterialId(1));
        assert_eq!(cell.fill(), Some(Fill::Material(MaterialId(1))));

        cell.set_fill(Fill::Universe(UniverseId(0)));
        assert_eq!(cell.fill(), Some(Fill::Universe(UniverseId(0))));
    }
}
