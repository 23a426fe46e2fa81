//! Universes: unordered collections of cells partitioning a domain

use crate::cell::CellId;

/// Arena index of a [Universe] registered with a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniverseId(pub(crate) usize);

impl UniverseId {
    /// Position in the geometry universe arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for UniverseId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A collection of cells whose regions partition the universe's domain
///
/// The contract, checked by [finalize()](crate::Geometry::finalize), is that
/// the cell regions cover the universe's addressable domain exactly once.
/// Cells are kept in declaration order: that order is the deterministic
/// iteration order everywhere, and the first-declared cell wins if a point
/// ever satisfies more than one region (a situation validation rejects).
///
/// ```rust
/// # use rmoc_geometry::{Cell, Geometry, MaterialId, Universe};
/// # let mut geometry = Geometry::new();
/// # let fuel = geometry.add_cell(Cell::named("fuel").fill_material(MaterialId(1))).unwrap();
/// # let moderator = geometry.add_cell(Cell::named("ring").fill_material(MaterialId(2))).unwrap();
/// let pin = Universe::named("UO2 pin").with_cell(fuel).with_cell(moderator);
/// assert_eq!(pin.cells().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    name: Option<String>,
    cells: Vec<CellId>,
}

impl Universe {
    /// A new empty universe
    pub fn new() -> Self {
        Self::default()
    }

    /// A new empty universe with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            cells: Vec::new(),
        }
    }

    /// Append a cell, builder style
    pub fn with_cell(mut self, cell: CellId) -> Self {
        self.cells.push(cell);
        self
    }

    /// Append a cell
    pub fn add_cell(&mut self, cell: CellId) {
        self.cells.push(cell);
    }

    /// Cells in declaration order
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// Optional name given at construction
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label, falling back to "unnamed" for anonymous universes
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "unnamed".to_string())
    }
}

impl std::fmt::Display for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} [{} cells]", self.label(), self.cells.len())
    }
}
