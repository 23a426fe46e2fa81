//! Result and Error types for rmoc-geometry

use crate::cell::CellId;
use crate::lattice::LatticeId;
use crate::surface::SurfaceId;
use crate::universe::UniverseId;

/// Type alias for `Result<T, geometry::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `rmoc-geometry` crate
///
/// Variants fall into three families. Construction errors are raised
/// immediately by the offending `add_*`/`set_*` call. Validation errors are
/// raised only by [finalize()](crate::Geometry::finalize), which fails
/// atomically. Query errors are raised by the point lookups on a finalised
/// geometry.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    // --- construction ---
    #[error("surface {surface} required with both signs in region of cell \"{cell}\"")]
    ContradictorySurface { cell: String, surface: SurfaceId },

    #[error("cell \"{0}\" has no fill")]
    CellWithoutFill(String),

    #[error("lattice \"{lattice}\" slot ({i}, {j}, {k}) has no universe")]
    IncompleteLattice {
        lattice: String,
        i: usize,
        j: usize,
        k: usize,
    },

    #[error("lattice \"{0}\" has no slots")]
    EmptyLattice(String),

    #[error("lattice \"{lattice}\" pitch must be positive (found {pitch} on the {axis} axis)")]
    InvalidPitch {
        lattice: String,
        axis: char,
        pitch: f64,
    },

    #[error("lattice \"{lattice}\" template does not match shape ({nx}, {ny}, {nz})")]
    TemplateShapeMismatch {
        lattice: String,
        nx: usize,
        ny: usize,
        nz: usize,
    },

    #[error("surface radius must be positive and finite (found {0})")]
    InvalidRadius(f64),

    #[error("surface coefficient must be finite (found {0})")]
    InvalidCoefficient(f64),

    #[error("surface {0} is referenced by a cell and is sealed against changes")]
    SealedSurface(SurfaceId),

    #[error("surface {0} not found")]
    UnknownSurface(SurfaceId),

    #[error("cell {0} not found")]
    UnknownCell(CellId),

    #[error("universe {0} not found")]
    UnknownUniverse(UniverseId),

    #[error("lattice {0} not found")]
    UnknownLattice(LatticeId),

    #[error("no root universe has been set")]
    NoRootUniverse,

    #[error("geometry is finalised and can no longer be modified")]
    AlreadyFinalised,

    // --- validation ---
    #[error("universe \"{0}\" transitively fills itself")]
    FillCycle(String),

    #[error("universe/lattice nesting exceeds the maximum depth of {limit}")]
    NestingTooDeep { limit: usize },

    #[error("no cell of universe \"{universe}\" contains sample point ({x}, {y}, {z})")]
    CoverageGap {
        universe: String,
        x: f64,
        y: f64,
        z: f64,
    },

    #[error("cells \"{first}\" and \"{second}\" of universe \"{universe}\" overlap at ({x}, {y}, {z})")]
    CellOverlap {
        universe: String,
        first: String,
        second: String,
        x: f64,
        y: f64,
        z: f64,
    },

    #[error("root universe is unbounded along the {0} axis")]
    UnboundedRoot(char),

    // --- query ---
    #[error("geometry must be finalised before point queries")]
    NotFinalised,

    #[error("point ({x}, {y}, {z}) is outside the outer boundary")]
    PointOutsideDomain { x: f64, y: f64, z: f64 },

    #[error("no cell of universe \"{universe}\" contains in-domain point ({x}, {y}, {z})")]
    PointUnmatched {
        universe: String,
        x: f64,
        y: f64,
        z: f64,
    },

    #[error("index {index} out of range on the {axis} axis of lattice \"{lattice}\" ({extent} cells)")]
    LatticeIndexOutOfRange {
        lattice: String,
        axis: char,
        index: i64,
        extent: usize,
    },

    /// A catch-all for lookups that a validated geometry should never miss
    #[error("flat region table has no entry for a validated path")]
    MissingFlatRegion,
}
