//! CSG geometry core for reactor core modelling
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod cell;
mod error;
mod geometry;
mod lattice;
mod point;
mod region;
mod surface;
mod universe;

// inline the geometry-related modules for a nice public API
#[doc(inline)]
pub use cell::{Cell, CellId, Fill, MaterialId};

#[doc(inline)]
pub use geometry::{FlatRegion, FlatRegionId, Geometry, PathStep};

#[doc(inline)]
pub use lattice::{Lattice, LatticeId};

#[doc(inline)]
pub use point::{BoundingBox, Point};

#[doc(inline)]
pub use region::Region;

#[doc(inline)]
pub use surface::{BoundaryType, Halfspace, Surface, SurfaceId, SurfaceKind};

#[doc(inline)]
pub use universe::{Universe, UniverseId};

#[doc(inline)]
pub use error::{Error, Result};
