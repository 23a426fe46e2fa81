//! Structured rectilinear lattices of repeated universes

use crate::error::{Error, Result};
use crate::point::{BoundingBox, Point};
use crate::universe::UniverseId;

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Arena index of a [Lattice] registered with a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticeId(pub(crate) usize);

impl LatticeId {
    /// Position in the geometry lattice arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for LatticeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// A rectilinear grid of universes, each slot a fixed-size box
///
/// Lattices give O(1) point lookup over regular repetition, instead of the
/// linear cell scan an unstructured universe needs for the same layout. The
/// grid is `(nx, ny, nz)` slots of pitch `(wx, wy, wz)`, centred on the
/// origin of the parent cell's frame unless a lower-left corner is set
/// explicitly.
///
/// Each slot's universe sees coordinates relative to the slot **centre**, so
/// a pin universe modelled about its own origin drops into any slot
/// unchanged.
///
/// Slot templates are given the way a core map is drawn on paper: rows run
/// top (highest y) to bottom, and 3D layers run top (highest z) to bottom.
///
/// ```rust
/// # use rmoc_geometry::{Cell, Geometry, Lattice, MaterialId, Universe};
/// # let mut geometry = Geometry::new();
/// # let cell = geometry.add_cell(Cell::named("water").fill_material(MaterialId(1))).unwrap();
/// # let a = geometry.add_universe(Universe::named("a").with_cell(cell)).unwrap();
/// # let b = geometry.add_universe(Universe::named("b").with_cell(cell)).unwrap();
/// let mut lattice = Lattice::new_2d(2, 2, 1.26, 1.26).named("checkerboard");
/// lattice.set_universes(&[
///     vec![a, b], // top row, j = 1
///     vec![b, a], // bottom row, j = 0
/// ])?;
/// assert_eq!(lattice.universe_at(0, 0, 0), Some(b));
/// assert_eq!(lattice.universe_at(1, 1, 0), Some(b));
/// # Ok::<(), rmoc_geometry::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    name: Option<String>,
    shape: [usize; 3],
    pitch: [f64; 3],
    lower_left: Point,
    universes: Vec<Option<UniverseId>>,
}

impl Lattice {
    /// A 3D lattice of `nx * ny * nz` slots with pitches `(wx, wy, wz)`
    ///
    /// Centred on the origin of the frame it is placed in.
    pub fn new(nx: usize, ny: usize, nz: usize, wx: f64, wy: f64, wz: f64) -> Self {
        let lower_left = Point::new(
            -(nx as f64) * wx / 2.0,
            -(ny as f64) * wy / 2.0,
            -(nz as f64) * wz / 2.0,
        );
        Self {
            name: None,
            shape: [nx, ny, nz],
            pitch: [wx, wy, wz],
            lower_left,
            universes: vec![None; nx * ny * nz],
        }
    }

    /// A degenerate 2D lattice: `nz = 1` and the z axis unbounded
    ///
    /// Points pass their z coordinate through to the slot universes
    /// unchanged.
    pub fn new_2d(nx: usize, ny: usize, wx: f64, wy: f64) -> Self {
        let mut lattice = Self::new(nx, ny, 1, wx, wy, f64::INFINITY);
        lattice.lower_left.z = f64::NEG_INFINITY;
        lattice
    }

    /// Attach a human-readable name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Move the lattice so its lower-left corner sits at `corner`
    ///
    /// Overrides the default origin-centred placement.
    pub fn with_lower_left(mut self, corner: Point) -> Self {
        self.lower_left = corner;
        self
    }

    /// Slot counts `(nx, ny, nz)`
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Slot pitches `(wx, wy, wz)`
    pub fn pitch(&self) -> [f64; 3] {
        self.pitch
    }

    /// Lower-left corner of slot `(0, 0, 0)`
    pub fn lower_left(&self) -> Point {
        self.lower_left
    }

    /// Optional name given at construction
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label, falling back to "unnamed" for anonymous lattices
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "unnamed".to_string())
    }

    // row-major storage, i fastest
    fn slot(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.shape[1] + j) * self.shape[0] + i
    }

    /// Assign one slot by ascending `(i, j, k)` index
    pub fn set_universe(&mut self, i: usize, j: usize, k: usize, universe: UniverseId) -> Result<()> {
        let [nx, ny, nz] = self.shape;
        if i >= nx || j >= ny || k >= nz {
            return Err(Error::TemplateShapeMismatch {
                lattice: self.label(),
                nx,
                ny,
                nz,
            });
        }
        let slot = self.slot(i, j, k);
        self.universes[slot] = Some(universe);
        Ok(())
    }

    /// Fill a 2D lattice from a row template
    ///
    /// `rows` are ordered top to bottom, as a core map is drawn: `rows[0]` is
    /// the row at the highest y. Requires `nz == 1`.
    pub fn set_universes(&mut self, rows: &[Vec<UniverseId>]) -> Result<()> {
        let [nx, ny, nz] = self.shape;
        if nz != 1 || rows.len() != ny || rows.iter().any(|row| row.len() != nx) {
            return Err(Error::TemplateShapeMismatch {
                lattice: self.label(),
                nx,
                ny,
                nz,
            });
        }
        for (row, universes) in rows.iter().enumerate() {
            let j = ny - 1 - row;
            for (i, &universe) in universes.iter().enumerate() {
                let slot = self.slot(i, j, 0);
                self.universes[slot] = Some(universe);
            }
        }
        Ok(())
    }

    /// Fill a 3D lattice from a layer template
    ///
    /// `layers[0]` is the layer at the highest z, and each layer is a row
    /// template as for [set_universes](Lattice::set_universes).
    pub fn set_universes_3d(&mut self, layers: &[Vec<Vec<UniverseId>>]) -> Result<()> {
        let [nx, ny, nz] = self.shape;
        let layers_ok = layers.len() == nz
            && layers
                .iter()
                .all(|rows| rows.len() == ny && rows.iter().all(|row| row.len() == nx));
        if !layers_ok {
            return Err(Error::TemplateShapeMismatch {
                lattice: self.label(),
                nx,
                ny,
                nz,
            });
        }
        for (layer, rows) in layers.iter().enumerate() {
            let k = nz - 1 - layer;
            for (row, universes) in rows.iter().enumerate() {
                let j = ny - 1 - row;
                for (i, &universe) in universes.iter().enumerate() {
                    let slot = self.slot(i, j, k);
                    self.universes[slot] = Some(universe);
                }
            }
        }
        Ok(())
    }

    /// Universe in slot `(i, j, k)`, if assigned
    pub fn universe_at(&self, i: usize, j: usize, k: usize) -> Option<UniverseId> {
        let [nx, ny, nz] = self.shape;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        self.universes[self.slot(i, j, k)]
    }

    /// First unassigned slot, scanning in storage order
    pub(crate) fn first_missing_slot(&self) -> Option<[usize; 3]> {
        let [nx, ny, _] = self.shape;
        self.universes.iter().position(|slot| slot.is_none()).map(|index| {
            let i = index % nx;
            let j = (index / nx) % ny;
            let k = index / (nx * ny);
            [i, j, k]
        })
    }

    /// Every assigned slot universe, in storage order, duplicates included
    pub(crate) fn slot_universes(&self) -> impl Iterator<Item = UniverseId> + '_ {
        self.universes.iter().flatten().copied()
    }

    fn axis_index(&self, axis: usize, value: f64) -> Result<usize> {
        let extent = self.shape[axis];
        let pitch = self.pitch[axis];
        // unbounded axis of a 2D lattice
        if !pitch.is_finite() {
            return Ok(0);
        }
        let index = ((value - self.lower_left[axis]) / pitch).floor();
        // written to also catch a NaN index, which fails both comparisons
        if !(index >= 0.0 && index < extent as f64) {
            return Err(Error::LatticeIndexOutOfRange {
                lattice: self.label(),
                axis: AXES[axis],
                index: index as i64,
                extent,
            });
        }
        Ok(index as usize)
    }

    /// Locate the slot containing `point` and transform into its frame
    ///
    /// Indices follow `floor((point - lower_left) / pitch)`, so a point
    /// exactly on an internal grid edge belongs to the higher-indexed slot,
    /// consistently with the surface tie-break. Out-of-range indices are a
    /// fatal lookup error naming the offending axis.
    ///
    /// The returned local point is the query point minus the slot centre;
    /// unbounded axes pass through unchanged.
    pub fn find_universe(&self, point: &Point) -> Result<(UniverseId, [usize; 3], Point)> {
        let i = self.axis_index(0, point.x)?;
        let j = self.axis_index(1, point.y)?;
        let k = self.axis_index(2, point.z)?;

        let universe = self.universe_at(i, j, k).ok_or(Error::IncompleteLattice {
            lattice: self.label(),
            i,
            j,
            k,
        })?;

        let mut local = *point;
        for (axis, index) in [i, j, k].into_iter().enumerate() {
            if self.pitch[axis].is_finite() {
                let centre = self.lower_left[axis] + (index as f64 + 0.5) * self.pitch[axis];
                local[axis] -= centre;
            }
        }
        Ok((universe, [i, j, k], local))
    }

    /// Local-frame domain of a single slot, centred on the slot origin
    pub(crate) fn slot_box(&self) -> BoundingBox {
        let mut min = Point::origin();
        let mut max = Point::origin();
        for axis in 0..3 {
            if self.pitch[axis].is_finite() {
                min[axis] = -self.pitch[axis] / 2.0;
                max[axis] = self.pitch[axis] / 2.0;
            } else {
                min[axis] = f64::NEG_INFINITY;
                max[axis] = f64::INFINITY;
            }
        }
        BoundingBox::new(min, max)
    }
}

impl std::fmt::Display for Lattice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let [nx, ny, nz] = self.shape;
        write!(f, "{} [{nx} x {ny} x {nz}]", self.label())
    }
}
