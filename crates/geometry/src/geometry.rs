//! Module for the root geometry arena, validation, and point location

use std::collections::{HashMap, HashSet};

use itertools::iproduct;
use log::{debug, warn};

use rmoc_utils::{f, SliceExt};

use crate::cell::{Cell, CellId, Fill, MaterialId};
use crate::error::{Error, Result};
use crate::lattice::{Lattice, LatticeId};
use crate::point::{BoundingBox, Point};
use crate::surface::{BoundaryType, Surface, SurfaceId, SurfaceKind};
use crate::universe::{Universe, UniverseId};

/// Hard cap on universe/lattice nesting
///
/// Construction bounds the real depth, but a rewired fill graph should fail
/// loudly rather than exhaust the stack.
const MAX_NESTING_DEPTH: usize = 64;

/// Interior sample points per bounded axis during coverage validation
const COVERAGE_SAMPLES: usize = 8;

/// Stable identifier of one flat source region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlatRegionId(pub(crate) usize);

impl FlatRegionId {
    /// Position in the flat region table
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for FlatRegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One step of the descent from the root universe to a leaf cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Entered a universe
    Universe(UniverseId),
    /// Matched a cell of the current universe
    Cell(CellId),
    /// Descended into lattice slot `(i, j, k)`
    Lattice(LatticeId, [usize; 3]),
}

/// A leaf of the flattened geometry
///
/// Every distinct descent path ending in a material-filled cell gets exactly
/// one flat region: the same pin cell repeated over a 17 x 17 lattice
/// contributes one flat region per slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRegion {
    /// The material-filled leaf cell
    pub cell: CellId,
    /// Material handle for the transport collaborator
    pub material: MaterialId,
    /// Full descent path from the root universe
    pub path: Vec<PathStep>,
}

/// The root object: arenas, root universe, and the flattened region table
///
/// All surfaces, cells, universes, and lattices are owned here by value and
/// referenced everywhere else by id, so shared objects (a moderator ring
/// surface reused by every pin cell) are shared by index rather than by
/// aliasing.
///
/// Lifecycle: build single-threaded with the `add_*`/`set_*` calls, call
/// [finalize()](Geometry::finalize) once, then treat the geometry as
/// immutable. Every query after that is a pure read, so `&Geometry` can be
/// shared across as many worker threads as the track generator wants.
///
/// ```rust
/// use rmoc_geometry::{Cell, Geometry, Halfspace, MaterialId, Point, Surface, Universe};
///
/// # fn main() -> rmoc_geometry::Result<()> {
/// let mut geometry = Geometry::new();
///
/// let xmin = geometry.add_surface(Surface::x_plane(-0.63))?;
/// let xmax = geometry.add_surface(Surface::x_plane(0.63))?;
/// let ymin = geometry.add_surface(Surface::y_plane(-0.63))?;
/// let ymax = geometry.add_surface(Surface::y_plane(0.63))?;
/// let fuel = geometry.add_surface(Surface::z_cylinder(0.0, 0.0, 0.54))?;
///
/// let pin = geometry.add_cell(
///     Cell::named("fuel")
///         .intersect(fuel, Halfspace::Negative)
///         .fill_material(MaterialId(1)),
/// )?;
/// let water = geometry.add_cell(
///     Cell::named("moderator")
///         .intersect(fuel, Halfspace::Positive)
///         .intersect(xmin, Halfspace::Positive)
///         .intersect(xmax, Halfspace::Negative)
///         .intersect(ymin, Halfspace::Positive)
///         .intersect(ymax, Halfspace::Negative)
///         .fill_material(MaterialId(2)),
/// )?;
///
/// let root = geometry.add_universe(Universe::named("root").with_cell(pin).with_cell(water))?;
/// geometry.set_root_universe(root)?;
/// geometry.finalize()?;
///
/// let region = geometry.find_leaf(&Point::new(0.0, 0.0, 0.0))?;
/// assert_eq!(geometry.flat_region(region)?.material, MaterialId(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Geometry {
    surfaces: Vec<Surface>,
    sealed: Vec<bool>,
    cells: Vec<Cell>,
    universes: Vec<Universe>,
    lattices: Vec<Lattice>,
    root: Option<UniverseId>,
    finalised: bool,
    flat_regions: Vec<FlatRegion>,
    region_index: HashMap<Vec<PathStep>, FlatRegionId>,
    bbox: Option<BoundingBox>,
}

// Construction phase
impl Geometry {
    /// An empty geometry ready for construction
    pub fn new() -> Self {
        Self::default()
    }

    fn guard_mutable(&self) -> Result<()> {
        if self.finalised {
            Err(Error::AlreadyFinalised)
        } else {
            Ok(())
        }
    }

    /// Register a surface, returning its id
    ///
    /// Coefficients are checked up front: non-finite plane offsets or cylinder
    /// centres, and non-positive radii, are construction errors.
    pub fn add_surface(&mut self, surface: Surface) -> Result<SurfaceId> {
        self.guard_mutable()?;
        match surface.kind() {
            SurfaceKind::XPlane { x } if !x.is_finite() => return Err(Error::InvalidCoefficient(x)),
            SurfaceKind::YPlane { y } if !y.is_finite() => return Err(Error::InvalidCoefficient(y)),
            SurfaceKind::ZPlane { z } if !z.is_finite() => return Err(Error::InvalidCoefficient(z)),
            SurfaceKind::ZCylinder { x, y, radius } => {
                if !x.is_finite() {
                    return Err(Error::InvalidCoefficient(x));
                }
                if !y.is_finite() {
                    return Err(Error::InvalidCoefficient(y));
                }
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(Error::InvalidRadius(radius));
                }
            }
            _ => {}
        }
        let id = SurfaceId(self.surfaces.len());
        self.surfaces.push(surface);
        self.sealed.push(false);
        Ok(id)
    }

    /// Register a cell, returning its id
    ///
    /// The cell must have a fill, its region must not require a surface with
    /// both signs, and every referenced id must already exist. Referenced
    /// surfaces become sealed against boundary condition changes.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId> {
        self.guard_mutable()?;
        if let Some(surface) = cell.region().contradiction() {
            return Err(Error::ContradictorySurface {
                cell: cell.label(),
                surface,
            });
        }
        for (surface, _) in cell.region().terms() {
            if surface.index() >= self.surfaces.len() {
                return Err(Error::UnknownSurface(*surface));
            }
        }
        match cell.fill() {
            None => return Err(Error::CellWithoutFill(cell.label())),
            Some(fill) => self.check_fill_target(fill)?,
        }
        // referenced surfaces can no longer change behind the region's back
        for (surface, _) in cell.region().terms() {
            self.sealed[surface.index()] = true;
        }
        let id = CellId(self.cells.len());
        self.cells.push(cell);
        Ok(id)
    }

    /// Register a universe, returning its id
    pub fn add_universe(&mut self, universe: Universe) -> Result<UniverseId> {
        self.guard_mutable()?;
        for cell in universe.cells() {
            if cell.index() >= self.cells.len() {
                return Err(Error::UnknownCell(*cell));
            }
        }
        let id = UniverseId(self.universes.len());
        self.universes.push(universe);
        Ok(id)
    }

    /// Register a lattice, returning its id
    ///
    /// The grid must have at least one slot and positive pitches (the z
    /// pitch of a 2D lattice is legitimately infinite), and every slot must
    /// hold a universe that already exists; a missing slot is reported with
    /// its `(i, j, k)` index. A degenerate grid accepted here would pass
    /// validation yet fail every in-domain lookup, so it is rejected up
    /// front like a bad surface coefficient.
    pub fn add_lattice(&mut self, lattice: Lattice) -> Result<LatticeId> {
        self.guard_mutable()?;
        let [nx, ny, nz] = lattice.shape();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(Error::EmptyLattice(lattice.label()));
        }
        for (axis, pitch) in ['x', 'y', 'z'].into_iter().zip(lattice.pitch()) {
            let unbounded = axis == 'z' && pitch == f64::INFINITY;
            if !unbounded && (!pitch.is_finite() || pitch <= 0.0) {
                return Err(Error::InvalidPitch {
                    lattice: lattice.label(),
                    axis,
                    pitch,
                });
            }
        }
        if let Some([i, j, k]) = lattice.first_missing_slot() {
            return Err(Error::IncompleteLattice {
                lattice: lattice.label(),
                i,
                j,
                k,
            });
        }
        for universe in lattice.slot_universes() {
            if universe.index() >= self.universes.len() {
                return Err(Error::UnknownUniverse(universe));
            }
        }
        let id = LatticeId(self.lattices.len());
        self.lattices.push(lattice);
        Ok(id)
    }

    /// Replace the fill of a registered cell
    ///
    /// A single atomic replace; the previous fill is discarded. This is how a
    /// construction script fills an assembly cell with a lattice built after
    /// the cell itself.
    pub fn set_fill(&mut self, cell: CellId, fill: Fill) -> Result<()> {
        self.guard_mutable()?;
        if cell.index() >= self.cells.len() {
            return Err(Error::UnknownCell(cell));
        }
        self.check_fill_target(fill)?;
        self.cells[cell.index()].set_fill(fill);
        Ok(())
    }

    fn check_fill_target(&self, fill: Fill) -> Result<()> {
        match fill {
            Fill::Material(_) => Ok(()),
            Fill::Universe(universe) if universe.index() >= self.universes.len() => {
                Err(Error::UnknownUniverse(universe))
            }
            Fill::Lattice(lattice) if lattice.index() >= self.lattices.len() => {
                Err(Error::UnknownLattice(lattice))
            }
            _ => Ok(()),
        }
    }

    /// Designate the root universe
    pub fn set_root_universe(&mut self, universe: UniverseId) -> Result<()> {
        self.guard_mutable()?;
        if universe.index() >= self.universes.len() {
            return Err(Error::UnknownUniverse(universe));
        }
        self.root = Some(universe);
        Ok(())
    }

    /// Change the boundary condition of an unsealed surface
    ///
    /// Errors with [Error::SealedSurface] once any cell references the
    /// surface; tag boundaries before building cells on them, or at
    /// construction via [Surface::with_boundary].
    pub fn set_boundary_condition(
        &mut self,
        surface: SurfaceId,
        boundary: BoundaryType,
    ) -> Result<()> {
        self.guard_mutable()?;
        if surface.index() >= self.surfaces.len() {
            return Err(Error::UnknownSurface(surface));
        }
        if self.sealed[surface.index()] {
            return Err(Error::SealedSurface(surface));
        }
        self.surfaces[surface.index()].set_boundary(boundary);
        Ok(())
    }
}

// Arena access
impl Geometry {
    /// The surface arena, indexable by [SurfaceId]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Look up one surface
    pub fn surface(&self, id: SurfaceId) -> Result<&Surface> {
        self.surfaces.get(id.index()).ok_or(Error::UnknownSurface(id))
    }

    /// Look up one cell
    pub fn cell(&self, id: CellId) -> Result<&Cell> {
        self.cells.get(id.index()).ok_or(Error::UnknownCell(id))
    }

    /// Look up one universe
    pub fn universe(&self, id: UniverseId) -> Result<&Universe> {
        self.universes.get(id.index()).ok_or(Error::UnknownUniverse(id))
    }

    /// Look up one lattice
    pub fn lattice(&self, id: LatticeId) -> Result<&Lattice> {
        self.lattices.get(id.index()).ok_or(Error::UnknownLattice(id))
    }

    /// Boundary condition tag of a surface, for boundary-crossing logic
    pub fn boundary_condition(&self, surface: SurfaceId) -> Result<BoundaryType> {
        Ok(self.surface(surface)?.boundary())
    }

    /// The root universe, if designated
    pub fn root_universe(&self) -> Option<UniverseId> {
        self.root
    }
}

// Finalisation: cycle detection, coverage validation, flattening
impl Geometry {
    /// Validate the hierarchy and assign flat region ids
    ///
    /// Runs, in order: fill-graph cycle detection from the root, bounding box
    /// derivation from the root cells' regions, coverage/overlap validation
    /// of every reached universe against its container domain, and flat
    /// region enumeration.
    ///
    /// Fails atomically: on any error the geometry stays unfinalised with no
    /// partial flat region table, and construction may resume. Calling again
    /// after success is a no-op.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalised {
            return Ok(());
        }
        let root = self.root.ok_or(Error::NoRootUniverse)?;

        self.check_fill_graph(root)?;
        let bbox = self.root_bounding_box(root)?;
        self.validate_coverage(root, &bbox)?;
        let (flat_regions, region_index) = self.enumerate_flat_regions(root)?;
        debug!(
            "geometry finalised with {} flat source regions",
            flat_regions.len()
        );

        self.flat_regions = flat_regions;
        self.region_index = region_index;
        self.bbox = Some(bbox);
        self.finalised = true;
        Ok(())
    }

    /// True once [finalize()](Geometry::finalize) has succeeded
    pub fn is_finalised(&self) -> bool {
        self.finalised
    }

    /// Direct child universes of a universe through its cell fills
    fn child_universes(&self, universe: UniverseId) -> Vec<UniverseId> {
        let mut children = Vec::new();
        for cell in self.universes[universe.index()].cells() {
            match self.cells[cell.index()].fill() {
                Some(Fill::Universe(child)) => children.push(child),
                Some(Fill::Lattice(lattice)) => {
                    children.extend(self.lattices[lattice.index()].slot_universes())
                }
                _ => {}
            }
        }
        children.sort_unstable();
        children.dedup();
        children
    }

    /// Reject fill graphs where a universe transitively fills itself
    fn check_fill_graph(&self, root: UniverseId) -> Result<()> {
        enum Visit {
            Enter(UniverseId, usize),
            Exit(UniverseId),
        }

        let mut on_path = vec![false; self.universes.len()];
        let mut done = vec![false; self.universes.len()];
        let mut stack = vec![Visit::Enter(root, 0)];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(universe, depth) => {
                    if depth > MAX_NESTING_DEPTH {
                        return Err(Error::NestingTooDeep {
                            limit: MAX_NESTING_DEPTH,
                        });
                    }
                    if on_path[universe.index()] {
                        return Err(Error::FillCycle(
                            self.universes[universe.index()].label(),
                        ));
                    }
                    if done[universe.index()] {
                        continue;
                    }
                    on_path[universe.index()] = true;
                    stack.push(Visit::Exit(universe));
                    for child in self.child_universes(universe) {
                        stack.push(Visit::Enter(child, depth + 1));
                    }
                }
                Visit::Exit(universe) => {
                    on_path[universe.index()] = false;
                    done[universe.index()] = true;
                }
            }
        }
        Ok(())
    }

    /// Per-axis `(lower, upper)` bounds of a cell's region, `None` = unbounded
    fn cell_axis_bounds(&self, cell: &Cell) -> [(Option<f64>, Option<f64>); 3] {
        use crate::surface::Halfspace::{Negative, Positive};

        let mut lows: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut highs: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];

        for (surface, halfspace) in cell.region().terms() {
            match (self.surfaces[surface.index()].kind(), halfspace) {
                (SurfaceKind::XPlane { x }, Positive) => lows[0].push(x),
                (SurfaceKind::XPlane { x }, Negative) => highs[0].push(x),
                (SurfaceKind::YPlane { y }, Positive) => lows[1].push(y),
                (SurfaceKind::YPlane { y }, Negative) => highs[1].push(y),
                (SurfaceKind::ZPlane { z }, Positive) => lows[2].push(z),
                (SurfaceKind::ZPlane { z }, Negative) => highs[2].push(z),
                (SurfaceKind::ZCylinder { x, y, radius }, Negative) => {
                    lows[0].push(x - radius);
                    highs[0].push(x + radius);
                    lows[1].push(y - radius);
                    highs[1].push(y + radius);
                }
                _ => {}
            }
        }

        // a region is the intersection of its halfspaces, so the tightest
        // bound wins on each side
        [0, 1, 2].map(|axis| (lows[axis].try_max().ok(), highs[axis].try_min().ok()))
    }

    /// Overall bounding box from the root universe's cell regions
    ///
    /// x and y must be bounded; z may be left unbounded for 2D problems.
    fn root_bounding_box(&self, root: UniverseId) -> Result<BoundingBox> {
        let mut lower: [Option<f64>; 3] = [Some(f64::INFINITY); 3];
        let mut upper: [Option<f64>; 3] = [Some(f64::NEG_INFINITY); 3];

        for cell in self.universes[root.index()].cells() {
            let bounds = self.cell_axis_bounds(&self.cells[cell.index()]);
            for axis in 0..3 {
                // the union of the root cells, so any unbounded cell makes
                // the whole axis unbounded
                lower[axis] = match (lower[axis], bounds[axis].0) {
                    (Some(current), Some(low)) => Some(current.min(low)),
                    _ => None,
                };
                upper[axis] = match (upper[axis], bounds[axis].1) {
                    (Some(current), Some(high)) => Some(current.max(high)),
                    _ => None,
                };
            }
        }

        let mut min = Point::origin();
        let mut max = Point::origin();
        for (axis, name) in ['x', 'y', 'z'].into_iter().enumerate() {
            match (lower[axis], upper[axis]) {
                (Some(low), Some(high)) if low.is_finite() && high.is_finite() => {
                    min[axis] = low;
                    max[axis] = high;
                }
                _ if axis == 2 => {
                    warn!("root universe is unbounded in z, treating the problem as 2D");
                    min[axis] = f64::NEG_INFINITY;
                    max[axis] = f64::INFINITY;
                }
                _ => return Err(Error::UnboundedRoot(name)),
            }
        }
        Ok(BoundingBox::new(min, max))
    }

    /// Check every reached universe covers its container domain exactly once
    ///
    /// Deterministic interior-point sampling: a sample contained by no cell
    /// is a coverage gap, a sample contained by two cells is an overlap.
    /// Sample coordinates sit at interval midpoints so none ever lies on a
    /// lattice grid edge. Each universe is validated once per distinct
    /// container domain, not once per lattice slot.
    fn validate_coverage(&self, root: UniverseId, bbox: &BoundingBox) -> Result<()> {
        type DomainKey = (UniverseId, [u64; 6], Vec<(SurfaceId, crate::surface::Halfspace)>);

        let mut seen: HashSet<DomainKey> = HashSet::new();
        let mut stack: Vec<(UniverseId, BoundingBox, Vec<crate::region::Region>)> =
            vec![(root, *bbox, Vec::new())];

        while let Some((universe_id, domain, clips)) = stack.pop() {
            let key = (
                universe_id,
                domain_bits(&domain),
                clips.iter().flat_map(|clip| clip.terms().to_vec()).collect(),
            );
            if !seen.insert(key) {
                continue;
            }

            let universe = &self.universes[universe_id.index()];
            let (xs, ys, zs) = (
                sample_coordinates(domain.min.x, domain.max.x),
                sample_coordinates(domain.min.y, domain.max.y),
                sample_coordinates(domain.min.z, domain.max.z),
            );

            for (&x, &y, &z) in iproduct!(&xs, &ys, &zs) {
                let point = Point::new(x, y, z);
                // clipped out of the part of the domain this universe fills
                if !clips.iter().all(|clip| clip.contains(&self.surfaces, &point)) {
                    continue;
                }

                let mut containing = universe
                    .cells()
                    .iter()
                    .copied()
                    .filter(|cell| self.cells[cell.index()].contains(&self.surfaces, &point));

                match (containing.next(), containing.next()) {
                    (Some(_), None) => {}
                    (None, _) => {
                        return Err(Error::CoverageGap {
                            universe: universe.label(),
                            x,
                            y,
                            z,
                        })
                    }
                    (Some(first), Some(second)) => {
                        return Err(Error::CellOverlap {
                            universe: universe.label(),
                            first: self.cells[first.index()].label(),
                            second: self.cells[second.index()].label(),
                            x,
                            y,
                            z,
                        })
                    }
                }
            }

            for cell_id in universe.cells() {
                let cell = &self.cells[cell_id.index()];
                match cell.fill() {
                    Some(Fill::Universe(child)) => {
                        // same frame; the child only fills this cell's region.
                        // Shrink the sampled domain to the cell's own bounds
                        // so a cell much smaller than its container is not
                        // skipped over by the fixed sampling resolution.
                        let bounds = self.cell_axis_bounds(cell);
                        let mut child_domain = domain;
                        for axis in 0..3 {
                            if let Some(low) = bounds[axis].0 {
                                child_domain.min[axis] = child_domain.min[axis].max(low);
                            }
                            if let Some(high) = bounds[axis].1 {
                                child_domain.max[axis] = child_domain.max[axis].min(high);
                            }
                        }
                        let mut child_clips = clips.clone();
                        child_clips.push(cell.region().clone());
                        stack.push((child, child_domain, child_clips));
                    }
                    Some(Fill::Lattice(lattice)) => {
                        let lattice = &self.lattices[lattice.index()];
                        let slot_box = lattice.slot_box();
                        let mut slots: Vec<UniverseId> = lattice.slot_universes().collect();
                        slots.sort_unstable();
                        slots.dedup();
                        for slot in slots {
                            stack.push((slot, slot_box, Vec::new()));
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Enumerate every reachable (path, leaf cell) pair in traversal order
    fn enumerate_flat_regions(
        &self,
        root: UniverseId,
    ) -> Result<(Vec<FlatRegion>, HashMap<Vec<PathStep>, FlatRegionId>)> {
        let mut flat_regions = Vec::new();
        let mut region_index = HashMap::new();
        let mut stack: Vec<(UniverseId, Vec<PathStep>)> = vec![(root, Vec::new())];

        while let Some((universe_id, path)) = stack.pop() {
            let mut prefix = path;
            prefix.push(PathStep::Universe(universe_id));

            for cell_id in self.universes[universe_id.index()].cells() {
                let cell = &self.cells[cell_id.index()];
                let mut cell_path = prefix.clone();
                cell_path.push(PathStep::Cell(*cell_id));

                match cell.fill() {
                    Some(Fill::Material(material)) => {
                        let id = FlatRegionId(flat_regions.len());
                        region_index.insert(cell_path.clone(), id);
                        flat_regions.push(FlatRegion {
                            cell: *cell_id,
                            material,
                            path: cell_path,
                        });
                    }
                    Some(Fill::Universe(child)) => stack.push((child, cell_path)),
                    Some(Fill::Lattice(lattice_id)) => {
                        let lattice = &self.lattices[lattice_id.index()];
                        let [nx, ny, nz] = lattice.shape();
                        for (k, j, i) in iproduct!(0..nz, 0..ny, 0..nx) {
                            let slot =
                                lattice.universe_at(i, j, k).ok_or(Error::IncompleteLattice {
                                    lattice: lattice.label(),
                                    i,
                                    j,
                                    k,
                                })?;
                            let mut slot_path = cell_path.clone();
                            slot_path.push(PathStep::Lattice(lattice_id, [i, j, k]));
                            stack.push((slot, slot_path));
                        }
                    }
                    None => return Err(Error::CellWithoutFill(cell.label())),
                }
            }
        }
        Ok((flat_regions, region_index))
    }
}

// Steady-state point queries
impl Geometry {
    /// Walk from the root universe to the material-filled leaf cell
    fn descend(&self, point: &Point) -> Result<(CellId, Vec<PathStep>)> {
        if !self.finalised {
            return Err(Error::NotFinalised);
        }
        // NaN satisfies no halfspace and breaks floor indexing
        if [point.x, point.y, point.z].iter().any(|c| !c.is_finite()) {
            return Err(Error::PointOutsideDomain {
                x: point.x,
                y: point.y,
                z: point.z,
            });
        }
        let bbox = self.bbox.ok_or(Error::NotFinalised)?;
        let mut universe_id = self.root.ok_or(Error::NoRootUniverse)?;
        let mut local = *point;
        let mut path = Vec::new();

        for _ in 0..MAX_NESTING_DEPTH {
            path.push(PathStep::Universe(universe_id));
            let universe = &self.universes[universe_id.index()];

            let found = universe
                .cells()
                .iter()
                .copied()
                .find(|cell| self.cells[cell.index()].contains(&self.surfaces, &local));

            let cell_id = match found {
                Some(cell) => cell,
                // distinguish "legitimately outside" from a modelling defect
                None if !bbox.contains(point) => {
                    return Err(Error::PointOutsideDomain {
                        x: point.x,
                        y: point.y,
                        z: point.z,
                    })
                }
                None => {
                    return Err(Error::PointUnmatched {
                        universe: universe.label(),
                        x: local.x,
                        y: local.y,
                        z: local.z,
                    })
                }
            };
            path.push(PathStep::Cell(cell_id));

            match self.cells[cell_id.index()].fill() {
                Some(Fill::Material(_)) => return Ok((cell_id, path)),
                Some(Fill::Universe(child)) => universe_id = child,
                Some(Fill::Lattice(lattice_id)) => {
                    let (child, ijk, slot_local) =
                        self.lattices[lattice_id.index()].find_universe(&local)?;
                    path.push(PathStep::Lattice(lattice_id, ijk));
                    universe_id = child;
                    local = slot_local;
                }
                None => {
                    return Err(Error::CellWithoutFill(
                        self.cells[cell_id.index()].label(),
                    ))
                }
            }
        }
        Err(Error::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        })
    }

    /// Flat region id of the leaf region containing a point
    ///
    /// The steady-state query entry point for the transport collaborators.
    /// Pure read over the immutable graph; safe to call from any number of
    /// threads, and the same point always maps to the same id.
    pub fn find_leaf(&self, point: &Point) -> Result<FlatRegionId> {
        let (_, path) = self.descend(point)?;
        self.region_index
            .get(&path)
            .copied()
            .ok_or(Error::MissingFlatRegion)
    }

    /// Leaf cell containing a point, without the path-resolved region id
    pub fn find_cell(&self, point: &Point) -> Result<CellId> {
        Ok(self.descend(point)?.0)
    }

    /// One flat region of a finalised geometry
    pub fn flat_region(&self, id: FlatRegionId) -> Result<&FlatRegion> {
        if !self.finalised {
            return Err(Error::NotFinalised);
        }
        self.flat_regions.get(id.index()).ok_or(Error::MissingFlatRegion)
    }

    /// Number of flat source regions assigned by finalisation
    pub fn num_flat_regions(&self) -> usize {
        self.flat_regions.len()
    }

    /// Overall domain bounds, derived from the root cells' regions
    pub fn bounding_box(&self) -> Result<BoundingBox> {
        self.bbox.ok_or(Error::NotFinalised)
    }
}

/// Interior sample coordinates for one axis of a domain
///
/// Midpoints of `COVERAGE_SAMPLES` equal intervals, so samples never sit on
/// interval edges. An unbounded axis is sampled at its representative plane
/// only.
fn sample_coordinates(min: f64, max: f64) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() {
        return vec![0.0];
    }
    let step = (max - min) / COVERAGE_SAMPLES as f64;
    (0..COVERAGE_SAMPLES)
        .map(|sample| min + (sample as f64 + 0.5) * step)
        .collect()
}

fn domain_bits(bbox: &BoundingBox) -> [u64; 6] {
    [
        bbox.min.x.to_bits(),
        bbox.min.y.to_bits(),
        bbox.min.z.to_bits(),
        bbox.max.x.to_bits(),
        bbox.max.y.to_bits(),
        bbox.max.z.to_bits(),
    ]
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut summary = f!("{}\n", "-".repeat(40));
        summary += &f!("Geometry\n");
        summary += &f!("{}\n", "-".repeat(40));
        summary += &f!("Surfaces     : {}\n", self.surfaces.len());
        summary += &f!("Cells        : {}\n", self.cells.len());
        summary += &f!("Universes    : {}\n", self.universes.len());
        summary += &f!("Lattices     : {}\n", self.lattices.len());
        summary += &f!("Flat regions : {}\n", self.flat_regions.len());
        match &self.bbox {
            Some(bbox) => summary += &f!("Bounds\n{bbox}\n"),
            None => summary += "Bounds       : not finalised\n",
        }
        write!(f, "{}", summary)
    }
}
