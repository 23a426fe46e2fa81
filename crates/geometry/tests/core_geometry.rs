//! Integration tests over full geometry construction, validation, and lookup

use rstest::{fixture, rstest};

use rmoc_geometry::{
    BoundaryType, Cell, Error, Fill, Geometry, Halfspace, Lattice, MaterialId, PathStep, Point,
    Surface, Universe,
};

const FUEL: MaterialId = MaterialId(1);
const MODERATOR: MaterialId = MaterialId(2);

/// A single pin cell: fuel disc in a square of moderator, reflective box
///
/// Half-width 0.63 cm, fuel radius 0.54 cm, unbounded in z.
#[fixture]
fn pin_geometry() -> Geometry {
    let mut geometry = Geometry::new();

    let xmin = geometry
        .add_surface(Surface::x_plane(-0.63).with_boundary(BoundaryType::Reflective))
        .unwrap();
    let xmax = geometry
        .add_surface(Surface::x_plane(0.63).with_boundary(BoundaryType::Reflective))
        .unwrap();
    let ymin = geometry
        .add_surface(Surface::y_plane(-0.63).with_boundary(BoundaryType::Reflective))
        .unwrap();
    let ymax = geometry
        .add_surface(Surface::y_plane(0.63).with_boundary(BoundaryType::Reflective))
        .unwrap();
    let fuel = geometry
        .add_surface(Surface::z_cylinder(0.0, 0.0, 0.54).named("fuel radius"))
        .unwrap();

    let pin = geometry
        .add_cell(
            Cell::named("fuel")
                .intersect(fuel, Halfspace::Negative)
                .fill_material(FUEL),
        )
        .unwrap();
    let water = geometry
        .add_cell(
            Cell::named("moderator")
                .intersect(fuel, Halfspace::Positive)
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .intersect(ymin, Halfspace::Positive)
                .intersect(ymax, Halfspace::Negative)
                .fill_material(MODERATOR),
        )
        .unwrap();

    let root = geometry
        .add_universe(Universe::named("root").with_cell(pin).with_cell(water))
        .unwrap();
    geometry.set_root_universe(root).unwrap();
    geometry.finalize().unwrap();
    geometry
}

/// A scaled-down core: 2x2x2 assembly lattice, each assembly a 2x2 pin map
///
/// The pin universe is shared by every slot; assemblies are a 2D pin lattice
/// wrapped in an unbounded cell, stacked by a 3D core lattice with a 5 cm
/// axial pitch.
#[fixture]
fn core_geometry() -> Geometry {
    let mut geometry = Geometry::new();

    let fuel_radius = geometry
        .add_surface(Surface::z_cylinder(0.0, 0.0, 0.54).named("fuel radius"))
        .unwrap();
    let pin = geometry
        .add_cell(
            Cell::named("fuel")
                .intersect(fuel_radius, Halfspace::Negative)
                .fill_material(FUEL),
        )
        .unwrap();
    let ring = geometry
        .add_cell(
            Cell::named("moderator ring")
                .intersect(fuel_radius, Halfspace::Positive)
                .fill_material(MODERATOR),
        )
        .unwrap();
    let pin_universe = geometry
        .add_universe(Universe::named("pin").with_cell(pin).with_cell(ring))
        .unwrap();

    let mut pins = Lattice::new_2d(2, 2, 1.26, 1.26).named("assembly map");
    pins.set_universes(&[
        vec![pin_universe, pin_universe],
        vec![pin_universe, pin_universe],
    ])
    .unwrap();
    let pins = geometry.add_lattice(pins).unwrap();

    let assembly_cell = geometry
        .add_cell(Cell::named("assembly").fill_lattice(pins))
        .unwrap();
    let assembly = geometry
        .add_universe(Universe::named("assembly").with_cell(assembly_cell))
        .unwrap();

    let mut core = Lattice::new(2, 2, 2, 2.52, 2.52, 5.0).named("core map");
    let layer = vec![vec![assembly, assembly], vec![assembly, assembly]];
    core.set_universes_3d(&[layer.clone(), layer]).unwrap();
    let core = geometry.add_lattice(core).unwrap();

    let xmin = geometry.add_surface(Surface::x_plane(-2.52)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(2.52)).unwrap();
    let ymin = geometry.add_surface(Surface::y_plane(-2.52)).unwrap();
    let ymax = geometry.add_surface(Surface::y_plane(2.52)).unwrap();
    let zmin = geometry.add_surface(Surface::z_plane(-5.0)).unwrap();
    let zmax = geometry.add_surface(Surface::z_plane(5.0)).unwrap();

    let root_cell = geometry
        .add_cell(
            Cell::named("core")
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .intersect(ymin, Halfspace::Positive)
                .intersect(ymax, Halfspace::Negative)
                .intersect(zmin, Halfspace::Positive)
                .intersect(zmax, Halfspace::Negative)
                .fill_lattice(core),
        )
        .unwrap();
    let root = geometry
        .add_universe(Universe::named("root").with_cell(root_cell))
        .unwrap();
    geometry.set_root_universe(root).unwrap();
    geometry.finalize().unwrap();
    geometry
}

#[rstest]
#[case(0.0, 0.0, FUEL)]
#[case(0.38, -0.38, FUEL)] // r = 0.537, just inside the disc
#[case(0.39, -0.39, MODERATOR)] // r = 0.552, just outside
#[case(-0.6, 0.6, MODERATOR)]
fn pin_cell_partitions_the_square(
    pin_geometry: Geometry,
    #[case] x: f64,
    #[case] y: f64,
    #[case] material: MaterialId,
) {
    let region = pin_geometry.find_leaf(&Point::new(x, y, 0.0)).unwrap();
    assert_eq!(pin_geometry.flat_region(region).unwrap().material, material);
}

#[rstest]
fn on_surface_points_resolve_deterministically(pin_geometry: Geometry) {
    // exactly on the fuel radius: positive halfspace, so the moderator cell
    let on_disc = Point::new(0.54, 0.0, 0.0);
    let first = pin_geometry.find_leaf(&on_disc).unwrap();
    assert_eq!(
        pin_geometry.flat_region(first).unwrap().material,
        MODERATOR
    );
    for _ in 0..100 {
        assert_eq!(pin_geometry.find_leaf(&on_disc).unwrap(), first);
    }
}

#[rstest]
fn min_edge_is_inside_and_max_edge_is_outside(pin_geometry: Geometry) {
    // regions are closed below and open above, matching the bounding box
    assert!(pin_geometry.find_leaf(&Point::new(-0.63, 0.0, 0.0)).is_ok());
    assert_eq!(
        pin_geometry.find_leaf(&Point::new(0.63, 0.0, 0.0)),
        Err(Error::PointOutsideDomain {
            x: 0.63,
            y: 0.0,
            z: 0.0,
        })
    );
}

#[rstest]
fn two_dimensional_geometry_ignores_z(pin_geometry: Geometry) {
    let at_origin = pin_geometry.find_leaf(&Point::new(0.1, 0.1, 0.0)).unwrap();
    for z in [-1.0e6, -7.14, 33.3, 1.0e6] {
        assert_eq!(
            pin_geometry.find_leaf(&Point::new(0.1, 0.1, z)).unwrap(),
            at_origin
        );
    }
}

#[rstest]
fn pin_geometry_has_two_flat_regions(pin_geometry: Geometry) {
    assert_eq!(pin_geometry.num_flat_regions(), 2);
}

#[rstest]
fn core_flattens_one_region_per_pin(core_geometry: Geometry) {
    // 8 core slots x 4 pins x 2 cells, despite every object being shared
    assert_eq!(core_geometry.num_flat_regions(), 64);
}

#[rstest]
fn shared_pin_cell_gets_distinct_regions_per_slot(core_geometry: Geometry) {
    // the same point of two different pins: same leaf cell, different region
    let a = Point::new(-1.89, -1.89, -2.5); // pin centre, slot (0, 0, 0)
    let b = Point::new(1.89, 1.89, 2.5); // pin centre, slot (1, 1, 1)

    assert_eq!(
        core_geometry.find_cell(&a).unwrap(),
        core_geometry.find_cell(&b).unwrap()
    );

    let region_a = core_geometry.find_leaf(&a).unwrap();
    let region_b = core_geometry.find_leaf(&b).unwrap();
    assert_ne!(region_a, region_b);
    for region in [region_a, region_b] {
        assert_eq!(core_geometry.flat_region(region).unwrap().material, FUEL);
    }
}

#[rstest]
#[case(-1.89, -1.89, FUEL)] // slot-centre pin axis
#[case(-1.89 + 0.54, -1.89, MODERATOR)] // on the disc: positive halfspace
#[case(-1.35, -1.35, MODERATOR)] // pin corner, r > 0.54
fn lattice_local_frames_are_slot_centred(
    core_geometry: Geometry,
    #[case] x: f64,
    #[case] y: f64,
    #[case] material: MaterialId,
) {
    let region = core_geometry.find_leaf(&Point::new(x, y, -2.5)).unwrap();
    assert_eq!(
        core_geometry.flat_region(region).unwrap().material,
        material
    );
}

#[rstest]
fn core_bounding_box_spans_the_lattice(core_geometry: Geometry) {
    let bbox = core_geometry.bounding_box().unwrap();
    assert_eq!(bbox.min, Point::new(-2.52, -2.52, -5.0));
    assert_eq!(bbox.max, Point::new(2.52, 2.52, 5.0));
}

#[rstest]
fn internal_lattice_edges_belong_to_the_higher_slot() {
    let mut geometry = Geometry::new();
    let a_cell = geometry
        .add_cell(Cell::named("a").fill_material(FUEL))
        .unwrap();
    let b_cell = geometry
        .add_cell(Cell::named("b").fill_material(MODERATOR))
        .unwrap();
    let a = geometry
        .add_universe(Universe::named("a").with_cell(a_cell))
        .unwrap();
    let b = geometry
        .add_universe(Universe::named("b").with_cell(b_cell))
        .unwrap();

    let mut lattice = Lattice::new_2d(2, 2, 1.0, 1.0).named("checkerboard");
    lattice
        .set_universes(&[vec![a, b], vec![b, a]])
        .unwrap();
    let lattice = geometry.add_lattice(lattice).unwrap();

    let xmin = geometry.add_surface(Surface::x_plane(-1.0)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(1.0)).unwrap();
    let ymin = geometry.add_surface(Surface::y_plane(-1.0)).unwrap();
    let ymax = geometry.add_surface(Surface::y_plane(1.0)).unwrap();
    let root_cell = geometry
        .add_cell(
            Cell::named("board")
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .intersect(ymin, Halfspace::Positive)
                .intersect(ymax, Halfspace::Negative)
                .fill_lattice(lattice),
        )
        .unwrap();
    let root = geometry
        .add_universe(Universe::named("root").with_cell(root_cell))
        .unwrap();
    geometry.set_root_universe(root).unwrap();
    geometry.finalize().unwrap();

    let material_at = |x: f64, y: f64| {
        let region = geometry.find_leaf(&Point::new(x, y, 0.0)).unwrap();
        geometry.flat_region(region).unwrap().material
    };

    // the four-way corner resolves to slot (1, 1), the top-right
    assert_eq!(material_at(0.0, 0.0), MODERATOR);
    // vertical edge between (0, 0) and (1, 0)
    assert_eq!(material_at(0.0, -0.5), FUEL);
    // horizontal edge between (1, 0) and (1, 1)
    assert_eq!(material_at(0.5, 0.0), MODERATOR);
    // strict interiors for reference
    assert_eq!(material_at(-0.5, 0.5), FUEL);
    assert_eq!(material_at(-0.5, -0.5), MODERATOR);
}

#[rstest]
fn coverage_gap_fails_finalize() {
    let mut geometry = Geometry::new();
    let xmin = geometry.add_surface(Surface::x_plane(-1.0)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(1.0)).unwrap();
    let ymin = geometry.add_surface(Surface::y_plane(-1.0)).unwrap();
    let ymax = geometry.add_surface(Surface::y_plane(1.0)).unwrap();
    let split = geometry.add_surface(Surface::x_plane(0.0)).unwrap();

    // the filling universe only claims the western half of the box
    let west = geometry
        .add_cell(
            Cell::named("west")
                .intersect(split, Halfspace::Negative)
                .fill_material(FUEL),
        )
        .unwrap();
    let halved = geometry
        .add_universe(Universe::named("halved").with_cell(west))
        .unwrap();

    let board = geometry
        .add_cell(
            Cell::named("board")
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .intersect(ymin, Halfspace::Positive)
                .intersect(ymax, Halfspace::Negative)
                .fill_universe(halved),
        )
        .unwrap();
    let root = geometry
        .add_universe(Universe::named("root").with_cell(board))
        .unwrap();
    geometry.set_root_universe(root).unwrap();

    assert!(matches!(
        geometry.finalize(),
        Err(Error::CoverageGap { .. })
    ));
    assert!(!geometry.is_finalised());
}

#[rstest]
fn cell_overlap_fails_finalize() {
    let mut geometry = Geometry::new();
    let xmin = geometry.add_surface(Surface::x_plane(-1.0)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(1.0)).unwrap();
    let ymin = geometry.add_surface(Surface::y_plane(-1.0)).unwrap();
    let ymax = geometry.add_surface(Surface::y_plane(1.0)).unwrap();

    let box_cell = |name: &str, material| {
        Cell::named(name)
            .intersect(xmin, Halfspace::Positive)
            .intersect(xmax, Halfspace::Negative)
            .intersect(ymin, Halfspace::Positive)
            .intersect(ymax, Halfspace::Negative)
            .fill_material(material)
    };
    let first = geometry.add_cell(box_cell("first", FUEL)).unwrap();
    let second = geometry.add_cell(box_cell("second", MODERATOR)).unwrap();

    let root = geometry
        .add_universe(Universe::named("doubled").with_cell(first).with_cell(second))
        .unwrap();
    geometry.set_root_universe(root).unwrap();

    match geometry.finalize() {
        Err(Error::CellOverlap {
            universe,
            first,
            second,
            ..
        }) => {
            assert_eq!(universe, "doubled");
            assert_eq!(first, "first");
            assert_eq!(second, "second");
        }
        other => panic!("expected an overlap error, got {other:?}"),
    }
}

#[rstest]
fn unbounded_root_axis_fails_finalize() {
    let mut geometry = Geometry::new();
    let xmin = geometry.add_surface(Surface::x_plane(-1.0)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(1.0)).unwrap();

    // an infinite slab: no y planes anywhere
    let slab = geometry
        .add_cell(
            Cell::named("slab")
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .fill_material(FUEL),
        )
        .unwrap();
    let root = geometry
        .add_universe(Universe::named("root").with_cell(slab))
        .unwrap();
    geometry.set_root_universe(root).unwrap();

    assert_eq!(geometry.finalize(), Err(Error::UnboundedRoot('y')));
}

#[rstest]
fn fill_cycle_between_universes_fails_finalize() {
    let mut geometry = Geometry::new();
    let inner_cell = geometry
        .add_cell(Cell::named("inner").fill_material(FUEL))
        .unwrap();
    let inner = geometry
        .add_universe(Universe::named("inner").with_cell(inner_cell))
        .unwrap();
    let outer_cell = geometry
        .add_cell(Cell::named("outer").fill_universe(inner))
        .unwrap();
    let outer = geometry
        .add_universe(Universe::named("outer").with_cell(outer_cell))
        .unwrap();

    // rewire: inner -> outer -> inner
    geometry
        .set_fill(inner_cell, Fill::Universe(outer))
        .unwrap();

    let xmin = geometry.add_surface(Surface::x_plane(-1.0)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(1.0)).unwrap();
    let ymin = geometry.add_surface(Surface::y_plane(-1.0)).unwrap();
    let ymax = geometry.add_surface(Surface::y_plane(1.0)).unwrap();
    let root_cell = geometry
        .add_cell(
            Cell::named("root")
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .intersect(ymin, Halfspace::Positive)
                .intersect(ymax, Halfspace::Negative)
                .fill_universe(outer),
        )
        .unwrap();
    let root = geometry
        .add_universe(Universe::named("root").with_cell(root_cell))
        .unwrap();
    geometry.set_root_universe(root).unwrap();

    assert!(matches!(geometry.finalize(), Err(Error::FillCycle(_))));
}

#[rstest]
fn finalised_geometry_rejects_construction(pin_geometry: Geometry) {
    let mut geometry = pin_geometry;
    assert_eq!(
        geometry.add_surface(Surface::x_plane(0.0)),
        Err(Error::AlreadyFinalised)
    );
    assert_eq!(
        geometry.add_cell(Cell::named("late").fill_material(FUEL)),
        Err(Error::AlreadyFinalised)
    );
    // but finalising twice is a harmless no-op
    geometry.finalize().unwrap();
}

#[rstest]
fn concurrent_queries_agree(core_geometry: Geometry) {
    let geometry = &core_geometry;
    let expected = geometry.find_leaf(&Point::new(0.63, 0.63, 2.5)).unwrap();

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    for _ in 0..1000 {
                        assert_eq!(
                            geometry.find_leaf(&Point::new(0.63, 0.63, 2.5)).unwrap(),
                            expected
                        );
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    });
}

#[rstest]
#[case(-1.89, -1.89, -2.5)]
#[case(0.63, -0.63, 2.5)]
#[case(2.0, 2.0, 4.9)]
fn flat_regions_record_their_leaf_cell(
    core_geometry: Geometry,
    #[case] x: f64,
    #[case] y: f64,
    #[case] z: f64,
) {
    let point = Point::new(x, y, z);
    let region = core_geometry.find_leaf(&point).unwrap();
    let flat = core_geometry.flat_region(region).unwrap();
    assert_eq!(flat.cell, core_geometry.find_cell(&point).unwrap());
    // the path pins down the exact lattice slots, not just the cell
    let lattice_steps = flat
        .path
        .iter()
        .filter(|step| matches!(step, PathStep::Lattice(..)))
        .count();
    assert_eq!(lattice_steps, 2);
}

#[rstest]
#[case(f64::NAN, 0.0, 0.0)]
#[case(0.0, f64::INFINITY, 0.0)]
#[case(0.0, 0.0, f64::NAN)]
fn non_finite_points_are_rejected(
    pin_geometry: Geometry,
    #[case] x: f64,
    #[case] y: f64,
    #[case] z: f64,
) {
    assert!(matches!(
        pin_geometry.find_leaf(&Point::new(x, y, z)),
        Err(Error::PointOutsideDomain { .. })
    ));
    assert!(pin_geometry.find_cell(&Point::new(x, y, z)).is_err());
}

#[rstest]
fn small_nested_universe_is_validated_over_its_own_bounds() {
    let mut geometry = Geometry::new();
    let xmin = geometry.add_surface(Surface::x_plane(-4.0)).unwrap();
    let xmax = geometry.add_surface(Surface::x_plane(4.0)).unwrap();
    let ymin = geometry.add_surface(Surface::y_plane(-4.0)).unwrap();
    let ymax = geometry.add_surface(Surface::y_plane(4.0)).unwrap();
    let left = geometry.add_surface(Surface::x_plane(-0.1)).unwrap();
    let right = geometry.add_surface(Surface::x_plane(0.1)).unwrap();
    let bottom = geometry.add_surface(Surface::y_plane(-0.1)).unwrap();
    let top = geometry.add_surface(Surface::y_plane(0.1)).unwrap();
    let dot = geometry
        .add_surface(Surface::z_cylinder(0.0, 0.0, 0.05))
        .unwrap();

    // a universe that only claims a tiny disc of its 0.2 cm box
    let dot_cell = geometry
        .add_cell(
            Cell::named("dot")
                .intersect(dot, Halfspace::Negative)
                .fill_material(FUEL),
        )
        .unwrap();
    let hollow = geometry
        .add_universe(Universe::named("hollow").with_cell(dot_cell))
        .unwrap();

    // partition of the 8 cm box: a small centre cell plus four flanks
    let centre = geometry
        .add_cell(
            Cell::named("centre")
                .intersect(left, Halfspace::Positive)
                .intersect(right, Halfspace::Negative)
                .intersect(bottom, Halfspace::Positive)
                .intersect(top, Halfspace::Negative)
                .fill_universe(hollow),
        )
        .unwrap();
    let west = geometry
        .add_cell(
            Cell::named("west")
                .intersect(left, Halfspace::Negative)
                .fill_material(MODERATOR),
        )
        .unwrap();
    let east = geometry
        .add_cell(
            Cell::named("east")
                .intersect(right, Halfspace::Positive)
                .fill_material(MODERATOR),
        )
        .unwrap();
    let north = geometry
        .add_cell(
            Cell::named("north")
                .intersect(left, Halfspace::Positive)
                .intersect(right, Halfspace::Negative)
                .intersect(top, Halfspace::Positive)
                .fill_material(MODERATOR),
        )
        .unwrap();
    let south = geometry
        .add_cell(
            Cell::named("south")
                .intersect(left, Halfspace::Positive)
                .intersect(right, Halfspace::Negative)
                .intersect(bottom, Halfspace::Negative)
                .fill_material(MODERATOR),
        )
        .unwrap();
    let inner = geometry
        .add_universe(
            Universe::named("inner")
                .with_cell(centre)
                .with_cell(west)
                .with_cell(east)
                .with_cell(north)
                .with_cell(south),
        )
        .unwrap();

    let root_cell = geometry
        .add_cell(
            Cell::named("root")
                .intersect(xmin, Halfspace::Positive)
                .intersect(xmax, Halfspace::Negative)
                .intersect(ymin, Halfspace::Positive)
                .intersect(ymax, Halfspace::Negative)
                .fill_universe(inner),
        )
        .unwrap();
    let root = geometry
        .add_universe(Universe::named("root").with_cell(root_cell))
        .unwrap();
    geometry.set_root_universe(root).unwrap();

    // the gap sits entirely between the coarse samples of the 8 cm domain,
    // so it is only caught by sampling the centre cell's own bounds
    match geometry.finalize() {
        Err(Error::CoverageGap { universe, .. }) => assert_eq!(universe, "hollow"),
        other => panic!("expected a coverage gap, got {other:?}"),
    }
}
