//! End to end tests of the navigator: scene mutations, background builds and
//! published navmeshes.

use glam::{Affine3A, IVec2, Vec3};
use navigator::{
    make_navigator, make_navigator_stub, DoorShapes, Listener, Navigator, NavigatorImpl, NoopListener, ObjectId,
    ObjectShapes, Pathgrid, Settings, StatsMap, WaitCondition, GLOBAL_CELL_SIZE,
};
use navigator_builder::{
    AreaType, BoxShape, HeightfieldShape, HeightfieldTileBuilder, TileBuilder, TileGeometry, TilePayload,
};
use navigator_common::{AgentBounds, Aabb, Error, Result, TilePosition};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn box_shapes(half_x: f32, half_z: f32) -> ObjectShapes {
    ObjectShapes::new(Arc::new(BoxShape::new(Vec3::new(half_x, 0.5, half_z))))
}

fn at(x: f32, z: f32) -> Affine3A {
    Affine3A::from_translation(Vec3::new(x, 0.0, z))
}

fn tiles_of(navigator: &dyn Navigator, agent: &AgentBounds) -> Vec<TilePosition> {
    navigator
        .get_nav_mesh(agent)
        .map(|mesh| mesh.load().tile_positions().collect())
        .unwrap_or_default()
}

fn build_all(navigator: &mut dyn Navigator, player: Vec3) {
    navigator.update(player);
    navigator.wait(&mut NoopListener, WaitCondition::AllJobsDone);
}

#[test]
fn test_object_registration_follows_net_effect() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let id = ObjectId(1);
    let shapes = box_shapes(1.0, 1.0);

    assert!(navigator.add_object(id, &shapes, &at(0.0, 0.0)));
    assert!(!navigator.add_object(id, &shapes, &at(3.0, 0.0)));
    assert!(navigator.has_object(id));

    assert!(navigator.update_object(id, &shapes, &at(3.0, 0.0)));
    assert!(!navigator.update_object(id, &shapes, &at(3.0, 0.0)));
    assert!(!navigator.update_object(ObjectId(2), &shapes, &at(3.0, 0.0)));

    assert!(navigator.remove_object(id));
    assert!(!navigator.has_object(id));
    assert!(!navigator.remove_object(id));
}

#[test]
fn test_box_at_origin_builds_covering_tiles() {
    init_logging();
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 1.0);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);

    build_all(navigator.as_mut(), Vec3::ZERO);

    assert_eq!(
        tiles_of(navigator.as_ref(), &agent),
        vec![
            TilePosition::new(-1, -1),
            TilePosition::new(-1, 0),
            TilePosition::new(0, -1),
            TilePosition::new(0, 0),
        ]
    );
    let mesh = navigator.get_nav_mesh(&agent).unwrap().load();
    assert!(mesh.polygon_count() > 0);
}

#[test]
fn test_agent_radius_widens_affected_tiles() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let small = AgentBounds::cylinder(1.0, 0.5);
    let large = AgentBounds::cylinder(1.0, 2.0);
    navigator.add_agent(small);
    navigator.add_agent(large);
    // x extent [12.5, 14.5], 1.5 from the edge of tile 0
    navigator.add_object(ObjectId(1), &box_shapes(1.0, 1.0), &at(13.5, 8.0));

    build_all(navigator.as_mut(), Vec3::ZERO);

    assert_eq!(tiles_of(navigator.as_ref(), &small), vec![TilePosition::new(0, 0)]);
    assert_eq!(
        tiles_of(navigator.as_ref(), &large),
        vec![TilePosition::new(0, 0), TilePosition::new(1, 0)]
    );
}

#[test]
fn test_second_update_is_a_no_op() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);

    build_all(navigator.as_mut(), Vec3::ZERO);
    let built = navigator.stats().scheduler.tiles_built;
    let generation = navigator.get_nav_mesh(&agent).unwrap().generation();
    assert_eq!(built, 4);

    build_all(navigator.as_mut(), Vec3::ZERO);
    assert_eq!(navigator.stats().scheduler.tiles_built, built);
    assert_eq!(navigator.get_nav_mesh(&agent).unwrap().generation(), generation);
}

#[test]
fn test_revisions_never_go_backwards() {
    init_logging();
    let settings = Settings::default().with_async_threads(4);
    let mut navigator = make_navigator(settings, None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    let id = ObjectId(1);
    let shapes = box_shapes(6.0, 6.0);
    navigator.add_object(id, &shapes, &Affine3A::IDENTITY);

    let mesh = navigator.get_nav_mesh(&agent).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let reader = {
        let mesh = Arc::clone(&mesh);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut seen: BTreeMap<TilePosition, u64> = BTreeMap::new();
            while !stop.load(Ordering::SeqCst) {
                let snapshot = mesh.load();
                for (position, tile) in &snapshot.tiles {
                    let previous = seen.insert(*position, tile.revision).unwrap_or(0);
                    assert!(tile.revision >= previous, "tile {} went back in time", position);
                }
            }
            seen
        })
    };

    for step in 0..12 {
        navigator.update_object(id, &shapes, &at(step as f32 * 0.5, 0.0));
        navigator.update(Vec3::ZERO);
        if step % 4 == 3 {
            navigator.wait(&mut NoopListener, WaitCondition::AllJobsDone);
        }
    }
    navigator.wait(&mut NoopListener, WaitCondition::AllJobsDone);
    stop.store(true, Ordering::SeqCst);
    let seen = reader.join().unwrap();

    let snapshot = mesh.load();
    for (position, revision) in seen {
        if let Some(tile) = snapshot.tile(position) {
            assert!(tile.revision >= revision);
        }
    }
    assert_eq!(snapshot.len(), 4);
}

#[test]
fn test_removing_last_agent_drops_its_mesh() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let small = AgentBounds::cylinder(1.0, 0.5);
    let large = AgentBounds::cylinder(1.0, 2.0);
    navigator.add_agent(small);
    navigator.add_agent(small);
    navigator.add_agent(large);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);
    build_all(navigator.as_mut(), Vec3::ZERO);

    navigator.remove_agent(&small);
    assert!(navigator.get_nav_mesh(&small).is_some());

    navigator.remove_agent(&small);
    assert!(navigator.get_nav_mesh(&small).is_none());
    assert_eq!(tiles_of(navigator.as_ref(), &large).len(), 4);
    assert_eq!(navigator.get_nav_meshes().keys().copied().collect::<Vec<_>>(), vec![large]);
}

#[test]
fn test_water_entries() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();

    assert!(navigator.add_water(IVec2::ZERO, 1, 0.0));
    assert!(!navigator.add_water(IVec2::ZERO, 1, 5.0));
    assert!(navigator.remove_water(IVec2::ZERO));
    assert!(!navigator.remove_water(IVec2::ZERO));

    // unbounded water alone changes nothing
    assert!(!navigator.add_water(IVec2::new(4, 4), GLOBAL_CELL_SIZE, 0.0));
    assert!(navigator.remove_water(IVec2::new(4, 4)));

    navigator.add_object(ObjectId(1), &box_shapes(1.0, 1.0), &Affine3A::IDENTITY);
    assert!(navigator.add_water(IVec2::new(4, 4), GLOBAL_CELL_SIZE, 0.0));
}

#[test]
fn test_global_water_floods_occupied_tiles() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(1.0, 1.0), &at(8.0, 8.0));
    navigator.add_water(IVec2::ZERO, GLOBAL_CELL_SIZE, -4.0);

    build_all(navigator.as_mut(), Vec3::ZERO);

    let mesh = navigator.get_nav_mesh(&agent).unwrap().load();
    assert_eq!(mesh.len(), 1);
    let tile = mesh.tile(TilePosition::ZERO).unwrap();
    assert!(tile.payload.polygons.iter().any(|polygon| polygon.area == AreaType::Water));
}

#[test]
fn test_heightfield_builds_terrain_tiles() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);

    assert!(navigator.add_heightfield(IVec2::new(1, 0), 16, Arc::new(HeightfieldShape::Plane { height: 0.0 })));
    assert!(!navigator.add_heightfield(IVec2::new(1, 0), 16, Arc::new(HeightfieldShape::Plane { height: 1.0 })));
    build_all(navigator.as_mut(), Vec3::ZERO);

    let tiles = tiles_of(navigator.as_ref(), &agent);
    assert!(tiles.contains(&TilePosition::new(1, 0)));

    assert!(navigator.remove_heightfield(IVec2::new(1, 0)));
    assert!(!navigator.remove_heightfield(IVec2::new(1, 0)));
    build_all(navigator.as_mut(), Vec3::ZERO);
    assert!(tiles_of(navigator.as_ref(), &agent).is_empty());
}

#[test]
fn test_malformed_heightfield_is_rejected() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);

    let malformed = HeightfieldShape::Samples {
        heights: vec![0.0; 3],
        size: 2,
        min_height: 0.0,
        max_height: 0.0,
    };
    assert!(!navigator.add_heightfield(IVec2::ZERO, 16, Arc::new(malformed)));
    assert_eq!(navigator.stats().heightfields, 0);
    assert_eq!(navigator.recast_mesh_tiles().len(), 4);

    build_all(navigator.as_mut(), Vec3::ZERO);
    assert_eq!(navigator.stats().scheduler.tiles_failed, 0);
}

#[test]
fn test_door_and_pathgrid_connections() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);

    let door = DoorShapes::new(box_shapes(0.5, 0.1), Vec3::new(2.0, 0.0, 2.0), Vec3::new(2.0, 0.0, -2.0));
    assert!(navigator.add_door(ObjectId(1), &door, &at(0.0, 0.0)));
    assert!(navigator.add_pathgrid(
        IVec2::new(3, 0),
        &Pathgrid {
            points: vec![Vec3::new(50.0, 0.0, 5.0), Vec3::new(40.0, 0.0, 5.0)],
            edges: vec![[0, 1], [1, 0]],
        },
    ));
    assert!(!navigator.add_pathgrid(IVec2::new(3, 0), &Pathgrid::default()));

    build_all(navigator.as_mut(), Vec3::ZERO);
    let mesh = navigator.get_nav_mesh(&agent).unwrap().load();

    let door_tile = mesh.tile(TilePosition::new(0, 0)).unwrap();
    assert_eq!(door_tile.payload.connections.len(), 1);
    assert_eq!(door_tile.payload.connections[0].area, AreaType::Door);
    assert!(mesh.tile(TilePosition::new(0, -1)).unwrap().payload.connections.is_empty());

    let pathgrid_tile = mesh.tile(TilePosition::new(3, 0)).unwrap();
    assert_eq!(pathgrid_tile.payload.connections.len(), 1);
    assert_eq!(pathgrid_tile.payload.connections[0].start, Vec3::new(50.0, 0.0, 5.0));
    let other = mesh.tile(TilePosition::new(2, 0)).unwrap();
    assert_eq!(other.payload.connections[0].area, AreaType::Pathgrid);

    assert!(navigator.remove_pathgrid(IVec2::new(3, 0)));
    build_all(navigator.as_mut(), Vec3::ZERO);
    let mesh = navigator.get_nav_mesh(&agent).unwrap().load();
    assert!(mesh.tile(TilePosition::new(3, 0)).is_none());
    assert!(mesh.tile(TilePosition::new(2, 0)).is_none());
}

/// Fails tile (0, 0) while `broken` is set
struct FlakyBuilder {
    inner: HeightfieldTileBuilder,
    broken: AtomicBool,
}

impl TileBuilder for FlakyBuilder {
    fn region(&self, agent: &AgentBounds, tile_bounds: &Aabb) -> Aabb {
        self.inner.region(agent, tile_bounds)
    }

    fn build(&self, agent: &AgentBounds, geometry: &TileGeometry) -> Result<Option<TilePayload>> {
        if self.broken.load(Ordering::SeqCst) && geometry.position == TilePosition::ZERO {
            return Err(Error::TileBuild("degenerate tile".to_string()));
        }
        self.inner.build(agent, geometry)
    }
}

#[test]
fn test_failed_build_keeps_last_good_tile() {
    init_logging();
    let settings = Settings::default().with_async_threads(2);
    let builder = Arc::new(FlakyBuilder {
        inner: HeightfieldTileBuilder::new(settings.build_config()).unwrap(),
        broken: AtomicBool::new(false),
    });
    let mut navigator = NavigatorImpl::new(settings, builder.clone(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    let shapes = box_shapes(4.0, 4.0);
    navigator.add_object(ObjectId(1), &shapes, &Affine3A::IDENTITY);
    build_all(&mut navigator, Vec3::ZERO);

    let mesh = navigator.get_nav_mesh(&agent).unwrap();
    let before = mesh.load();

    builder.broken.store(true, Ordering::SeqCst);
    navigator.update_object(ObjectId(1), &shapes, &at(1.0, 1.0));
    build_all(&mut navigator, Vec3::ZERO);

    let after = mesh.load();
    assert_eq!(after.len(), 4);
    assert_eq!(
        after.tile(TilePosition::ZERO).unwrap().revision,
        before.tile(TilePosition::ZERO).unwrap().revision
    );
    for position in [TilePosition::new(-1, -1), TilePosition::new(-1, 0), TilePosition::new(0, -1)] {
        assert!(after.tile(position).unwrap().revision > before.tile(position).unwrap().revision);
    }
    assert_eq!(navigator.stats().scheduler.tiles_failed, 1);
}

#[test]
fn test_worldspace_change_resets_meshes() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.set_worldspace("sys::default");
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);
    build_all(navigator.as_mut(), Vec3::ZERO);
    let mesh = navigator.get_nav_mesh(&agent).unwrap();
    let epoch = mesh.epoch();

    navigator.set_worldspace("sys::default");
    assert_eq!(mesh.load().len(), 4);

    navigator.set_worldspace("interior");
    assert!(mesh.load().is_empty());
    assert_eq!(mesh.epoch(), epoch + 1);
    assert_eq!(navigator.stats().dirty_tiles, 4);

    build_all(navigator.as_mut(), Vec3::ZERO);
    assert_eq!(mesh.load().len(), 4);
}

/// Records the order tiles are built in, optionally slowing every build down
struct RecordingBuilder {
    inner: HeightfieldTileBuilder,
    delay: Duration,
    order: Mutex<Vec<TilePosition>>,
}

impl RecordingBuilder {
    fn new(settings: &Settings, delay_ms: u64) -> Self {
        Self {
            inner: HeightfieldTileBuilder::new(settings.build_config()).unwrap(),
            delay: Duration::from_millis(delay_ms),
            order: Mutex::new(Vec::new()),
        }
    }
}

impl TileBuilder for RecordingBuilder {
    fn region(&self, agent: &AgentBounds, tile_bounds: &Aabb) -> Aabb {
        self.inner.region(agent, tile_bounds)
    }

    fn build(&self, agent: &AgentBounds, geometry: &TileGeometry) -> Result<Option<TilePayload>> {
        thread::sleep(self.delay);
        self.order.lock().push(geometry.position);
        self.inner.build(agent, geometry)
    }
}

#[test]
fn test_one_update_covers_more_tiles_than_in_flight_limit() {
    let settings = Settings::default().with_max_tiles_per_update(2).with_async_threads(4);
    let mut navigator = make_navigator(settings, None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    // tiles -3..=2 on both axes
    navigator.add_object(ObjectId(1), &box_shapes(40.0, 40.0), &Affine3A::IDENTITY);

    build_all(navigator.as_mut(), Vec3::ZERO);
    assert_eq!(tiles_of(navigator.as_ref(), &agent).len(), 36);
    assert_eq!(navigator.stats().dirty_tiles, 0);
    let built = navigator.stats().scheduler.tiles_built;
    assert_eq!(built, 36);

    build_all(navigator.as_mut(), Vec3::ZERO);
    assert_eq!(navigator.stats().scheduler.tiles_built, built);
}

#[test]
fn test_stationary_player_gets_every_tile() {
    let settings = Settings::default().with_max_tiles_per_update(1);
    let mut navigator = make_navigator(settings, None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(40.0, 40.0), &Affine3A::IDENTITY);

    for _ in 0..5 {
        navigator.update_player_position(Vec3::ZERO);
        navigator.wait(&mut NoopListener, WaitCondition::AllJobsDone);
    }
    assert_eq!(tiles_of(navigator.as_ref(), &agent).len(), 36);
    assert_eq!(navigator.stats().dirty_tiles, 0);
    assert_eq!(navigator.stats().scheduler.tiles_built, 36);
}

#[test]
fn test_tiles_closest_to_player_go_first() {
    let settings = Settings::default();
    let builder = Arc::new(RecordingBuilder::new(&settings, 0));
    let mut navigator = NavigatorImpl::new(settings, builder.clone(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.3);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(2.0, 2.0), &at(8.0, 8.0));
    navigator.add_object(ObjectId(2), &box_shapes(2.0, 2.0), &at(88.0, 8.0));

    build_all(&mut navigator, Vec3::new(90.0, 0.0, 8.0));
    assert_eq!(
        *builder.order.lock(),
        vec![TilePosition::new(5, 0), TilePosition::ZERO]
    );
}

#[test]
fn test_removed_agent_drains_builds_into_orphaned_mesh() {
    let settings = Settings::default();
    let builder = Arc::new(RecordingBuilder::new(&settings, 100));
    let mut navigator = NavigatorImpl::new(settings, builder, None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);

    navigator.update(Vec3::ZERO);
    while navigator.stats().scheduler.jobs_building == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    let mesh = navigator.get_nav_mesh(&agent).unwrap();

    navigator.remove_agent(&agent);
    assert!(navigator.get_nav_mesh(&agent).is_none());
    assert!(navigator.get_nav_meshes().is_empty());
    assert_eq!(navigator.stats().scheduler.jobs_cancelled, 3);

    navigator.wait(&mut NoopListener, WaitCondition::AllJobsDone);
    assert_eq!(mesh.load().len(), 1);
    assert_eq!(navigator.stats().scheduler.jobs_building, 0);
}

#[test]
fn test_update_player_position_ignores_small_moves() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.update_player_position(Vec3::new(8.0, 0.0, 8.0));

    navigator.add_object(ObjectId(1), &box_shapes(1.0, 1.0), &at(8.0, 8.0));
    navigator.update_player_position(Vec3::new(8.5, 0.0, 8.0));
    assert_eq!(navigator.stats().dirty_tiles, 1);

    navigator.update_player_position(Vec3::new(11.0, 0.0, 8.0));
    assert_eq!(navigator.stats().dirty_tiles, 0);
}

#[test]
fn test_wait_for_agent_subset() {
    #[derive(Default)]
    struct Progress {
        range: usize,
        done: usize,
    }

    impl Listener for Progress {
        fn set_progress_range(&mut self, range: usize) {
            self.range = range;
        }

        fn increase_progress(&mut self, increment: usize) {
            self.done += increment;
        }
    }

    let mut navigator = make_navigator(Settings::default().with_async_threads(2), None).unwrap();
    let small = AgentBounds::cylinder(1.0, 0.5);
    let large = AgentBounds::cylinder(1.0, 2.0);
    navigator.add_agent(small);
    navigator.add_agent(large);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);
    navigator.update(Vec3::ZERO);

    let mut progress = Progress::default();
    navigator.wait(&mut progress, WaitCondition::Agents(BTreeSet::from([small])));
    assert_eq!(tiles_of(navigator.as_ref(), &small).len(), 4);
    assert_eq!(progress.done, progress.range);

    navigator.wait(&mut NoopListener, WaitCondition::RequiredTilesPresent);
    assert_eq!(tiles_of(navigator.as_ref(), &large).len(), 4);
}

#[test]
fn test_tile_cache_round_trip() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::default().with_tile_cache("navmeshdb", true);
    let agent = AgentBounds::cylinder(1.0, 0.5);

    let build = |navigator: &mut dyn Navigator| {
        navigator.add_agent(agent);
        navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);
        build_all(navigator, Vec3::ZERO);
    };

    let mut first = make_navigator(settings.clone(), Some(dir.path())).unwrap();
    build(first.as_mut());
    let stats = first.stats().scheduler;
    assert_eq!(stats.cache_misses, 4);
    assert_eq!(stats.cache_hits, 0);
    let built = first.get_nav_mesh(&agent).unwrap().load();
    drop(first);

    assert_eq!(std::fs::read_dir(dir.path().join("navmeshdb")).unwrap().count(), 4);

    let mut second = make_navigator(settings, Some(dir.path())).unwrap();
    build(second.as_mut());
    assert_eq!(second.stats().scheduler.cache_hits, 4);
    let loaded = second.get_nav_mesh(&agent).unwrap().load();
    for (position, tile) in &built.tiles {
        assert_eq!(loaded.tile(*position).unwrap().payload, tile.payload);
    }
}

#[test]
fn test_report_stats() {
    let mut navigator = make_navigator(Settings::default(), None).unwrap();
    let agent = AgentBounds::cylinder(1.0, 0.5);
    navigator.add_agent(agent);
    navigator.add_object(ObjectId(1), &box_shapes(4.0, 4.0), &Affine3A::IDENTITY);
    build_all(navigator.as_mut(), Vec3::ZERO);

    let mut sink = StatsMap::new();
    navigator.report_stats(42, &mut sink);
    assert_eq!(sink.get(42, "NavMesh Tiles Built"), Some(4.0));
    assert_eq!(sink.get(42, "NavMesh Agents"), Some(1.0));
    assert_eq!(sink.get(42, "NavMesh Objects"), Some(1.0));
    assert_eq!(sink.get(42, "NavMesh Tiles"), Some(4.0));
}

#[test]
fn test_invalid_settings_fail_fast() {
    let settings = Settings::default().with_tile_size(0);
    assert!(matches!(make_navigator(settings, None), Err(Error::InvalidSettings(_))));
}

#[test]
fn test_stub_accepts_everything() {
    let mut navigator = make_navigator_stub();
    let agent = AgentBounds::cylinder(1.0, 0.5);

    navigator.add_agent(agent);
    navigator.set_worldspace("sys::default");
    assert!(!navigator.add_object(ObjectId(1), &box_shapes(1.0, 1.0), &Affine3A::IDENTITY));
    assert!(!navigator.has_object(ObjectId(1)));
    assert!(!navigator.add_water(IVec2::ZERO, 1, 0.0));
    navigator.update_bounds(Vec3::ZERO);
    build_all(navigator.as_mut(), Vec3::ZERO);

    assert!(navigator.get_nav_mesh(&agent).is_none());
    assert!(navigator.get_nav_meshes().is_empty());
    assert!(navigator.recast_mesh_tiles().is_empty());

    let mut sink = StatsMap::new();
    navigator.report_stats(1, &mut sink);
    assert_eq!(sink.get(1, "NavMesh Tiles Built"), Some(0.0));
}
