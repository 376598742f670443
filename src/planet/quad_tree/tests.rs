use super::*;
use crate::camera::{Camera, Viewport};
use crate::planet::renderer::{BufferPool, BufferPoolConfig, CountingSink, DrawCall};
use crate::planet::Description;
use crate::transform::Transform;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::collections::HashSet;
use std::f64::consts::PI;
use std::rc::Rc;

fn unit_generator() -> Generator {
    Generator::new(Description::sphere(1.0), None)
}

fn config() -> LodConfig {
    LodConfig {
        max_level: 6,
        ..Default::default()
    }
}

fn tree_with(config: LodConfig) -> SphericalQuadtree<()> {
    SphericalQuadtree::without_payload(config, unit_generator()).unwrap()
}

fn looking_at(eye: Point3<f64>, target: Point3<f64>, frame: u64) -> FrameContext {
    let direction = (target - eye).normalize();
    let up = if direction.y.abs() > 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let mut camera = Camera::new();
    camera
        .set_field_of_view(PI / 3.0)
        .set_near(0.001)
        .set_far(100.0)
        .look_at(&eye, &target, &up);
    camera.frame_context(
        &Transform::identity(),
        Viewport {
            width: 1024.0,
            height: 768.0,
        },
        frame,
    )
}

fn above_front(distance: f64) -> FrameContext {
    looking_at(Point3::new(0.0, 0.0, distance), Point3::origin(), 0)
}

/// Runs updates until a frame passes without splits or merges.
fn settle<T>(tree: &mut SphericalQuadtree<T>, ctx: &FrameContext) -> usize {
    for frame in 0..200 {
        let stats = tree.try_update(ctx, false).unwrap();
        tree.validate().unwrap();
        if stats.splits == 0 && stats.merges == 0 {
            return frame;
        }
    }
    panic!("quadtree did not settle");
}

struct RecordingSink {
    calls: Vec<(DrawCall, usize)>,
}

impl FanSink<usize> for RecordingSink {
    fn draw(
        &mut self,
        _pool: &BufferPool,
        call: DrawCall,
        payload: &usize,
    ) -> Result<(), LodError> {
        self.calls.push((call, *payload));
        Ok(())
    }
}

#[test]
fn roots_share_their_edges_and_corners() {
    let tree = tree_with(config());
    tree.validate().unwrap();
    assert_eq!(tree.roots().len(), 6);
    // Grid points on the surface of a 5x5x5 lattice cube
    assert_eq!(tree.vertices().live_count(), 5 * 5 * 5 - 3 * 3 * 3);

    let front = tree.node(tree.root(Face::Front).unwrap()).unwrap();
    assert_eq!(tree.vertices().ref_count(front.vertex_indices()[0]), 3);
    assert_eq!(tree.vertices().ref_count(front.vertex_indices()[1]), 2);
    assert_eq!(tree.vertices().ref_count(front.center()), 1);
    for side in Side::ALL.iter() {
        assert!(front.adjacent(*side).is_some());
    }
}

#[test]
fn buffer_objects_must_hold_a_whole_leaf() {
    let small = LodConfig {
        buffers: BufferPoolConfig {
            indices_per_object: MAX_FAN_INDICES - 1,
            ..BufferPoolConfig::default()
        },
        ..config()
    };
    match SphericalQuadtree::without_payload(small, unit_generator()) {
        Err(LodError::Invariant(_)) => {}
        other => panic!(
            "expected an invariant error, got {:?}",
            other.map(|tree| tree.node_count())
        ),
    }

    let small = LodConfig {
        buffers: BufferPoolConfig {
            vertices_per_object: GRID_VERTICES - 1,
            ..BufferPoolConfig::default()
        },
        ..config()
    };
    assert!(SphericalQuadtree::without_payload(small, unit_generator()).is_err());
    assert!(SphericalQuadtree::without_payload(config(), unit_generator()).is_ok());
}

#[test]
fn face_below_the_camera_splits_in_the_first_update() {
    let mut tree = tree_with(LodConfig::default());
    let ctx = above_front(3.0);
    let stats = tree.try_update(&ctx, false).unwrap();

    assert_eq!(stats.splits, 1);
    assert_eq!(stats.forced_splits, 0);
    for face in Face::values() {
        let node = tree.node(tree.root(*face).unwrap()).unwrap();
        assert_eq!(!node.is_leaf(), *face == Face::Front, "{:?}", face);
    }
    tree.validate().unwrap();
}

#[test]
fn nothing_splits_when_the_planet_is_hidden() {
    let mut tree = tree_with(config());
    let stats = tree.try_update(&above_front(3.0), true).unwrap();
    assert_eq!(stats, UpdateStats::default());
    assert_eq!(tree.node_count(), 6);
}

#[test]
fn split_neighbours_share_vertex_indices() {
    let mut tree = tree_with(config());
    let front = tree.root(Face::Front).unwrap();
    assert_eq!(tree.split(front).unwrap(), 0);

    // Splitting a corner child forces the two roots it touches to split first
    let corner = tree.node(front).unwrap().children().unwrap()[Child::TopRight.index()];
    assert_eq!(tree.split(corner).unwrap(), 2);
    tree.validate().unwrap();

    let corner_node = tree.node(corner).unwrap();
    for side in Child::TopRight.outer_sides().iter() {
        let neighbor_id = corner_node.adjacent(*side).expect("neighbour was not linked");
        let neighbor = tree.node(neighbor_id).unwrap();
        assert_eq!(neighbor.level(), corner_node.level());
        assert_ne!(neighbor.location().face, Face::Front);

        let back = neighbor.side_of(corner).unwrap();
        let mine = side.slots();
        let theirs = back.slots();
        for t in 0..GRID_SIZE {
            assert_eq!(
                corner_node.vertex_indices()[mine[t]],
                neighbor.vertex_indices()[theirs[GRID_SIZE - 1 - t]]
            );
        }
    }

    // Every grandchild along the shared sides sees a same-level neighbour or a coarser leaf
    for (_, leaf) in tree.leaves() {
        assert!(leaf.level() <= 2);
    }
}

#[test]
fn coarse_leaves_stitch_in_the_mid_edges_of_split_neighbours() {
    let mut tree = tree_with(LodConfig {
        frustum_culling: false,
        horizon_culling: false,
        ..config()
    });
    let front = tree.root(Face::Front).unwrap();
    tree.split(front).unwrap();
    tree.draw(&above_front(3.0), &mut CountingSink::default()).unwrap();

    let children = tree.node(front).unwrap().children().unwrap();
    let mut coarse_fans = HashSet::new();
    for &root in tree.roots() {
        if root == front {
            continue;
        }
        let fans = tree.fan_vertices(root).unwrap();
        let node = tree.node(root).unwrap();
        for fan in fans.iter() {
            coarse_fans.extend(fan.iter().cloned());
        }

        // Only the side facing the split root picks up its odd vertices
        for side in Side::ALL.iter() {
            let edge = side.slots();
            let odd = [node.vertex_indices()[edge[1]], node.vertex_indices()[edge[3]]];
            let drawn = odd.iter().all(|v| fans.iter().any(|fan| fan.contains(v)));
            assert_eq!(drawn, node.adjacent(*side) == Some(front));
        }
    }

    for (child, &child_id) in Child::values().zip(children.iter()) {
        let node = tree.node(child_id).unwrap();
        let fans: Vec<VertexIndex> =
            tree.fan_vertices(child_id).unwrap().into_iter().flatten().collect();
        for side in child.outer_sides().iter() {
            let edge = side.slots();
            let middle = node.vertex_indices()[edge[2]];
            assert!(coarse_fans.contains(&middle), "{:?} of {:?}", side, child);
            // The finer side runs straight along the coarse edge
            assert!(!fans.contains(&node.vertex_indices()[edge[1]]));
            assert!(!fans.contains(&node.vertex_indices()[edge[3]]));
        }
        // The siblings are leaves too, so every side drops its odd vertices
        assert_eq!(fans.iter().collect::<HashSet<_>>().len(), GRID_VERTICES - 8);
    }

    // Once a sibling splits, only the side facing it picks up its odd vertices
    tree.split(children[Child::TopRight.index()]).unwrap();
    tree.draw(&above_front(3.0), &mut CountingSink::default()).unwrap();
    let top_left = children[Child::TopLeft.index()];
    let node = tree.node(top_left).unwrap();
    let fans: Vec<VertexIndex> =
        tree.fan_vertices(top_left).unwrap().into_iter().flatten().collect();
    for side in Side::ALL.iter() {
        let edge = side.slots();
        let odd = [node.vertex_indices()[edge[1]], node.vertex_indices()[edge[3]]];
        let drawn = odd.iter().all(|v| fans.contains(v));
        assert_eq!(drawn, *side == Side::Right, "{:?}", side);
    }
    assert_eq!(fans.iter().collect::<HashSet<_>>().len(), GRID_VERTICES - 6);
}

#[test]
fn only_a_batch_of_split_candidates_is_evaluated_per_frame() {
    let mut tree = tree_with(LodConfig {
        split_batch: 2,
        merge_batch: 0,
        ..config()
    });
    let ctx = above_front(3.0);
    let front = tree.root(Face::Front).unwrap();

    // Two roots per frame, the children of the front face queue up behind the rest
    for _ in 0..3 {
        let stats = tree.try_update(&ctx, false).unwrap();
        assert_eq!(stats.splits + stats.requeued, 2);
        assert_eq!(stats.forced_splits, 0);
        tree.validate().unwrap();
    }
    assert!(!tree.node(front).unwrap().is_leaf());
    assert_eq!(tree.leaves().count(), 9);
    assert_eq!(tree.split_queue.len(), 9);
}

#[test]
fn split_then_merge_restores_reference_counts() {
    let mut tree = tree_with(config());
    let before: Vec<(VertexIndex, u32)> = tree.vertices().live().collect();

    let front = tree.root(Face::Front).unwrap();
    tree.split(front).unwrap();
    tree.validate().unwrap();
    assert_eq!(tree.node_count(), 10);
    let children = tree.node(front).unwrap().children().unwrap();

    assert!(tree.merge(front).unwrap());
    tree.validate().unwrap();
    assert_eq!(tree.node_count(), 6);
    assert!(children.iter().all(|child| tree.node(*child).is_none()));

    let after: Vec<(VertexIndex, u32)> = tree.vertices().live().collect();
    assert_eq!(before, after);
}

#[test]
fn merge_waits_for_finer_neighbours() {
    let mut tree = tree_with(config());
    let front = tree.root(Face::Front).unwrap();
    tree.split(front).unwrap();
    let corner = tree.node(front).unwrap().children().unwrap()[Child::TopRight.index()];
    tree.split(corner).unwrap();

    // Not a quad anymore
    assert!(!tree.merge(front).unwrap());

    // The forced roots border the split corner child
    let forced: Vec<NodeId<()>> = tree
        .roots()
        .iter()
        .cloned()
        .filter(|&root| root != front && !tree.node(root).unwrap().is_leaf())
        .collect();
    assert_eq!(forced.len(), 2);
    for root in forced.iter() {
        assert!(!tree.merge(*root).unwrap());
    }

    assert!(tree.merge(corner).unwrap());
    for root in forced.iter() {
        assert!(tree.merge(*root).unwrap());
    }
    assert!(tree.merge(front).unwrap());
    tree.validate().unwrap();
    assert_eq!(tree.node_count(), 6);
}

#[test]
fn stale_and_invalid_requests_are_rejected() {
    let mut tree = tree_with(config());
    let front = tree.root(Face::Front).unwrap();
    tree.split(front).unwrap();
    let child = tree.node(front).unwrap().children().unwrap()[0];

    match tree.split(front) {
        Err(LodError::Invariant(_)) => {}
        other => panic!("expected an invariant error, got {:?}", other),
    }
    assert!(tree.merge(front).unwrap());
    match tree.split(child) {
        Err(LodError::StaleHandle(_)) => {}
        other => panic!("expected a stale handle, got {:?}", other),
    }
    assert!(!tree.merge(child).unwrap());
}

#[test]
fn detached_neighbours_fail_validation_and_abort_the_frame() {
    let mut tree = tree_with(config());
    let front = tree.root(Face::Front).unwrap();
    tree.nodes.get_mut(front).unwrap().adjacent[Side::Top.index()] = None;
    assert!(tree.validate().is_err());

    let stats = tree.update(&above_front(3.0), false);
    assert_eq!(stats, UpdateStats::default());
    assert!(tree.node(front).unwrap().is_leaf());
}

#[test]
fn updates_reach_a_fixed_point() {
    let mut tree = tree_with(LodConfig {
        split_batch: 100_000,
        merge_batch: 100_000,
        ..config()
    });
    let ctx = above_front(3.0);
    settle(&mut tree, &ctx);
    let count = tree.node_count();

    let stats = tree.try_update(&ctx, false).unwrap();
    assert_eq!((stats.splits, stats.forced_splits, stats.merges), (0, 0, 0));
    assert_eq!(tree.node_count(), count);

    // Refined below the camera, untouched on the far side
    let below = tree.find_leaf(Face::Front, Point2::new(0.5, 0.5)).unwrap();
    let behind = tree.find_leaf(Face::Back, Point2::new(0.5, 0.5)).unwrap();
    assert!(tree.node(below).unwrap().level() >= 2);
    assert_eq!(tree.node(behind).unwrap().level(), 0);
}

#[test]
fn receding_camera_merges_back_to_the_roots() {
    let mut tree = tree_with(LodConfig {
        split_batch: 100_000,
        merge_batch: 100_000,
        ..config()
    });
    settle(&mut tree, &above_front(3.0));
    assert!(tree.node_count() > 6);

    // Merges still happen while the planet is reported invisible
    let far = above_front(50.0);
    for _ in 0..20 {
        let stats = tree.try_update(&far, true).unwrap();
        assert_eq!(stats.splits, 0);
        tree.validate().unwrap();
    }
    assert_eq!(tree.node_count(), 6);
    assert_eq!(tree.vertices().live_count(), 98);
}

#[test]
fn culled_subtrees_are_not_drawn() {
    let mut tree = tree_with(config());
    let mut sink = CountingSink::default();

    let away = looking_at(Point3::new(0.0, 0.0, 3.0), Point3::new(0.0, 0.0, 10.0), 0);
    let stats = tree.draw(&away, &mut sink).unwrap();
    assert_eq!(stats.culled, 6);
    assert_eq!(stats.visible_leaves, 0);
    assert_eq!(sink.draws, 0);

    let close = above_front(1.2);
    let stats = tree.draw(&close, &mut sink).unwrap();
    assert!(stats.culled >= 1);
    assert!(tree.fan_vertices(tree.root(Face::Back).unwrap()).is_none());
    assert!(tree.fan_vertices(tree.root(Face::Front).unwrap()).is_some());
    assert_eq!(sink.draws, stats.fans);
    assert_eq!(sink.indices, stats.visible_leaves * 32);
}

#[test]
fn payloads_come_from_the_factory() {
    let created = Rc::new(Cell::new(0));
    let counter = created.clone();
    let mut tree = SphericalQuadtree::new(config(), unit_generator(), move |location| {
        counter.set(counter.get() + 1);
        location.lod_level
    })
    .unwrap();
    assert_eq!(created.get(), 6);

    let front = tree.root(Face::Front).unwrap();
    tree.split(front).unwrap();
    assert_eq!(created.get(), 10);
    *tree.payload_mut(front).unwrap() = 99;

    let mut sink = RecordingSink { calls: Vec::new() };
    let stats = tree.draw(&above_front(3.0), &mut sink).unwrap();
    assert_eq!(sink.calls.len(), stats.fans);
    assert!(sink.calls.iter().any(|(_, level)| *level == 1));
    assert!(sink.calls.iter().all(|(_, level)| *level <= 1));

    // Every draw stays inside the index range of its object
    for (call, _) in sink.calls.iter() {
        let start = tree.pool().index_offset(call.record);
        assert!(call.index_start >= start);
        assert!(call.index_start + call.index_count <= start + 40);
    }
}

#[test]
fn random_camera_walk_keeps_the_tree_consistent() {
    let mut tree = tree_with(LodConfig {
        split_batch: 64,
        merge_batch: 64,
        ..config()
    });
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut sink = CountingSink::default();

    for frame in 0..80 {
        let direction = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if direction.norm() < 1e-3 {
            continue;
        }
        let distance = rng.gen_range(1.05..4.0);
        let eye = Point3::from(direction.normalize() * distance);
        let ctx = looking_at(eye, Point3::origin(), frame);

        let hidden = frame % 7 == 0;
        tree.try_update(&ctx, hidden).unwrap();
        tree.validate().unwrap();
        tree.draw(&ctx, &mut sink).unwrap();

        for (_, leaf) in tree.leaves() {
            assert!(leaf.level() <= tree.config().max_level);
        }
    }
    assert!(sink.draws > 0);
}
