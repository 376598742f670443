#[macro_use]
extern crate log;

use nalgebra::{Point3, Vector3};
use sphere_lod::camera::{Camera, Viewport};
use sphere_lod::planet::renderer::CountingSink;
use sphere_lod::planet::{Generator, PlanetMesh, SphericalQuadtree};
use sphere_lod::timeline::Timeline;
use sphere_lod::transform::Transform;
use sphere_lod::{LodError, PlanetConfig};

const FRAMES: u64 = 600;

/// Flies a camera from orbit down to the surface and reports what both level of detail structures
/// do along the way. Pass the path of a planet configuration to override the defaults.
fn main() {
    pretty_env_logger::init();

    if let Err(err) = run() {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), LodError> {
    let config = match std::env::args().nth(1) {
        Some(path) => PlanetConfig::from_file(path)?,
        None => PlanetConfig::default(),
    };
    let radius = config.description.equatorial_radius;
    let generator = Generator::new(config.description.clone(), config.terrain.clone());

    let mut tree = SphericalQuadtree::without_payload(config.lod.clone(), generator.clone())?;
    let mut mesh = PlanetMesh::new(config.mesh.clone(), generator)?;

    let viewport = Viewport {
        width: 1280.0,
        height: 800.0,
    };
    let planet_transform = Transform::identity();
    let direction = Vector3::new(1.0, 0.4, 0.8).normalize();
    let mut camera = Camera::new();
    camera
        .set_field_of_view(std::f64::consts::PI / 3.0)
        .set_near(radius * 1e-5)
        .set_far(radius * 10.0);

    let mut timeline = Timeline::new();
    let mut tree_sink = CountingSink::default();
    let mut mesh_sink = CountingSink::default();
    while timeline.frame() < FRAMES {
        // Altitude shrinks geometrically from four radii to a thousandth of a radius
        let t = timeline.frame() as f64 / (FRAMES - 1) as f64;
        let altitude = radius * 3.0 * (1e-3f64 / 3.0).powf(t);
        let eye = Point3::from(direction * (radius + altitude));
        camera.look_at(&eye, &Point3::origin(), &Vector3::y());
        let ctx = camera.frame_context(&planet_transform, viewport, timeline.frame());

        let tree_update = tree.update(&ctx, false);
        let tree_draw = tree.draw(&ctx, &mut tree_sink)?;
        let mesh_update = mesh.update(&ctx, false);
        let mesh_draw = mesh.draw(&ctx, &mut mesh_sink)?;

        if timeline.frame() % 50 == 0 {
            info!(
                "frame {} at altitude {:.0}: quadtree {} nodes, {:?}, {:?}",
                timeline.frame(),
                altitude,
                tree.node_count(),
                tree_update,
                tree_draw
            );
            info!(
                "frame {}: mesh {} triangles in {} diamonds, {:?}, {:?}",
                timeline.frame(),
                mesh.triangle_count(),
                mesh.diamond_count(),
                mesh_update,
                mesh_draw
            );
            debug!("previous frame took {:.3}ms", timeline.previous_frame_time() * 1000.0);
        }
        timeline.next_frame();
    }

    tree.validate()?;
    mesh.validate()?;
    info!(
        "walked {} frames in {:.2}s, quadtree issued {} draws with {} indices, \
         mesh {} draws with {} indices",
        timeline.frame(),
        timeline.elapsed().as_secs_f64(),
        tree_sink.draws,
        tree_sink.indices,
        mesh_sink.draws,
        mesh_sink.indices
    );
    Ok(())
}
