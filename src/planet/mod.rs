/// Describes the basic properties of a planet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Description {
    /// Radius at the equator, along the x and z axes
    pub equatorial_radius: f64,
    /// Radius at the poles, along the y axis
    pub polar_radius: f64,
}

impl Default for Description {
    fn default() -> Self {
        // WGS84
        Description {
            equatorial_radius: 6_378_137.0,
            polar_radius: 6_356_752.314_245,
        }
    }
}

impl Description {
    pub fn sphere(radius: f64) -> Description {
        Description {
            equatorial_radius: radius,
            polar_radius: radius,
        }
    }
}

mod face;
mod generator;
pub mod mesh;
pub mod quad_tree;
pub mod renderer;
mod terrain;
mod vertex_arena;

pub use self::face::Face;
pub use self::generator::{midpoint_normal, polar_texcoord, Generator};
pub use self::mesh::PlanetMesh;
pub use self::quad_tree::{PatchLocation, SphericalQuadtree};
pub use self::terrain::TerrainLayer;
pub use self::vertex_arena::{VertexArena, VertexIndex};
