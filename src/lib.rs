//! Adaptive level of detail for planet-sized spheres.
//!
//! Two interchangeable structures are provided: [`planet::SphericalQuadtree`], a quadtree over
//! the faces of a cube that draws every leaf as a 5x5 grid of triangle fans, and
//! [`planet::PlanetMesh`], a longest-edge bisection mesh over an octahedron. Both keep their
//! vertices in a shared reference counted [`planet::VertexArena`] and stream geometry through a
//! [`planet::renderer::BufferPool`].

#[macro_use]
extern crate glium;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod id_arena;

pub mod camera;
pub mod config;
pub mod context;
pub mod culling;
pub mod error;
pub mod frustum;
pub mod planet;
pub mod timeline;
pub mod transform;

pub use crate::config::{LodConfig, MeshConfig, PlanetConfig};
pub use crate::context::FrameContext;
pub use crate::error::LodError;
