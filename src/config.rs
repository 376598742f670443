use crate::error::LodError;
use crate::planet::renderer::{BufferPoolConfig, Primitive};
use crate::planet::{Description, TerrainLayer};
use std::fs;
use std::path::Path;

/// Tuning of the spherical quadtree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LodConfig {
    /// Patches whose center faces the eye with a cosine below this value are split candidates
    pub angle_cutoff: f64,
    /// Apparent patch radius in pixels above which a patch is split
    pub pixel_cutoff: f64,
    /// Maximum number of split candidates evaluated per frame
    pub split_batch: usize,
    /// Maximum number of merge candidates evaluated per frame
    pub merge_batch: usize,
    pub max_level: usize,
    pub frustum_culling: bool,
    pub horizon_culling: bool,
    pub buffers: BufferPoolConfig,
}

impl Default for LodConfig {
    fn default() -> Self {
        LodConfig {
            angle_cutoff: -0.5,
            pixel_cutoff: 128.0,
            split_batch: 128,
            merge_batch: 128,
            max_level: 24,
            frustum_culling: true,
            horizon_culling: true,
            buffers: BufferPoolConfig::default(),
        }
    }
}

/// Tuning of the diamond mesh.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshConfig {
    pub angle_cutoff: f64,
    /// Apparent midpoint error in pixels above which a triangle is split
    pub pixel_error_cutoff: f64,
    /// Number of frames a diamond has to exist before it may be merged
    pub min_merge_age: u64,
    pub split_batch: usize,
    pub merge_batch: usize,
    pub max_level: usize,
    pub buffers: BufferPoolConfig,
}

impl Default for MeshConfig {
    fn default() -> Self {
        MeshConfig {
            angle_cutoff: -0.5,
            pixel_error_cutoff: 2.0,
            min_merge_age: 10,
            split_batch: 128,
            merge_batch: 128,
            max_level: 40,
            buffers: BufferPoolConfig {
                primitive: Primitive::Triangles,
                objects_per_bucket: 32,
                vertices_per_object: 3 * 64,
                indices_per_object: 3 * 64,
                ..Default::default()
            },
        }
    }
}

/// Everything needed to build the level-of-detail structures of one planet.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanetConfig {
    pub description: Description,
    pub terrain: Option<TerrainLayer>,
    pub lod: LodConfig,
    pub mesh: MeshConfig,
}

impl PlanetConfig {
    pub fn from_yaml_str(content: &str) -> Result<PlanetConfig, LodError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<PlanetConfig, LodError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reads a configuration file. Files ending in `.json` are parsed as JSON, everything else as
    /// YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PlanetConfig, LodError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => PlanetConfig::from_json_str(&content)?,
            _ => PlanetConfig::from_yaml_str(&content)?,
        };
        info!("loaded planet configuration from {}", path.display());
        Ok(config)
    }
}
