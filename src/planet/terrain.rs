use nalgebra::Vector3;
use std::f32::{MAX, MIN};

/// Procedural height field, evaluated on the unit direction from the planet center.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerrainLayer {
    Add(Vec<TerrainLayer>),
    Multiply(Vec<TerrainLayer>),
    Constant(f32),
    Clamp {
        min: Option<f32>,
        max: Option<f32>,
        value: Box<TerrainLayer>,
    },
    NoiseFBM {
        frequency: f32,
        persistence: f32,
        octaves: usize,
    },
    NoiseRidge {
        frequency: f32,
        persistence: f32,
        octaves: usize,
    },
    NoiseSimplex,
}

impl TerrainLayer {
    pub fn compute_height(&self, dir: &Vector3<f32>) -> f32 {
        match self {
            TerrainLayer::Add(children) => children
                .iter()
                .map(|child| child.compute_height(dir))
                .sum(),
            TerrainLayer::Multiply(children) => children
                .iter()
                .map(|child| child.compute_height(dir))
                .product(),
            TerrainLayer::Clamp { min, max, value } => value
                .compute_height(dir)
                .min(max.unwrap_or(MAX))
                .max(min.unwrap_or(MIN)),
            TerrainLayer::Constant(height) => *height,
            TerrainLayer::NoiseFBM {
                frequency,
                persistence,
                octaves,
            } => octave_sum(dir, *frequency, *persistence, *octaves, |n| {
                (1.0 - n.abs()) * 2.0 - 1.0
            }),
            TerrainLayer::NoiseRidge {
                frequency,
                persistence,
                octaves,
            } => octave_sum(dir, *frequency, *persistence, *octaves, |n| n),
            TerrainLayer::NoiseSimplex => simdnoise::scalar::simplex_3d(dir.x, dir.y, dir.z),
        }
    }

    /// Upper bound on how far below zero this layer can reach. Used to shrink occluders.
    pub fn min_height(&self) -> f32 {
        match self {
            TerrainLayer::Add(children) => children.iter().map(|c| c.min_height()).sum(),
            TerrainLayer::Multiply(children) => {
                let bound: f32 = children
                    .iter()
                    .map(|c| c.min_height().abs().max(c.max_height().abs()))
                    .product();
                -bound
            }
            TerrainLayer::Clamp { min, value, .. } => match min {
                Some(min) => value.min_height().max(*min),
                None => value.min_height(),
            },
            TerrainLayer::Constant(height) => *height,
            _ => -1.0,
        }
    }

    pub fn max_height(&self) -> f32 {
        match self {
            TerrainLayer::Add(children) => children.iter().map(|c| c.max_height()).sum(),
            TerrainLayer::Multiply(children) => children
                .iter()
                .map(|c| c.min_height().abs().max(c.max_height().abs()))
                .product(),
            TerrainLayer::Clamp { max, value, .. } => match max {
                Some(max) => value.max_height().min(*max),
                None => value.max_height(),
            },
            TerrainLayer::Constant(height) => *height,
            _ => 1.0,
        }
    }
}

fn octave_sum<F: Fn(f32) -> f32>(
    dir: &Vector3<f32>,
    frequency: f32,
    persistence: f32,
    octaves: usize,
    shape: F,
) -> f32 {
    let mut result = 0.0;
    let mut max_amplitude = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = frequency;
    for _ in 0..octaves {
        let noise =
            simdnoise::scalar::simplex_3d(dir.x * frequency, dir.y * frequency, dir.z * frequency);
        result += shape(noise) * amplitude;
        frequency *= 2.0;
        max_amplitude += amplitude;
        amplitude *= persistence;
    }

    if max_amplitude > 0.0 {
        result / max_amplitude
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_layers() {
        let dir = Vector3::new(0.0, 1.0, 0.0);
        let layer = TerrainLayer::Add(vec![
            TerrainLayer::Constant(2.0),
            TerrainLayer::Multiply(vec![TerrainLayer::Constant(3.0), TerrainLayer::Constant(4.0)]),
        ]);
        assert_eq!(layer.compute_height(&dir), 14.0);

        let clamped = TerrainLayer::Clamp {
            min: Some(-1.0),
            max: Some(5.0),
            value: Box::new(layer),
        };
        assert_eq!(clamped.compute_height(&dir), 5.0);
        assert_eq!(clamped.max_height(), 5.0);
    }

    #[test]
    fn noise_is_deterministic() {
        let layer = TerrainLayer::NoiseFBM {
            frequency: 2.0,
            persistence: 0.5,
            octaves: 4,
        };
        for i in 0..32 {
            let angle = i as f32 * 0.2;
            let dir = Vector3::new(angle.cos(), angle.sin(), 0.3).normalize();
            let height = layer.compute_height(&dir);
            assert!(height.is_finite());
            assert_eq!(height, layer.compute_height(&dir));
        }
    }

    #[test]
    fn deserializes_from_yaml() {
        let layer: TerrainLayer = serde_yaml::from_str(
            "add:\n  - constant: 1.5\n  - noiseSimplex\n",
        )
        .unwrap();
        match layer {
            TerrainLayer::Add(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected layer {:?}", other),
        }
    }
}
