use super::node::{slot, GRID_SIZE, GRID_VERTICES};
use crate::planet::midpoint_normal;
use nalgebra::Vector3;

/// Completes a grid of unit normals from the known ones.
///
/// The vertices at even grid coordinates must be known. Edge vertices (one odd coordinate) are the
/// normalized average of their two even neighbours along the odd axis. Interior vertices (both
/// coordinates odd) average the two vertices above and below them. Slots that are already known
/// are left untouched.
pub fn fill_in_normals(
    normals: &mut [Option<Vector3<f64>>; GRID_VERTICES],
) -> [Vector3<f64>; GRID_VERTICES] {
    for y in 0..GRID_SIZE {
        for x in 0..GRID_SIZE {
            if normals[slot(x, y)].is_some() {
                continue;
            }
            let (a, b) = match (x % 2, y % 2) {
                (1, 0) => (slot(x - 1, y), slot(x + 1, y)),
                (0, 1) => (slot(x, y - 1), slot(x, y + 1)),
                _ => continue,
            };
            normals[slot(x, y)] = average(normals[a], normals[b]);
        }
    }

    for y in (1..GRID_SIZE).step_by(2) {
        for x in (1..GRID_SIZE).step_by(2) {
            if normals[slot(x, y)].is_none() {
                normals[slot(x, y)] = average(normals[slot(x, y - 1)], normals[slot(x, y + 1)]);
            }
        }
    }

    let mut result = [Vector3::zeros(); GRID_VERTICES];
    for (out, normal) in result.iter_mut().zip(normals.iter()) {
        // Only reachable when an even slot was left out, which callers never do
        *out = normal.unwrap_or_else(Vector3::zeros);
    }
    result
}

fn average(a: Option<Vector3<f64>>, b: Option<Vector3<f64>>) -> Option<Vector3<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(midpoint_normal(&a, &b)),
        _ => None,
    }
}
