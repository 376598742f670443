use nalgebra::Point3;
use ncollide3d::bounding_volume::AABB;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Containment {
    Outside,
    Inside,
    Intersects,
}

pub trait Classify<T> {
    fn classify(&self, shape: &T) -> Containment;
    fn intersects(&self, shape: &T) -> bool {
        self.classify(shape) != Containment::Outside
    }
    fn contains(&self, shape: &T) -> bool {
        self.classify(shape) == Containment::Inside
    }
}

/// Builds a box around the given points.
pub fn aabb_from_points<'a, I>(points: I) -> AABB<f64>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let mut min = [std::f64::INFINITY; 3];
    let mut max = [std::f64::NEG_INFINITY; 3];
    for point in points {
        for axis in 0..3 {
            min[axis] = min[axis].min(point[axis]);
            max[axis] = max[axis].max(point[axis]);
        }
    }
    AABB::new(
        ncollide3d::math::Point::new(min[0], min[1], min[2]),
        ncollide3d::math::Point::new(max[0], max[1], max[2]),
    )
}

/// Grows the box by `amount` in every direction.
pub fn loosened(aabb: &AABB<f64>, amount: f64) -> AABB<f64> {
    AABB::new(
        ncollide3d::math::Point::new(
            aabb.mins.x - amount,
            aabb.mins.y - amount,
            aabb.mins.z - amount,
        ),
        ncollide3d::math::Point::new(
            aabb.maxs.x + amount,
            aabb.maxs.y + amount,
            aabb.maxs.z + amount,
        ),
    )
}

pub fn corners(aabb: &AABB<f64>) -> [Point3<f64>; 8] {
    // Compute the corners of the bounding box
    let min = Point3::new(aabb.mins.x, aabb.mins.y, aabb.mins.z);
    let max = Point3::new(aabb.maxs.x, aabb.maxs.y, aabb.maxs.z);
    [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(min.x, max.y, max.z),
        Point3::new(max.x, max.y, max.z),
    ]
}
