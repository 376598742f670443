pub type Transform = nalgebra::Isometry3<f64>;
pub type Rotation = nalgebra::UnitQuaternion<f64>;

pub trait Transformable: Sized {
    fn transform(&self) -> &Transform;
    fn transform_mut(&mut self) -> &mut Transform;

    fn translate_by(&mut self, translation: &nalgebra::Vector3<f64>) -> &mut Self {
        self.transform_mut()
            .append_translation_mut(&nalgebra::Translation3::from(*translation));
        self
    }

    /// Returns the position of the origin of this object in its parent space.
    fn position(&self) -> nalgebra::Point3<f64> {
        nalgebra::Point3::from(self.transform().translation.vector)
    }
}
