//! Free-flying manual camera
//!
//! Orientation is an explicit `forward` / `right` / `up` basis. Every
//! rotation turns two of the vectors about the third and re-normalizes them,
//! so the basis stays orthonormal up to float error.

use cgmath::{InnerSpace, Matrix3, Matrix4, Point3, Rad, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(10.0, 2.0, 10.0),
            Point3::new(0.0, 2.0, 0.0),
            Vector3::unit_y(),
        )
    }
}

impl Camera {
    pub fn new(position: Point3<f32>, look_at: Point3<f32>, up: Vector3<f32>) -> Self {
        let forward = (look_at - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward).normalize();
        Self {
            position,
            forward,
            right,
            up,
        }
    }

    /// Pitch: rotates forward and up about right by `step / 2` radians.
    pub fn tilt(&mut self, step: f32) {
        let rotation = Matrix3::from_axis_angle(self.right, Rad(step / 2.0));
        self.forward = (rotation * self.forward).normalize();
        self.up = (rotation * self.up).normalize();
    }

    /// Yaw: rotates forward and right about up by `step` radians.
    pub fn pan(&mut self, step: f32) {
        let rotation = Matrix3::from_axis_angle(self.up, Rad(step));
        self.forward = (rotation * self.forward).normalize();
        self.right = (rotation * self.right).normalize();
    }

    /// Roll: rotates right and up about forward by `step / 2` radians.
    pub fn cant(&mut self, step: f32) {
        let rotation = Matrix3::from_axis_angle(self.forward, Rad(step / 2.0));
        self.right = (rotation * self.right).normalize();
        self.up = (rotation * self.up).normalize();
    }

    pub fn truck(&mut self, distance: f32) {
        self.position += self.right * distance;
    }

    pub fn pedestal(&mut self, distance: f32) {
        self.position += self.up * distance;
    }

    pub fn dolly(&mut self, distance: f32) {
        self.position += self.forward * distance;
    }

    /// Levels the camera: world up, horizontal forward.
    pub fn align(&mut self) {
        self.up = Vector3::unit_y();
        self.forward.y = 0.0;
        self.forward = if self.forward.magnitude2() > f32::EPSILON {
            self.forward.normalize()
        } else {
            -Vector3::unit_z()
        };
        self.right = self.forward.cross(self.up).normalize();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.forward, self.up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn assert_vec_eq(a: Vector3<f32>, b: Vector3<f32>) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    fn assert_orthonormal(camera: &Camera) {
        assert_relative_eq!(camera.forward.magnitude(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(camera.right.magnitude(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(camera.up.magnitude(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(camera.forward.dot(camera.right), 0.0, epsilon = 1e-3);
        assert_relative_eq!(camera.forward.dot(camera.up), 0.0, epsilon = 1e-3);
        assert_relative_eq!(camera.right.dot(camera.up), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_default_pose() {
        let camera = Camera::default();
        assert_eq!(camera.position, Point3::new(10.0, 2.0, 10.0));
        let expected = Vector3::new(-1.0, 0.0, -1.0).normalize();
        assert_vec_eq(camera.forward, expected);
        assert_vec_eq(camera.up, Vector3::unit_y());
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_random_rotations_keep_basis_orthonormal() {
        let mut rng = rand::rng();
        let mut camera = Camera::default();
        for _ in 0..2000 {
            let step = rng.random_range(-0.5..0.5);
            match rng.random_range(0..3) {
                0 => camera.tilt(step),
                1 => camera.pan(step),
                _ => camera.cant(step),
            }
        }
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_translations_follow_basis() {
        let mut camera = Camera::default();
        let start = camera.position;
        camera.dolly(2.0);
        camera.dolly(-2.0);
        camera.pedestal(1.0);
        assert_relative_eq!(camera.position.y, start.y + 1.0, epsilon = 1e-5);
        camera.truck(1.0);
        assert_relative_eq!((camera.position - start).dot(camera.right), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_align_levels_camera() {
        let mut camera = Camera::default();
        camera.tilt(0.7);
        camera.cant(0.3);
        camera.align();
        assert_eq!(camera.up, Vector3::unit_y());
        assert_eq!(camera.forward.y, 0.0);
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_align_straight_down_falls_back() {
        let mut camera = Camera::new(
            Point3::new(0.0, 5.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_z(),
        );
        camera.align();
        assert_eq!(camera.forward, -Vector3::unit_z());
        assert_orthonormal(&camera);
    }

    #[test]
    fn test_view_matrix_maps_position_to_origin() {
        let camera = Camera::default();
        let eye = camera.view_matrix() * camera.position.to_homogeneous();
        assert_vec_eq(eye.truncate(), Vector3::new(0.0, 0.0, 0.0));
    }
}
