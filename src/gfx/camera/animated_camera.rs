//! Camera that sweeps a quarter circle around the room on its own

use cgmath::{Matrix4, Point3, Vector3};

/// Moves along the arc between the +Z and +X axes, always looking at the
/// middle of the room. The sweep is fastest on the diagonal, where `|x - z|`
/// is smallest, and slows down towards either axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedCamera {
    pub position: Point3<f32>,
    /// Current position on the arc in degrees, 0 on +Z.
    pub angle: f32,
    /// +1 or -1.
    pub direction: f32,
    pub radius: f32,
}

impl Default for AnimatedCamera {
    fn default() -> Self {
        let position = Point3::new(0.0, 4.0, 12.0);
        Self {
            position,
            angle: 1.0,
            direction: 1.0,
            radius: (position.x * position.x + position.z * position.z).sqrt(),
        }
    }
}

impl AnimatedCamera {
    const TARGET: Point3<f32> = Point3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    const MIN_RADIUS: f32 = 5.0;
    const SPEED: f32 = 0.04;

    /// Advances the sweep one frame and returns the new view matrix.
    pub fn view_matrix(&mut self) -> Matrix4<f32> {
        if self.angle > 89.0 || self.angle < 1.0 {
            self.direction = -self.direction;
        }
        let step = self.radius - (self.position.x - self.position.z).abs() + 1.0;
        self.angle += step * self.direction * Self::SPEED;

        let angle = self.angle.to_radians();
        self.position.x = angle.sin() * self.radius;
        self.position.z = angle.cos() * self.radius;

        Matrix4::look_at_rh(self.position, Self::TARGET, Vector3::unit_y())
    }

    /// Shrinks (positive `step`) or grows the orbit radius. Moving closer
    /// stops once the radius is below 5.
    pub fn dolly(&mut self, step: f32) {
        if self.radius < Self::MIN_RADIUS && step > 0.0 {
            return;
        }
        self.radius -= (step * 100.0).to_radians();
    }
}
