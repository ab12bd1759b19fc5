//! Scene light and shadow settings
//!
//! Both structs are edited in place by the settings panel between frames.
//! [`LightSpace`] derives every light-dependent matrix for one frame from
//! their current values.

use cgmath::{
    perspective, Deg, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3,
};

use crate::gfx::{camera::camera_utils::OPENGL_TO_WGPU_MATRIX, device::ShadowMapHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: [f32; 3],
    /// Used as a direction by the unshadowed pass and as the look-at target
    /// of the light by the shadowed pass.
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub ambient: [f32; 3],
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: [10.0, 2.0, 10.0],
            direction: [1.0, 1.0, 1.0],
            color: [1.0, 1.0, 1.0],
            ambient: [0.1, 0.1, 0.1],
        }
    }
}

impl Light {
    /// Normalized light direction for the unshadowed pass.
    pub fn normalized_direction(&self) -> Vector3<f32> {
        let direction = Vector3::from(self.direction);
        if direction.magnitude2() > f32::EPSILON {
            direction.normalize()
        } else {
            Vector3::unit_y()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSettings {
    /// Side length of the square depth map in texels.
    pub size: u32,
    /// Vertical field of view of the light in degrees.
    pub fov: f32,
    pub proj_width: f32,
    pub proj_height: f32,
    pub z_far: f32,
    pub bias: f32,
    pub enabled: bool,
    pub show_frustum: bool,
    pub depth_map: Option<ShadowMapHandle>,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            size: 4096,
            fov: 60.0,
            proj_width: 2.0,
            proj_height: 2.0,
            z_far: 20.0,
            bias: -0.0001,
            enabled: false,
            show_frustum: false,
            depth_map: None,
        }
    }
}

/// Light-space matrices for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpace {
    pub view: Matrix4<f32>,
    /// Light projection in wgpu clip space.
    pub projection: Matrix4<f32>,
    /// World space to shadow-map coordinates: xy in 0..1 (y down), z depth.
    pub texture_matrix: Matrix4<f32>,
    /// Maps the -1..1 cube onto the light frustum in world space.
    pub frustum: Matrix4<f32>,
    /// Unit vector from the light's target towards the light.
    pub direction: Vector3<f32>,
}

const LIGHT_Z_NEAR: f32 = 0.5;

#[rustfmt::skip]
const SHADOW_UV_MATRIX: Matrix4<f32> = Matrix4::new(
    0.5,  0.0, 0.0, 0.0,
    0.0, -0.5, 0.0, 0.0,
    0.0,  0.0, 1.0, 0.0,
    0.5,  0.5, 0.0, 1.0,
);

impl LightSpace {
    pub fn new(light: &Light, shadow: &ShadowSettings) -> Self {
        let eye = Point3::from(light.position);
        let mut target = Point3::from(light.direction);
        if (target - eye).magnitude2() <= f32::EPSILON {
            target.y -= 1.0;
        }
        let mut up = Vector3::unit_y();
        if (target - eye).normalize().cross(up).magnitude2() <= f32::EPSILON {
            up = Vector3::unit_z();
        }

        let view = Matrix4::look_at_rh(eye, target, up);
        let aspect = if shadow.proj_height.abs() > f32::EPSILON {
            shadow.proj_width / shadow.proj_height
        } else {
            1.0
        };
        let projection_gl = perspective(
            Deg(shadow.fov.clamp(1.0, 179.0)),
            aspect,
            LIGHT_Z_NEAR,
            shadow.z_far.max(LIGHT_Z_NEAR + 0.01),
        );
        let projection = OPENGL_TO_WGPU_MATRIX * projection_gl;

        let frustum = match (view.invert(), projection_gl.invert()) {
            (Some(view_inv), Some(proj_inv)) => view_inv * proj_inv,
            _ => Matrix4::identity(),
        };

        Self {
            view,
            projection,
            texture_matrix: SHADOW_UV_MATRIX * projection * view,
            frustum,
            direction: (eye - target).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    #[test]
    fn test_default_light() {
        let light = Light::default();
        assert_eq!(light.position, [10.0, 2.0, 10.0]);
        let dir = light.normalized_direction();
        assert_relative_eq!(dir.magnitude(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(dir.x, 1.0 / 3f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_light_direction_points_at_light() {
        let space = LightSpace::new(&Light::default(), &ShadowSettings::default());
        let expected = Vector3::new(9.0, 1.0, 9.0).normalize();
        assert_relative_eq!(space.direction.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(space.direction.y, expected.y, epsilon = 1e-5);
    }

    #[test]
    fn test_target_projects_to_shadow_map_center() {
        let light = Light::default();
        let space = LightSpace::new(&light, &ShadowSettings::default());
        let target = Vector4::new(1.0, 1.0, 1.0, 1.0);
        let uv = space.texture_matrix * target;
        assert_relative_eq!(uv.x / uv.w, 0.5, epsilon = 1e-4);
        assert_relative_eq!(uv.y / uv.w, 0.5, epsilon = 1e-4);
        let depth = uv.z / uv.w;
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn test_frustum_corners_span_near_and_far() {
        let light = Light::default();
        let shadow = ShadowSettings::default();
        let space = LightSpace::new(&light, &shadow);
        let eye = Point3::from(light.position);

        let near = space.frustum * Vector4::new(0.0, 0.0, -1.0, 1.0);
        let near = Point3::new(near.x / near.w, near.y / near.w, near.z / near.w);
        assert_relative_eq!((near - eye).magnitude(), LIGHT_Z_NEAR, epsilon = 1e-3);

        let far = space.frustum * Vector4::new(0.0, 0.0, 1.0, 1.0);
        let far = Point3::new(far.x / far.w, far.y / far.w, far.z / far.w);
        assert_relative_eq!((far - eye).magnitude(), shadow.z_far, epsilon = 1e-2);
    }

    #[test]
    fn test_light_on_its_target_is_still_finite() {
        let light = Light {
            position: [1.0, 1.0, 1.0],
            ..Light::default()
        };
        let space = LightSpace::new(&light, &ShadowSettings::default());
        assert!(space.direction.x.is_finite());
        assert!(space.view.x.x.is_finite());
    }
}
