//! # Camera System
//!
//! Two interchangeable cameras behind one [`CameraRig`]:
//!
//! - [`Camera`] - free-flying, driven by keys and pointer drags
//! - [`AnimatedCamera`] - sweeps around the room by itself
//!
//! Switching replaces the whole rig, so switching back to the manual camera
//! always yields its default pose.

pub mod animated_camera;
pub mod camera;
pub mod camera_controller;
pub mod camera_utils;

use cgmath::{Matrix4, Point3};

pub use animated_camera::AnimatedCamera;
pub use camera::Camera;
pub use camera_controller::CameraController;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraRig {
    Manual(Camera),
    Animated(AnimatedCamera),
}

impl Default for CameraRig {
    fn default() -> Self {
        CameraRig::Manual(Camera::default())
    }
}

impl CameraRig {
    /// The other kind of camera in its initial pose.
    pub fn switched(&self) -> Self {
        match self {
            CameraRig::Manual(_) => CameraRig::Animated(AnimatedCamera::default()),
            CameraRig::Animated(_) => CameraRig::Manual(Camera::default()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            CameraRig::Manual(_) => "Camera",
            CameraRig::Animated(_) => "Animated Camera",
        }
    }

    /// Current view matrix. Advances the animated camera by one frame.
    pub fn view_matrix(&mut self) -> Matrix4<f32> {
        match self {
            CameraRig::Manual(camera) => camera.view_matrix(),
            CameraRig::Animated(camera) => camera.view_matrix(),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        match self {
            CameraRig::Manual(camera) => camera.position,
            CameraRig::Animated(camera) => camera.position,
        }
    }

    pub fn dolly(&mut self, step: f32) {
        match self {
            CameraRig::Manual(camera) => camera.dolly(step),
            CameraRig::Animated(camera) => camera.dolly(step),
        }
    }

    pub fn truck(&mut self, step: f32) {
        if let CameraRig::Manual(camera) = self {
            camera.truck(step);
        }
    }

    pub fn pedestal(&mut self, step: f32) {
        if let CameraRig::Manual(camera) = self {
            camera.pedestal(step);
        }
    }

    pub fn pan(&mut self, step: f32) {
        if let CameraRig::Manual(camera) = self {
            camera.pan(step);
        }
    }

    pub fn tilt(&mut self, step: f32) {
        if let CameraRig::Manual(camera) = self {
            camera.tilt(step);
        }
    }

    pub fn cant(&mut self, step: f32) {
        if let CameraRig::Manual(camera) = self {
            camera.cant(step);
        }
    }

    pub fn align(&mut self) {
        if let CameraRig::Manual(camera) = self {
            camera.align();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switching_resets_pose() {
        let mut rig = CameraRig::default();
        rig.dolly(3.0);
        rig.pan(0.4);
        let animated = rig.switched();
        assert_eq!(animated.kind_name(), "Animated Camera");
        assert_eq!(animated.switched(), CameraRig::default());
    }

    #[test]
    fn test_manual_only_operations_ignore_animated_camera() {
        let mut rig = CameraRig::Animated(AnimatedCamera::default());
        let before = rig;
        rig.truck(1.0);
        rig.pedestal(1.0);
        rig.pan(1.0);
        rig.tilt(1.0);
        rig.cant(1.0);
        rig.align();
        assert_eq!(rig, before);
        rig.dolly(0.05);
        assert_ne!(rig, before);
    }
}
