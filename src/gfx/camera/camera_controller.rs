use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};

use super::CameraRig;

/// Turns left-button pointer drags into camera pan and tilt.
///
/// A drag across the full window width pans by `2π · rotate_speed` radians,
/// and likewise vertically for tilt.
pub struct CameraController {
    pub rotate_speed: f32,
    is_mouse_pressed: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl CameraController {
    pub fn new(rotate_speed: f32) -> Self {
        Self {
            rotate_speed,
            is_mouse_pressed: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.is_mouse_pressed
    }

    /// Tracks the drag button. `captured` is true when the UI owns the pointer.
    pub fn process_window_event(&mut self, event: &WindowEvent, captured: bool) {
        match event {
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed && !captured;
            }
            WindowEvent::Focused(false) => self.is_mouse_pressed = false,
            _ => (),
        }
    }

    pub fn process_device_event(
        &mut self,
        event: &DeviceEvent,
        window_size: (u32, u32),
        camera: &mut CameraRig,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.is_mouse_pressed {
                let (pan, tilt) = self.drag_angles(*delta, window_size);
                camera.pan(pan);
                camera.tilt(tilt);
            }
        }
    }

    /// Pan and tilt steps for a pointer movement of `delta` pixels.
    pub fn drag_angles(&self, delta: (f64, f64), window_size: (u32, u32)) -> (f32, f32) {
        let full_turn = 2.0 * std::f32::consts::PI * self.rotate_speed;
        let width = window_size.0.max(1) as f32;
        let height = window_size.1.max(1) as f32;
        (
            delta.0 as f32 * full_turn / width,
            delta.1 as f32 * full_turn / height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_width_drag_is_a_fifth_turn() {
        let controller = CameraController::default();
        let (pan, tilt) = controller.drag_angles((800.0, 0.0), (800, 600));
        assert_relative_eq!(pan, 2.0 * std::f32::consts::PI * 0.2, epsilon = 1e-5);
        assert_eq!(tilt, 0.0);
    }

    #[test]
    fn test_zero_sized_window_does_not_divide_by_zero() {
        let controller = CameraController::default();
        let (pan, tilt) = controller.drag_angles((3.0, 4.0), (0, 0));
        assert!(pan.is_finite() && tilt.is_finite());
    }

    fn left_button(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn test_drag_ignored_while_ui_captures_pointer() {
        let mut controller = CameraController::default();
        controller.process_window_event(&left_button(ElementState::Pressed), true);
        assert!(!controller.is_dragging());

        controller.process_window_event(&left_button(ElementState::Pressed), false);
        assert!(controller.is_dragging());

        controller.process_window_event(&WindowEvent::Focused(false), false);
        assert!(!controller.is_dragging());
    }
}
