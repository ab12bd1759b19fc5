use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    assets::{loader::AssetLoader, source::FileSource},
    config::ViewerConfig,
    gfx::{
        camera::CameraController,
        rendering::record_frame,
        scene::Scene,
        ui::{panel, UiManager},
        RenderEngine,
    },
    input::HeldKeys,
};

/// Everything that lives independently of the window and the GPU.
pub struct ViewerContext {
    pub scene: Scene,
    pub keys: HeldKeys,
    pub controller: CameraController,
    pub config: ViewerConfig,
}

impl ViewerContext {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let source = Arc::new(FileSource::new(config.asset_root.clone()));
        let loader = AssetLoader::new(source, config.loader_threads)?;
        let scene = Scene::new(loader, &config);

        Ok(Self {
            scene,
            keys: HeldKeys::new(),
            controller: CameraController::default(),
            config,
        })
    }

    /// Queues the empty room shell. Furniture is added from the panel.
    pub fn load_room(&mut self) {
        self.scene.load_meshes([self.config.room.clone()]);
    }
}

/// The room viewer application
pub struct ViewerApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    context: ViewerContext,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;
        let context = ViewerContext::new(config)?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                window: None,
                render_engine: None,
                ui_manager: None,
                context,
            },
        })
    }

    /// Runs the event loop until the window closes.
    pub fn run(mut self) -> anyhow::Result<()> {
        let Some(event_loop) = self.event_loop.take() else {
            anyhow::bail!("event loop already consumed");
        };
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.app_state)?;
        Ok(())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.context.config.window_size;
        let attributes = WindowAttributes::default()
            .with_title(self.context.config.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        let window_clone = window.clone();
        let mut renderer = match pollster::block_on(async move {
            RenderEngine::new(window_clone, width, height).await
        }) {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let mut ui_manager = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
        );
        ui_manager.update_display_size(width, height);

        let scene = &mut self.context.scene;
        scene.prepare_shadows(renderer.resources_mut());
        scene.prepare_skybox();
        self.context.load_room();

        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };

        let Some(window) = self.window.as_ref() else {
            return;
        };

        // UI input first; the camera only sees what imgui does not capture
        let (ui_wants_mouse, ui_wants_keyboard) = match self.ui_manager.as_mut() {
            Some(ui_manager) => {
                ui_manager.handle_input(window, window_id, &event);
                (ui_manager.wants_mouse(), ui_manager.wants_keyboard())
            }
            None => (false, false),
        };

        let context = &mut self.context;
        context
            .controller
            .process_window_event(&event, ui_wants_mouse);

        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                if key_event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }
                // Releases always go through so keys cannot stick under the UI
                if !ui_wants_keyboard || key_event.state == ElementState::Released {
                    context.keys.process_keyboard_event(&key_event);
                }
            }
            WindowEvent::Focused(false) => context.keys.clear(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                render_engine.resize(width, height);
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let scene = &mut context.scene;
                scene.apply_held_keys(&context.keys);
                scene.poll_loads(render_engine.resources_mut());

                let size = window.inner_size();
                let frame = record_frame(scene, size.width, size.height);

                let mut actions = Vec::new();
                match self.ui_manager.as_mut() {
                    Some(ui_manager) => {
                        let window_clone = window.clone();
                        render_engine.render_frame(&frame, |device, queue, encoder, view| {
                            ui_manager.draw(device, queue, encoder, &window_clone, view, |ui| {
                                actions = panel::draw_settings(ui, scene);
                            });
                        });
                    }
                    None => render_engine.render_frame(&frame, |_, _, _, _| {}),
                }

                for action in actions {
                    log::debug!("{:?}", action);
                    action.apply(scene);
                }

                window.request_redraw();
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        let size = window.inner_size();
        let context = &mut self.context;
        context
            .controller
            .process_device_event(&event, (size.width, size.height), &mut context.scene.camera);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_room_starts_with_shell_only() {
        let config = ViewerConfig {
            loader_threads: 1,
            ..ViewerConfig::default()
        };
        let mut context = ViewerContext::new(config).unwrap();
        context.load_room();

        let scene = &context.scene;
        assert_eq!(scene.meshes().len(), 1);
        assert!(scene.contains("stanzetta"));
        assert!(catalog::FURNITURE.iter().all(|item| !scene.contains(item.name)));
    }
}
