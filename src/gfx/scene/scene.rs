use crate::{
    assets::loader::{AssetLoader, LoadEvent},
    config::ViewerConfig,
    gfx::{
        camera::CameraRig,
        device::{GpuDevice, ShadowSampling},
    },
    input::{HeldKeys, ViewerKey},
};

use super::{
    light::{Light, ShadowSettings},
    mesh_entity::{MeshDescriptor, MeshEntity},
    skybox::Skybox,
};

/// Camera movement per frame while a key is held.
pub const KEY_STEP: f32 = 0.05;

/// Object movement per frame while an arrow, Q or E is held.
pub const OBJECT_STEP: f32 = 0.1;

/// Main scene containing the room's entities, camera, light and sky
pub struct Scene {
    pub camera: CameraRig,
    pub light: Light,
    pub shadow: ShadowSettings,
    pub skybox: Skybox,
    meshes: Vec<MeshEntity>,
    objects_to_add: Vec<MeshDescriptor>,
    objects_to_remove: Vec<MeshDescriptor>,
    /// Entities whose name contains this string react to the object keys.
    selected: String,
    loader: AssetLoader,
    /// Entities dropped since the last poll, waiting for their GPU parts to be freed.
    retired: Vec<MeshEntity>,
}

impl Scene {
    pub fn new(loader: AssetLoader, config: &ViewerConfig) -> Self {
        Self {
            camera: CameraRig::default(),
            light: Light::default(),
            shadow: ShadowSettings {
                size: config.shadow_map_size,
                ..ShadowSettings::default()
            },
            skybox: Skybox::new(config.skybox.clone()),
            meshes: Vec::new(),
            objects_to_add: Vec::new(),
            objects_to_remove: Vec::new(),
            selected: config.initial_selection.clone(),
            loader,
            retired: Vec::new(),
        }
    }

    pub fn meshes(&self) -> &[MeshEntity] {
        &self.meshes
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn set_selected(&mut self, name: impl Into<String>) {
        self.selected = name.into();
    }

    /// True if an entity with exactly this name is in the room.
    pub fn contains(&self, name: &str) -> bool {
        self.meshes.iter().any(|mesh| mesh.name() == name)
    }

    /// Appends a loading entity per descriptor and queues its load.
    pub fn load_meshes(&mut self, descriptors: impl IntoIterator<Item = MeshDescriptor>) {
        for descriptor in descriptors {
            log::info!("Loading '{}' at {:?}", descriptor.name, descriptor.position);
            self.meshes.push(MeshEntity::spawn(descriptor, &self.loader));
        }
    }

    pub fn queue_add(&mut self, descriptor: MeshDescriptor) {
        self.objects_to_add.push(descriptor);
    }

    pub fn queue_remove(&mut self, descriptor: MeshDescriptor) {
        self.objects_to_remove.push(descriptor);
    }

    pub fn pending_changes(&self) -> (usize, usize) {
        (self.objects_to_add.len(), self.objects_to_remove.len())
    }

    /// Applies moves and the add/remove queues, then empties both queues.
    ///
    /// Selected entities that moved are replaced by a fresh load at their new
    /// position. Removal matches names exactly.
    pub fn reload_scene(&mut self) {
        for mesh in self.meshes.iter_mut() {
            if mesh.name().contains(self.selected.as_str()) && mesh.has_moved() {
                let descriptor = mesh.descriptor().at(mesh.position);
                let fresh = MeshEntity::spawn(descriptor, &self.loader);
                self.retired.push(std::mem::replace(mesh, fresh));
            }
        }

        if !self.objects_to_remove.is_empty() {
            let (removed, kept) = std::mem::take(&mut self.meshes)
                .into_iter()
                .partition::<Vec<_>, _>(|mesh| {
                    self.objects_to_remove
                        .iter()
                        .any(|remove| remove.name == mesh.name())
                });
            for mesh in &removed {
                log::info!("Removing '{}'", mesh.name());
            }
            self.meshes = kept;
            self.retired.extend(removed);
        }

        let added = std::mem::take(&mut self.objects_to_add);
        self.load_meshes(added);

        self.objects_to_add.clear();
        self.objects_to_remove.clear();
    }

    pub fn switch_camera(&mut self) {
        self.camera = self.camera.switched();
        log::info!("Switched to {}", self.camera.kind_name());
    }

    pub fn prepare_skybox(&mut self) {
        self.skybox.prepare(&self.loader);
    }

    pub fn toggle_skybox(&mut self) {
        self.skybox.toggle();
    }

    pub fn switch_skybox(&mut self) {
        self.skybox.switch(&self.loader);
    }

    /// Allocates the depth map on first use and (re)applies its sampling.
    pub fn prepare_shadows(&mut self, device: &mut dyn GpuDevice) {
        let depth_map = match self.shadow.depth_map {
            Some(handle) => handle,
            None => {
                let handle = device.create_shadow_map(self.shadow.size);
                self.shadow.depth_map = Some(handle);
                handle
            }
        };
        device.configure_shadow_map(depth_map, ShadowSampling::default());
    }

    pub fn toggle_shadows(&mut self) {
        self.shadow.enabled = !self.shadow.enabled;
        log::info!("Shadows {}", if self.shadow.enabled { "on" } else { "off" });
    }

    /// Applies every finished load, then frees entities dropped since the
    /// last poll.
    pub fn poll_loads(&mut self, device: &mut dyn GpuDevice) {
        for event in self.loader.drain() {
            match event {
                LoadEvent::Mesh { entity, result } => {
                    match self.meshes.iter_mut().find(|mesh| mesh.id() == entity) {
                        Some(mesh) => mesh.apply_load(result, device, &self.loader),
                        None => log::debug!("Dropping load result for removed entity"),
                    }
                }
                LoadEvent::Texture {
                    handle,
                    path,
                    result,
                } => match result {
                    Ok(image) => device.replace_texture(handle, &image),
                    Err(e) => log::warn!("Keeping placeholder for {}: {}", path, e),
                },
                LoadEvent::Cubemap { generation, result } => {
                    self.skybox.apply(generation, result, device)
                }
            }
        }

        for mut mesh in self.retired.drain(..) {
            mesh.release(device);
        }
    }

    /// Moves every selected entity by `delta` and reloads.
    pub fn move_selected(&mut self, delta: [f32; 3]) {
        for mesh in self.meshes.iter_mut() {
            if mesh.name().contains(self.selected.as_str()) {
                for (axis, d) in mesh.position.iter_mut().zip(delta) {
                    *axis += d;
                }
            }
        }
        self.reload_scene();
    }

    /// Per-frame key handling. Steps are fixed per frame.
    pub fn apply_held_keys(&mut self, keys: &HeldKeys) {
        let step = KEY_STEP;
        let camera_keys: [(ViewerKey, fn(&mut CameraRig, f32), f32); 12] = [
            (ViewerKey::Forward, CameraRig::dolly, step),
            (ViewerKey::Backward, CameraRig::dolly, -step),
            (ViewerKey::Left, CameraRig::truck, -step),
            (ViewerKey::Right, CameraRig::truck, step),
            (ViewerKey::Up, CameraRig::pedestal, step),
            (ViewerKey::Down, CameraRig::pedestal, -step),
            (ViewerKey::CantLeft, CameraRig::cant, -step),
            (ViewerKey::CantRight, CameraRig::cant, step),
            (ViewerKey::TiltUp, CameraRig::tilt, step),
            (ViewerKey::TiltDown, CameraRig::tilt, -step),
            (ViewerKey::PanLeft, CameraRig::pan, step),
            (ViewerKey::PanRight, CameraRig::pan, -step),
        ];
        for (key, action, amount) in camera_keys {
            if keys.is_held(key) {
                action(&mut self.camera, amount);
            }
        }
        if keys.is_held(ViewerKey::Align) {
            self.camera.align();
        }

        let object_keys = [
            (ViewerKey::ObjectForward, [OBJECT_STEP, 0.0, 0.0]),
            (ViewerKey::ObjectBackward, [-OBJECT_STEP, 0.0, 0.0]),
            (ViewerKey::ObjectLeft, [0.0, 0.0, OBJECT_STEP]),
            (ViewerKey::ObjectRight, [0.0, 0.0, -OBJECT_STEP]),
            (ViewerKey::ObjectUp, [0.0, OBJECT_STEP, 0.0]),
            (ViewerKey::ObjectDown, [0.0, -OBJECT_STEP, 0.0]),
        ];
        for (key, delta) in object_keys {
            if keys.is_held(key) {
                self.move_selected(delta);
            }
        }
    }
}
