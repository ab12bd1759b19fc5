//! Viewer configuration
//!
//! Everything the viewer needs to know before the first frame: window size,
//! where assets live, which room to load and where the skybox faces are.

use std::path::PathBuf;

use crate::gfx::scene::{mesh_entity::MeshDescriptor, skybox::SkyboxFaces};

/// Environment variable overriding [`ViewerConfig::asset_root`].
pub const ASSET_ROOT_ENV: &str = "ROOMVIEW_ASSET_ROOT";

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_size: (u32, u32),
    /// Directory all descriptor paths are resolved against.
    pub asset_root: PathBuf,
    /// The room shell loaded at startup.
    pub room: MeshDescriptor,
    pub skybox: SkyboxFaces,
    pub shadow_map_size: u32,
    /// Worker threads used for reading and decoding assets.
    pub loader_threads: usize,
    /// Entity name the movement keys act on at startup.
    pub initial_selection: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "roomview".to_string(),
            window_size: (1200, 800),
            asset_root: PathBuf::from("."),
            room: MeshDescriptor::new(
                "stanzetta",
                "data/stanzetta/stanzetta.obj",
                Some("data/stanzetta/stanzetta.mtl"),
                [0.0, 0.0, 0.0],
            ),
            skybox: SkyboxFaces::default(),
            shadow_map_size: 4096,
            loader_threads: num_cpus::get().clamp(1, 8),
            initial_selection: "Quadro".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Default configuration with overrides taken from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(ASSET_ROOT_ENV) {
            log::info!("Using asset root {} from {}", root, ASSET_ROOT_ENV);
            config.asset_root = PathBuf::from(root);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads_room_shell() {
        let config = ViewerConfig::default();
        assert_eq!(config.room.name, "stanzetta");
        assert_eq!(config.room.position, [0.0, 0.0, 0.0]);
        assert!(config.room.material_source.is_some());
        assert!(config.loader_threads >= 1);
        assert_eq!(config.shadow_map_size, 4096);
    }
}
