//! # Scene Management Module
//!
//! Everything that is drawn, and the state that decides how:
//!
//! - [`Scene`] - entity list, camera rig, light, shadow and skybox settings
//! - [`MeshEntity`] - one loaded model and its GPU parts
//! - [`TextureCache`] - per-entity texture de-duplication
//! - [`Skybox`] - cubemap requests and the enable flag
//! - [`MeshVertex`] - the interleaved vertex format
//!
//! All of it lives on the main thread. Loader threads only ever produce
//! [`crate::assets::LoadEvent`]s, which [`Scene::poll_loads`] applies once
//! per frame.

pub mod light;
pub mod mesh_entity;
pub mod scene;
pub mod skybox;
pub mod texture_cache;
pub mod vertex;

// Re-export main types
pub use light::{Light, LightSpace, ShadowSettings};
pub use mesh_entity::{LoadState, MeshDescriptor, MeshEntity};
pub use scene::Scene;
pub use skybox::{Skybox, SkyboxFaces};
pub use texture_cache::TextureCache;
pub use vertex::MeshVertex;
