// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles textures, buffers, and bind groups for rendering.

pub mod global_bindings;
pub mod texture_resource;

pub use global_bindings::{FrameUniform, GlobalBindings, LineUniform};
pub use texture_resource::TextureResource;
