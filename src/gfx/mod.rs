//! # Graphics Module
//!
//! Cameras, the scene and its entities, and the wgpu renderer.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Manual and animated cameras behind one rig
//! - **Scene Management** ([`scene`]) - Mesh entities, light, shadows and skybox
//! - **GPU Seam** ([`device`]) - Handles and the trait scene code allocates through
//! - **Rendering Pipeline** ([`rendering`]) - Frame recording and execution
//! - **Resource Management** ([`resources`]) - Textures and uniform bindings
//! - **Settings Panel** ([`ui`]) - imgui overlay editing the scene
//!
//! Scene code never talks to wgpu directly. It records a
//! [`rendering::Frame`] each redraw and the [`RenderEngine`] draws it.

pub mod camera;
pub mod device;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod ui;

pub use camera::CameraRig;
pub use rendering::render_engine::RenderEngine;
