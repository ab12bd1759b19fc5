// src/lib.rs
//! Roomview
//!
//! An interactive viewer for a furnished room, built on wgpu and winit.
//! Furniture is loaded from OBJ/MTL files on worker threads, lit by one
//! directional light with optional shadow mapping, and surrounded by a
//! cubemap skybox. An imgui panel edits the light, shadows and furniture.

pub mod app;
pub mod assets;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gfx;
pub mod input;
pub mod prelude;
pub mod wgpu_utils;

pub use app::ViewerApp;
