// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Frames are recorded as plain data in [`frame`] and executed by the
//! [`RenderEngine`] against the resources held in [`gpu_resources`].

pub mod frame;
pub mod gpu_resources;
pub mod pipeline_manager;
pub mod render_engine;

pub use frame::{record_frame, Frame, PassRecorder, Program};
pub use gpu_resources::GpuResources;
pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats};
pub use render_engine::RenderEngine;
