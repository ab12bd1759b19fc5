//! # Roomview Prelude
//!
//! The types most code driving the viewer needs:
//!
//! ```no_run
//! use roomview::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     ViewerApp::new(ViewerConfig::from_env())?.run()
//! }
//! ```

pub use crate::app::{ViewerApp, ViewerContext};
pub use crate::config::ViewerConfig;
pub use crate::error::{AssetError, RenderError};

pub use crate::assets::loader::AssetLoader;
pub use crate::assets::source::{AssetSource, FileSource, MemorySource};

pub use crate::gfx::camera::{AnimatedCamera, Camera, CameraController, CameraRig};
pub use crate::gfx::scene::{MeshDescriptor, Scene};
pub use crate::gfx::RenderEngine;
pub use crate::input::{HeldKeys, ViewerKey};
