//! # Asset Loading
//!
//! Text and image formats the viewer understands, plus the background loader
//! that reads them off the main thread.
//!
//! - [`obj`] - Wavefront geometry, grouped per material
//! - [`mtl`] - Material libraries
//! - [`texture_data`] - Image decoding and mip generation
//! - [`source`] - Where bytes come from (disk or memory)
//! - [`loader`] - Thread pool plus result channel

pub mod directives;
pub mod loader;
pub mod mtl;
pub mod obj;
pub mod source;
pub mod texture_data;

pub use loader::{AssetLoader, CubemapSources, LoadEvent};
pub use source::{AssetSource, FileSource};
