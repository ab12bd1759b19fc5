//! Per-entity texture de-duplication
//!
//! Each mesh entity owns one cache. A filename is uploaded at most once per
//! cache: the first request creates a placeholder texture and queues the real
//! image, later requests get the same handle back. When the image arrives the
//! placeholder's contents are replaced, so handles never change.

use std::collections::HashMap;

use crate::{
    assets::{
        loader::AssetLoader,
        source::resolve,
        texture_data::{DecodedImage, LOADING_PIXEL, WHITE_PIXEL},
    },
    gfx::device::{GpuDevice, TextureHandle},
};

#[derive(Debug)]
pub struct TextureCache {
    base_dir: String,
    entries: HashMap<String, TextureHandle>,
    white: TextureHandle,
}

impl TextureCache {
    /// `base_dir` is the directory texture filenames are relative to.
    pub fn new(base_dir: impl Into<String>, device: &mut dyn GpuDevice) -> Self {
        let white = device.create_texture("white", &DecodedImage::solid(WHITE_PIXEL));
        Self {
            base_dir: base_dir.into(),
            entries: HashMap::new(),
            white,
        }
    }

    /// Default diffuse and specular map.
    pub fn white(&self) -> TextureHandle {
        self.white
    }

    /// Handle for `filename`, queueing its load on first use.
    pub fn acquire(
        &mut self,
        filename: &str,
        device: &mut dyn GpuDevice,
        loader: &AssetLoader,
    ) -> TextureHandle {
        if let Some(handle) = self.entries.get(filename) {
            return *handle;
        }

        let path = resolve(&self.base_dir, filename);
        let handle = device.create_texture(&path, &DecodedImage::solid(LOADING_PIXEL));
        loader.load_texture(handle, path);
        self.entries.insert(filename.to_string(), handle);
        handle
    }

    pub fn get(&self, filename: &str) -> Option<TextureHandle> {
        self.entries.get(filename).copied()
    }

    /// Number of distinct files requested so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::{loader::LoadEvent, source::MemorySource, texture_data::tests::png_bytes},
        gfx::device::RecordingDevice,
    };
    use std::sync::Arc;

    #[test]
    fn test_same_filename_loads_once() {
        let source = Arc::new(MemorySource::new().with_bytes("data/Letto/foo.png", png_bytes(2, 2)));
        let loader = AssetLoader::inline(source.clone());
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new("data/Letto/", &mut device);

        let first = cache.acquire("foo.png", &mut device, &loader);
        let second = cache.acquire("foo.png", &mut device, &loader);

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        // White default plus one placeholder.
        assert_eq!(device.textures.len(), 2);
        let events = loader.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LoadEvent::Texture { path, .. } if path == "data/Letto/foo.png"));
        assert_eq!(source.reads("data/Letto/foo.png"), 1);
    }

    #[test]
    fn test_placeholder_is_loading_colour() {
        let loader = AssetLoader::inline(Arc::new(MemorySource::new()));
        let mut device = RecordingDevice::new();
        let mut cache = TextureCache::new("", &mut device);
        let handle = cache.acquire("missing.png", &mut device, &loader);

        assert_ne!(handle, cache.white());
        assert_eq!(cache.get("missing.png"), Some(handle));
        assert_eq!(device.textures[1], (handle, "missing.png".to_string(), (1, 1)));
    }
}
