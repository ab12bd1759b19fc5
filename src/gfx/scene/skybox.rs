//! Skybox state
//!
//! The cubemap is requested asynchronously. Each request carries a
//! generation number and only the result of the newest request is applied,
//! so quickly switching back and forth never shows a stale sky. The previous
//! cubemap stays visible until its replacement is ready.

use crate::{
    assets::{
        loader::{AssetLoader, CubemapSources},
        texture_data::DecodedImage,
    },
    error::AssetError,
    gfx::device::{CubemapHandle, GpuDevice},
};

/// Image files for both skybox modes.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyboxFaces {
    /// +X, -X, +Y, -Y, +Z, -Z
    pub photos: [String; 6],
    /// One flat image used on every face.
    pub blank: String,
}

impl Default for SkyboxFaces {
    fn default() -> Self {
        Self {
            photos: ["right", "left", "top", "bottom", "front", "back"]
                .map(|face| format!("data/skybox/{}.png", face)),
            blank: "data/skybox/bianco.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyboxMode {
    Photo,
    Blank,
}

#[derive(Debug)]
pub struct Skybox {
    pub enabled: bool,
    mode: SkyboxMode,
    faces: SkyboxFaces,
    generation: u64,
    cubemap: Option<CubemapHandle>,
}

impl Skybox {
    pub fn new(faces: SkyboxFaces) -> Self {
        Self {
            enabled: false,
            mode: SkyboxMode::Photo,
            faces,
            generation: 0,
            cubemap: None,
        }
    }

    pub fn mode(&self) -> SkyboxMode {
        self.mode
    }

    pub fn cubemap(&self) -> Option<CubemapHandle> {
        self.cubemap
    }

    /// The cubemap to draw this frame, if any.
    pub fn visible_cubemap(&self) -> Option<CubemapHandle> {
        self.cubemap.filter(|_| self.enabled)
    }

    /// Requests the cubemap for the current mode.
    pub fn prepare(&mut self, loader: &AssetLoader) {
        self.generation += 1;
        let sources = match self.mode {
            SkyboxMode::Photo => CubemapSources::Faces(self.faces.photos.clone()),
            SkyboxMode::Blank => CubemapSources::Replicated(self.faces.blank.clone()),
        };
        log::debug!("Requesting {:?} skybox (generation {})", self.mode, self.generation);
        loader.load_cubemap(self.generation, sources);
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Flips between photo and blank mode. Does nothing while disabled.
    pub fn switch(&mut self, loader: &AssetLoader) {
        if !self.enabled {
            return;
        }
        self.mode = match self.mode {
            SkyboxMode::Photo => SkyboxMode::Blank,
            SkyboxMode::Blank => SkyboxMode::Photo,
        };
        self.prepare(loader);
    }

    /// Applies a finished cubemap load. Results of older requests are dropped.
    pub fn apply(
        &mut self,
        generation: u64,
        result: Result<Vec<DecodedImage>, AssetError>,
        device: &mut dyn GpuDevice,
    ) {
        if generation != self.generation {
            log::debug!(
                "Dropping skybox generation {} (current {})",
                generation,
                self.generation
            );
            return;
        }

        match result {
            Ok(faces) => {
                let label = match self.mode {
                    SkyboxMode::Photo => "skybox",
                    SkyboxMode::Blank => "skybox (blank)",
                };
                let cubemap = device.create_cubemap(label, &faces);
                if let Some(old) = self.cubemap.replace(cubemap) {
                    device.release_cubemap(old);
                }
                self.enabled = true;
                log::info!("Skybox ready ({:?})", self.mode);
            }
            Err(e) => log::error!("Failed to load skybox: {}", e),
        }
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

    fn sky_source() -> MemorySource {
        let faces = SkyboxFaces::default();
        faces
            .photos
            .iter()
            .fold(MemorySource::new(), |s, path| s.with_bytes(path, png_bytes(4, 4)))
            .with_bytes(&faces.blank, png_bytes(2, 2))
    }

    fn apply_all(skybox: &mut Skybox, loader: &AssetLoader, device: &mut RecordingDevice) {
        for event in loader.drain() {
            if let LoadEvent::Cubemap { generation, result } = event {
                skybox.apply(generation, result, device);
            }
        }
    }

    #[test]
    fn test_completion_enables_skybox() {
        let loader = AssetLoader::inline(Arc::new(sky_source()));
        let mut device = RecordingDevice::new();
        let mut skybox = Skybox::new(SkyboxFaces::default());

        skybox.prepare(&loader);
        assert_eq!(skybox.visible_cubemap(), None);
        apply_all(&mut skybox, &loader, &mut device);

        assert!(skybox.enabled);
        assert!(skybox.visible_cubemap().is_some());
        skybox.toggle();
        assert_eq!(skybox.visible_cubemap(), None);
    }

    #[test]
    fn test_switch_only_while_enabled() {
        let loader = AssetLoader::inline(Arc::new(sky_source()));
        let mut skybox = Skybox::new(SkyboxFaces::default());
        skybox.switch(&loader);
        assert_eq!(skybox.mode(), SkyboxMode::Photo);
        assert!(loader.drain().is_empty());

        skybox.enabled = true;
        skybox.switch(&loader);
        assert_eq!(skybox.mode(), SkyboxMode::Blank);
        assert_eq!(loader.drain().len(), 1);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let loader = AssetLoader::inline(Arc::new(sky_source()));
        let mut device = RecordingDevice::new();
        let mut skybox = Skybox::new(SkyboxFaces::default());

        skybox.prepare(&loader);
        skybox.enabled = true;
        skybox.switch(&loader);
        apply_all(&mut skybox, &loader, &mut device);

        assert_eq!(device.cubemaps.len(), 1);
        assert_eq!(device.cubemaps[0].1, "skybox (blank)");
    }

    #[test]
    fn test_replacement_releases_previous_cubemap() {
        let loader = AssetLoader::inline(Arc::new(sky_source()));
        let mut device = RecordingDevice::new();
        let mut skybox = Skybox::new(SkyboxFaces::default());

        skybox.prepare(&loader);
        apply_all(&mut skybox, &loader, &mut device);
        let first = skybox.cubemap();
        skybox.switch(&loader);
        assert_eq!(skybox.cubemap(), first);
        apply_all(&mut skybox, &loader, &mut device);

        assert_ne!(skybox.cubemap(), first);
        assert_eq!(device.released_cubemaps, vec![first.unwrap()]);
    }

    #[test]
    fn test_failed_load_keeps_skybox_disabled() {
        let loader = AssetLoader::inline(Arc::new(MemorySource::new()));
        let mut device = RecordingDevice::new();
        let mut skybox = Skybox::new(SkyboxFaces::default());
        skybox.prepare(&loader);
        apply_all(&mut skybox, &loader, &mut device);
        assert!(!skybox.enabled);
        assert!(device.cubemaps.is_empty());
    }
}
