//! GPU resource seam
//!
//! Scene code creates and releases GPU resources only through [`GpuDevice`]
//! and refers to them by small copyable handles. The wgpu implementation
//! lives in [`crate::gfx::rendering::gpu_resources`]; tests use
//! [`RecordingDevice`].

use crate::{assets::texture_data::DecodedImage, gfx::scene::vertex::MeshVertex};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// A 2D texture. Its contents may be replaced while the handle stays valid.
    TextureHandle
);
handle!(
    /// A six-face cube texture.
    CubemapHandle
);
handle!(
    /// One uploaded vertex buffer of a mesh entity.
    PartHandle
);
handle!(
    /// A depth texture rendered from the light.
    ShadowMapHandle
);

/// Sampler state of the shadow depth map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSampling {
    /// Compare against the stored depth. When off every lookup passes and
    /// nothing is shadowed.
    pub compare: bool,
    /// Linear filtering (percentage closer on most hardware) instead of nearest.
    pub linear: bool,
}

impl Default for ShadowSampling {
    fn default() -> Self {
        Self {
            compare: true,
            linear: false,
        }
    }
}

pub trait GpuDevice {
    fn create_texture(&mut self, label: &str, image: &DecodedImage) -> TextureHandle;

    /// Swaps the image behind `handle`, e.g. a placeholder for the real file.
    fn replace_texture(&mut self, handle: TextureHandle, image: &DecodedImage);

    /// `faces` are ordered +X, -X, +Y, -Y, +Z, -Z.
    fn create_cubemap(&mut self, label: &str, faces: &[DecodedImage]) -> CubemapHandle;

    fn release_cubemap(&mut self, handle: CubemapHandle);

    fn create_part(&mut self, label: &str, vertices: &[MeshVertex]) -> PartHandle;

    fn release_part(&mut self, handle: PartHandle);

    fn create_shadow_map(&mut self, size: u32) -> ShadowMapHandle;

    fn configure_shadow_map(&mut self, handle: ShadowMapHandle, sampling: ShadowSampling);
}

/// Remembers every call instead of talking to a GPU.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next: u32,
    pub textures: Vec<(TextureHandle, String, (u32, u32))>,
    pub replaced: Vec<(TextureHandle, (u32, u32))>,
    pub cubemaps: Vec<(CubemapHandle, String)>,
    pub released_cubemaps: Vec<CubemapHandle>,
    pub parts: Vec<(PartHandle, String, usize)>,
    pub released_parts: Vec<PartHandle>,
    pub shadow_maps: Vec<(ShadowMapHandle, u32)>,
    pub shadow_configs: Vec<(ShadowMapHandle, ShadowSampling)>,
}

#[cfg(test)]
impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_raw(&mut self) -> u32 {
        self.next += 1;
        self.next
    }

    /// Parts created and not yet released.
    pub fn live_parts(&self) -> usize {
        self.parts
            .iter()
            .filter(|(handle, _, _)| !self.released_parts.contains(handle))
            .count()
    }
}

#[cfg(test)]
impl GpuDevice for RecordingDevice {
    fn create_texture(&mut self, label: &str, image: &DecodedImage) -> TextureHandle {
        let handle = TextureHandle(self.next_raw());
        self.textures
            .push((handle, label.to_string(), (image.width, image.height)));
        handle
    }

    fn replace_texture(&mut self, handle: TextureHandle, image: &DecodedImage) {
        self.replaced.push((handle, (image.width, image.height)));
    }

    fn create_cubemap(&mut self, label: &str, _faces: &[DecodedImage]) -> CubemapHandle {
        let handle = CubemapHandle(self.next_raw());
        self.cubemaps.push((handle, label.to_string()));
        handle
    }

    fn release_cubemap(&mut self, handle: CubemapHandle) {
        self.released_cubemaps.push(handle);
    }

    fn create_part(&mut self, label: &str, vertices: &[MeshVertex]) -> PartHandle {
        let handle = PartHandle(self.next_raw());
        self.parts.push((handle, label.to_string(), vertices.len()));
        handle
    }

    fn release_part(&mut self, handle: PartHandle) {
        self.released_parts.push(handle);
    }

    fn create_shadow_map(&mut self, size: u32) -> ShadowMapHandle {
        let handle = ShadowMapHandle(self.next_raw());
        self.shadow_maps.push((handle, size));
        handle
    }

    fn configure_shadow_map(&mut self, handle: ShadowMapHandle, sampling: ShadowSampling) {
        self.shadow_configs.push((handle, sampling));
    }
}
