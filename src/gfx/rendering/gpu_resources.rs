//! wgpu implementation of [`GpuDevice`]
//!
//! Owns every texture, cubemap, vertex buffer and shadow map the scene
//! creates and hands out handles for them. Each part also keeps its own
//! material uniform and a bind group that is rebuilt only when one of its
//! textures changes.

use std::{collections::HashMap, sync::Arc};

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    assets::texture_data::{DecodedImage, WHITE_PIXEL},
    gfx::{
        camera::camera_utils::convert_matrix4_to_array,
        device::{
            CubemapHandle, GpuDevice, PartHandle, ShadowMapHandle, ShadowSampling, TextureHandle,
        },
        resources::TextureResource,
        scene::{mesh_entity::ResolvedMaterial, vertex::MeshVertex},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

use super::frame::DrawCall;

/// Per-draw material block. MUST match `Part` in the surface shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PartUniform {
    world: [[f32; 4]; 4],
    diffuse: [f32; 4],
    ambient: [f32; 4],
    specular: [f32; 4],
    emissive: [f32; 4],
}

impl PartUniform {
    pub fn new(material: &ResolvedMaterial, world: Matrix4<f32>) -> Self {
        let [dr, dg, db] = material.diffuse;
        let [ar, ag, ab] = material.ambient;
        let [sr, sg, sb] = material.specular;
        let [er, eg, eb] = material.emissive;
        let normal_flag = if material.normal_map.is_some() { 1.0 } else { 0.0 };
        Self {
            world: convert_matrix4_to_array(world),
            diffuse: [dr, dg, db, material.opacity],
            ambient: [ar, ag, ab, 1.0],
            specular: [sr, sg, sb, material.shininess],
            emissive: [er, eg, eb, normal_flag],
        }
    }
}

struct TextureSlot {
    resource: TextureResource,
    /// Bumped whenever the image behind the handle changes.
    version: u64,
}

/// Texture identities a part bind group was built from.
type MaterialKey = [(u32, u64); 3];

struct GpuPart {
    label: String,
    vertices: wgpu::Buffer,
    vertex_count: u32,
    uniform: UniformBuffer<PartUniform>,
    bind_group: Option<(MaterialKey, wgpu::BindGroup)>,
}

pub struct ShadowMap {
    pub resource: TextureResource,
    pub size: u32,
    pub bind_group: wgpu::BindGroup,
}

/// Everything needed to issue one draw.
pub struct PartBinding<'a> {
    pub vertices: &'a wgpu::Buffer,
    pub vertex_count: u32,
    pub bind_group: &'a wgpu::BindGroup,
}

pub struct GpuResources {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    next_raw: u32,
    next_version: u64,
    textures: HashMap<TextureHandle, TextureSlot>,
    /// Bound wherever a material has no texture or references an unknown one.
    fallback: TextureSlot,
    cubemaps: HashMap<CubemapHandle, TextureResource>,
    parts: HashMap<PartHandle, GpuPart>,
    shadow_maps: HashMap<ShadowMapHandle, ShadowMap>,
    part_layout: BindGroupLayoutWithDesc,
    shadow_layout: BindGroupLayoutWithDesc,
}

fn slot<'a>(
    textures: &'a HashMap<TextureHandle, TextureSlot>,
    fallback: &'a TextureSlot,
    handle: Option<TextureHandle>,
) -> (u32, &'a TextureSlot) {
    match handle.and_then(|h| textures.get(&h).map(|slot| (h.raw(), slot))) {
        Some(found) => found,
        None => (0, fallback),
    }
}

fn material_key(
    textures: &HashMap<TextureHandle, TextureSlot>,
    fallback: &TextureSlot,
    material: &ResolvedMaterial,
) -> MaterialKey {
    [
        Some(material.diffuse_map),
        Some(material.specular_map),
        material.normal_map,
    ]
    .map(|handle| {
        let (raw, slot) = slot(textures, fallback, handle);
        (raw, slot.version)
    })
}

impl GpuResources {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let fallback = TextureSlot {
            resource: TextureResource::from_image(
                &device,
                &queue,
                &DecodedImage::solid(WHITE_PIXEL),
                "Fallback White",
            ),
            version: 0,
        };

        let filtering = wgpu::SamplerBindingType::Filtering;
        let part_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(filtering))
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(filtering))
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(filtering))
            .create(&device, "Part Bind Group Layout");

        let shadow_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_depth_2d())
            .next_binding_fragment(binding_types::sampler(
                wgpu::SamplerBindingType::Comparison,
            ))
            .create(&device, "Shadow Bind Group Layout");

        Self {
            device,
            queue,
            next_raw: 0,
            next_version: 1,
            textures: HashMap::new(),
            fallback,
            cubemaps: HashMap::new(),
            parts: HashMap::new(),
            shadow_maps: HashMap::new(),
            part_layout,
            shadow_layout,
        }
    }

    fn next_raw(&mut self) -> u32 {
        self.next_raw += 1;
        self.next_raw
    }

    fn next_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    pub fn part_layout(&self) -> &wgpu::BindGroupLayout {
        &self.part_layout.layout
    }

    pub fn shadow_layout(&self) -> &wgpu::BindGroupLayout {
        &self.shadow_layout.layout
    }

    /// Writes the draw's material and transform into its part and makes
    /// sure the part's bind group matches the material textures.
    ///
    /// Returns `false` for parts that no longer exist.
    pub fn prepare_draw(&mut self, draw: &DrawCall) -> bool {
        let key = material_key(&self.textures, &self.fallback, &draw.material);
        let Some(part) = self.parts.get_mut(&draw.part) else {
            return false;
        };

        part.uniform
            .update_content(&self.queue, PartUniform::new(&draw.material, draw.world));

        if part.bind_group.as_ref().map(|(k, _)| *k) != Some(key) {
            let (_, diffuse) = slot(&self.textures, &self.fallback, Some(draw.material.diffuse_map));
            let (_, specular) =
                slot(&self.textures, &self.fallback, Some(draw.material.specular_map));
            let (_, normal) = slot(&self.textures, &self.fallback, draw.material.normal_map);

            let bind_group = BindGroupBuilder::new(&self.part_layout)
                .resource(part.uniform.binding_resource())
                .texture(&diffuse.resource.view)
                .sampler(&diffuse.resource.sampler)
                .texture(&specular.resource.view)
                .sampler(&specular.resource.sampler)
                .texture(&normal.resource.view)
                .sampler(&normal.resource.sampler)
                .create(&self.device, &part.label);
            part.bind_group = Some((key, bind_group));
        }
        true
    }

    /// Vertex buffer and bind group of a prepared part.
    pub fn part(&self, handle: PartHandle) -> Option<PartBinding<'_>> {
        let part = self.parts.get(&handle)?;
        let (_, bind_group) = part.bind_group.as_ref()?;
        Some(PartBinding {
            vertices: &part.vertices,
            vertex_count: part.vertex_count,
            bind_group,
        })
    }

    pub fn shadow_map(&self, handle: ShadowMapHandle) -> Option<&ShadowMap> {
        self.shadow_maps.get(&handle)
    }

    pub fn cubemap(&self, handle: CubemapHandle) -> Option<&TextureResource> {
        self.cubemaps.get(&handle)
    }

    fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn shadow_bind_group(&self, resource: &TextureResource) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.shadow_layout)
            .texture(&resource.view)
            .sampler(&resource.sampler)
            .create(&self.device, "Shadow Bind Group")
    }
}

impl GpuDevice for GpuResources {
    fn create_texture(&mut self, label: &str, image: &DecodedImage) -> TextureHandle {
        let handle = TextureHandle::from_raw(self.next_raw());
        let version = self.next_version();
        let resource = if image.fits_within(self.max_dimension()) {
            TextureResource::from_image(&self.device, &self.queue, image, label)
        } else {
            log::warn!(
                "Texture {} is {}x{}, above the device limit; using white",
                label,
                image.width,
                image.height
            );
            let white = DecodedImage::solid(WHITE_PIXEL);
            TextureResource::from_image(&self.device, &self.queue, &white, label)
        };
        self.textures.insert(handle, TextureSlot { resource, version });
        handle
    }

    fn replace_texture(&mut self, handle: TextureHandle, image: &DecodedImage) {
        if !self.textures.contains_key(&handle) {
            log::warn!("Ignoring image for unknown texture {:?}", handle);
            return;
        }
        if !image.fits_within(self.max_dimension()) {
            log::warn!(
                "Keeping placeholder for texture {:?}: {}x{} is above the device limit",
                handle,
                image.width,
                image.height
            );
            return;
        }
        let version = self.next_version();
        let label = format!("Texture {}", handle.raw());
        let resource = TextureResource::from_image(&self.device, &self.queue, image, &label);
        self.textures.insert(handle, TextureSlot { resource, version });
    }

    fn create_cubemap(&mut self, label: &str, faces: &[DecodedImage]) -> CubemapHandle {
        let handle = CubemapHandle::from_raw(self.next_raw());
        let max = self.max_dimension();
        let resource = if faces.iter().all(|face| face.fits_within(max)) {
            TextureResource::cubemap(&self.device, &self.queue, faces, label)
        } else {
            log::warn!("Cubemap {} faces are above the device limit; using white", label);
            let white = vec![DecodedImage::solid(WHITE_PIXEL); 6];
            TextureResource::cubemap(&self.device, &self.queue, &white, label)
        };
        self.cubemaps.insert(handle, resource);
        handle
    }

    fn release_cubemap(&mut self, handle: CubemapHandle) {
        self.cubemaps.remove(&handle);
    }

    fn create_part(&mut self, label: &str, vertices: &[MeshVertex]) -> PartHandle {
        let handle = PartHandle::from_raw(self.next_raw());
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.parts.insert(
            handle,
            GpuPart {
                label: label.to_string(),
                vertices: buffer,
                vertex_count: vertices.len() as u32,
                uniform: UniformBuffer::new(&self.device),
                bind_group: None,
            },
        );
        handle
    }

    fn release_part(&mut self, handle: PartHandle) {
        self.parts.remove(&handle);
    }

    fn create_shadow_map(&mut self, size: u32) -> ShadowMapHandle {
        let max = self.device.limits().max_texture_dimension_2d;
        let size = if size > max {
            log::warn!("Shadow map size {} exceeds device limit, using {}", size, max);
            max
        } else {
            size.max(1)
        };

        let handle = ShadowMapHandle::from_raw(self.next_raw());
        let resource = TextureResource::create_shadow_map(&self.device, size);
        let bind_group = self.shadow_bind_group(&resource);
        self.shadow_maps.insert(
            handle,
            ShadowMap {
                resource,
                size,
                bind_group,
            },
        );
        handle
    }

    fn configure_shadow_map(&mut self, handle: ShadowMapHandle, sampling: ShadowSampling) {
        let sampler = TextureResource::create_shadow_sampler(&self.device, sampling);
        let Some(mut resource) = self.shadow_maps.get(&handle).map(|map| map.resource.clone())
        else {
            log::warn!("Ignoring sampling for unknown shadow map {:?}", handle);
            return;
        };
        resource.sampler = sampler;
        let bind_group = self.shadow_bind_group(&resource);
        if let Some(map) = self.shadow_maps.get_mut(&handle) {
            map.resource = resource;
            map.bind_group = bind_group;
        }
    }
}
