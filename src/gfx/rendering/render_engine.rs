//! WGPU-based rendering engine for the room viewer
//!
//! Owns the surface, device and every pipeline, and executes the
//! [`Frame`] descriptions built by [`super::frame::record_frame`]: an
//! optional depth pass from the light, the main pass, the light frustum
//! wireframe, the skybox and finally the UI overlay.

use std::sync::Arc;
use wgpu::{Device, TextureFormat};

use crate::{
    error::RenderError,
    gfx::{
        camera::camera_utils::convert_matrix4_to_array,
        device::CubemapHandle,
        resources::{
            global_bindings::{FrameUniform, GlobalBindings, LineUniform},
            texture_resource::TextureResource,
        },
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

use super::{
    frame::{DrawCall, Frame, Program, SkyboxDraw},
    gpu_resources::GpuResources,
    pipeline_manager::{PipelineConfig, PipelineManager},
};

const SURFACE_SHADER: &str = include_str!("shaders/surface.wgsl");

const FRUSTUM_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// MUST match `Sky` in the skybox shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyboxUniform {
    inverse_view_projection: [[f32; 4]; 4],
    light_color: [f32; 4],
}

impl From<&SkyboxDraw> for SkyboxUniform {
    fn from(draw: &SkyboxDraw) -> Self {
        let c = draw.light_color;
        Self {
            inverse_view_projection: convert_matrix4_to_array(draw.inverse_view_projection),
            light_color: [c.x, c.y, c.z, 1.0],
        }
    }
}

struct SkyboxBindings {
    layout: BindGroupLayoutWithDesc,
    ubo: UniformBuffer<SkyboxUniform>,
    /// Rebuilt when the skybox switches to another cubemap.
    bind_group: Option<(CubemapHandle, wgpu::BindGroup)>,
}

/// Keeps a surface inside `1..=max` on both axes. A larger window is
/// stretched from the clamped surface.
fn clamp_surface_size(width: u32, height: u32, max: u32) -> (u32, u32) {
    (width.clamp(1, max), height.clamp(1, max))
}

fn pipeline_name(program: Program) -> &'static str {
    match program {
        Program::Depth => "Depth",
        Program::Lit => "Lit",
        Program::Shadowed => "Shadowed",
    }
}

fn draw_parts(pass: &mut wgpu::RenderPass<'_>, resources: &GpuResources, draws: &[DrawCall]) {
    for draw in draws {
        let Some(part) = resources.part(draw.part) else {
            continue;
        };
        if part.vertex_count == 0 {
            continue;
        }
        pass.set_bind_group(1, part.bind_group, &[]);
        pass.set_vertex_buffer(0, part.vertices.slice(..));
        pass.draw(0..part.vertex_count, 0..1);
    }
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    resources: GpuResources,
    main_bindings: GlobalBindings<FrameUniform>,
    light_bindings: GlobalBindings<FrameUniform>,
    line_bindings: GlobalBindings<LineUniform>,
    skybox: SkyboxBindings,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    ///
    /// # Errors
    /// Fails when no surface, adapter or device can be obtained.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let (width, height) =
            clamp_surface_size(width, height, device.limits().max_texture_dimension_2d);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(
            &device,
            config.width,
            config.height,
            "depth_texture",
        );

        let main_bindings = GlobalBindings::new(&device, "Main Frame Bindings");
        let light_bindings = GlobalBindings::new(&device, "Light Frame Bindings");
        let line_bindings = GlobalBindings::new(&device, "Frustum Bindings");

        let skybox_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::sampler(
                wgpu::SamplerBindingType::Filtering,
            ))
            .create(&device, "Skybox Bind Group Layout");
        let skybox = SkyboxBindings {
            ubo: UniformBuffer::new(&device),
            layout: skybox_layout,
            bind_group: None,
        };

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let resources = GpuResources::new(device_handle.clone(), queue_handle.clone());
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("depth", include_str!("shaders/depth.wgsl"));
        pipeline_manager.load_shader(
            "lit",
            &[SURFACE_SHADER, include_str!("shaders/lit.wgsl")].concat(),
        );
        pipeline_manager.load_shader(
            "shadowed",
            &[SURFACE_SHADER, include_str!("shaders/shadowed.wgsl")].concat(),
        );
        pipeline_manager.load_shader("lines", include_str!("shaders/lines.wgsl"));
        pipeline_manager.load_shader("skybox", include_str!("shaders/skybox.wgsl"));

        // No culling in the depth pass so thin geometry still casts shadows
        pipeline_manager.register_pipeline(
            pipeline_name(Program::Depth),
            PipelineConfig::default()
                .with_label("DEPTH")
                .with_shader("depth")
                .with_vertex_only()
                .with_cull_mode(None)
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_bind_group_layouts(vec![
                    light_bindings.bind_group_layout().clone(),
                    resources.part_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            pipeline_name(Program::Lit),
            PipelineConfig::default()
                .with_label("LIT")
                .with_shader("lit")
                .with_blended_target(format)
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_bind_group_layouts(vec![
                    main_bindings.bind_group_layout().clone(),
                    resources.part_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            pipeline_name(Program::Shadowed),
            PipelineConfig::default()
                .with_label("SHADOWED")
                .with_shader("shadowed")
                .with_blended_target(format)
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_bind_group_layouts(vec![
                    main_bindings.bind_group_layout().clone(),
                    resources.part_layout().clone(),
                    resources.shadow_layout().clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            "Frustum",
            PipelineConfig::default()
                .with_label("FRUSTUM")
                .with_shader("lines")
                .with_opaque_target(format)
                .with_primitive_topology(wgpu::PrimitiveTopology::LineList)
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_bind_group_layouts(vec![line_bindings.bind_group_layout().clone()]),
        );

        // Drawn last at the far plane, so only where nothing else was drawn
        pipeline_manager.register_pipeline(
            "Skybox",
            PipelineConfig::default()
                .with_label("SKYBOX")
                .with_shader("skybox")
                .with_opaque_target(format)
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_depth_format(TextureResource::DEPTH_FORMAT)
                .with_depth_compare(wgpu::CompareFunction::LessEqual, false)
                .with_bind_group_layouts(vec![skybox.layout.layout.clone()]),
        );

        if let Err(errors) = pipeline_manager.create_all_pipelines() {
            for error in errors {
                log::error!("{}", error);
            }
        }
        log::debug!("{:?}", pipeline_manager.get_stats());

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            format,
            pipeline_manager,
            resources,
            main_bindings,
            light_bindings,
            line_bindings,
            skybox,
        })
    }

    /// The resource owner scene code creates GPU objects through.
    pub fn resources_mut(&mut self) -> &mut GpuResources {
        &mut self.resources
    }

    /// Uploads uniforms and refreshes bind groups for everything `frame` draws.
    fn prepare(&mut self, frame: &Frame) {
        self.main_bindings
            .update(&self.queue, FrameUniform::from(&frame.main_pass.uniforms));

        let shadow_draws = frame
            .shadow_pass
            .iter()
            .flat_map(|shadow| shadow.pass.recorder.draws());
        for draw in frame.main_pass.recorder.draws().iter().chain(shadow_draws) {
            self.resources.prepare_draw(draw);
        }

        if let Some(shadow) = &frame.shadow_pass {
            self.light_bindings
                .update(&self.queue, FrameUniform::from(&shadow.pass.uniforms));
        }

        if let Some(frustum) = frame.frustum {
            let uniforms = &frame.main_pass.uniforms;
            self.line_bindings.update(
                &self.queue,
                LineUniform::new(uniforms.projection * uniforms.view, frustum, FRUSTUM_COLOR),
            );
        }

        if let Some(sky) = &frame.skybox {
            self.skybox.ubo.update_content(&self.queue, SkyboxUniform::from(sky));
            let current = self.skybox.bind_group.as_ref().map(|(handle, _)| *handle);
            if current != Some(sky.cubemap) {
                self.skybox.bind_group = self.resources.cubemap(sky.cubemap).map(|cubemap| {
                    let group = BindGroupBuilder::new(&self.skybox.layout)
                        .resource(self.skybox.ubo.binding_resource())
                        .texture(&cubemap.view)
                        .sampler(&cubemap.sampler)
                        .create(&self.device, "Skybox Bind Group");
                    (sky.cubemap, group)
                });
            }
        }
    }

    /// Renders `frame`, then lets `ui_callback` draw on top before presenting.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn render_frame<F>(&mut self, frame: &Frame, ui_callback: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let (width, height) = frame.size;
        if width > 0
            && height > 0
            && clamp_surface_size(width, height, self.max_surface_dimension())
                != self.get_surface_size()
        {
            self.resize(width, height);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for the next surface texture");
                return;
            }
            Err(e) => {
                log::error!("Failed to get surface texture: {}", e);
                return;
            }
        };

        self.prepare(frame);

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: depth from the light
        let shadow_map = frame
            .shadow_pass
            .as_ref()
            .and_then(|shadow| self.resources.shadow_map(shadow.depth_map).map(|m| (shadow, m)));
        if let Some((shadow, map)) = shadow_map {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &map.resource.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.pipeline_manager.pipeline(pipeline_name(Program::Depth)) {
                shadow_pass.set_pipeline(pipeline);
                shadow_pass.set_bind_group(0, self.light_bindings.bind_group(), &[]);
                draw_parts(&mut shadow_pass, &self.resources, shadow.pass.recorder.draws());
            }
        }

        // PASS 2: main pass, frustum wireframe and skybox
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Fall back to plain lighting if the depth map vanished
            let program = match (frame.main_pass.program, shadow_map) {
                (Program::Shadowed, None) => Program::Lit,
                (program, _) => program,
            };

            if let Some(pipeline) = self.pipeline_manager.pipeline(pipeline_name(program)) {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, self.main_bindings.bind_group(), &[]);
                if let (Program::Shadowed, Some((_, map))) = (program, shadow_map) {
                    render_pass.set_bind_group(2, &map.bind_group, &[]);
                }
                draw_parts(&mut render_pass, &self.resources, frame.main_pass.recorder.draws());
            }

            if frame.frustum.is_some() {
                if let Some(pipeline) = self.pipeline_manager.pipeline("Frustum") {
                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(0, self.line_bindings.bind_group(), &[]);
                    render_pass.draw(0..24, 0..1);
                }
            }

            if frame.skybox.is_some() {
                let group = self.skybox.bind_group.as_ref().map(|(_, group)| group);
                if let (Some(pipeline), Some(group)) =
                    (self.pipeline_manager.pipeline("Skybox"), group)
                {
                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(0, group, &[]);
                    render_pass.draw(0..6, 0..1);
                }
            }
        }

        // PASS 3: UI overlay
        ui_callback(
            &self.device,
            &self.queue,
            &mut encoder,
            &surface_texture_view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Resizes the render engine surface and recreates depth buffer
    ///
    /// Zero sizes (minimized windows) are ignored. The shadow map keeps its
    /// fixed resolution.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        let (width, height) = clamp_surface_size(width, height, self.max_surface_dimension());
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, width, height, "depth_texture");
    }

    fn max_surface_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Returns current surface dimensions
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface texture format
    ///
    /// Used for creating compatible render targets and UI systems.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_is_clamped_to_device_limit() {
        assert_eq!(clamp_surface_size(5120, 2880, 4096), (4096, 2880));
        assert_eq!(clamp_surface_size(1200, 800, 4096), (1200, 800));
        assert_eq!(clamp_surface_size(0, 0, 4096), (1, 1));
    }

    #[test]
    fn test_pipeline_names_are_distinct() {
        let names = [Program::Depth, Program::Lit, Program::Shadowed].map(pipeline_name);
        assert_eq!(names, ["Depth", "Lit", "Shadowed"]);
    }
}
