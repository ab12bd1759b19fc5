//! Per-pass uniform bindings
//!
//! Every pass binds one uniform block at group 0. The layouts here MUST
//! match the `Frame` and `Lines` structs declared in the shaders.

use cgmath::{Matrix4, Vector3};

use crate::{
    gfx::{camera::camera_utils::convert_matrix4_to_array, rendering::frame::FrameUniforms},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Camera, light and shadow values shared by all draws of a pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    texture_matrix: [[f32; 4]; 4],
    camera_position: [f32; 4],
    light_position: [f32; 4],
    light_direction: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    /// x: depth bias, y: 1.0 when the shadow map is sampled
    params: [f32; 4],
}
// 3 * 64 + 6 * 16 = 288 bytes

fn extend(v: Vector3<f32>, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

impl From<&FrameUniforms> for FrameUniform {
    fn from(uniforms: &FrameUniforms) -> Self {
        Self {
            view: convert_matrix4_to_array(uniforms.view),
            projection: convert_matrix4_to_array(uniforms.projection),
            texture_matrix: convert_matrix4_to_array(uniforms.texture_matrix),
            camera_position: extend(uniforms.camera_position, 1.0),
            light_position: extend(uniforms.light_position, 1.0),
            light_direction: extend(uniforms.light_direction, 0.0),
            light_color: extend(uniforms.light_color, 1.0),
            ambient: extend(uniforms.ambient, 1.0),
            params: [
                uniforms.bias,
                if uniforms.shadows { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

/// Draws the unit cube through `frustum` as a wireframe.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineUniform {
    view_projection: [[f32; 4]; 4],
    frustum: [[f32; 4]; 4],
    color: [f32; 4],
}

impl LineUniform {
    pub fn new(view_projection: Matrix4<f32>, frustum: Matrix4<f32>, color: [f32; 4]) -> Self {
        Self {
            view_projection: convert_matrix4_to_array(view_projection),
            frustum: convert_matrix4_to_array(frustum),
            color,
        }
    }
}

/// A uniform buffer together with the bind group exposing it at binding 0.
pub struct GlobalBindings<Content> {
    ubo: UniformBuffer<Content>,
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl<Content: bytemuck::Pod> GlobalBindings<Content> {
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, &format!("{} Layout", label));
        let ubo = UniformBuffer::new(device);
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, label);

        GlobalBindings {
            ubo,
            bind_group_layout,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, content: Content) {
        self.ubo.update_content(queue, content);
    }

    /// Used when creating render pipelines that read this block.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    fn uniforms(shadows: bool) -> FrameUniforms {
        FrameUniforms {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            texture_matrix: Matrix4::from_scale(0.5),
            camera_position: Vector3::new(1.0, 2.0, 3.0),
            light_position: Vector3::new(10.0, 2.0, 10.0),
            light_direction: Vector3::unit_y(),
            light_color: Vector3::new(1.0, 1.0, 1.0),
            ambient: Vector3::new(0.1, 0.1, 0.1),
            bias: -0.0001,
            shadows,
        }
    }

    #[test]
    fn test_frame_uniform_layout() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 288);
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<LineUniform>(), 144);
    }

    #[test]
    fn test_frame_uniform_packs_flags_and_points() {
        let gpu = FrameUniform::from(&uniforms(true));
        assert_eq!(gpu.camera_position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(gpu.light_direction, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(gpu.params, [-0.0001, 1.0, 0.0, 0.0]);
        assert_eq!(gpu.texture_matrix[0][0], 0.5);

        let unshadowed = FrameUniform::from(&uniforms(false));
        assert_eq!(unshadowed.params[1], 0.0);
    }
}
