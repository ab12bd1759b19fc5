//! Frame recording
//!
//! A frame is first described as plain data: which passes run, with which
//! uniforms, drawing which parts. [`record_frame`] builds that description
//! from the scene and the render engine executes it. Nothing here touches
//! the GPU.

use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};

use crate::gfx::{
    camera::camera_utils::projection,
    device::{CubemapHandle, PartHandle, ShadowMapHandle},
    scene::{mesh_entity::ResolvedMaterial, LightSpace, Scene},
};

/// Shader program a pass draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// Depth only, from the light.
    Depth,
    /// Ambient plus directional light, no shadow lookup.
    Lit,
    /// Lighting with the shadow map projected into the scene.
    Shadowed,
}

/// Values shared by every draw of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    /// World space to shadow-map coordinates. Identity without shadows.
    pub texture_matrix: Matrix4<f32>,
    pub camera_position: Vector3<f32>,
    pub light_position: Vector3<f32>,
    /// Unit vector towards the light.
    pub light_direction: Vector3<f32>,
    pub light_color: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub bias: f32,
    pub shadows: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub part: PartHandle,
    pub material: ResolvedMaterial,
    pub world: Matrix4<f32>,
}

/// Collects the draws of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassRecorder {
    draws: Vec<DrawCall>,
}

impl PassRecorder {
    pub fn draw(&mut self, part: PartHandle, material: ResolvedMaterial, world: Matrix4<f32>) {
        self.draws.push(DrawCall {
            part,
            material,
            world,
        });
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub program: Program,
    pub uniforms: FrameUniforms,
    pub recorder: PassRecorder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowPass {
    pub depth_map: ShadowMapHandle,
    pub pass: Pass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyboxDraw {
    pub cubemap: CubemapHandle,
    /// Inverse of projection times the translation-free view.
    pub inverse_view_projection: Matrix4<f32>,
    pub light_color: Vector3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub size: (u32, u32),
    pub shadow_pass: Option<ShadowPass>,
    pub main_pass: Pass,
    /// Maps the unit cube onto the light frustum; drawn as lines when set.
    pub frustum: Option<Matrix4<f32>>,
    pub skybox: Option<SkyboxDraw>,
}

fn record_pass(scene: &Scene, program: Program, uniforms: FrameUniforms) -> Pass {
    let mut recorder = PassRecorder::default();
    for mesh in scene.meshes() {
        mesh.render(&mut recorder);
    }
    Pass {
        program,
        uniforms,
        recorder,
    }
}

/// Describes the next frame. Advances the animated camera.
pub fn record_frame(scene: &mut Scene, width: u32, height: u32) -> Frame {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    let projection = projection(aspect);
    let view = scene.camera.view_matrix();
    let camera_position = scene.camera.position();

    let light = scene.light;
    let base = FrameUniforms {
        view,
        projection,
        texture_matrix: Matrix4::identity(),
        camera_position: Vector3::new(camera_position.x, camera_position.y, camera_position.z),
        light_position: Vector3::from(light.position),
        light_direction: light.normalized_direction(),
        light_color: Vector3::from(light.color),
        ambient: Vector3::from(light.ambient),
        bias: scene.shadow.bias,
        shadows: false,
    };

    let (shadow_pass, main_pass, frustum) = match scene.shadow.depth_map {
        Some(depth_map) if scene.shadow.enabled => {
            let space = LightSpace::new(&light, &scene.shadow);
            let depth = record_pass(
                scene,
                Program::Depth,
                FrameUniforms {
                    view: space.view,
                    projection: space.projection,
                    light_direction: space.direction,
                    ..base
                },
            );
            let main = record_pass(
                scene,
                Program::Shadowed,
                FrameUniforms {
                    texture_matrix: space.texture_matrix,
                    light_direction: space.direction,
                    shadows: true,
                    ..base
                },
            );
            let frustum = scene.shadow.show_frustum.then_some(space.frustum);
            (
                Some(ShadowPass {
                    depth_map,
                    pass: depth,
                }),
                main,
                frustum,
            )
        }
        _ => (None, record_pass(scene, Program::Lit, base), None),
    };

    let skybox = scene.skybox.visible_cubemap().map(|cubemap| {
        let mut rotation = view;
        rotation.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
        SkyboxDraw {
            cubemap,
            inverse_view_projection: (projection * rotation)
                .invert()
                .unwrap_or_else(Matrix4::identity),
            light_color: base.light_color,
        }
    });

    Frame {
        size: (width, height),
        shadow_pass,
        main_pass,
        frustum,
        skybox,
    }
}
