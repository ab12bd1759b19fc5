//! # Mesh Entities
//!
//! A [`MeshEntity`] is one model placed in the room. Creating it only queues
//! a load job; the entity stays [`LoadState::Loading`] (and invisible) until
//! the job's [`PreparedMesh`] is applied on the main thread, which uploads
//! its vertex buffers and requests its textures.
//!
//! The entity's position is baked into the vertex data at load time, so
//! moving an entity means loading a fresh copy at the new position.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    assets::{
        loader::AssetLoader,
        mtl::{parse_mtl, MaterialDesc, Materials},
        obj::parse_obj,
        source::{base_dir, resolve, AssetSource},
    },
    error::AssetError,
    gfx::{
        device::{GpuDevice, PartHandle, TextureHandle},
        rendering::frame::PassRecorder,
    },
};

use super::{
    texture_cache::TextureCache,
    vertex::{interleave, MeshVertex},
};

/// What to load and where to put it. Paths are relative to the asset root.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    pub name: String,
    pub mesh_source: String,
    pub material_source: Option<String>,
    /// World-space offset added to every vertex.
    pub position: [f32; 3],
}

impl MeshDescriptor {
    pub fn new(
        name: &str,
        mesh_source: &str,
        material_source: Option<&str>,
        position: [f32; 3],
    ) -> Self {
        Self {
            name: name.to_string(),
            mesh_source: mesh_source.to_string(),
            material_source: material_source.map(str::to_string),
            position,
        }
    }

    /// The same model at another position.
    pub fn at(&self, position: [f32; 3]) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

/// Process-unique entity identity used to route load results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u64);

impl EntityId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// One geometry, interleaved and translated, still on the CPU.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedGeometry {
    pub material: String,
    pub vertices: Vec<MeshVertex>,
}

/// Output of a mesh load job.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMesh {
    pub geometries: Vec<PreparedGeometry>,
    pub materials: Materials,
    /// Directory of the mesh file; texture filenames are relative to it.
    pub base_dir: String,
}

/// Reads and parses a mesh and its material library. Runs on loader threads.
///
/// Without an explicit material source the mesh's own `mtllib` references
/// are used, resolved against the mesh's directory.
pub fn prepare_mesh(
    source: &dyn AssetSource,
    descriptor: &MeshDescriptor,
) -> Result<PreparedMesh, AssetError> {
    let text = source.read_text(&descriptor.mesh_source)?;
    let obj = parse_obj(&text)?;
    let base = base_dir(&descriptor.mesh_source).to_string();

    let mut materials = Materials::new();
    match &descriptor.material_source {
        Some(path) => materials = parse_mtl(&source.read_text(path)?)?,
        None => {
            for lib in &obj.material_libs {
                materials.extend(parse_mtl(&source.read_text(&resolve(&base, lib))?)?);
            }
        }
    }

    let [dx, dy, dz] = descriptor.position;
    let geometries = obj
        .geometries
        .into_iter()
        .map(|geometry| {
            let data = geometry.data;
            let position: Vec<f32> = data
                .position
                .chunks_exact(3)
                .flat_map(|p| [p[0] + dx, p[1] + dy, p[2] + dz])
                .collect();
            PreparedGeometry {
                material: geometry.material,
                vertices: interleave(
                    &position,
                    data.normal.as_deref(),
                    data.texcoord.as_deref(),
                    data.color.as_deref(),
                ),
            }
        })
        .collect();

    Ok(PreparedMesh {
        geometries,
        materials,
        base_dir: base,
    })
}

/// A material with every default filled in and textures resolved to handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMaterial {
    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    pub diffuse_map: TextureHandle,
    pub specular_map: TextureHandle,
    pub normal_map: Option<TextureHandle>,
    pub optical_density: Option<f32>,
    pub illum: Option<i32>,
}

impl ResolvedMaterial {
    pub fn defaults(white: TextureHandle) -> Self {
        Self {
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.0, 0.0, 0.0],
            specular: [1.0, 1.0, 1.0],
            emissive: [0.0, 0.0, 0.0],
            shininess: 400.0,
            opacity: 1.0,
            diffuse_map: white,
            specular_map: white,
            normal_map: None,
            optical_density: None,
            illum: None,
        }
    }

    /// Lays `desc` over the defaults field by field.
    fn resolve(desc: &MaterialDesc, textures: &TextureCache) -> Self {
        let defaults = Self::defaults(textures.white());
        let map = |name: &Option<String>| name.as_deref().and_then(|n| textures.get(n));
        Self {
            diffuse: desc.diffuse.unwrap_or(defaults.diffuse),
            ambient: desc.ambient.unwrap_or(defaults.ambient),
            specular: desc.specular.unwrap_or(defaults.specular),
            emissive: desc.emissive.unwrap_or(defaults.emissive),
            shininess: desc.shininess.unwrap_or(defaults.shininess),
            opacity: desc.opacity.unwrap_or(defaults.opacity),
            diffuse_map: map(&desc.diffuse_map).unwrap_or(defaults.diffuse_map),
            specular_map: map(&desc.specular_map).unwrap_or(defaults.specular_map),
            normal_map: map(&desc.normal_map),
            optical_density: desc.optical_density,
            illum: desc.illum,
        }
    }
}

/// One uploaded geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub handle: PartHandle,
    pub material: ResolvedMaterial,
    pub vertex_count: usize,
}

#[derive(Debug)]
pub struct MeshEntity {
    id: EntityId,
    descriptor: MeshDescriptor,
    /// Current position. Differs from the descriptor's position once moved.
    pub position: [f32; 3],
    state: LoadState,
    parts: Vec<MeshPart>,
    textures: Option<TextureCache>,
}

impl MeshEntity {
    /// Creates a loading entity and queues its load job.
    pub fn spawn(descriptor: MeshDescriptor, loader: &AssetLoader) -> Self {
        let id = EntityId::fresh();
        loader.load_mesh(id, descriptor.clone());
        Self {
            id,
            position: descriptor.position,
            descriptor,
            state: LoadState::Loading,
            parts: Vec::new(),
            textures: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &MeshDescriptor {
        &self.descriptor
    }

    /// Position the entity was loaded at.
    pub fn initial_position(&self) -> [f32; 3] {
        self.descriptor.position
    }

    pub fn has_moved(&self) -> bool {
        self.position != self.descriptor.position
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    pub fn textures(&self) -> Option<&TextureCache> {
        self.textures.as_ref()
    }

    /// Finishes loading on the main thread. Only the first result counts.
    pub fn apply_load(
        &mut self,
        result: Result<PreparedMesh, AssetError>,
        device: &mut dyn GpuDevice,
        loader: &AssetLoader,
    ) {
        if self.state != LoadState::Loading {
            log::warn!("Ignoring repeated load result for '{}'", self.name());
            return;
        }

        let prepared = match result {
            Ok(prepared) => prepared,
            Err(e) => {
                log::error!("Failed to load '{}': {}", self.name(), e);
                self.state = LoadState::Failed(e.to_string());
                return;
            }
        };

        let mut textures = TextureCache::new(prepared.base_dir.clone(), device);
        for desc in prepared.materials.values() {
            for filename in desc.texture_refs() {
                textures.acquire(filename, device, loader);
            }
        }

        let resolved: HashMap<&str, ResolvedMaterial> = prepared
            .materials
            .iter()
            .map(|(name, desc)| (name.as_str(), ResolvedMaterial::resolve(desc, &textures)))
            .collect();

        self.parts = prepared
            .geometries
            .iter()
            .map(|geometry| {
                let material = resolved
                    .get(geometry.material.as_str())
                    .copied()
                    .unwrap_or_else(|| {
                        log::debug!(
                            "'{}' uses unknown material '{}', using defaults",
                            self.descriptor.name,
                            geometry.material
                        );
                        ResolvedMaterial::defaults(textures.white())
                    });
                let label = format!("{}/{}", self.descriptor.name, geometry.material);
                MeshPart {
                    handle: device.create_part(&label, &geometry.vertices),
                    material,
                    vertex_count: geometry.vertices.len(),
                }
            })
            .collect();

        log::info!(
            "Loaded '{}' with {} parts and {} textures",
            self.name(),
            self.parts.len(),
            textures.len()
        );
        self.textures = Some(textures);
        self.state = LoadState::Ready;
    }

    /// Records one draw per part. Nothing is drawn until the entity is ready.
    pub fn render(&self, pass: &mut PassRecorder) {
        if !self.is_ready() {
            return;
        }
        let world = Matrix4::identity();
        for part in &self.parts {
            pass.draw(part.handle, part.material, world);
        }
    }

    /// Frees the entity's vertex buffers.
    pub fn release(&mut self, device: &mut dyn GpuDevice) {
        for part in self.parts.drain(..) {
            device.release_part(part.handle);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        assets::{loader::LoadEvent, source::MemorySource, texture_data::tests::png_bytes},
        gfx::device::RecordingDevice,
    };
    use std::sync::Arc;

    pub(crate) const BOX_OBJ: &str = "\
mtllib Box.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vn 0 0 1
usemtl Wood
f 1/1/1 2/2/1 3/3/1 4/1/1
usemtl Metal
f 1/1/1 3/3/1 4/1/1
";

    pub(crate) const BOX_MTL: &str = "\
newmtl Wood
Kd 0.5 0.3 0.1
map_Kd foo.png
newmtl Metal
Ks 0.9 0.9 0.9
map_Kd foo.png
map_Ns shine.png
";

    /// Asset source with a `Box` model under `data/<name>/` for each name.
    pub(crate) fn box_source(names: &[&str]) -> MemorySource {
        names.iter().fold(MemorySource::new(), |source, name| {
            source
                .with_text(&format!("data/{0}/{0}.obj", name), BOX_OBJ)
                .with_text(&format!("data/{0}/{0}.mtl", name), BOX_MTL)
                .with_text(&format!("data/{}/Box.mtl", name), BOX_MTL)
                .with_bytes(&format!("data/{}/foo.png", name), png_bytes(2, 2))
                .with_bytes(&format!("data/{}/shine.png", name), png_bytes(2, 2))
        })
    }

    pub(crate) fn box_descriptor(name: &str, position: [f32; 3]) -> MeshDescriptor {
        MeshDescriptor::new(
            name,
            &format!("data/{0}/{0}.obj", name),
            Some(&format!("data/{0}/{0}.mtl", name)),
            position,
        )
    }

    fn apply_all(entity: &mut MeshEntity, loader: &AssetLoader, device: &mut RecordingDevice) {
        for event in loader.drain() {
            if let LoadEvent::Mesh { entity: id, result } = event {
                assert_eq!(id, entity.id());
                entity.apply_load(result, device, loader);
            }
        }
    }

    #[test]
    fn test_prepare_translates_and_interleaves() {
        let source = box_source(&["Letto"]);
        let prepared = prepare_mesh(&source, &box_descriptor("Letto", [-2.0, 0.0, -0.2])).unwrap();

        assert_eq!(prepared.base_dir, "data/Letto/");
        assert_eq!(prepared.geometries.len(), 2);
        let wood = &prepared.geometries[0];
        assert_eq!(wood.material, "Wood");
        assert_eq!(wood.vertices.len(), 6);
        assert_eq!(wood.vertices[1].position, [-1.0, 0.0, -0.2]);
        assert_eq!(wood.vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_eq!(wood.vertices[1].color, [1.0; 4]);
    }

    #[test]
    fn test_prepare_falls_back_to_mtllib() {
        let source = box_source(&["Vaso"]);
        let descriptor = MeshDescriptor::new("Vaso", "data/Vaso/Vaso.obj", None, [0.0; 3]);
        let prepared = prepare_mesh(&source, &descriptor).unwrap();
        assert!(prepared.materials.contains_key("Wood"));
        assert_eq!(source.reads("data/Vaso/Box.mtl"), 1);
    }

    #[test]
    fn test_entity_becomes_ready_after_apply() {
        let loader = AssetLoader::inline(Arc::new(box_source(&["Letto"])));
        let mut device = RecordingDevice::new();
        let mut entity = MeshEntity::spawn(box_descriptor("Letto", [0.0; 3]), &loader);

        let mut pass = PassRecorder::default();
        entity.render(&mut pass);
        assert!(pass.draws().is_empty());
        assert_eq!(entity.state(), &LoadState::Loading);

        apply_all(&mut entity, &loader, &mut device);
        assert!(entity.is_ready());
        assert_eq!(device.parts.len(), 2);

        entity.render(&mut pass);
        assert_eq!(pass.draws().len(), 2);
        assert_eq!(pass.draws()[0].world, Matrix4::identity());
    }

    #[test]
    fn test_shared_texture_loads_once() {
        let source = Arc::new(box_source(&["Letto"]));
        let loader = AssetLoader::inline(source.clone());
        let mut device = RecordingDevice::new();
        let mut entity = MeshEntity::spawn(box_descriptor("Letto", [0.0; 3]), &loader);
        apply_all(&mut entity, &loader, &mut device);

        let textures = entity.textures().unwrap();
        assert_eq!(textures.len(), 2);
        let texture_loads = loader
            .drain()
            .into_iter()
            .filter(|e| matches!(e, LoadEvent::Texture { .. }))
            .count();
        assert_eq!(texture_loads, 2);
        assert_eq!(source.reads("data/Letto/foo.png"), 1);

        let [wood, metal] = [&entity.parts()[0].material, &entity.parts()[1].material];
        assert_eq!(wood.diffuse_map, metal.diffuse_map);
        assert_eq!(wood.specular_map, textures.white());
        assert_ne!(metal.specular_map, textures.white());
    }

    #[test]
    fn test_materials_override_defaults_per_field() {
        let loader = AssetLoader::inline(Arc::new(box_source(&["Letto"])));
        let mut device = RecordingDevice::new();
        let mut entity = MeshEntity::spawn(box_descriptor("Letto", [0.0; 3]), &loader);
        apply_all(&mut entity, &loader, &mut device);

        let wood = entity.parts()[0].material;
        assert_eq!(wood.diffuse, [0.5, 0.3, 0.1]);
        assert_eq!(wood.specular, [1.0, 1.0, 1.0]);
        assert_eq!(wood.shininess, 400.0);
        assert_eq!(wood.opacity, 1.0);
        assert_eq!(wood.normal_map, None);

        let metal = entity.parts()[1].material;
        assert_eq!(metal.diffuse, [1.0, 1.0, 1.0]);
        assert_eq!(metal.specular, [0.9, 0.9, 0.9]);
    }

    #[test]
    fn test_missing_mesh_fails_entity() {
        let loader = AssetLoader::inline(Arc::new(MemorySource::new()));
        let mut device = RecordingDevice::new();
        let mut entity = MeshEntity::spawn(box_descriptor("Ghost", [0.0; 3]), &loader);
        apply_all(&mut entity, &loader, &mut device);

        assert!(matches!(entity.state(), LoadState::Failed(_)));
        let mut pass = PassRecorder::default();
        entity.render(&mut pass);
        assert!(pass.draws().is_empty());
        assert!(device.parts.is_empty());
    }

    #[test]
    fn test_release_frees_parts() {
        let loader = AssetLoader::inline(Arc::new(box_source(&["Letto"])));
        let mut device = RecordingDevice::new();
        let mut entity = MeshEntity::spawn(box_descriptor("Letto", [0.0; 3]), &loader);
        apply_all(&mut entity, &loader, &mut device);

        entity.release(&mut device);
        assert_eq!(device.live_parts(), 0);
        assert!(entity.parts().is_empty());
    }
}
