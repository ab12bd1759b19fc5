//! Furniture that can be added to and removed from the room
//!
//! Every item lives under `data/<Name>/<Name>.obj` with a material library
//! of the same name. The vase rests on the nightstand when the nightstand is
//! in the room and on the floor otherwise.

use crate::gfx::scene::{MeshDescriptor, Scene};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogItem {
    pub name: &'static str,
    /// World-space placement.
    pub position: [f32; 3],
}

pub const NIGHTSTAND: &str = "Comodino";
pub const VASE: &str = "Vaso";

/// Height of the vase when it stands on the nightstand.
const VASE_ON_NIGHTSTAND_Y: f32 = 2.55;

pub const FURNITURE: [CatalogItem; 9] = [
    CatalogItem { name: "Quadro", position: [0.0, 0.0, 0.0] },
    CatalogItem { name: "Letto", position: [-2.0, 0.0, -0.2] },
    CatalogItem { name: "Orologio", position: [-4.0, 4.5, -1.5] },
    CatalogItem { name: NIGHTSTAND, position: [-2.2, 0.0, 2.0] },
    CatalogItem { name: "VinileErnia", position: [-3.8, 4.6, 1.2] },
    CatalogItem { name: "VinileUltimo", position: [-3.8, 4.6, 2.5] },
    CatalogItem { name: VASE, position: [-1.2, VASE_ON_NIGHTSTAND_Y, 1.5] },
    CatalogItem { name: "Libreria", position: [-2.0, 3.8, -5.15] },
    CatalogItem { name: "Lampada", position: [3.0, 0.0, 3.3] },
];

pub fn item(name: &str) -> Option<&'static CatalogItem> {
    FURNITURE.iter().find(|item| item.name == name)
}

/// Descriptor for a catalog model at `position`.
pub fn descriptor(name: &str, position: [f32; 3]) -> MeshDescriptor {
    MeshDescriptor::new(
        name,
        &format!("data/{0}/{0}.obj", name),
        Some(&format!("data/{0}/{0}.mtl", name)),
        position,
    )
}

pub fn vase_position(on_nightstand: bool) -> [f32; 3] {
    let [x, _, z] = item(VASE).map(|vase| vase.position).unwrap_or_default();
    let y = if on_nightstand { VASE_ON_NIGHTSTAND_Y } else { 0.0 };
    [x, y, z]
}

/// Adds the item if it is missing from the room, removes it otherwise.
pub fn toggle(scene: &mut Scene, name: &str) {
    let Some(item) = item(name) else {
        log::warn!("'{}' is not in the furniture catalog", name);
        return;
    };

    let mut position = item.position;
    if item.name == NIGHTSTAND && scene.contains(VASE) {
        let nightstand_after = !scene.contains(NIGHTSTAND);
        scene.queue_remove(descriptor(VASE, vase_position(!nightstand_after)));
        scene.queue_add(descriptor(VASE, vase_position(nightstand_after)));
    } else if item.name == VASE {
        position = vase_position(scene.contains(NIGHTSTAND));
    }

    if scene.contains(item.name) {
        scene.queue_remove(descriptor(item.name, position));
    } else {
        scene.queue_add(descriptor(item.name, position));
    }
    scene.reload_scene();
}

/// Removes every catalog item. The room shell stays.
pub fn clear(scene: &mut Scene) {
    let present: Vec<&CatalogItem> = FURNITURE
        .iter()
        .filter(|item| scene.contains(item.name))
        .collect();
    for item in present {
        scene.queue_remove(descriptor(item.name, item.position));
    }
    scene.reload_scene();
}

/// Empties the room, then adds every catalog item at its default place.
pub fn insert_all(scene: &mut Scene) {
    clear(scene);
    for item in &FURNITURE {
        scene.queue_add(descriptor(item.name, item.position));
    }
    scene.reload_scene();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::{loader::AssetLoader, source::MemorySource},
        config::ViewerConfig,
        gfx::device::RecordingDevice,
    };
    use std::sync::Arc;

    fn empty_room() -> Scene {
        let loader = AssetLoader::inline(Arc::new(MemorySource::new()));
        Scene::new(loader, &ViewerConfig::default())
    }

    fn position_of(scene: &Scene, name: &str) -> Option<[f32; 3]> {
        scene
            .meshes()
            .iter()
            .find(|mesh| mesh.name() == name)
            .map(|mesh| mesh.position)
    }

    #[test]
    fn test_descriptor_paths() {
        let letto = descriptor("Letto", [1.0, 2.0, 3.0]);
        assert_eq!(letto.mesh_source, "data/Letto/Letto.obj");
        assert_eq!(letto.material_source.as_deref(), Some("data/Letto/Letto.mtl"));
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut scene = empty_room();
        toggle(&mut scene, "Letto");
        assert!(scene.contains("Letto"));
        toggle(&mut scene, "Letto");
        assert!(!scene.contains("Letto"));
        assert_eq!(scene.pending_changes(), (0, 0));
    }

    #[test]
    fn test_vase_without_nightstand_goes_on_floor() {
        let mut scene = empty_room();
        toggle(&mut scene, VASE);
        assert_eq!(position_of(&scene, VASE), Some([-1.2, 0.0, 1.5]));
    }

    #[test]
    fn test_vase_follows_nightstand() {
        let mut scene = empty_room();
        toggle(&mut scene, NIGHTSTAND);
        toggle(&mut scene, VASE);
        assert_eq!(position_of(&scene, VASE), Some([-1.2, 2.55, 1.5]));

        toggle(&mut scene, NIGHTSTAND);
        assert!(!scene.contains(NIGHTSTAND));
        assert_eq!(position_of(&scene, VASE), Some([-1.2, 0.0, 1.5]));

        toggle(&mut scene, NIGHTSTAND);
        assert_eq!(position_of(&scene, VASE), Some([-1.2, 2.55, 1.5]));
        assert_eq!(scene.meshes().iter().filter(|m| m.name() == VASE).count(), 1);
    }

    #[test]
    fn test_insert_all_then_clear_keeps_room_shell() {
        let mut device = RecordingDevice::new();
        let mut scene = empty_room();
        scene.load_meshes([descriptor("stanzetta", [0.0; 3])]);
        toggle(&mut scene, "Letto");

        insert_all(&mut scene);
        assert_eq!(scene.meshes().len(), FURNITURE.len() + 1);
        assert_eq!(scene.meshes().iter().filter(|m| m.name() == "Letto").count(), 1);

        clear(&mut scene);
        scene.poll_loads(&mut device);
        assert_eq!(scene.meshes().len(), 1);
        assert!(scene.contains("stanzetta"));
    }

    #[test]
    fn test_unknown_item_is_ignored() {
        let mut scene = empty_room();
        toggle(&mut scene, "Divano");
        assert!(scene.meshes().is_empty());
    }
}
