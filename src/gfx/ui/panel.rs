use std::borrow::Cow;

use imgui::Ui;

use crate::{catalog, gfx::scene::Scene};

/// Something the settings panel asks the app to do after the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    ToggleSkybox,
    SwitchSkybox,
    ToggleShadows,
    SwitchCamera,
    Select(&'static str),
    ToggleObject(&'static str),
    ClearRoom,
    InsertAll,
}

impl PanelAction {
    pub fn apply(self, scene: &mut Scene) {
        match self {
            PanelAction::ToggleSkybox => scene.toggle_skybox(),
            PanelAction::SwitchSkybox => scene.switch_skybox(),
            PanelAction::ToggleShadows => scene.toggle_shadows(),
            PanelAction::SwitchCamera => scene.switch_camera(),
            PanelAction::Select(name) => scene.set_selected(name),
            PanelAction::ToggleObject(name) => catalog::toggle(scene, name),
            PanelAction::ClearRoom => catalog::clear(scene),
            PanelAction::InsertAll => catalog::insert_all(scene),
        }
    }
}

fn sliders(ui: &Ui, id: &str, min: f32, max: f32, values: &mut [f32; 3]) {
    for (axis, value) in ["X", "Y", "Z"].iter().zip(values.iter_mut()) {
        ui.slider(format!("{}##{}", axis, id), min, max, value);
    }
}

/// Draws the settings window. Light and shadow parameters are edited in
/// place; everything else comes back as actions.
pub fn draw_settings(ui: &Ui, scene: &mut Scene) -> Vec<PanelAction> {
    let mut actions = Vec::new();

    ui.window("Settings")
        .size([340.0, 620.0], imgui::Condition::FirstUseEver)
        .position([10.0, 10.0], imgui::Condition::FirstUseEver)
        .build(|| {
            let mut skybox = scene.skybox.enabled;
            if ui.checkbox("Skybox", &mut skybox) {
                actions.push(PanelAction::ToggleSkybox);
            }
            if scene.skybox.enabled {
                ui.same_line();
                if ui.button("Switch skybox") {
                    actions.push(PanelAction::SwitchSkybox);
                }
            }

            ui.text(format!("Camera: {}", scene.camera.kind_name()));
            ui.same_line();
            if ui.button("Switch camera") {
                actions.push(PanelAction::SwitchCamera);
            }

            if ui.collapsing_header("Light", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                ui.text("Position");
                let position = &mut scene.light.position;
                ui.slider("X##light_position", -10.0, 10.0, &mut position[0]);
                ui.slider("Y##light_position", 0.0, 10.0, &mut position[1]);
                ui.slider("Z##light_position", -10.0, 10.0, &mut position[2]);
                ui.text("Direction");
                sliders(ui, "light_direction", -10.0, 10.0, &mut scene.light.direction);
                ui.text("Color");
                sliders(ui, "light_color", 0.1, 1.0, &mut scene.light.color);
            }

            if ui.collapsing_header("Shadows", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                let mut shadows = scene.shadow.enabled;
                if ui.checkbox("Enabled##shadows", &mut shadows) {
                    actions.push(PanelAction::ToggleShadows);
                }
                ui.checkbox("Show frustum", &mut scene.shadow.show_frustum);
                ui.slider("Field of view", 30.0, 180.0, &mut scene.shadow.fov);
                ui.slider("Width", 1.0, 10.0, &mut scene.shadow.proj_width);
                ui.slider("Height", 1.0, 10.0, &mut scene.shadow.proj_height);
                ui.slider("Far", 1.0, 30.0, &mut scene.shadow.z_far);
                ui.slider("Bias", -0.001, 0.0, &mut scene.shadow.bias);
            }

            if ui.collapsing_header("Furniture", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                let names: Vec<&'static str> =
                    catalog::FURNITURE.iter().map(|item| item.name).collect();
                let mut current = names
                    .iter()
                    .position(|name| *name == scene.selected())
                    .unwrap_or(0);
                if ui.combo("Move with arrows", &mut current, &names, |name| {
                    Cow::Borrowed(*name)
                }) {
                    if let Some(&name) = names.get(current) {
                        actions.push(PanelAction::Select(name));
                    }
                }

                ui.separator();
                for &name in &names {
                    let mut present = scene.contains(name);
                    if ui.checkbox(name, &mut present) {
                        actions.push(PanelAction::ToggleObject(name));
                    }
                }

                ui.separator();
                if ui.button("Clear room") {
                    actions.push(PanelAction::ClearRoom);
                }
                ui.same_line();
                if ui.button("Insert all") {
                    actions.push(PanelAction::InsertAll);
                }

                let loading = scene.meshes().iter().filter(|m| !m.is_ready()).count();
                if loading > 0 {
                    ui.text(format!("Loading {} of {} objects", loading, scene.meshes().len()));
                }
            }
        });

    actions
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

    #[test]
    fn test_toggle_actions_flip_scene_state() {
        let mut scene = empty_room();
        let mut device = RecordingDevice::new();
        scene.prepare_shadows(&mut device);

        PanelAction::ToggleShadows.apply(&mut scene);
        assert!(scene.shadow.enabled);
        PanelAction::SwitchCamera.apply(&mut scene);
        assert_eq!(scene.camera.kind_name(), "Animated Camera");
        PanelAction::SwitchCamera.apply(&mut scene);
        assert_eq!(scene.camera.kind_name(), "Camera");
    }

    #[test]
    fn test_select_and_catalog_actions() {
        let mut scene = empty_room();
        PanelAction::Select("Letto").apply(&mut scene);
        assert_eq!(scene.selected(), "Letto");

        PanelAction::ToggleObject("Letto").apply(&mut scene);
        assert!(scene.contains("Letto"));

        PanelAction::InsertAll.apply(&mut scene);
        assert_eq!(scene.meshes().len(), catalog::FURNITURE.len());

        PanelAction::ClearRoom.apply(&mut scene);
        assert!(scene.meshes().is_empty());
    }
}
