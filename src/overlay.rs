use crate::config::OverlayConfig;
use crate::scene::{NodeId, SceneAsset, SceneNode};

/// Decides which mesh nodes count as decorative overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRules {
    name_patterns: Vec<String>,
    opacity_threshold: f32,
}

impl OverlayRules {
    pub fn new<I, S>(name_patterns: I, opacity_threshold: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name_patterns = name_patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().trim().to_lowercase())
            .filter(|pattern| !pattern.is_empty())
            .collect();
        Self { name_patterns, opacity_threshold }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(&config.name_patterns, config.opacity_threshold)
    }

    pub fn matches(&self, node: &SceneNode) -> bool {
        let Some(material) = node.material.as_ref() else {
            return false;
        };
        let name = node.name.to_lowercase();
        self.name_patterns.iter().any(|pattern| name.contains(pattern.as_str()))
            || material.is_translucent_below(self.opacity_threshold)
    }
}

impl Default for OverlayRules {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

/// Global overlay visibility plus the node list tagged when the scene loaded.
#[derive(Debug, Clone)]
pub struct OverlayToggle {
    visible: bool,
    members: Vec<NodeId>,
}

impl OverlayToggle {
    pub fn new() -> Self {
        Self { visible: true, members: Vec::new() }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    /// One-time tagging pass for a freshly loaded scene. Members take the current visibility.
    pub fn attach(&mut self, scene: &mut SceneAsset, rules: &OverlayRules) -> usize {
        self.members = scene.nodes().filter(|(_, node)| rules.matches(node)).map(|(id, _)| id).collect();
        self.apply(scene);
        self.members.len()
    }

    /// Flips the global flag and pushes it to every tagged node. Without a scene only the flag changes.
    pub fn toggle(&mut self, scene: Option<&mut SceneAsset>) -> bool {
        self.visible = !self.visible;
        if let Some(scene) = scene {
            self.apply(scene);
        }
        self.visible
    }

    fn apply(&self, scene: &mut SceneAsset) {
        for &id in &self.members {
            scene.set_visible(id, self.visible);
        }
    }
}

impl Default for OverlayToggle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::Aabb;
    use crate::scene::tests::opaque;
    use crate::scene::MaterialInfo;
    use glam::Vec3;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    fn translucent(opacity: f32) -> MaterialInfo {
        MaterialInfo { transparent: true, opacity, ..opaque("tint") }
    }

    fn sample_scene() -> SceneAsset {
        let mut scene = SceneAsset::default();
        let root = scene.add_node("Crane_OVERLAY_root", None, None);
        scene.add_node("Wall", Some(root), Some((opaque("wall"), unit_box())));
        scene.add_node("Turning_Circle", Some(root), Some((opaque("paint"), unit_box())));
        scene.add_node("HoistZone", Some(root), Some((opaque("paint"), unit_box())));
        scene.add_node("Tinted", Some(root), Some((translucent(0.3), unit_box())));
        scene.add_node("AlmostOpaque", Some(root), Some((translucent(0.95), unit_box())));
        scene.add_node("FadedButOpaqueMode", Some(root), Some((MaterialInfo { opacity: 0.2, ..opaque("x") }, unit_box())));
        scene
    }

    fn names(scene: &SceneAsset, ids: &[NodeId]) -> Vec<String> {
        ids.iter().filter_map(|id| scene.node(*id)).map(|node| node.name.clone()).collect()
    }

    #[test]
    fn classifies_by_name_and_translucency() {
        let mut scene = sample_scene();
        let mut toggle = OverlayToggle::new();
        assert_eq!(toggle.attach(&mut scene, &OverlayRules::default()), 3);
        assert_eq!(names(&scene, toggle.members()), vec!["Turning_Circle", "HoistZone", "Tinted"]);
    }

    #[test]
    fn toggling_twice_restores_visibility() {
        let mut scene = sample_scene();
        let mut toggle = OverlayToggle::new();
        toggle.attach(&mut scene, &OverlayRules::default());
        let before: Vec<bool> = scene.nodes().map(|(_, node)| node.visible).collect();
        assert!(!toggle.toggle(Some(&mut scene)));
        let hidden = scene.find("Tinted").unwrap();
        assert!(!scene.is_visible(hidden));
        assert!(scene.is_visible(scene.find("Wall").unwrap()));
        assert!(toggle.toggle(Some(&mut scene)));
        let after: Vec<bool> = scene.nodes().map(|(_, node)| node.visible).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn membership_is_fixed_after_attach() {
        let mut scene = sample_scene();
        let mut toggle = OverlayToggle::new();
        toggle.attach(&mut scene, &OverlayRules::default());
        let members = toggle.members().to_vec();
        for _ in 0..5 {
            toggle.toggle(Some(&mut scene));
        }
        assert_eq!(toggle.members(), members.as_slice());
    }

    #[test]
    fn toggle_before_load_carries_into_attach() {
        let mut toggle = OverlayToggle::new();
        assert!(!toggle.toggle(None));
        let mut scene = sample_scene();
        toggle.attach(&mut scene, &OverlayRules::default());
        assert!(!scene.is_visible(scene.find("HoistZone").unwrap()));
        assert!(scene.is_visible(scene.find("Wall").unwrap()));
    }

    #[test]
    fn custom_patterns_are_case_insensitive() {
        let rules = OverlayRules::new(["  WALL "], 0.0);
        let scene = sample_scene();
        let wall = scene.node(scene.find("Wall").unwrap()).unwrap();
        assert!(rules.matches(wall));
        let tinted = scene.node(scene.find("Tinted").unwrap()).unwrap();
        assert!(!rules.matches(tinted));
    }
}
