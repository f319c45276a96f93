use crate::framing::Aabb;
use anyhow::{anyhow, Result};
use glam::{Mat4, Vec3};
use gltf::material::AlphaMode;

const GLASS_OPACITY: f32 = 0.45;
const GLASS_ROUGHNESS: f32 = 0.08;
const GLASS_METALNESS: f32 = 0.0;
const DEFAULT_ROUGHNESS: f32 = 0.78;
const DEFAULT_METALNESS: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Surface description forwarded to the renderer alongside each mesh node.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInfo {
    pub label: String,
    pub base_color_factor: [f32; 4],
    pub opacity: f32,
    pub transparent: bool,
    pub roughness: f32,
    pub metalness: f32,
    pub vertex_colors: bool,
}

impl MaterialInfo {
    fn from_gltf(material: &gltf::Material<'_>) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let base_color_factor = pbr.base_color_factor();
        let label = match (material.name(), material.index()) {
            (Some(name), _) => name.to_string(),
            (None, Some(index)) => format!("material_{index}"),
            (None, None) => "Default".to_string(),
        };
        Self {
            label,
            base_color_factor,
            opacity: base_color_factor[3],
            transparent: material.alpha_mode() == AlphaMode::Blend,
            roughness: pbr.roughness_factor(),
            metalness: pbr.metallic_factor(),
            vertex_colors: false,
        }
    }

    pub fn is_translucent_below(&self, threshold: f32) -> bool {
        self.transparent && self.opacity < threshold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub material: Option<MaterialInfo>,
    pub visible: bool,
    mesh_bounds: Option<Aabb>,
}

impl SceneNode {
    pub fn has_mesh(&self) -> bool {
        self.material.is_some()
    }

    pub fn world_bounds(&self) -> Option<Aabb> {
        self.mesh_bounds
    }
}

/// Flattened scene graph of the loaded model, in depth-first order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAsset {
    nodes: Vec<SceneNode>,
    bounds: Option<Aabb>,
}

impl SceneAsset {
    pub fn from_document(document: &gltf::Document) -> Result<Self> {
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| anyhow!("document contains no scenes"))?;
        let mut asset = SceneAsset::default();
        for root in scene.nodes() {
            asset.visit(&root, None, Mat4::IDENTITY);
        }
        Ok(asset)
    }

    fn visit(&mut self, node: &gltf::Node<'_>, parent: Option<NodeId>, parent_world: Mat4) {
        let world = parent_world * Mat4::from_cols_array_2d(&node.transform().matrix());
        let name = node.name().map(str::to_string).unwrap_or_else(|| format!("node_{}", node.index()));
        let (material, mesh_bounds) = match node.mesh() {
            Some(mesh) => {
                let mut bounds: Option<Aabb> = None;
                let mut material = None;
                for primitive in mesh.primitives() {
                    let bb = primitive.bounding_box();
                    let local = Aabb::new(Vec3::from_array(bb.min), Vec3::from_array(bb.max));
                    let world_box = local.transformed(&world);
                    bounds = Some(match bounds {
                        Some(existing) => existing.union(&world_box),
                        None => world_box,
                    });
                    if material.is_none() {
                        material = Some(MaterialInfo::from_gltf(&primitive.material()));
                    }
                }
                (material, bounds)
            }
            None => (None, None),
        };
        let id = self.push_node(SceneNode { name, parent, material, visible: true, mesh_bounds });
        for child in node.children() {
            self.visit(&child, Some(id), world);
        }
    }

    /// Adds a node built outside a glTF document. Mesh nodes carry a material and world bounds.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        mesh: Option<(MaterialInfo, Aabb)>,
    ) -> NodeId {
        let (material, mesh_bounds) = match mesh {
            Some((material, bounds)) => (Some(material), Some(bounds)),
            None => (None, None),
        };
        self.push_node(SceneNode { name: name.into(), parent, material, visible: true, mesh_bounds })
    }

    fn push_node(&mut self, node: SceneNode) -> NodeId {
        if let Some(node_bounds) = node.mesh_bounds {
            self.bounds = Some(match self.bounds {
                Some(existing) => existing.union(&node_bounds),
                None => node_bounds,
            });
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(index, node)| (NodeId(index), node))
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.name == name).map(NodeId)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.visible = visible;
        }
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).map(|node| node.visible).unwrap_or(false)
    }

    /// World-space bounds of every mesh in the scene.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Load-time material pass: vertex colours on, glass made see-through, everything else matte.
    pub fn prepare_materials(&mut self) {
        for node in &mut self.nodes {
            let Some(material) = node.material.as_mut() else {
                continue;
            };
            material.vertex_colors = true;
            if node.name.to_lowercase().contains("glass") {
                material.transparent = true;
                material.opacity = GLASS_OPACITY;
                material.roughness = GLASS_ROUGHNESS;
                material.metalness = GLASS_METALNESS;
            } else {
                material.roughness = DEFAULT_ROUGHNESS;
                material.metalness = DEFAULT_METALNESS;
            }
        }
    }
}
