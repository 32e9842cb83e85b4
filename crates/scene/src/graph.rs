use glam::{Mat4, Vec3};
use std::collections::BTreeMap;
use tinyscene_assets::{AssetId, AssetStore, MeshData, ModelData};
use tinyscene_common::{Color, ObjectId, Transform};

use crate::light::{Background, Fog, Lights};

/// Parent chains longer than this are treated as cycles.
const MAX_DEPTH: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("parent node {0:?} does not exist")]
    UnknownParent(ObjectId),
    #[error("mesh {0} has out-of-range indices or mismatched attributes")]
    InvalidMesh(String),
    #[error("model {0} has no primitives")]
    EmptyModel(String),
}

/// How a material is shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Unlit flat color (or texture).
    Basic,
    /// Lit by ambient, directional and spot lights; receives shadows and fog.
    Standard,
    /// Animated procedural shader; ignores `color` and `texture`.
    Procedural,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub wireframe: bool,
    pub texture: Option<AssetId>,
}

impl Default for Material {
    fn default() -> Self {
        Self::standard(Color::WHITE)
    }
}

impl Material {
    pub fn basic(color: Color) -> Self {
        Self {
            kind: MaterialKind::Basic,
            color,
            wireframe: false,
            texture: None,
        }
    }

    pub fn standard(color: Color) -> Self {
        Self {
            kind: MaterialKind::Standard,
            ..Self::basic(color)
        }
    }

    pub fn procedural() -> Self {
        Self {
            kind: MaterialKind::Procedural,
            ..Self::basic(Color::WHITE)
        }
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn with_texture(mut self, texture: AssetId) -> Self {
        self.texture = Some(texture);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Mesh(AssetId),
    /// RGB axis lines of the given length.
    Axes(f32),
    /// Square line grid on the XZ plane.
    Grid { size: f32, divisions: u32 },
    /// Transform-only node used as a parent.
    Group,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub material: Material,
    pub parent: Option<ObjectId>,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind, material: Material) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind,
            material,
            parent: None,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: AssetId, material: Material) -> Self {
        Self::new(name, NodeKind::Mesh(mesh), material)
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group, Material::default())
    }

    pub fn axes(size: f32) -> Self {
        Self::new("axes", NodeKind::Axes(size), Material::basic(Color::WHITE))
    }

    pub fn grid(size: f32, divisions: u32) -> Self {
        Self::new(
            "grid",
            NodeKind::Grid { size, divisions },
            Material::basic(Color::from_hex(0x888888)),
        )
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn mesh_id(&self) -> Option<AssetId> {
        match self.kind {
            NodeKind::Mesh(id) => Some(id),
            _ => None,
        }
    }
}

/// The scene: nodes plus the environment they are lit and drawn in.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: BTreeMap<ObjectId, Node>,
    assets: AssetStore,
    lights: Lights,
    fog: Option<Fog>,
    background: Background,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node. Returns its id.
    pub fn add(&mut self, mut node: Node) -> ObjectId {
        node.parent = None;
        let id = ObjectId::new();
        self.nodes.insert(id, node);
        id
    }

    /// Add a node under an existing parent.
    pub fn add_child(&mut self, parent: ObjectId, mut node: Node) -> Result<ObjectId, SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::UnknownParent(parent));
        }
        node.parent = Some(parent);
        let id = ObjectId::new();
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Register `mesh` and add a top-level node drawing it.
    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        mesh: MeshData,
        material: Material,
        transform: Transform,
    ) -> Result<ObjectId, SceneError> {
        if !mesh.is_valid() {
            return Err(SceneError::InvalidMesh(mesh.name));
        }
        let mesh_id = self.assets.register_mesh(mesh);
        Ok(self.add(Node::mesh(name, mesh_id, material).with_transform(transform)))
    }

    /// Attach an imported model under a new group positioned at `offset`.
    ///
    /// Every primitive is validated before anything is inserted.
    pub fn attach_model(&mut self, model: &ModelData, offset: Vec3) -> Result<ObjectId, SceneError> {
        if model.primitives.is_empty() {
            return Err(SceneError::EmptyModel(model.name.clone()));
        }
        if let Some(bad) = model.primitives.iter().find(|p| !p.mesh.is_valid()) {
            return Err(SceneError::InvalidMesh(bad.mesh.name.clone()));
        }

        let root = self.add(Node::group(&model.name).with_transform(Transform::from_position(offset)));
        for prim in &model.primitives {
            let mesh_id = self.assets.register_mesh(prim.mesh.clone());
            let [r, g, b, _] = prim.base_color;
            let node = Node::mesh(&prim.mesh.name, mesh_id, Material::standard(Color::rgb(r, g, b)))
                .with_shadows(true, false);
            self.add_child(root, node)?;
        }
        tracing::info!(
            model = %model.name,
            root = %root.short(),
            primitives = model.primitives.len(),
            "model attached"
        );
        Ok(root)
    }

    /// Remove a node and all of its descendants. Returns the removed node.
    pub fn remove(&mut self, id: ObjectId) -> Option<Node> {
        let removed = self.nodes.remove(&id)?;
        let children: Vec<ObjectId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(child, _)| *child)
            .collect();
        for child in children {
            self.remove(child);
        }
        Some(removed)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Read-only access to all nodes (BTreeMap for deterministic iteration).
    pub fn nodes(&self) -> &BTreeMap<ObjectId, Node> {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, parent: ObjectId) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(parent))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| *id)
    }

    /// Visible mesh nodes whose ancestors are all visible.
    pub fn mesh_nodes(&self) -> impl Iterator<Item = (ObjectId, &Node, AssetId)> + '_ {
        self.nodes.iter().filter_map(|(id, node)| {
            let mesh = node.mesh_id()?;
            self.is_visible(*id).then_some((*id, node, mesh))
        })
    }

    /// A node is visible when it and every ancestor are visible.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        let mut current = Some(id);
        for _ in 0..MAX_DEPTH {
            match current.and_then(|c| self.nodes.get(&c)) {
                Some(node) if !node.visible => return false,
                Some(node) => current = node.parent,
                None => return current.is_none(),
            }
        }
        false
    }

    /// Model-to-world matrix, composing every ancestor transform.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut matrix = node.transform.matrix();
        for _ in 0..MAX_DEPTH {
            match node.parent {
                Some(parent) => {
                    node = self.nodes.get(&parent)?;
                    matrix = node.transform.matrix() * matrix;
                }
                None => return Some(matrix),
            }
        }
        tracing::warn!(node = %id.short(), "parent chain too deep; treating as cycle");
        None
    }

    /// Set the material color of a node. Returns false if it does not exist.
    pub fn set_color(&mut self, id: ObjectId, color: Color) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.material.color = color;
                true
            }
            None => false,
        }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetStore {
        &mut self.assets
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut Lights {
        &mut self.lights
    }

    pub fn fog(&self) -> Option<&Fog> {
        self.fog.as_ref()
    }

    pub fn set_fog(&mut self, fog: Option<Fog>) {
        self.fog = fog;
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }
}
