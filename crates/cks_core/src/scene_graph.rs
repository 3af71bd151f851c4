//! Arena-backed transform tree.
//!
//! Nodes live in a flat `Vec` and refer to their children by `NodeId`. A node is
//! owned by exactly one parent; the tree is built once and afterwards only the
//! per-node scalar state (angles, piece offsets, computed transforms) changes.
//!
//! Adding the same child to two parents, or twice to one parent, is undefined:
//! the evaluator would visit it more than once per frame and the last visit
//! would win. Debug builds assert against it.

use glam::{Mat4, Vec2, Vec3};

use crate::grid::GridCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque render token returned by a mesh provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    pub id: u32,
    pub index_count: u32,
}

/// Logical board slot and in-flight slide of a game piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieceState {
    pub cell: GridCoord,
    /// Remaining (x, z) distance between the drawn position and the cell center.
    pub offset: Vec2,
    pub animating: bool,
}

impl PieceState {
    pub fn at(cell: GridCoord) -> Self {
        Self {
            cell,
            offset: Vec2::ZERO,
            animating: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub mesh: Option<MeshHandle>,
    pub position: Vec3,
    /// Applied per node at draw time only; never inherited by children.
    pub scale: Vec3,
    /// Orbit angle in radians, kept in `[0, 2π)`.
    pub rotation_angle: f32,
    pub rotation_axis: Vec3,
    pub orbit_speed: f32,
    pub spin_speed: f32,
    pub piece: Option<PieceState>,
    pub world_transform: Mat4,
    children: Vec<NodeId>,
    has_parent: bool,
}

impl SceneNode {
    pub fn new() -> Self {
        Self {
            mesh: None,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_angle: 0.0,
            rotation_axis: Vec3::Y,
            orbit_speed: 0.0,
            spin_speed: 0.0,
            piece: None,
            world_transform: Mat4::IDENTITY,
            children: Vec::new(),
            has_parent: false,
        }
    }

    pub fn with_mesh(mut self, mesh: MeshHandle) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_piece(&self) -> bool {
        self.piece.is_some()
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn create_node(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert_ne!(parent, child, "a node cannot be its own child");
        debug_assert!(
            !self.nodes[child.index()].has_parent,
            "node {:?} already has a parent",
            child
        );
        self.nodes[child.index()].has_parent = true;
        self.nodes[parent.index()].children.push(child);
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk starting at `root`; children are visited in list order.
    pub fn pre_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev().copied());
        }
        order
    }
}
