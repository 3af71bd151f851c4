//! Turns a `Board` into a scene graph.
//!
//! Layout of the built tree (children in this order under the table root):
//!
//! ```text
//! table (slab)
//! ├── square (col 0, row 0) ... square (width-1, height-1)   row-major
//! ├── piece 0 ... piece n-1                                 board order
//! └── body 0 ... body k-1                                   decorative
//!     └── moon                                              (one body only)
//! ```
//!
//! Distinct `(ShapeKind, Colour)` pairs are requested from the provider once and
//! shared by every node that uses them.

use std::collections::HashMap;
use std::f32::consts::PI;

use cks_core::{GridLayout, MeshHandle, NodeId, PieceState, SceneGraph, SceneNode};
use glam::Vec3;

use crate::board::Board;
use crate::config::PieceStyle;
use crate::meshes::{piece_colour, Colour, MeshProvider, ShapeKind};

const TABLE_COLOUR: Colour = [0.45, 0.3, 0.15, 1.0];
const TABLE_HALF_HEIGHT: f32 = 0.25;
const LIGHT_SQUARE: Colour = [0.85, 0.8, 0.65, 1.0];
const DARK_SQUARE: Colour = [0.2, 0.15, 0.1, 1.0];
const SQUARE_HALF_HEIGHT: f32 = 0.05;
/// Top surface of the squares; pieces stand here.
pub const PIECE_BASE_Y: f32 = TABLE_HALF_HEIGHT + 2.0 * SQUARE_HALF_HEIGHT;
const PIECE_FOOTPRINT: f32 = 0.8;
/// Decorative bodies circle well above the tallest raised piece.
const BODY_HEIGHT: f32 = 6.0;

pub struct BuiltScene {
    pub graph: SceneGraph,
    pub root: NodeId,
    /// Piece nodes in selection order.
    pub pieces: Vec<NodeId>,
    pub layout: GridLayout,
}

struct Body {
    colour: Colour,
    position: Vec3,
    scale: f32,
    axis: Vec3,
    spin_speed: f32,
    orbit_speed: f32,
}

const BODIES: [Body; 5] = [
    Body {
        colour: [0.3, 0.0, 0.3, 1.0],
        position: Vec3::new(4.0, BODY_HEIGHT, 6.0),
        scale: 0.3,
        axis: Vec3::NEG_Y,
        spin_speed: PI / 10.0,
        orbit_speed: PI / 30.0,
    },
    Body {
        colour: [0.1, 0.2, 0.7, 1.0],
        position: Vec3::new(-8.0, BODY_HEIGHT, -15.0),
        scale: 0.8,
        axis: Vec3::Y,
        spin_speed: PI / 40.0,
        orbit_speed: PI / 50.0,
    },
    Body {
        colour: [0.8, 0.3, 0.1, 1.0],
        position: Vec3::new(14.0, BODY_HEIGHT, -19.0),
        scale: 1.0,
        axis: Vec3::NEG_Y,
        spin_speed: PI / 60.0,
        orbit_speed: PI / 70.0,
    },
    Body {
        colour: [0.1, 0.5, 0.1, 1.0],
        position: Vec3::new(-8.0, BODY_HEIGHT, -30.0),
        scale: 1.8,
        axis: Vec3::Y,
        spin_speed: PI / 100.0,
        orbit_speed: PI / 120.0,
    },
    Body {
        colour: [0.2, 0.3, 0.3, 1.0],
        position: Vec3::new(-30.0, BODY_HEIGHT, 30.0),
        scale: 0.55,
        axis: Vec3::Y,
        spin_speed: PI / 40.0,
        orbit_speed: PI / 200.0,
    },
];

/// Index into `BODIES` of the body carrying the moon.
const MOON_HOST: usize = 1;

const MOON: Body = Body {
    colour: [0.0, 0.0, 0.4, 1.0],
    position: Vec3::new(1.5, 0.0, 0.0),
    scale: 0.2,
    axis: Vec3::Y,
    spin_speed: PI / 20.0,
    orbit_speed: PI / 10.0,
};

struct MeshCache<'a, P: MeshProvider> {
    provider: &'a mut P,
    handles: HashMap<(ShapeKind, [u32; 4]), MeshHandle>,
}

impl<'a, P: MeshProvider> MeshCache<'a, P> {
    fn new(provider: &'a mut P) -> Self {
        Self {
            provider,
            handles: HashMap::new(),
        }
    }

    fn get(&mut self, kind: ShapeKind, colour: Colour) -> MeshHandle {
        let key = (kind, colour.map(f32::to_bits));
        *self
            .handles
            .entry(key)
            .or_insert_with(|| self.provider.produce_mesh(kind, colour))
    }
}

pub fn build_scene<P: MeshProvider>(
    board: &Board,
    provider: &mut P,
    style: &PieceStyle,
) -> BuiltScene {
    let layout = board.layout();
    let mut meshes = MeshCache::new(provider);
    let mut graph = SceneGraph::new();

    let table = SceneNode::new()
        .with_mesh(meshes.get(ShapeKind::Slab, TABLE_COLOUR))
        .with_scale(Vec3::new(
            layout.width as f32 + 0.5,
            TABLE_HALF_HEIGHT,
            layout.height as f32 + 0.5,
        ));
    let root = graph.create_node(table);

    for cell in layout.cells() {
        let colour = if (cell.col + cell.row) % 2 == 0 {
            LIGHT_SQUARE
        } else {
            DARK_SQUARE
        };
        let centre = layout.cell_center(cell);
        let square = SceneNode::new()
            .with_mesh(meshes.get(ShapeKind::Slab, colour))
            .with_position(Vec3::new(
                centre.x,
                TABLE_HALF_HEIGHT + SQUARE_HALF_HEIGHT,
                centre.y,
            ))
            .with_scale(Vec3::new(0.95, SQUARE_HALF_HEIGHT, 0.95));
        let id = graph.create_node(square);
        graph.add_child(root, id);
    }

    let mut pieces = Vec::new();
    for (cell, shape) in board.pieces() {
        let centre = layout.cell_center(cell);
        let mut node = SceneNode::new()
            .with_mesh(meshes.get(ShapeKind::Piece(shape), piece_colour(shape)))
            .with_position(Vec3::new(centre.x, PIECE_BASE_Y, centre.y))
            .with_scale(Vec3::new(PIECE_FOOTPRINT, style.rest_scale, PIECE_FOOTPRINT));
        node.piece = Some(PieceState::at(cell));
        let id = graph.create_node(node);
        graph.add_child(root, id);
        pieces.push(id);
    }
    if let Some(&first) = pieces.first() {
        graph.node_mut(first).scale.y = style.raised_scale;
    }

    for (i, body) in BODIES.iter().enumerate() {
        let id = add_body(&mut graph, &mut meshes, root, body);
        if i == MOON_HOST {
            add_body(&mut graph, &mut meshes, id, &MOON);
        }
    }

    log::info!(
        "Built scene for board '{}': {} nodes, {} pieces, {} meshes",
        board.board_id,
        graph.len(),
        pieces.len(),
        meshes.handles.len()
    );

    BuiltScene {
        graph,
        root,
        pieces,
        layout,
    }
}

fn add_body<P: MeshProvider>(
    graph: &mut SceneGraph,
    meshes: &mut MeshCache<'_, P>,
    parent: NodeId,
    body: &Body,
) -> NodeId {
    let mut node = SceneNode::new()
        .with_mesh(meshes.get(ShapeKind::Sphere, body.colour))
        .with_position(body.position)
        .with_scale(Vec3::splat(body.scale));
    node.rotation_axis = body.axis;
    node.spin_speed = body.spin_speed;
    node.orbit_speed = body.orbit_speed;
    let id = graph.create_node(node);
    graph.add_child(parent, id);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::PieceShape;
    use crate::meshes::RecordingMeshProvider;
    use cks_core::{evaluate, AnimationTuning, GridCoord};
    use std::collections::HashSet;

    fn build_sample() -> (BuiltScene, RecordingMeshProvider) {
        let mut provider = RecordingMeshProvider::default();
        let scene = build_scene(&Board::sample(), &mut provider, &PieceStyle::default());
        (scene, provider)
    }

    #[test]
    fn builds_one_square_per_cell_under_the_table() {
        let (scene, _) = build_sample();
        let root = scene.graph.node(scene.root);
        let squares = root
            .children()
            .iter()
            .filter(|&&id| {
                let node = scene.graph.node(id);
                !node.is_piece() && node.orbit_speed == 0.0
            })
            .count();
        assert_eq!(squares, 40);
        assert_eq!(
            root.children().len(),
            40 + Board::sample().piece_count() + BODIES.len()
        );
    }

    #[test]
    fn pieces_record_their_cells_and_positions() {
        let (scene, _) = build_sample();
        let board = Board::sample();
        assert_eq!(scene.pieces.len(), board.piece_count());
        for (&id, (cell, _)) in scene.pieces.iter().zip(board.pieces()) {
            let node = scene.graph.node(id);
            let piece = node.piece.expect("piece node");
            assert_eq!(piece.cell, cell);
            assert!(!piece.animating);
            assert_eq!(node.position.x, (2 * cell.col - 8 + 1) as f32);
            assert_eq!(node.position.z, (2 * cell.row - 5 + 1) as f32);
            assert_eq!(node.position.y, PIECE_BASE_Y);
        }
    }

    #[test]
    fn only_first_piece_starts_raised() {
        let (scene, _) = build_sample();
        let style = PieceStyle::default();
        let raised: Vec<_> = scene
            .pieces
            .iter()
            .filter(|&&id| scene.graph.node(id).scale.y == style.raised_scale)
            .collect();
        assert_eq!(raised, vec![&scene.pieces[0]]);
    }

    #[test]
    fn square_colours_alternate_by_parity() {
        let mut provider = RecordingMeshProvider::default();
        let board = Board::empty("plain", 3, 2);
        let scene = build_scene(&board, &mut provider, &PieceStyle::default());
        let meshes: Vec<_> = scene
            .graph
            .node(scene.root)
            .children()
            .iter()
            .take(6)
            .map(|&id| scene.graph.node(id).mesh.expect("square mesh"))
            .collect();
        assert_eq!(meshes[0], meshes[2]);
        assert_ne!(meshes[0], meshes[1]);
        // Next row starts with the other colour.
        assert_eq!(meshes[1], meshes[3]);
    }

    #[test]
    fn mesh_requests_are_shared_per_shape_and_colour() {
        let (_, provider) = build_sample();
        let unique: HashSet<_> = provider
            .requests
            .iter()
            .map(|(kind, colour)| (*kind, colour.map(f32::to_bits)))
            .collect();
        assert_eq!(unique.len(), provider.requests.len());
        // Table + two square colours + six pieces + five bodies + moon.
        assert_eq!(provider.requests.len(), 3 + 6 + 6);
        assert!(provider
            .requests
            .iter()
            .any(|(kind, _)| *kind == ShapeKind::Piece(PieceShape::Star)));
    }

    #[test]
    fn one_body_carries_a_moon() {
        let (scene, _) = build_sample();
        let bodies: Vec<_> = scene
            .graph
            .node(scene.root)
            .children()
            .iter()
            .copied()
            .filter(|&id| scene.graph.node(id).orbit_speed != 0.0)
            .collect();
        assert_eq!(bodies.len(), BODIES.len());
        let with_moons: Vec<_> = bodies
            .iter()
            .filter(|&&id| !scene.graph.node(id).children().is_empty())
            .collect();
        assert_eq!(with_moons.len(), 1);
    }

    #[test]
    fn bodies_orbit_clear_of_the_board() {
        let (mut scene, _) = build_sample();
        let style = PieceStyle::default();
        let top = PIECE_BASE_Y + crate::meshes::PIECE_HEIGHT * style.raised_scale;
        for step in 0..120 {
            evaluate(
                &mut scene.graph,
                scene.root,
                scene.layout,
                AnimationTuning::default(),
                step as f32 * 0.5,
            );
            for id in scene.graph.pre_order(scene.root) {
                let node = scene.graph.node(id);
                if node.orbit_speed == 0.0 {
                    continue;
                }
                let centre = node.world_transform.w_axis.truncate();
                assert!(centre.y - node.scale.y > top);
            }
        }
    }

    #[test]
    fn empty_board_builds_without_pieces() {
        let mut provider = RecordingMeshProvider::default();
        let board = Board::empty("none", 8, 5);
        let scene = build_scene(&board, &mut provider, &PieceStyle::default());
        assert!(scene.pieces.is_empty());
        assert!(scene
            .graph
            .pre_order(scene.root)
            .iter()
            .all(|&id| !scene.graph.node(id).is_piece()));
        assert_eq!(scene.layout.cell_count(), 40);
        assert!(!scene.layout.contains(GridCoord::new(8, 0)));
    }
}
