//! Per-frame scene evaluation.
//!
//! `evaluate` integrates the persistent per-node state (orbit angles and piece
//! slide offsets) by the frame's elapsed time and recomputes every world
//! transform top-down. A node's stored transform is `rotate(orbit) * translate`
//! composed onto its parent's; scale and self-rotation are left out of the tree
//! and are only folded in by `draw_list`, so children never inherit them.

use std::f32::consts::TAU;

use glam::{Mat4, Vec2, Vec3};

use crate::grid::GridLayout;
use crate::scene_graph::{MeshHandle, NodeId, PieceState, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTuning {
    /// World units per second a sliding piece closes on its cell.
    pub slide_rate: f32,
    /// Offsets at or below this magnitude snap to zero and end the slide.
    pub stop_threshold: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            slide_rate: 5.0,
            stop_threshold: 0.03,
        }
    }
}

/// Advance the tree by `elapsed` seconds and refresh all world transforms.
pub fn evaluate(
    graph: &mut SceneGraph,
    root: NodeId,
    layout: GridLayout,
    tuning: AnimationTuning,
    elapsed: f32,
) {
    let mut stack = vec![(root, Mat4::IDENTITY)];
    while let Some((id, parent_world)) = stack.pop() {
        let node = graph.node_mut(id);

        node.rotation_angle = wrap_angle(node.rotation_angle + elapsed * node.orbit_speed);

        if let Some(piece) = node.piece.as_mut() {
            if piece.animating {
                advance_slide(piece, tuning, elapsed);
            }
            // Grid cell plus live offset is the only source of a piece's X/Z.
            let rest = layout.cell_center(piece.cell);
            node.position.x = rest.x + piece.offset.x;
            node.position.z = rest.y + piece.offset.y;
        }

        let local = Mat4::from_axis_angle(unit_axis(node.rotation_axis), node.rotation_angle)
            * Mat4::from_translation(node.position);
        let world = parent_world * local;
        node.world_transform = world;

        stack.extend(node.children().iter().rev().map(|&child| (child, world)));
    }
}

fn advance_slide(piece: &mut PieceState, tuning: AnimationTuning, elapsed: f32) {
    if elapsed <= 0.0 {
        return;
    }
    let step = tuning.slide_rate * elapsed;
    piece.offset.x = move_towards(piece.offset.x, 0.0, step);
    piece.offset.y = move_towards(piece.offset.y, 0.0, step);

    if piece.offset.x.abs() <= tuning.stop_threshold && piece.offset.y.abs() <= tuning.stop_threshold
    {
        piece.offset = Vec2::ZERO;
        piece.animating = false;
    }
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else if target > current {
        current + max_delta
    } else {
        current - max_delta
    }
}

fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

fn unit_axis(axis: Vec3) -> Vec3 {
    axis.try_normalize().unwrap_or(Vec3::Y)
}

/// Everything the external draw step needs for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshHandle,
    pub world: Mat4,
    pub scale: Vec3,
    pub spin_axis: Vec3,
    pub spin_angle: f32,
}

impl DrawItem {
    pub fn model_matrix(&self) -> Mat4 {
        self.world
            * Mat4::from_axis_angle(self.spin_axis, self.spin_angle)
            * Mat4::from_scale(self.scale)
    }
}

/// Collect draw items for every node with a mesh, in pre-order.
///
/// Self-rotation is derived from `total_time` on every call rather than stored.
pub fn draw_list(graph: &SceneGraph, root: NodeId, total_time: f32) -> Vec<DrawItem> {
    graph
        .pre_order(root)
        .into_iter()
        .filter_map(|id| {
            let node = graph.node(id);
            let mesh = node.mesh?;
            Some(DrawItem {
                node: id,
                mesh,
                world: node.world_transform,
                scale: node.scale,
                spin_axis: unit_axis(node.rotation_axis),
                spin_angle: wrap_angle(total_time * node.spin_speed),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCoord;
    use crate::scene_graph::SceneNode;

    const LAYOUT: GridLayout = GridLayout::new(8, 5);

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn piece_node(cell: GridCoord) -> SceneNode {
        let mut node = SceneNode::new().with_position(Vec3::new(0.0, 0.3, 0.0));
        node.piece = Some(PieceState::at(cell));
        node
    }

    fn orbit_tree() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(SceneNode::new());
        let mut planet = SceneNode::new().with_position(Vec3::new(4.0, 0.0, 6.0));
        planet.orbit_speed = std::f32::consts::PI / 30.0;
        let planet = graph.create_node(planet);
        let mut moon = SceneNode::new().with_position(Vec3::new(1.5, 0.0, 0.0));
        moon.orbit_speed = std::f32::consts::PI / 10.0;
        let moon = graph.create_node(moon);
        graph.add_child(root, planet);
        graph.add_child(planet, moon);
        (graph, root, planet, moon)
    }

    #[test]
    fn zero_elapsed_is_idempotent() {
        let (mut graph, root, planet, moon) = orbit_tree();
        let piece = graph.create_node(piece_node(GridCoord::new(2, 1)));
        graph.add_child(root, piece);
        if let Some(state) = graph.node_mut(piece).piece.as_mut() {
            state.offset = Vec2::new(-2.0, 0.0);
            state.animating = true;
        }

        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 0.1);
        let snapshot: Vec<_> = [root, planet, moon, piece]
            .iter()
            .map(|&id| {
                let n = graph.node(id);
                (n.rotation_angle, n.piece, n.world_transform)
            })
            .collect();

        for _ in 0..5 {
            evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 0.0);
        }
        let after: Vec<_> = [root, planet, moon, piece]
            .iter()
            .map(|&id| {
                let n = graph.node(id);
                (n.rotation_angle, n.piece, n.world_transform)
            })
            .collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn orbit_angle_wraps_into_full_turn() {
        let (mut graph, root, planet, _) = orbit_tree();
        // 70 seconds at PI/30 rad/s is 7/3 PI, i.e. 1/3 PI after wrapping.
        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 70.0);
        let angle = graph.node(planet).rotation_angle;
        assert!((0.0..TAU).contains(&angle));
        assert!(approx(angle, std::f32::consts::PI / 3.0));
    }

    #[test]
    fn child_transform_composes_parent_world() {
        let (mut graph, root, planet, moon) = orbit_tree();
        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 3.0);

        let planet_world = graph.node(planet).world_transform;
        let moon_node = graph.node(moon);
        let moon_local = Mat4::from_axis_angle(Vec3::Y, moon_node.rotation_angle)
            * Mat4::from_translation(moon_node.position);
        let expected = planet_world * moon_local;
        assert!(moon_node.world_transform.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn parent_scale_is_not_inherited() {
        let (mut graph, root, planet, moon) = orbit_tree();
        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 1.0);
        let before = graph.node(moon).world_transform;

        graph.node_mut(planet).scale = Vec3::splat(5.0);
        graph.node_mut(root).scale = Vec3::new(9.0, 0.5, 9.0);
        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 0.0);
        assert_eq!(graph.node(moon).world_transform, before);
    }

    #[test]
    fn siblings_do_not_affect_each_other() {
        let (mut graph, root, planet, _) = orbit_tree();
        let mut other = SceneNode::new().with_position(Vec3::new(-8.0, 0.0, -15.0));
        other.orbit_speed = 1.0;
        let other = graph.create_node(other);
        graph.add_child(root, other);

        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 2.0);
        let planet_world = graph.node(planet).world_transform;

        graph.node_mut(other).position = Vec3::new(100.0, 5.0, 100.0);
        graph.node_mut(other).orbit_speed = 3.0;
        graph.node_mut(planet).rotation_angle -= 2.0 * std::f32::consts::PI / 30.0;
        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 2.0);
        assert!(graph.node(planet).world_transform.abs_diff_eq(planet_world, 1e-5));
    }

    #[test]
    fn piece_position_comes_from_cell_and_offset() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(SceneNode::new());
        let mut stale = piece_node(GridCoord::new(1, 1));
        stale.position.x = 42.0;
        stale.position.z = -42.0;
        let piece = graph.create_node(stale);
        graph.add_child(root, piece);

        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 0.0);
        let node = graph.node(piece);
        assert_eq!(node.position, Vec3::new(-5.0, 0.3, -2.0));
        let translation = node.world_transform.w_axis.truncate();
        assert!(translation.abs_diff_eq(Vec3::new(-5.0, 0.3, -2.0), 1e-6));
    }

    #[test]
    fn slide_shrinks_monotonically_to_exact_zero() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(SceneNode::new());
        let piece = graph.create_node(piece_node(GridCoord::new(3, 2)));
        graph.add_child(root, piece);
        if let Some(state) = graph.node_mut(piece).piece.as_mut() {
            state.offset = Vec2::new(0.0, 2.0);
            state.animating = true;
        }

        let dt = 1.0 / 60.0;
        let mut previous = 2.0f32;
        let mut steps = 0;
        loop {
            evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), dt);
            steps += 1;
            let state = graph.node(piece).piece.expect("piece state");
            let magnitude = state.offset.length();
            assert!(magnitude < previous || magnitude == 0.0);
            previous = magnitude;
            if !state.animating {
                assert_eq!(state.offset, Vec2::ZERO);
                break;
            }
            assert!(steps < 100, "slide never settled");
        }
        // 2 units at 5 units/s is 0.4 s, i.e. at most 24 sixtieths.
        assert!(steps <= 24);
    }

    #[test]
    fn single_large_step_never_overshoots() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(SceneNode::new());
        let piece = graph.create_node(piece_node(GridCoord::new(3, 2)));
        graph.add_child(root, piece);
        if let Some(state) = graph.node_mut(piece).piece.as_mut() {
            state.offset = Vec2::new(-2.0, 0.0);
            state.animating = true;
        }

        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 10.0);
        let state = graph.node(piece).piece.expect("piece state");
        assert_eq!(state.offset, Vec2::ZERO);
        assert!(!state.animating);
        assert_eq!(graph.node(piece).position.x, LAYOUT.cell_center(state.cell).x);
    }

    #[test]
    fn draw_list_folds_in_scale_and_spin() {
        let mut graph = SceneGraph::new();
        let mesh = MeshHandle {
            id: 3,
            index_count: 36,
        };
        let mut body = SceneNode::new()
            .with_mesh(mesh)
            .with_position(Vec3::new(2.0, 0.0, 0.0))
            .with_scale(Vec3::splat(0.5));
        body.spin_speed = 1.0;
        let root = graph.create_node(SceneNode::new());
        let body = graph.create_node(body);
        graph.add_child(root, body);
        evaluate(&mut graph, root, LAYOUT, AnimationTuning::default(), 0.0);

        let items = draw_list(&graph, root, 0.5);
        assert_eq!(items.len(), 1, "mesh-less root is skipped");
        let item = items[0];
        assert_eq!(item.mesh, mesh);
        assert!(approx(item.spin_angle, 0.5));
        let expected = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))
            * Mat4::from_rotation_y(0.5)
            * Mat4::from_scale(Vec3::splat(0.5));
        assert!(item.model_matrix().abs_diff_eq(expected, 1e-5));
    }
}
