//! Piece selection and grid moves.
//!
//! The controller only edits piece state in the scene graph. It never moves a
//! node directly: a successful move rewrites the piece's logical cell and seeds
//! an offset back to where the piece was drawn, and the evaluator slides the
//! offset to zero over the following frames.

use cks_core::{GridCoord, GridLayout, NodeId, SceneGraph};
use glam::Vec2;

use crate::config::PieceStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: GridCoord, to: GridCoord },
    /// The selected piece is still sliding from its previous move.
    Busy,
    OutOfBounds(GridCoord),
    Occupied(GridCoord),
    NoPieces,
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

pub struct PieceController {
    pieces: Vec<NodeId>,
    selected: usize,
    layout: GridLayout,
    style: PieceStyle,
}

impl PieceController {
    /// Piece 0 starts selected; the builder has already raised it.
    pub fn new(pieces: Vec<NodeId>, layout: GridLayout, style: PieceStyle) -> Self {
        Self {
            pieces,
            selected: 0,
            layout,
            style,
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.pieces.get(self.selected).copied()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Lower the current piece and raise the next one, wrapping around.
    pub fn select_next(&mut self, graph: &mut SceneGraph) {
        if self.pieces.is_empty() {
            return;
        }
        let old = self.pieces[self.selected];
        graph.node_mut(old).scale.y = self.style.rest_scale;

        self.selected = (self.selected + 1) % self.pieces.len();
        let new = self.pieces[self.selected];
        graph.node_mut(new).scale.y = self.style.raised_scale;
        log::debug!("Selected piece #{}", self.selected);
    }

    /// Move the selected piece one step. Rejected moves change nothing.
    pub fn attempt_move(
        &mut self,
        graph: &mut SceneGraph,
        d_col: i32,
        d_row: i32,
    ) -> MoveOutcome {
        let Some(id) = self.selected() else {
            return MoveOutcome::NoPieces;
        };
        let Some(piece) = graph.node(id).piece else {
            return MoveOutcome::NoPieces;
        };
        if piece.animating {
            return MoveOutcome::Busy;
        }

        let target = piece.cell.offset(d_col, d_row);
        if !self.layout.contains(target) {
            return MoveOutcome::OutOfBounds(target);
        }
        if self.occupant(graph, target).is_some() {
            return MoveOutcome::Occupied(target);
        }

        if let Some(state) = graph.node_mut(id).piece.as_mut() {
            state.cell = target;
            state.offset = Vec2::new(-2.0 * d_col as f32, -2.0 * d_row as f32);
            state.animating = true;
        }

        MoveOutcome::Moved {
            from: piece.cell,
            to: target,
        }
    }

    /// Piece whose logical cell is `cell`, if any. Sliding pieces already count
    /// as standing on their destination.
    pub fn occupant(&self, graph: &SceneGraph, cell: GridCoord) -> Option<NodeId> {
        self.pieces
            .iter()
            .copied()
            .find(|&id| graph.node(id).piece.is_some_and(|p| p.cell == cell))
    }

    pub fn animating_count(&self, graph: &SceneGraph) -> usize {
        self.pieces
            .iter()
            .filter(|&&id| graph.node(id).piece.is_some_and(|p| p.animating))
            .count()
    }
}
