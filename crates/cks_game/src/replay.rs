use crate::pieces::{MoveOutcome, PieceController};
use cks_core::{evaluate, AnimationTuning, NodeId, SceneGraph};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Scripted piece input, one entry per frame, used to check that the
/// controller and evaluator produce the same board from the same input.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub frame_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub action: Option<ReplayAction>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplayAction {
    Next,
    Up,
    Down,
    Left,
    Right,
}

impl ReplaySequence {
    pub fn expanded_actions(&self) -> Vec<Option<ReplayAction>> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(frame.action);
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.frame_dt < 0.0 {
        return Err("Replay validation failed: frame_dt must be >= 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

/// Apply one frame of replay input, then advance the scene by `dt`.
pub fn step_frame(
    graph: &mut SceneGraph,
    root: NodeId,
    controller: &mut PieceController,
    layout: cks_core::GridLayout,
    action: Option<ReplayAction>,
    dt: f32,
) -> Option<MoveOutcome> {
    let outcome = match action {
        Some(ReplayAction::Next) => {
            controller.select_next(graph);
            None
        }
        Some(ReplayAction::Up) => Some(controller.attempt_move(graph, 0, -1)),
        Some(ReplayAction::Down) => Some(controller.attempt_move(graph, 0, 1)),
        Some(ReplayAction::Left) => Some(controller.attempt_move(graph, -1, 0)),
        Some(ReplayAction::Right) => Some(controller.attempt_move(graph, 1, 0)),
        None => None,
    };
    evaluate(graph, root, layout, AnimationTuning::default(), dt);
    outcome
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::builder::{build_scene, BuiltScene};
    use crate::config::PieceStyle;
    use crate::meshes::RecordingMeshProvider;
    use cks_core::GridCoord;
    use std::collections::HashSet;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "cks_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn sample_scene() -> (BuiltScene, PieceController) {
        let style = PieceStyle::default();
        let scene = build_scene(&Board::sample(), &mut RecordingMeshProvider::default(), &style);
        let controller = PieceController::new(scene.pieces.clone(), scene.layout, style);
        (scene, controller)
    }

    fn piece_cells(scene: &BuiltScene) -> Vec<GridCoord> {
        scene
            .pieces
            .iter()
            .filter_map(|&id| scene.graph.node(id).piece.map(|p| p.cell))
            .collect()
    }

    /// Runs the replay on a fresh sample scene, checking occupancy every frame.
    fn run_replay(replay: &ReplaySequence) -> (Vec<GridCoord>, Vec<Option<MoveOutcome>>) {
        let (mut scene, mut controller) = sample_scene();
        let mut outcomes = Vec::new();
        for action in replay.expanded_actions() {
            let outcome = step_frame(
                &mut scene.graph,
                scene.root,
                &mut controller,
                scene.layout,
                action,
                replay.frame_dt,
            );
            outcomes.push(outcome);

            let cells = piece_cells(&scene);
            let distinct: HashSet<_> = cells.iter().copied().collect();
            assert_eq!(distinct.len(), scene.pieces.len(), "two pieces share a cell");
            assert!(cells.iter().all(|&c| scene.layout.contains(c)));
        }
        (piece_cells(&scene), outcomes)
    }

    const WANDER_REPLAY: &str = r#"{
      "frame_dt": 0.016667,
      "frames": [
        { "action": "right" },
        { "repeat": 30 },
        { "action": "right" },
        { "repeat": 30 },
        { "action": "down" },
        { "action": "down" },
        { "repeat": 30 },
        { "action": "next" },
        { "action": "up" },
        { "repeat": 30 },
        { "action": "up" },
        { "repeat": 30 },
        { "action": "next" },
        { "action": "left" },
        { "repeat": 30 },
        { "action": "left" },
        { "repeat": 30 }
      ]
    }"#;

    #[test]
    fn replay_expands_repeat_counts() {
        let replay: ReplaySequence = serde_json::from_str(WANDER_REPLAY).expect("parse replay");
        let actions = replay.expanded_actions();
        assert_eq!(actions.len(), 220);
        assert_eq!(actions[0], Some(ReplayAction::Right));
        assert_eq!(actions[1], None);
    }

    #[test]
    fn identical_replays_produce_identical_boards() {
        let replay: ReplaySequence = serde_json::from_str(WANDER_REPLAY).expect("parse replay");
        let (first_cells, first_outcomes) = run_replay(&replay);
        let (second_cells, second_outcomes) = run_replay(&replay);
        assert_eq!(first_cells, second_cells);
        assert_eq!(first_outcomes, second_outcomes);
    }

    #[test]
    fn wander_replay_ends_where_expected() {
        let replay: ReplaySequence = serde_json::from_str(WANDER_REPLAY).expect("parse replay");
        let (cells, outcomes) = run_replay(&replay);

        // Circle: (1,1) -> (3,1) -> (3,2); the second "down" lands mid-slide.
        assert_eq!(cells[0], GridCoord::new(3, 2));
        assert!(outcomes.contains(&Some(MoveOutcome::Busy)));
        // Triangle: (1,4) -> (1,2).
        assert_eq!(cells[1], GridCoord::new(1, 2));
        // Hex on the top edge: both moves left succeed, (3,0) -> (1,0).
        assert_eq!(cells[2], GridCoord::new(1, 0));
    }

    #[test]
    fn replay_against_wall_is_rejected_without_side_effects() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{"frames":[{"action":"next","repeat":2},{"action":"up"},{"repeat":10},{"action":"up"}]}"#,
        )
        .expect("parse replay");
        let (cells, outcomes) = run_replay(&replay);
        // Third piece is the hex on row 0.
        assert_eq!(cells[2], GridCoord::new(3, 0));
        let rejected = outcomes
            .iter()
            .flatten()
            .filter(|o| matches!(o, MoveOutcome::OutOfBounds(_)))
            .count();
        assert_eq!(rejected, 2);
    }

    #[test]
    fn zero_dt_replay_keeps_pieces_sliding() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{"frame_dt":0.0,"frames":[{"action":"right"},{"action":"right","repeat":5}]}"#,
        )
        .expect("parse replay");
        let (cells, outcomes) = run_replay(&replay);
        assert_eq!(cells[0], GridCoord::new(2, 1));
        assert_eq!(
            outcomes.iter().filter(|o| **o == Some(MoveOutcome::Busy)).count(),
            5
        );
    }

    #[test]
    fn load_replay_from_path_parses_and_validates() {
        let path = temp_file_path("valid");
        fs::write(&path, WANDER_REPLAY).expect("write temp replay file");
        let replay = load_replay_from_path(&path).expect("replay should load");
        assert_eq!(replay.frames.len(), 17);

        fs::write(&path, r#"{"frames":[]}"#).expect("rewrite temp replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));

        let _ = fs::remove_file(path);
    }
}
