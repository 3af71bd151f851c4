pub mod evaluate;
pub mod grid;
pub mod input;
pub mod scene_graph;
pub mod time;

pub use evaluate::{draw_list, evaluate, AnimationTuning, DrawItem};
pub use grid::{GridCoord, GridLayout};
pub use scene_graph::{MeshHandle, NodeId, PieceState, SceneGraph, SceneNode};
