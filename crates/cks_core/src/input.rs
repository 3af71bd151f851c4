//! Input state tracking with both edge-triggered and level-triggered queries.
//!
//! Keys are mapped to semantic `Action`s by the platform layer; nothing here
//! knows about physical key codes.
//!
//! - **Level-triggered (held):** `is_held(action)` is true every frame the bound
//!   key is down. Used for continuous camera movement and look.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only during the
//!   frame the transition happened and cleared by `end_frame()`. Used for the
//!   discrete piece moves, selection and toggles.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
    SpeedModifier,
    NextPiece,
    PieceUp,
    PieceDown,
    PieceLeft,
    PieceRight,
    ToggleOverlay,
    ReloadBoard,
    Quit,
}

impl Action {
    /// Grid delta `(d_col, d_row)` for the four piece-move actions.
    pub fn piece_delta(self) -> Option<(i32, i32)> {
        match self {
            Self::PieceUp => Some((0, -1)),
            Self::PieceDown => Some((0, 1)),
            Self::PieceLeft => Some((-1, 0)),
            Self::PieceRight => Some((1, 0)),
            _ => None,
        }
    }

    pub const PIECE_MOVES: &'static [Action] = &[
        Action::PieceUp,
        Action::PieceDown,
        Action::PieceLeft,
        Action::PieceRight,
    ];
}

pub struct InputState {
    held: HashSet<Action>,
    just_pressed: HashSet<Action>,
    just_released: HashSet<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            self.just_pressed.insert(action);
        }
    }

    pub fn release(&mut self, action: Action) {
        if self.held.remove(&action) {
            self.just_released.insert(action);
        }
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn is_just_pressed(&self, action: Action) -> bool {
        self.just_pressed.contains(&action)
    }

    pub fn is_just_released(&self, action: Action) -> bool {
        self.just_released.contains(&action)
    }

    /// Signed axis value from a pair of opposing held actions.
    pub fn axis(&self, negative: Action, positive: Action) -> f32 {
        let mut value = 0.0;
        if self.is_held(negative) {
            value -= 1.0;
        }
        if self.is_held(positive) {
            value += 1.0;
        }
        value
    }

    /// Drop all held state, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.just_released.extend(self.held.drain());
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
