//! Board layouts: the initial occupancy snapshot the scene is built from.
//!
//! A `Board` is consumed once by the scene builder. After that each piece's
//! node owns its grid cell and the board is never consulted again, so nothing
//! here needs to track moves.
//!
//! Boards come from three places: the built-in sample layout, a JSON board file
//! (hot-reloaded through `BoardWatcher`), or pixel-space hits reported by an
//! external piece detector (`Board::from_detections`).

use cks_core::{GridCoord, GridLayout};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PieceShape {
    /// Three-quarter circle.
    Circle,
    /// "A" without the middle bar.
    A,
    Hex,
    /// Parallelogram.
    Pogram,
    Star,
    Triangle,
}

impl PieceShape {
    pub const ALL: &'static [PieceShape] = &[
        PieceShape::Circle,
        PieceShape::A,
        PieceShape::Hex,
        PieceShape::Pogram,
        PieceShape::Star,
        PieceShape::Triangle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::A => "a",
            Self::Hex => "hex",
            Self::Pogram => "pogram",
            Self::Star => "star",
            Self::Triangle => "triangle",
        }
    }

    fn glyph(self) -> char {
        match self {
            Self::Circle => 'C',
            Self::A => 'A',
            Self::Hex => 'H',
            Self::Pogram => 'P',
            Self::Star => 'S',
            Self::Triangle => 'T',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub board_id: String,
    layout: GridLayout,
    /// Row-major, `None` for empty cells.
    cells: Vec<Option<PieceShape>>,
}

impl Board {
    pub const DEFAULT_WIDTH: i32 = 8;
    pub const DEFAULT_HEIGHT: i32 = 5;
    /// Largest width or height a board file may declare.
    pub const MAX_DIM: i32 = 64;

    pub fn empty(board_id: &str, width: i32, height: i32) -> Self {
        let layout = GridLayout::new(width, height);
        Self {
            board_id: board_id.to_string(),
            layout,
            cells: vec![None; layout.cell_count()],
        }
    }

    /// One of each piece shape in a fixed arrangement on the default 8x5 board.
    pub fn sample() -> Self {
        let mut board = Self::empty("sample", Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT);
        board.place(GridCoord::new(1, 1), PieceShape::Circle);
        board.place(GridCoord::new(5, 1), PieceShape::A);
        board.place(GridCoord::new(3, 0), PieceShape::Hex);
        board.place(GridCoord::new(7, 2), PieceShape::Pogram);
        board.place(GridCoord::new(6, 2), PieceShape::Star);
        board.place(GridCoord::new(1, 4), PieceShape::Triangle);
        board
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn get(&self, coord: GridCoord) -> Option<PieceShape> {
        self.index(coord).and_then(|i| self.cells[i])
    }

    /// Put a piece on an empty in-bounds cell. Returns false and leaves the
    /// board untouched otherwise.
    pub fn place(&mut self, coord: GridCoord, shape: PieceShape) -> bool {
        match self.index(coord) {
            Some(i) if self.cells[i].is_none() => {
                self.cells[i] = Some(shape);
                true
            }
            _ => false,
        }
    }

    /// Occupied cells, column by column. This order becomes the piece
    /// selection order once the scene is built.
    pub fn pieces(&self) -> Vec<(GridCoord, PieceShape)> {
        let mut out = Vec::new();
        for col in 0..self.layout.width {
            for row in 0..self.layout.height {
                let coord = GridCoord::new(col, row);
                if let Some(shape) = self.get(coord) {
                    out.push((coord, shape));
                }
            }
        }
        out
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Build a board from a detector's pixel-space hits on a photo of the board.
    ///
    /// Each hit maps to the cell containing it. Hits on or past the right or
    /// bottom image edge land in the last column or row instead of being
    /// dropped, and the first hit for a cell wins.
    pub fn from_detections(
        board_id: &str,
        width: i32,
        height: i32,
        image_size: (u32, u32),
        detections: &[Detection],
    ) -> Self {
        let mut board = Self::empty(board_id, width, height);
        for detection in detections {
            let coord = detection_cell(board.layout, image_size, detection.x, detection.y);
            if !board.place(coord, detection.shape) {
                log::debug!(
                    "Ignoring duplicate {} detection at {} ({:.0}, {:.0})",
                    detection.shape.label(),
                    coord,
                    detection.x,
                    detection.y
                );
            }
        }
        board
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        if self.layout.contains(coord) {
            Some(coord.row as usize * self.layout.width as usize + coord.col as usize)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.layout.height {
            for col in 0..self.layout.width {
                let glyph = self
                    .get(GridCoord::new(col, row))
                    .map_or('.', PieceShape::glyph);
                write!(f, " {glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A piece found by an external detector, in image pixel coordinates.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Detection {
    pub shape: PieceShape,
    pub x: f32,
    pub y: f32,
}

fn detection_cell(layout: GridLayout, image_size: (u32, u32), x: f32, y: f32) -> GridCoord {
    let cell_w = (image_size.0 as i32 / layout.width).max(1);
    let cell_h = (image_size.1 as i32 / layout.height).max(1);
    let col = (x.max(0.0) as i32 / cell_w).clamp(0, layout.width - 1);
    let row = (y.max(0.0) as i32 / cell_h).clamp(0, layout.height - 1);
    GridCoord::new(col, row)
}

// --- Board file (JSON) ---

#[derive(Debug, Deserialize, Clone)]
pub struct BoardFile {
    pub version: String,
    pub board_id: String,
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    #[serde(default)]
    pub pieces: Vec<BoardPiece>,
    /// Detector output for a photo of the board, used instead of `pieces`.
    #[serde(default)]
    pub detections: Option<DetectionSet>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionSet {
    pub image_width: u32,
    pub image_height: u32,
    pub hits: Vec<Detection>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BoardPiece {
    pub col: i32,
    pub row: i32,
    pub shape: PieceShape,
}

pub fn load_board_from_path(path: &Path) -> Result<Board, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read board file {}: {e}", path.display()))?;
    let file: BoardFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse board JSON {}: {e}", path.display()))?;
    validate_board_file(&file)?;

    if let Some(set) = &file.detections {
        return Ok(Board::from_detections(
            &file.board_id,
            file.width,
            file.height,
            (set.image_width, set.image_height),
            &set.hits,
        ));
    }

    let mut board = Board::empty(&file.board_id, file.width, file.height);
    for piece in &file.pieces {
        board.place(GridCoord::new(piece.col, piece.row), piece.shape);
    }
    Ok(board)
}

fn validate_board_file(file: &BoardFile) -> Result<(), String> {
    if file.version != "0.1" {
        return Err(format!(
            "Board validation failed: unsupported version '{}'",
            file.version
        ));
    }
    if file.board_id.is_empty() {
        return Err("Board validation failed: board_id is empty".to_string());
    }
    if file.width <= 0 || file.height <= 0 {
        return Err("Board validation failed: width and height must be > 0".to_string());
    }
    if file.width > Board::MAX_DIM || file.height > Board::MAX_DIM {
        return Err(format!(
            "Board validation failed: {}x{} exceeds the {max}x{max} limit",
            file.width,
            file.height,
            max = Board::MAX_DIM
        ));
    }
    if let Some(set) = &file.detections {
        if !file.pieces.is_empty() {
            return Err(
                "Board validation failed: give either pieces or detections, not both".to_string(),
            );
        }
        if set.image_width == 0 || set.image_height == 0 {
            return Err("Board validation failed: detection image size must be > 0".to_string());
        }
        return Ok(());
    }
    if file.pieces.is_empty() {
        log::warn!(
            "Board '{}' has no pieces. This is allowed but often accidental.",
            file.board_id
        );
    }

    let layout = GridLayout::new(file.width, file.height);
    let mut seen = HashSet::new();
    for piece in &file.pieces {
        let coord = GridCoord::new(piece.col, piece.row);
        if !layout.contains(coord) {
            return Err(format!(
                "Board validation failed: piece out of bounds {}",
                coord
            ));
        }
        if !seen.insert(coord) {
            return Err(format!(
                "Board validation failed: duplicate piece at {}",
                coord
            ));
        }
    }
    Ok(())
}

const fn default_width() -> i32 {
    Board::DEFAULT_WIDTH
}

const fn default_height() -> i32 {
    Board::DEFAULT_HEIGHT
}

/// Polls a board file's modification time between frames.
pub struct BoardWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl BoardWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
