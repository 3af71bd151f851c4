//! Board grid addressing shared by the scene builder, evaluator and piece controller.
//!
//! Cells are two world units apart and the grid is centered on the origin, so a
//! cell's center is `2*col - width + 1` on X and `2*row - height + 1` on Z.

use glam::Vec2;

/// Distance in world units between neighbouring cell centers.
pub const CELL_SPACING: f32 = 2.0;

/// Integer (column, row) slot on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridCoord {
    pub col: i32,
    pub row: i32,
}

impl GridCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Saturates at the `i32` limits, which lie outside any real layout.
    pub const fn offset(self, d_col: i32, d_row: i32) -> Self {
        Self {
            col: self.col.saturating_add(d_col),
            row: self.row.saturating_add(d_row),
        }
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Board dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub width: i32,
    pub height: i32,
}

impl GridLayout {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> usize {
        (self.width.max(0) as usize).saturating_mul(self.height.max(0) as usize)
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.col >= 0 && coord.col < self.width && coord.row >= 0 && coord.row < self.height
    }

    /// World-space (x, z) center of a cell.
    pub fn cell_center(&self, coord: GridCoord) -> Vec2 {
        Vec2::new(
            CELL_SPACING * coord.col as f32 - self.width as f32 + 1.0,
            CELL_SPACING * coord.row as f32 - self.height as f32 + 1.0,
        )
    }

    /// Row-major iteration over every cell.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |col| GridCoord { col, row }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_center_is_symmetric_about_origin() {
        let layout = GridLayout::new(8, 5);
        let first = layout.cell_center(GridCoord::new(0, 0));
        let last = layout.cell_center(GridCoord::new(7, 4));
        assert_eq!(first, Vec2::new(-7.0, -4.0));
        assert_eq!(last, Vec2::new(7.0, 4.0));
        assert_eq!(layout.cell_center(GridCoord::new(1, 1)), Vec2::new(-5.0, -2.0));
    }

    #[test]
    fn contains_rejects_every_edge() {
        let layout = GridLayout::new(8, 5);
        assert!(layout.contains(GridCoord::new(0, 0)));
        assert!(layout.contains(GridCoord::new(7, 4)));
        assert!(!layout.contains(GridCoord::new(-1, 0)));
        assert!(!layout.contains(GridCoord::new(0, -1)));
        assert!(!layout.contains(GridCoord::new(8, 0)));
        assert!(!layout.contains(GridCoord::new(0, 5)));
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let layout = GridLayout::new(8, 5);
        let far = GridCoord::new(1, 1).offset(i32::MAX, 0);
        assert_eq!(far, GridCoord::new(i32::MAX, 1));
        assert!(!layout.contains(far));
        let below = GridCoord::new(1, 1).offset(0, i32::MIN);
        assert_eq!(below, GridCoord::new(1, i32::MIN));
        assert!(!layout.contains(below));
    }

    #[test]
    fn cell_count_of_large_layout_does_not_overflow() {
        let layout = GridLayout::new(70_000, 70_000);
        assert_eq!(layout.cell_count() as u64, 4_900_000_000);
        assert_eq!(GridLayout::new(-3, 4).cell_count(), 0);
    }

    #[test]
    fn cells_visits_each_slot_once() {
        let layout = GridLayout::new(3, 2);
        let cells: Vec<_> = layout.cells().collect();
        assert_eq!(cells.len(), layout.cell_count());
        assert_eq!(cells[0], GridCoord::new(0, 0));
        assert_eq!(cells[3], GridCoord::new(0, 1));
    }
}
