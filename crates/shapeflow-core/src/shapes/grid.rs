//! Grid container laying its children out in cells.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// A manager-style container: children are positioned by the grid, not by
/// their own alignment against the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridShape {
    pub size: Size,
    pub rows: usize,
    pub cols: usize,
    /// Gap between cells and around the border.
    pub cell_space: f64,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize, cell_space: f64) -> Self {
        Self {
            size: Size::new(100.0, 100.0),
            rows: rows.max(1),
            cols: cols.max(1),
            cell_space,
        }
    }

    /// Rows needed to hold `count` children; grows past `rows` when full.
    pub fn rows_for(&self, count: usize) -> usize {
        let cols = self.cols.max(1);
        self.rows.max(count.div_ceil(cols))
    }

    /// Cell rectangle of child `index`, relative to the grid's top-left corner.
    pub fn cell_rect(&self, index: usize, cell: Size) -> Rect {
        let cols = self.cols.max(1);
        let row = (index / cols) as f64;
        let col = (index % cols) as f64;
        Rect::from_origin_size(
            Point::new(
                col * cell.width + (col + 1.0) * self.cell_space,
                row * cell.height + (row + 1.0) * self.cell_space,
            ),
            cell,
        )
    }

    /// Box size covering all cells for `count` children.
    pub fn fitted_size(&self, cell: Size, count: usize) -> Size {
        let cols = self.cols.max(1) as f64;
        let rows = self.rows_for(count) as f64;
        Size::new(
            cols * cell.width + (cols + 1.0) * self.cell_space,
            rows * cell.height + (rows + 1.0) * self.cell_space,
        )
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::new(3, 3, 5.0)
    }
}
