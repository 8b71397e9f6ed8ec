use std::{u16, u32, u8};

use crate::grid::MazeGrid;
use crate::units::{ColumnsCount, RowsCount};

pub type SmallMazeGrid = MazeGrid<u8>;
pub type MediumMazeGrid = MazeGrid<u16>;
pub type LargeMazeGrid = MazeGrid<u32>;

/// Both the cells and every passage the grid could ever hold must be indexable up to `max_index`.
fn fits(rows: RowsCount, columns: ColumnsCount, max_index: usize) -> bool {
    let (RowsCount(rows), ColumnsCount(columns)) = (rows, columns);
    if rows == 0 || columns == 0 {
        return false;
    }
    let cells = rows.checked_mul(columns);
    let interior_walls = cells.and_then(|cells| cells.checked_mul(2))
                              .map(|twice_cells| twice_cells - rows - columns);
    match (cells, interior_walls) {
        (Some(cells), Some(walls)) => cells <= max_index && walls <= max_index,
        _ => false,
    }
}

pub fn small_rect_grid(rows: RowsCount, columns: ColumnsCount) -> Option<SmallMazeGrid> {
    if fits(rows, columns, u8::MAX as usize) {
        Some(SmallMazeGrid::new(rows, columns))
    } else {
        None
    }
}

pub fn medium_rect_grid(rows: RowsCount, columns: ColumnsCount) -> Option<MediumMazeGrid> {
    if fits(rows, columns, u16::MAX as usize) {
        Some(MediumMazeGrid::new(rows, columns))
    } else {
        None
    }
}

pub fn large_rect_grid(rows: RowsCount, columns: ColumnsCount) -> Option<LargeMazeGrid> {
    if fits(rows, columns, u32::MAX as usize) {
        Some(LargeMazeGrid::new(rows, columns))
    } else {
        None
    }
}
