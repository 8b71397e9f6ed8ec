use crate::cells::GridCoordinate;
use crate::units::{ColumnsCount, RowsCount};

/// Row major iteration over every coordinate of a rectangular grid.
#[derive(Debug, Clone)]
pub struct CellIter {
    columns: ColumnsCount,
    current_cell_number: usize,
    cells_count: usize,
}

impl CellIter {
    pub(crate) fn new(rows: RowsCount, columns: ColumnsCount) -> CellIter {
        CellIter {
            columns,
            current_cell_number: 0,
            cells_count: rows.0 * columns.0,
        }
    }
}

impl Iterator for CellIter {
    type Item = GridCoordinate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_cell_number < self.cells_count {
            let coord = GridCoordinate::from_row_major_index(self.current_cell_number, self.columns);
            self.current_cell_number += 1;
            Some(coord)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cells_count - self.current_cell_number;
        (remaining, Some(remaining))
    }
}
impl ExactSizeIterator for CellIter {} // default impl using size_hint()
