use std::fmt;

use fnv::FnvHashSet;

use crate::cells::{CompassPrimary, GridCoordinate, Terrain};
use crate::grid::{IndexType, MazeGrid};
use crate::units::{ColumnsCount, RowsCount};

const WALL_L: &str = "╴";
const WALL_R: &str = "╶";
const WALL_U: &str = "╵";
const WALL_D: &str = "╷";
const WALL_LR_3: &str = "───";
const WALL_LR: &str = "─";
const WALL_UD: &str = "│";
const WALL_LD: &str = "┐";
const WALL_RU: &str = "└";
const WALL_LU: &str = "┘";
const WALL_RD: &str = "┌";
const WALL_LRU: &str = "┴";
const WALL_LRD: &str = "┬";
const WALL_LRUD: &str = "┼";
const WALL_RUD: &str = "├";
const WALL_LUD: &str = "┤";

/// Box drawing text rendering of a maze.
///
/// Cell bodies show `S` and `E` at the start and end, `.` on the path if one is given, and
/// otherwise the terrain: blank for grass, `~` for mud and `≈` for water.
#[derive(Debug)]
pub struct MazeDisplay<'a, GridIndexType: IndexType> {
    grid: &'a MazeGrid<GridIndexType>,
    on_path_coordinates: FnvHashSet<GridCoordinate>,
}

impl<'a, GridIndexType: IndexType> MazeDisplay<'a, GridIndexType> {
    pub fn new(grid: &'a MazeGrid<GridIndexType>) -> Self {
        MazeDisplay {
            grid,
            on_path_coordinates: FnvHashSet::default(),
        }
    }

    pub fn with_path(grid: &'a MazeGrid<GridIndexType>, path: &[GridCoordinate]) -> Self {
        MazeDisplay {
            grid,
            on_path_coordinates: path.iter().cloned().collect(),
        }
    }

    fn render_cell_body(&self, coord: GridCoordinate) -> &'static str {
        if coord == self.grid.start() {
            " S "
        } else if coord == self.grid.end() {
            " E "
        } else if self.on_path_coordinates.contains(&coord) {
            " . "
        } else {
            match self.grid.cell(coord).terrain() {
                Some(Terrain::Grass) => "   ",
                Some(Terrain::Mud) => " ~ ",
                Some(Terrain::Water) => " ≈ ",
                None => " ? ",
            }
        }
    }

    /// The wall segment running down the grid line left of column `line_col` in `row`.
    fn vertical_wall(&self, row: u32, line_col: u32) -> bool {
        if line_col == 0 {
            self.grid.has_wall(GridCoordinate::new(row, 0), CompassPrimary::West)
        } else {
            self.grid.has_wall(GridCoordinate::new(row, line_col - 1), CompassPrimary::East)
        }
    }

    /// The wall segment running along the grid line above row `line_row` in `col`.
    fn horizontal_wall(&self, line_row: u32, col: u32) -> bool {
        if line_row == 0 {
            self.grid.has_wall(GridCoordinate::new(0, col), CompassPrimary::North)
        } else {
            self.grid.has_wall(GridCoordinate::new(line_row - 1, col), CompassPrimary::South)
        }
    }

    /// The glyph where grid lines cross, joining whichever of the four segments meeting there are
    /// walls.
    fn corner(&self, line_row: u32, line_col: u32) -> &'static str {
        let RowsCount(rows) = self.grid.rows();
        let ColumnsCount(columns) = self.grid.columns();
        let (rows, columns) = (rows as u32, columns as u32);

        let up = line_row > 0 && line_col <= columns && self.vertical_wall(line_row - 1, line_col);
        let down = line_row < rows && self.vertical_wall(line_row, line_col);
        let left = line_col > 0 && self.horizontal_wall(line_row, line_col - 1);
        let right = line_col < columns && self.horizontal_wall(line_row, line_col);

        match (left, right, up, down) {
            (true, true, true, true) => WALL_LRUD,
            (true, true, true, false) => WALL_LRU,
            (true, true, false, true) => WALL_LRD,
            (true, false, true, true) => WALL_LUD,
            (false, true, true, true) => WALL_RUD,
            (true, true, false, false) => WALL_LR,
            (false, false, true, true) => WALL_UD,
            (false, true, true, false) => WALL_RU,
            (true, false, false, true) => WALL_LD,
            (true, false, true, false) => WALL_LU,
            (false, true, false, true) => WALL_RD,
            (true, false, false, false) => WALL_L,
            (false, true, false, false) => WALL_R,
            (false, false, true, false) => WALL_U,
            (false, false, false, true) => WALL_D,
            (false, false, false, false) => " ",
        }
    }
}

impl<'a, GridIndexType: IndexType> fmt::Display for MazeDisplay<'a, GridIndexType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let RowsCount(rows) = self.grid.rows();
        let ColumnsCount(columns) = self.grid.columns();
        let (rows, columns) = (rows as u32, columns as u32);

        let mut output = String::new();
        for line_row in 0..=rows {

            // Grid line above the row, or the southern boundary on the last pass
            for line_col in 0..=columns {
                output.push_str(self.corner(line_row, line_col));
                if line_col < columns {
                    if self.horizontal_wall(line_row, line_col) {
                        output.push_str(WALL_LR_3);
                    } else {
                        output.push_str("   ");
                    }
                }
            }
            output.push('\n');

            if line_row == rows {
                break;
            }

            for line_col in 0..=columns {
                if self.vertical_wall(line_row, line_col) {
                    output.push_str(WALL_UD);
                } else {
                    output.push(' ');
                }
                if line_col < columns {
                    output.push_str(self.render_cell_body(GridCoordinate::new(line_row, line_col)));
                }
            }
            output.push('\n');
        }

        write!(f, "{}", output)
    }
}

impl<GridIndexType: IndexType> fmt::Display for MazeGrid<GridIndexType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&MazeDisplay::new(self), f)
    }
}


#[cfg(test)]
mod tests {

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::generators::{self, MazeMode};
    use crate::grids::SmallMazeGrid;
    use crate::pathing::{self, UnweightedStrategy};
    use crate::progress::NoProgress;

    #[test]
    fn walled_grid() {
        let g = SmallMazeGrid::new(RowsCount(2), ColumnsCount(2));
        let expected = "┌───┬───┐\n\
                        │ S │   │\n\
                        ├───┼───┤\n\
                        │   │ E │\n\
                        └───┴───┘\n";
        assert_eq!(format!("{}", g), expected);
    }

    #[test]
    fn single_cell_maze_shows_entrance_and_exit() {
        let mut g = SmallMazeGrid::new(RowsCount(1), ColumnsCount(1));
        generators::generate(&mut g, MazeMode::Standard, &mut StdRng::seed_from_u64(1), &mut NoProgress);
        assert_eq!(format!("{}", g), "╶───╴\n  S  \n╶───╴\n");
    }

    #[test]
    fn passages_and_terrain() {
        let mut g = SmallMazeGrid::new(RowsCount(1), ColumnsCount(3));
        let gc = |r, c| GridCoordinate::new(r, c);
        g.remove_wall(gc(0, 0), gc(0, 1)).unwrap();
        g.set_terrain_cost(gc(0, 1), 10).unwrap();
        let expected = "┌───────┬───┐\n\
                        │ S   ≈ │ E │\n\
                        └───────┴───┘\n";
        assert_eq!(format!("{}", g), expected);

        g.set_terrain_cost(gc(0, 1), 5).unwrap();
        assert!(format!("{}", g).contains(" ~ "));
        g.set_terrain_cost(gc(0, 1), 3).unwrap();
        assert!(format!("{}", g).contains(" ? "));
    }

    #[test]
    fn path_overlay() {
        let mut g = SmallMazeGrid::new(RowsCount(5), ColumnsCount(5));
        let mut rng = StdRng::seed_from_u64(11);
        generators::generate(&mut g, MazeMode::Standard, &mut rng, &mut NoProgress);
        let result = pathing::solve_unweighted(&mut g, UnweightedStrategy::BreadthFirst, &mut NoProgress);

        let text = format!("{}", MazeDisplay::with_path(&g, &result.path));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 11);
        assert!(lines.iter().all(|line| line.chars().count() == 21));
        // start and end are marked, every other path cell is dotted
        assert_eq!(text.matches(" . ").count(), result.path.len() - 2);
        assert_eq!(text.matches(" S ").count(), 1);
        assert_eq!(text.matches(" E ").count(), 1);
        // entrance on the west of the first row, exit on the east of the last
        assert!(lines[1].starts_with(' '));
        assert!(lines[9].ends_with(' '));
    }
}
