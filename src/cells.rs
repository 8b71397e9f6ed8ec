use rand::Rng;
use smallvec::SmallVec;
use std::convert::From;
use std::fmt;

use crate::units::ColumnsCount;

pub type CoordinateSmallVec = SmallVec<[GridCoordinate; 4]>;

/// A cell position on a rectangular grid. Row 0 is the northern edge, column 0 the western edge.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Ord, PartialOrd)]
pub struct GridCoordinate {
    pub row: u32,
    pub col: u32,
}

impl GridCoordinate {
    pub fn new(row: u32, col: u32) -> GridCoordinate {
        GridCoordinate { row, col }
    }

    #[inline]
    pub fn from_row_major_index(index: usize, columns: ColumnsCount) -> GridCoordinate {
        let ColumnsCount(width) = columns;
        GridCoordinate::new((index / width) as u32, (index % width) as u32)
    }

    /// Creates a new coordinate offset 1 cell away in the given direction.
    /// Returns None if the coordinate is not representable (north of row 0, west of column 0).
    /// The caller still has to check the result against the grid's southern and eastern bounds.
    pub fn offset(self, dir: CompassPrimary) -> Option<GridCoordinate> {
        let (row, col) = (self.row, self.col);
        match dir {
            CompassPrimary::North => {
                if row > 0 {
                    Some(GridCoordinate::new(row - 1, col))
                } else {
                    None
                }
            }
            CompassPrimary::South => row.checked_add(1).map(|r| GridCoordinate::new(r, col)),
            CompassPrimary::East => col.checked_add(1).map(|c| GridCoordinate::new(row, c)),
            CompassPrimary::West => {
                if col > 0 {
                    Some(GridCoordinate::new(row, col - 1))
                } else {
                    None
                }
            }
        }
    }

    /// The direction to take from `self` to reach the adjacent `other`, if they are 4-adjacent.
    pub fn direction_to(self, other: GridCoordinate) -> Option<CompassPrimary> {
        CompassPrimary::ALL
            .iter()
            .cloned()
            .find(|dir| self.offset(*dir) == Some(other))
    }

    /// Grid steps between two coordinates moving only north/south/east/west.
    #[inline]
    pub fn manhattan_distance(self, other: GridCoordinate) -> u32 {
        let dr = if self.row > other.row { self.row - other.row } else { other.row - self.row };
        let dc = if self.col > other.col { self.col - other.col } else { other.col - self.col };
        dr + dc
    }
}

impl From<(u32, u32)> for GridCoordinate {
    fn from(row_col_pair: (u32, u32)) -> GridCoordinate {
        GridCoordinate::new(row_col_pair.0, row_col_pair.1)
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four sides of a square cell, in wall-array order.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum CompassPrimary {
    North,
    East,
    South,
    West,
}

impl CompassPrimary {
    pub const ALL: [CompassPrimary; 4] = [CompassPrimary::North,
                                          CompassPrimary::East,
                                          CompassPrimary::South,
                                          CompassPrimary::West];

    #[inline]
    pub fn opposite(self) -> CompassPrimary {
        match self {
            CompassPrimary::North => CompassPrimary::South,
            CompassPrimary::East => CompassPrimary::West,
            CompassPrimary::South => CompassPrimary::North,
            CompassPrimary::West => CompassPrimary::East,
        }
    }

    /// Position of this side in a `[bool; 4]` walls array.
    #[inline]
    pub fn wall_index(self) -> usize {
        match self {
            CompassPrimary::North => 0,
            CompassPrimary::East => 1,
            CompassPrimary::South => 2,
            CompassPrimary::West => 3,
        }
    }
}

/// Terrain types laid over a weighted maze.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum Terrain {
    Grass,
    Mud,
    Water,
}

impl Terrain {
    #[inline]
    pub fn cost(self) -> u32 {
        match self {
            Terrain::Grass => 1,
            Terrain::Mud => 5,
            Terrain::Water => 10,
        }
    }

    /// Grass 60%, mud 25%, water 15%.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Terrain {
        let roll = rng.gen_range(0..100u32);
        if roll < 60 {
            Terrain::Grass
        } else if roll < 85 {
            Terrain::Mud
        } else {
            Terrain::Water
        }
    }

    /// The terrain a cost corresponds to, if it is one of the standard costs.
    pub fn from_cost(cost: u32) -> Option<Terrain> {
        match cost {
            1 => Some(Terrain::Grass),
            5 => Some(Terrain::Mud),
            10 => Some(Terrain::Water),
            _ => None,
        }
    }
}

impl Default for Terrain {
    fn default() -> Self {
        Terrain::Grass
    }
}

/// Per cell state stored as the node weight of the grid graph.
///
/// Walls between cells are not stored here: an interior wall is absent exactly when the grid graph
/// has an edge between the two cells, which keeps wall removal symmetric. Only the outer boundary
/// sides, which have no neighbour to link to, are tracked per cell.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct CellState {
    pub generation_visited: bool,
    pub search_visited: bool,
    pub parent: Option<GridCoordinate>,
    pub terrain_cost: u32,
    pub(crate) boundary_open: [bool; 4],
}

impl Default for CellState {
    fn default() -> Self {
        CellState {
            generation_visited: false,
            search_visited: false,
            parent: None,
            terrain_cost: Terrain::Grass.cost(),
            boundary_open: [false; 4],
        }
    }
}

impl CellState {
    #[inline]
    pub fn terrain(&self) -> Option<Terrain> {
        Terrain::from_cost(self.terrain_cost)
    }
}
