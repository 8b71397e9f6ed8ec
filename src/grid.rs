use petgraph::graph;
pub use petgraph::graph::IndexType;
use petgraph::{Graph, Undirected};
use std::fmt;
use std::slice;

use crate::cells::{CellState, CompassPrimary, CoordinateSmallVec, GridCoordinate};
use crate::errors::{ErrorKind, Result};
use crate::grid_iterators::CellIter;
use crate::units::{ColumnsCount, EdgesCount, NodesCount, RowsCount};


/// The maze arena: a fixed `rows x columns` rectangle of cells.
///
/// Cells are the nodes of an undirected graph and an open passage between two adjacent cells is an
/// edge. A wall between two cells is therefore present unless the edge exists, so walls always
/// disappear in matched pairs. The start cell is the north west corner and the end cell is the
/// south east corner.
pub struct MazeGrid<GridIndexType: IndexType = u32> {
    graph: Graph<CellState, (), Undirected, GridIndexType>,
    rows: RowsCount,
    columns: ColumnsCount,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum CellLinkError {
    InvalidGridCoordinate,
    SelfLink,
    NotAdjacent,
}

/// Which per cell flags `MazeGrid::reset` clears.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum ResetMode {
    /// `generation_visited`
    Generation,
    /// `search_visited` and `parent`
    Search,
}

impl<GridIndexType: IndexType> fmt::Debug for MazeGrid<GridIndexType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MazeGrid :: rows: {:?}, columns: {:?}, passages: {}",
               self.rows, self.columns, self.graph.edge_count())
    }
}

impl<GridIndexType: IndexType> MazeGrid<GridIndexType> {
    /// Panics if either dimension is zero, or if the cell count or the count of interior walls does
    /// not fit the graph index type.
    pub fn new(rows: RowsCount, columns: ColumnsCount) -> MazeGrid<GridIndexType> {
        assert!(rows.0 > 0 && columns.0 > 0,
                "grid dimensions must be non zero, got {} x {}", rows.0, columns.0);

        let (NodesCount(nodes), EdgesCount(edges)) = graph_size(rows, columns);
        let max_index = <GridIndexType as IndexType>::max().index();
        assert!(nodes <= max_index && edges <= max_index,
                "a {} x {} grid is too large for the grid index type", rows.0, columns.0);

        let mut graph = Graph::with_capacity(nodes, edges);
        for _ in 0..nodes {
            let _ = graph.add_node(CellState::default());
        }

        MazeGrid { graph, rows, columns }
    }

    #[inline]
    pub fn rows(&self) -> RowsCount {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> ColumnsCount {
        self.columns
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.rows.0 * self.columns.0
    }

    #[inline]
    pub fn start(&self) -> GridCoordinate {
        GridCoordinate::new(0, 0)
    }

    #[inline]
    pub fn end(&self) -> GridCoordinate {
        GridCoordinate::new((self.rows.0 - 1) as u32, (self.columns.0 - 1) as u32)
    }

    /// Number of open passages between cells. Entrance and exit openings on the outer boundary are
    /// not passages.
    #[inline]
    pub fn passages_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Is the grid coordinate valid for this grid - within the grid's dimensions
    #[inline]
    pub fn is_valid_coordinate(&self, coord: GridCoordinate) -> bool {
        (coord.row as usize) < self.rows.0 && (coord.col as usize) < self.columns.0
    }

    /// Convert a grid coordinate to a one dimensional index in the range 0...grid.size().
    /// Returns None if the grid coordinate is invalid.
    #[inline]
    pub fn grid_coordinate_to_index(&self, coord: GridCoordinate) -> Option<usize> {
        if self.is_valid_coordinate(coord) {
            Some(coord.row as usize * self.columns.0 + coord.col as usize)
        } else {
            None
        }
    }

    /// Panics if the coordinate is outside the grid.
    #[inline]
    pub fn cell(&self, coord: GridCoordinate) -> &CellState {
        let node = self.node_index(coord);
        &self.graph[node]
    }

    #[inline]
    pub(crate) fn cell_mut(&mut self, coord: GridCoordinate) -> &mut CellState {
        let node = self.node_index(coord);
        &mut self.graph[node]
    }

    #[inline]
    pub fn terrain_cost(&self, coord: GridCoordinate) -> u32 {
        self.cell(coord).terrain_cost
    }

    /// Set the cost of entering a cell. Zero costs are rejected, out of grid coordinates panic.
    pub fn set_terrain_cost(&mut self, coord: GridCoordinate, cost: u32) -> Result<()> {
        if cost == 0 {
            return Err(ErrorKind::InvalidTerrainCost(cost).into());
        }
        self.cell_mut(coord).terrain_cost = cost;
        Ok(())
    }

    /// Cells that are to the North, East, South or West of a cell, ignoring walls.
    pub fn neighbours(&self, coord: GridCoordinate) -> CoordinateSmallVec {
        self.assert_valid(coord);
        CompassPrimary::ALL
            .iter()
            .filter_map(|dir| self.neighbour_at_direction(coord, *dir))
            .collect()
    }

    pub fn neighbour_at_direction(&self,
                                  coord: GridCoordinate,
                                  direction: CompassPrimary)
                                  -> Option<GridCoordinate> {
        coord.offset(direction)
             .filter(|neighbour_coord| self.is_valid_coordinate(*neighbour_coord))
    }

    /// Neighbouring cells reachable through an open passage - the maze's traversal graph.
    pub fn open_neighbours(&self, coord: GridCoordinate) -> CoordinateSmallVec {
        let node = self.node_index(coord);
        self.graph
            .neighbors(node)
            .map(|neighbour| GridCoordinate::from_row_major_index(neighbour.index(), self.columns))
            .collect()
    }

    /// Knock down the wall pair between two adjacent cells.
    pub fn remove_wall(&mut self, a: GridCoordinate, b: GridCoordinate) -> ::std::result::Result<(), CellLinkError> {
        let (a_index, b_index) = self.adjacent_node_indices(a, b)?;
        let _ = self.graph.update_edge(a_index, b_index, ());
        Ok(())
    }

    /// Put the wall pair between two adjacent cells back.
    /// Returns true if there was a passage to close.
    pub fn restore_wall(&mut self, a: GridCoordinate, b: GridCoordinate) -> bool {
        if let Ok((a_index, b_index)) = self.adjacent_node_indices(a, b) {
            if let Some(edge_index) = self.graph.find_edge(a_index, b_index) {
                // This invalidates the last edge index in the graph, which is fine as we
                // are not storing them for any reason.
                self.graph.remove_edge(edge_index);
                return true;
            }
        }

        false
    }

    /// Is there an open passage between two cells? Total over any pair of coordinates: cells outside
    /// the grid have no passages.
    pub fn has_passage(&self, a: GridCoordinate, b: GridCoordinate) -> bool {
        let a_index_opt = self.grid_coordinate_to_index(a);
        let b_index_opt = self.grid_coordinate_to_index(b);
        if let (Some(a_index), Some(b_index)) = (a_index_opt, b_index_opt) {
            self.graph
                .find_edge(graph::NodeIndex::new(a_index), graph::NodeIndex::new(b_index))
                .is_some()
        } else {
            false
        }
    }

    /// Is the given side of a cell walled? Sides on the outer boundary are walls unless opened as
    /// an entrance or exit.
    /// Panics if the coordinate is outside the grid.
    pub fn has_wall(&self, coord: GridCoordinate, direction: CompassPrimary) -> bool {
        self.assert_valid(coord);
        match self.neighbour_at_direction(coord, direction) {
            Some(neighbour) => !self.has_passage(coord, neighbour),
            None => !self.cell(coord).boundary_open[direction.wall_index()],
        }
    }

    /// The wall flags of a cell in North, East, South, West order.
    pub fn walls(&self, coord: GridCoordinate) -> [bool; 4] {
        let mut walls = [true; 4];
        for dir in CompassPrimary::ALL.iter() {
            walls[dir.wall_index()] = self.has_wall(coord, *dir);
        }
        walls
    }

    /// Open an outer boundary wall. Returns false if that side faces another cell.
    pub fn open_boundary(&mut self, coord: GridCoordinate, direction: CompassPrimary) -> bool {
        if self.neighbour_at_direction(coord, direction).is_some() {
            return false;
        }
        self.cell_mut(coord).boundary_open[direction.wall_index()] = true;
        true
    }

    /// Clear one class of per cell flags. Walls and terrain are left alone.
    pub fn reset(&mut self, mode: ResetMode) {
        for cell in self.graph.node_weights_mut() {
            match mode {
                ResetMode::Generation => cell.generation_visited = false,
                ResetMode::Search => {
                    cell.search_visited = false;
                    cell.parent = None;
                }
            }
        }
    }

    /// Wall up every cell again, including the entrance and exit.
    pub fn restore_all_walls(&mut self) {
        self.graph.clear_edges();
        for cell in self.graph.node_weights_mut() {
            cell.boundary_open = [false; 4];
        }
    }

    /// Set every cell back to the uniform grass cost.
    pub fn reset_terrain(&mut self) {
        for cell in self.graph.node_weights_mut() {
            cell.terrain_cost = 1;
        }
    }

    /// Count of cells currently flagged as visited by a search.
    pub fn search_visited_count(&self) -> usize {
        self.graph.raw_nodes().iter().filter(|node| node.weight.search_visited).count()
    }

    #[inline]
    pub fn iter(&self) -> CellIter {
        CellIter::new(self.rows, self.columns)
    }

    pub fn iter_passages(&self) -> PassagesIter<GridIndexType> {
        PassagesIter {
            graph_edge_iter: self.graph.raw_edges().iter(),
            columns: self.columns,
        }
    }

    fn assert_valid(&self, coord: GridCoordinate) {
        assert!(self.is_valid_coordinate(coord),
                "coordinate {} is outside the {} x {} grid", coord, self.rows.0, self.columns.0);
    }

    /// Convert a grid coordinate into a petgraph node index, panicking if it is out of bounds.
    #[inline]
    fn node_index(&self, coord: GridCoordinate) -> graph::NodeIndex<GridIndexType> {
        self.assert_valid(coord);
        graph::NodeIndex::new(coord.row as usize * self.columns.0 + coord.col as usize)
    }

    fn adjacent_node_indices(&self,
                             a: GridCoordinate,
                             b: GridCoordinate)
                             -> ::std::result::Result<(graph::NodeIndex<GridIndexType>,
                                                       graph::NodeIndex<GridIndexType>),
                                                      CellLinkError> {
        if a == b {
            return Err(CellLinkError::SelfLink);
        }
        match (self.grid_coordinate_to_index(a), self.grid_coordinate_to_index(b)) {
            (Some(a_index), Some(b_index)) => {
                if a.direction_to(b).is_none() {
                    Err(CellLinkError::NotAdjacent)
                } else {
                    Ok((graph::NodeIndex::new(a_index), graph::NodeIndex::new(b_index)))
                }
            }
            _ => Err(CellLinkError::InvalidGridCoordinate),
        }
    }
}

fn graph_size(rows: RowsCount, columns: ColumnsCount) -> (NodesCount, EdgesCount) {
    let cells_count = rows.0 * columns.0;
    // every interior wall could be open
    let edges_count_hint = rows.0 * (columns.0 - 1) + columns.0 * (rows.0 - 1);
    (NodesCount(cells_count), EdgesCount(edges_count_hint))
}

pub struct PassagesIter<'a, GridIndexType: IndexType> {
    graph_edge_iter: slice::Iter<'a, graph::Edge<(), GridIndexType>>,
    columns: ColumnsCount,
}

impl<'a, GridIndexType: IndexType> Iterator for PassagesIter<'a, GridIndexType> {
    type Item = (GridCoordinate, GridCoordinate);

    fn next(&mut self) -> Option<Self::Item> {
        let columns = self.columns;
        self.graph_edge_iter.next().map(|edge| {
            (GridCoordinate::from_row_major_index(edge.source().index(), columns),
             GridCoordinate::from_row_major_index(edge.target().index(), columns))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.graph_edge_iter.size_hint()
    }
}
impl<'a, GridIndexType: IndexType> ExactSizeIterator for PassagesIter<'a, GridIndexType> {}

impl<'a, GridIndexType: IndexType> fmt::Debug for PassagesIter<'a, GridIndexType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PassagesIter :: remaining: {}", self.graph_edge_iter.len())
    }
}


#[cfg(test)]
mod tests {

    use itertools::Itertools;

    use super::*;
    use crate::grids::{small_rect_grid, SmallMazeGrid};

    fn small_grid(rows: usize, columns: usize) -> SmallMazeGrid {
        small_rect_grid(RowsCount(rows), ColumnsCount(columns))
            .expect("grid dimensions too large for small grid")
    }

    fn gc(row: u32, col: u32) -> GridCoordinate {
        GridCoordinate::new(row, col)
    }

    #[test]
    fn neighbour_cells() {
        let g = small_grid(10, 10);

        let check_expected_neighbours = |coord, expected_neighbours: &[GridCoordinate]| {
            let neighbours: Vec<GridCoordinate> = g.neighbours(coord).iter().cloned().sorted().collect();
            let expected: Vec<GridCoordinate> = expected_neighbours.iter().cloned().sorted().collect();
            assert_eq!(neighbours, expected);
        };

        // corners
        check_expected_neighbours(gc(0, 0), &[gc(0, 1), gc(1, 0)]);
        check_expected_neighbours(gc(0, 9), &[gc(0, 8), gc(1, 9)]);
        check_expected_neighbours(gc(9, 0), &[gc(8, 0), gc(9, 1)]);
        check_expected_neighbours(gc(9, 9), &[gc(8, 9), gc(9, 8)]);

        // sides
        check_expected_neighbours(gc(0, 1), &[gc(0, 0), gc(1, 1), gc(0, 2)]);
        check_expected_neighbours(gc(8, 9), &[gc(7, 9), gc(9, 9), gc(8, 8)]);

        // Some place with 4 neighbours inside the grid
        check_expected_neighbours(gc(1, 1), &[gc(0, 1), gc(1, 0), gc(2, 1), gc(1, 2)]);
    }

    #[test]
    fn neighbours_at_direction() {
        let g = small_grid(2, 2);
        assert_eq!(g.neighbour_at_direction(gc(0, 0), CompassPrimary::North), None);
        assert_eq!(g.neighbour_at_direction(gc(0, 0), CompassPrimary::West), None);
        assert_eq!(g.neighbour_at_direction(gc(0, 0), CompassPrimary::East), Some(gc(0, 1)));
        assert_eq!(g.neighbour_at_direction(gc(0, 0), CompassPrimary::South), Some(gc(1, 0)));
        assert_eq!(g.neighbour_at_direction(gc(1, 1), CompassPrimary::South), None);
        assert_eq!(g.neighbour_at_direction(gc(1, 1), CompassPrimary::East), None);
        assert_eq!(g.neighbour_at_direction(gc(1, 1), CompassPrimary::West), Some(gc(1, 0)));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_bounds_neighbours_fail_fast() {
        let g = small_grid(3, 3);
        let _ = g.neighbours(gc(3, 0));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_bounds_wall_query_fails_fast() {
        // (0, 3) is just east of a 3 x 3 grid, its west side would be the valid cell (0, 2)
        let g = small_grid(3, 3);
        let _ = g.has_wall(gc(0, 3), CompassPrimary::West);
    }

    #[test]
    fn passage_queries_outside_the_grid_are_false() {
        let g = small_grid(3, 3);
        assert!(!g.has_passage(gc(0, 3), gc(0, 2)));
        assert!(!g.has_passage(gc(7, 7), gc(7, 8)));
    }

    #[test]
    #[should_panic(expected = "too large")]
    fn oversized_grid_for_index_type() {
        let _ = SmallMazeGrid::new(RowsCount(15), ColumnsCount(17));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_bounds_cell_access_fails_fast() {
        let g = small_grid(3, 3);
        let _ = g.cell(gc(0, 7));
    }

    #[test]
    fn start_and_end_are_opposite_corners() {
        let g = small_grid(4, 6);
        assert_eq!(g.start(), gc(0, 0));
        assert_eq!(g.end(), gc(3, 5));
        assert_eq!(g.size(), 24);
    }

    #[test]
    fn grid_coordinate_as_index() {
        let g = small_grid(3, 3);
        let indices: Vec<Option<usize>> = g.iter().map(|coord| g.grid_coordinate_to_index(coord)).collect();
        let expected = (0..9).map(Some).collect::<Vec<Option<usize>>>();
        assert_eq!(expected, indices);

        assert_eq!(g.grid_coordinate_to_index(gc(2, 3)), None);
        assert_eq!(g.grid_coordinate_to_index(gc(3, 2)), None);
        assert_eq!(g.grid_coordinate_to_index(gc(u32::MAX, u32::MAX)), None);
    }

    #[test]
    fn cell_iteration() {
        let g = small_grid(2, 3);
        assert_eq!(g.iter().collect::<Vec<_>>(),
                   &[gc(0, 0), gc(0, 1), gc(0, 2), gc(1, 0), gc(1, 1), gc(1, 2)]);
        assert_eq!(g.iter().len(), 6);
    }

    #[test]
    fn walls_are_removed_and_restored_in_pairs() {
        let mut g = small_grid(4, 4);
        let a = gc(1, 0);
        let b = gc(2, 0);
        let c = gc(3, 0);

        assert!(g.has_wall(a, CompassPrimary::South));
        assert!(g.has_wall(b, CompassPrimary::North));
        assert!(g.open_neighbours(a).is_empty());

        g.remove_wall(a, b).expect("remove wall failed");
        assert!(g.has_passage(a, b) && g.has_passage(b, a));
        assert!(!g.has_wall(a, CompassPrimary::South));
        assert!(!g.has_wall(b, CompassPrimary::North));
        assert_eq!(&*g.open_neighbours(a), &[b]);
        assert_eq!(&*g.open_neighbours(b), &[a]);

        g.remove_wall(c, b).expect("remove wall failed");
        let b_open: Vec<_> = g.open_neighbours(b).iter().cloned().sorted().collect();
        assert_eq!(b_open, vec![a, c]);
        assert_eq!(g.walls(b), [false, true, false, true]);

        assert!(g.restore_wall(b, a));
        assert!(!g.has_passage(a, b));
        assert!(g.has_passage(b, c));
        assert!(g.has_wall(a, CompassPrimary::South) && g.has_wall(b, CompassPrimary::North));
        assert!(!g.restore_wall(a, b));
    }

    #[test]
    fn no_duplicated_passages() {
        let mut g = small_grid(4, 4);
        let a = gc(0, 0);
        let b = gc(0, 1);
        g.remove_wall(a, b).expect("remove wall failed");
        g.remove_wall(b, a).expect("remove wall failed");
        assert_eq!(g.passages_count(), 1);
        assert_eq!(&*g.open_neighbours(a), &[b]);
    }

    #[test]
    fn wall_removal_errors() {
        let mut g = small_grid(4, 4);
        assert_eq!(g.remove_wall(gc(0, 0), gc(0, 0)), Err(CellLinkError::SelfLink));
        assert_eq!(g.remove_wall(gc(0, 0), gc(100, 100)), Err(CellLinkError::InvalidGridCoordinate));
        assert_eq!(g.remove_wall(gc(0, 0), gc(1, 1)), Err(CellLinkError::NotAdjacent));
        assert_eq!(g.passages_count(), 0);
    }

    #[test]
    fn boundary_walls_open_only_on_the_edge() {
        let mut g = small_grid(3, 3);
        assert!(g.has_wall(gc(0, 0), CompassPrimary::West));
        assert!(g.open_boundary(gc(0, 0), CompassPrimary::West));
        assert!(!g.has_wall(gc(0, 0), CompassPrimary::West));
        assert!(!g.open_boundary(gc(0, 0), CompassPrimary::East));
        assert!(g.has_wall(gc(0, 0), CompassPrimary::East));

        g.restore_all_walls();
        assert!(g.has_wall(gc(0, 0), CompassPrimary::West));
    }

    #[test]
    fn reset_clears_only_the_requested_flags() {
        let mut g = small_grid(2, 2);
        g.remove_wall(gc(0, 0), gc(0, 1)).unwrap();
        g.set_terrain_cost(gc(1, 1), 5).unwrap();
        for coord in g.iter().collect::<Vec<_>>() {
            let cell = g.cell_mut(coord);
            cell.generation_visited = true;
            cell.search_visited = true;
            cell.parent = Some(gc(0, 0));
        }

        g.reset(ResetMode::Search);
        assert!(g.iter().all(|c| !g.cell(c).search_visited && g.cell(c).parent.is_none()));
        assert!(g.iter().all(|c| g.cell(c).generation_visited));

        g.reset(ResetMode::Generation);
        assert!(g.iter().all(|c| !g.cell(c).generation_visited));
        assert!(g.has_passage(gc(0, 0), gc(0, 1)));
        assert_eq!(g.terrain_cost(gc(1, 1)), 5);
    }

    #[test]
    fn zero_terrain_cost_is_rejected() {
        let mut g = small_grid(2, 2);
        assert!(g.set_terrain_cost(gc(0, 1), 0).is_err());
        assert_eq!(g.terrain_cost(gc(0, 1)), 1);
    }

    #[test]
    fn passages_iteration() {
        let mut g = small_grid(2, 2);
        g.remove_wall(gc(0, 0), gc(1, 0)).unwrap();
        g.remove_wall(gc(1, 1), gc(1, 0)).unwrap();
        let passages: Vec<(GridCoordinate, GridCoordinate)> = g.iter_passages().collect();
        assert_eq!(passages, vec![(gc(0, 0), gc(1, 0)), (gc(1, 1), gc(1, 0))]);
    }
}
