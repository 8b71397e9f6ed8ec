use fnv::FnvHashSet;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cells::{CompassPrimary, CoordinateSmallVec, GridCoordinate, Terrain};
use crate::grid::{IndexType, MazeGrid, ResetMode};
use crate::progress::{ProgressSink, StepKind};

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum MazeMode {
    /// Every cell costs 1 to enter.
    Standard,
    /// Cells are randomly grass, mud or water, except the start and end which stay grass.
    WeightedTerrain,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct GenerationSummary {
    pub passages: usize,
    pub mode: MazeMode,
}

/// Build a fresh perfect maze over the whole grid.
///
/// Any previous maze is wiped first: all walls go back up, terrain returns to grass and the
/// search flags are cleared, so generating twice leaves nothing behind from the first maze.
pub fn generate<GridIndexType, R, S>(grid: &mut MazeGrid<GridIndexType>,
                                     mode: MazeMode,
                                     rng: &mut R,
                                     sink: &mut S)
                                     -> GenerationSummary
    where GridIndexType: IndexType,
          R: Rng + ?Sized,
          S: ProgressSink + ?Sized
{
    debug!("generating {:?} maze on a {} x {} grid", mode, grid.rows().0, grid.columns().0);

    grid.restore_all_walls();
    grid.reset(ResetMode::Search);
    grid.reset_terrain();

    prims(grid, rng, sink);

    if mode == MazeMode::WeightedTerrain {
        assign_terrain(grid, rng);
    }

    let summary = GenerationSummary {
        passages: grid.passages_count(),
        mode,
    };
    debug!("maze generated with {} passages", summary.passages);
    sink.on_generated(&summary);
    summary
}

/// Apply the randomized Prim's maze generation algorithm to a fully walled grid.
///
/// The maze grows outwards from the start cell. The frontier holds the unvisited cells next to the
/// maze so far; a random frontier cell is joined to a random one of its already visited neighbours
/// and its own unvisited neighbours join the frontier. Every cell is joined exactly once by a
/// single passage, so the result is a spanning tree with `size - 1` passages whatever the rng does.
///
/// Once the tree is complete the west wall of the start cell and the east wall of the end cell are
/// opened as the entrance and exit.
pub fn prims<GridIndexType, R, S>(grid: &mut MazeGrid<GridIndexType>, rng: &mut R, sink: &mut S)
    where GridIndexType: IndexType,
          R: Rng + ?Sized,
          S: ProgressSink + ?Sized
{
    grid.reset(ResetMode::Generation);

    let start = grid.start();
    grid.cell_mut(start).generation_visited = true;

    let mut frontier: Vec<GridCoordinate> = Vec::with_capacity(grid.size());
    let mut in_frontier: FnvHashSet<GridCoordinate> =
        FnvHashSet::with_capacity_and_hasher(grid.size(), Default::default());
    extend_frontier(grid, start, &mut frontier, &mut in_frontier);

    while !frontier.is_empty() {
        let cell = frontier.swap_remove(rng.gen_range(0..frontier.len()));
        in_frontier.remove(&cell);

        let visited_neighbours: CoordinateSmallVec = grid.neighbours(cell)
            .iter()
            .cloned()
            .filter(|neighbour| grid.cell(*neighbour).generation_visited)
            .collect();

        if let Some(&join_to) = visited_neighbours.choose(rng) {
            if grid.remove_wall(cell, join_to).is_ok() {
                sink.on_step(StepKind::WallRemoved, cell);
            }
            grid.cell_mut(cell).generation_visited = true;
            extend_frontier(grid, cell, &mut frontier, &mut in_frontier);
        }
    }

    let end = grid.end();
    if grid.open_boundary(start, CompassPrimary::West) {
        sink.on_step(StepKind::WallRemoved, start);
    }
    if grid.open_boundary(end, CompassPrimary::East) {
        sink.on_step(StepKind::WallRemoved, end);
    }
}

fn extend_frontier<GridIndexType: IndexType>(grid: &MazeGrid<GridIndexType>,
                                             coord: GridCoordinate,
                                             frontier: &mut Vec<GridCoordinate>,
                                             in_frontier: &mut FnvHashSet<GridCoordinate>) {
    for neighbour in grid.neighbours(coord).iter() {
        if !grid.cell(*neighbour).generation_visited && in_frontier.insert(*neighbour) {
            frontier.push(*neighbour);
        }
    }
}

/// Lay random terrain over every cell except the start and end, which are forced to grass.
pub fn assign_terrain<GridIndexType, R>(grid: &mut MazeGrid<GridIndexType>, rng: &mut R)
    where GridIndexType: IndexType,
          R: Rng + ?Sized
{
    let (start, end) = (grid.start(), grid.end());
    for coord in grid.iter() {
        let terrain = if coord == start || coord == end {
            Terrain::Grass
        } else {
            Terrain::random(rng)
        };
        grid.cell_mut(coord).terrain_cost = terrain.cost();
    }
}

/// Wall up `count` randomly chosen passages. A maze treated like this is no longer perfect and may
/// have no route from start to end. Returns how many passages were closed.
pub fn block_passages<GridIndexType, R>(grid: &mut MazeGrid<GridIndexType>,
                                        count: usize,
                                        rng: &mut R)
                                        -> usize
    where GridIndexType: IndexType,
          R: Rng + ?Sized
{
    let passages: Vec<(GridCoordinate, GridCoordinate)> = grid.iter_passages().collect();
    let to_block: Vec<(GridCoordinate, GridCoordinate)> =
        passages.choose_multiple(rng, count).cloned().collect();

    let blocked = to_block.into_iter()
                          .filter(|&(a, b)| grid.restore_wall(a, b))
                          .count();
    debug!("blocked {} of {} passages", blocked, passages.len());
    blocked
}
