//! Route finding from the start cell to the end cell of a maze.
//!
//! Every solver only moves through open passages. The unweighted solvers count steps, the weighted
//! solvers add up the terrain cost of each cell they enter. All of them record what they did in the
//! grid's search flags (`search_visited`, `parent`), which are cleared at the start of each solve.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use itertools::Itertools;
use log::{debug, info, warn};

use crate::cells::GridCoordinate;
use crate::grid::{IndexType, MazeGrid, ResetMode};
use crate::progress::{ProgressSink, StepKind};

/// The outcome of one solve. `found == false` means the end cannot be reached, which only happens
/// on a grid that is no longer a perfect maze.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub found: bool,
    /// Start to end inclusive, empty when nothing was found.
    pub path: Vec<GridCoordinate>,
    /// Steps taken for the unweighted solvers, summed terrain cost for the weighted solvers.
    pub total_cost: u64,
    pub cells_visited: usize,
}

impl SearchResult {
    fn not_found(cells_visited: usize) -> SearchResult {
        SearchResult {
            found: false,
            path: Vec::new(),
            total_cost: 0,
            cells_visited,
        }
    }

    /// Number of steps along the path.
    pub fn path_length(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum UnweightedStrategy {
    /// Shortest path by step count.
    BreadthFirst,
    /// Some path, not necessarily the shortest.
    DepthFirst,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum WeightedStrategy {
    Dijkstra,
    /// Dijkstra guided by the Manhattan distance to the end.
    AStar,
}

enum Frontier {
    Fifo(VecDeque<GridCoordinate>),
    Lifo(Vec<GridCoordinate>),
}

impl Frontier {
    fn new(strategy: UnweightedStrategy, capacity: usize) -> Frontier {
        match strategy {
            UnweightedStrategy::BreadthFirst => Frontier::Fifo(VecDeque::with_capacity(capacity)),
            UnweightedStrategy::DepthFirst => Frontier::Lifo(Vec::with_capacity(capacity)),
        }
    }

    fn push(&mut self, coord: GridCoordinate) {
        match *self {
            Frontier::Fifo(ref mut queue) => queue.push_back(coord),
            Frontier::Lifo(ref mut stack) => stack.push(coord),
        }
    }

    fn pop(&mut self) -> Option<GridCoordinate> {
        match *self {
            Frontier::Fifo(ref mut queue) => queue.pop_front(),
            Frontier::Lifo(ref mut stack) => stack.pop(),
        }
    }
}

/// Find a route from start to end by breadth first or depth first search, ignoring terrain.
///
/// Cells are marked visited when they are first discovered, so `cells_visited` counts every cell
/// the search touched, not only the ones it expanded.
pub fn solve_unweighted<GridIndexType, S>(grid: &mut MazeGrid<GridIndexType>,
                                          strategy: UnweightedStrategy,
                                          sink: &mut S)
                                          -> SearchResult
    where GridIndexType: IndexType,
          S: ProgressSink + ?Sized
{
    debug!("{:?} search on a {} x {} grid", strategy, grid.rows().0, grid.columns().0);
    grid.reset(ResetMode::Search);

    let (start, end) = (grid.start(), grid.end());
    let mut frontier = Frontier::new(strategy, grid.size());

    grid.cell_mut(start).search_visited = true;
    sink.on_step(StepKind::CellVisited, start);
    frontier.push(start);

    let mut found = false;
    while let Some(current) = frontier.pop() {
        if current == end {
            found = true;
            break;
        }

        for next in grid.open_neighbours(current).iter() {
            let cell = grid.cell_mut(*next);
            if !cell.search_visited {
                cell.search_visited = true;
                cell.parent = Some(current);
                sink.on_step(StepKind::CellVisited, *next);
                frontier.push(*next);
            }
        }
    }

    let cells_visited = grid.search_visited_count();
    let result = match reconstruct_path(grid, end) {
        Some(path) if found => SearchResult {
            total_cost: path.len() as u64 - 1,
            path,
            found: true,
            cells_visited,
        },
        _ => SearchResult::not_found(cells_visited),
    };

    finish(strategy, result, sink)
}

/// Priority queue entry. `BinaryHeap` is a max heap so the ordering is reversed to pop the smallest
/// key first; equal keys pop in insertion order.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct QueueEntry {
    key: u64,
    sequence: u64,
    coord: GridCoordinate,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key
             .cmp(&self.key)
             .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const UNREACHED: u64 = u64::MAX;

/// Find the cheapest route from start to end, where entering a cell costs its terrain cost.
///
/// The A* key adds the Manhattan distance to the end. Every step moves one cell and costs at
/// least 1, so that estimate never overshoots and A* finds the same optimal cost as Dijkstra.
/// `cells_visited` counts the cells taken off the queue and finalised.
pub fn solve_weighted<GridIndexType, S>(grid: &mut MazeGrid<GridIndexType>,
                                        strategy: WeightedStrategy,
                                        sink: &mut S)
                                        -> SearchResult
    where GridIndexType: IndexType,
          S: ProgressSink + ?Sized
{
    debug!("{:?} search on a {} x {} grid", strategy, grid.rows().0, grid.columns().0);
    grid.reset(ResetMode::Search);

    let (start, end) = (grid.start(), grid.end());
    let heuristic = |coord: GridCoordinate| -> u64 {
        match strategy {
            WeightedStrategy::Dijkstra => 0,
            WeightedStrategy::AStar => u64::from(coord.manhattan_distance(end)),
        }
    };
    let index = |grid: &MazeGrid<GridIndexType>, coord: GridCoordinate| -> usize {
        coord.row as usize * grid.columns().0 + coord.col as usize
    };

    let mut dist = vec![UNREACHED; grid.size()];
    let mut open = BinaryHeap::new();
    let mut sequence = 0;

    dist[index(grid, start)] = 0;
    open.push(QueueEntry { key: heuristic(start), sequence, coord: start });

    let mut cells_visited = 0;
    let mut found = false;
    while let Some(QueueEntry { coord: current, .. }) = open.pop() {
        if grid.cell(current).search_visited {
            // stale entry for a cell already finalised through a cheaper key
            continue;
        }
        grid.cell_mut(current).search_visited = true;
        cells_visited += 1;
        sink.on_step(StepKind::CellVisited, current);

        if current == end {
            found = true;
            break;
        }

        let current_dist = dist[index(grid, current)];
        for next in grid.open_neighbours(current).iter() {
            if grid.cell(*next).search_visited {
                continue;
            }
            let candidate = current_dist.saturating_add(u64::from(grid.terrain_cost(*next)));
            let next_index = index(grid, *next);
            if candidate < dist[next_index] {
                dist[next_index] = candidate;
                grid.cell_mut(*next).parent = Some(current);
                sequence += 1;
                open.push(QueueEntry {
                    key: candidate.saturating_add(heuristic(*next)),
                    sequence,
                    coord: *next,
                });
            }
        }
    }

    let result = match reconstruct_path(grid, end) {
        Some(path) if found => SearchResult {
            found: true,
            path,
            total_cost: dist[index(grid, end)],
            cells_visited,
        },
        _ => SearchResult::not_found(cells_visited),
    };

    finish(strategy, result, sink)
}

fn finish<Strategy, S>(strategy: Strategy, result: SearchResult, sink: &mut S) -> SearchResult
    where Strategy: ::std::fmt::Debug,
          S: ProgressSink + ?Sized
{
    if result.found {
        for coord in &result.path {
            sink.on_step(StepKind::PathCellAdded, *coord);
        }
        info!("{:?} found a path of {} steps costing {} after visiting {} cells",
              strategy, result.path_length(), result.total_cost, result.cells_visited);
    } else {
        warn!("{:?} found no path after visiting {} cells", strategy, result.cells_visited);
    }
    sink.on_complete(&result);
    result
}

/// Walk the parent links from `end` back to the start and reverse them.
/// Returns None if the chain does not reach the start.
pub fn reconstruct_path<GridIndexType: IndexType>(grid: &MazeGrid<GridIndexType>,
                                                  end: GridCoordinate)
                                                  -> Option<Vec<GridCoordinate>> {
    let start = grid.start();
    let mut path = vec![end];
    let mut current = end;

    while current != start {
        // a chain longer than the grid has looped
        if path.len() > grid.size() {
            return None;
        }
        current = grid.cell(current).parent?;
        path.push(current);
    }

    path.reverse();
    Some(path)
}

/// Does the path run from the grid's start to its end, one open passage at a time?
pub fn is_valid_path<GridIndexType: IndexType>(grid: &MazeGrid<GridIndexType>,
                                               path: &[GridCoordinate])
                                               -> bool {
    path.first() == Some(&grid.start()) && path.last() == Some(&grid.end()) &&
    path.iter().tuple_windows().all(|(a, b)| grid.has_passage(*a, *b))
}

/// Sum of the terrain costs of every cell entered along the path (the first cell is free).
pub fn path_cost<GridIndexType: IndexType>(grid: &MazeGrid<GridIndexType>,
                                           path: &[GridCoordinate])
                                           -> u64 {
    path.iter()
        .skip(1)
        .map(|coord| u64::from(grid.terrain_cost(*coord)))
        .sum()
}
