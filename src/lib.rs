//! **maze_engine** carves perfect mazes with randomized Prim's algorithm and finds routes through
//! them with breadth first, depth first, Dijkstra and A* search.
//!
//! The algorithms report every step to a `progress::ProgressSink` so a front end can animate them.
//! `engine::MazeEngine` runs them one at a time on a background thread.

pub mod cells;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod grid;
pub mod grid_displays;
pub mod grid_iterators;
pub mod grids;
pub mod pathing;
pub mod progress;
pub mod units;
