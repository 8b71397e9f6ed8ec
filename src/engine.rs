//! Runs maze jobs in the background, one at a time per grid.
//!
//! A job is a worker thread that owns the grid for its whole run and a consumer thread that feeds
//! the worker's progress messages to the caller's `ProgressSink`. While a job is running any other
//! request is turned away with `ErrorKind::Busy` and leaves the grid untouched.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{Error, ErrorKind, Result};
use crate::generators::{self, GenerationSummary, MazeMode};
use crate::grid::ResetMode;
use crate::grids::{large_rect_grid, LargeMazeGrid};
use crate::pathing::{self, SearchResult, UnweightedStrategy, WeightedStrategy};
use crate::progress::{self, ChannelSink, Pacing, ProgressSink};
use crate::units::{ColumnsCount, RowsCount};

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum ExecutionState {
    Idle,
    Generating,
    Solving,
    /// A closure passed to `with_grid` or `with_grid_mut` is running.
    Editing,
}

impl ExecutionState {
    fn as_u8(self) -> u8 {
        match self {
            ExecutionState::Idle => 0,
            ExecutionState::Generating => 1,
            ExecutionState::Solving => 2,
            ExecutionState::Editing => 3,
        }
    }

    fn from_u8(value: u8) -> ExecutionState {
        match value {
            1 => ExecutionState::Generating,
            2 => ExecutionState::Solving,
            3 => ExecutionState::Editing,
            _ => ExecutionState::Idle,
        }
    }
}

/// Claim on the execution state for the duration of a job or a grid closure. Dropping it, including
/// while a panicking thread unwinds, puts the engine back to `Idle`.
#[derive(Debug)]
struct StateGuard {
    state: Arc<AtomicU8>,
}

impl StateGuard {
    fn acquire(state: &Arc<AtomicU8>, next: ExecutionState) -> Result<StateGuard> {
        match state.compare_exchange(ExecutionState::Idle.as_u8(),
                                     next.as_u8(),
                                     Ordering::SeqCst,
                                     Ordering::SeqCst) {
            Ok(_) => Ok(StateGuard { state: Arc::clone(state) }),
            Err(current) => {
                let current = ExecutionState::from_u8(current);
                warn!("rejected {:?} request while {:?}", next, current);
                Err(ErrorKind::Busy(current).into())
            }
        }
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        self.state.store(ExecutionState::Idle.as_u8(), Ordering::SeqCst);
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct EngineConfig {
    pub rows: RowsCount,
    pub columns: ColumnsCount,
    /// None seeds from the operating system.
    pub seed: Option<u64>,
    pub pacing: Pacing,
    /// Progress messages buffered before the worker waits for the consumer. Zero makes every step
    /// a rendezvous.
    pub channel_bound: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rows: RowsCount(35),
            columns: ColumnsCount(50),
            seed: None,
            pacing: Pacing::default(),
            channel_bound: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> EngineConfigBuilder {
        EngineConfigBuilder { config: EngineConfig::default() }
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.config.rows = RowsCount(rows);
        self
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.config.columns = ColumnsCount(columns);
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.config.pacing.step_delay = delay;
        self
    }

    pub fn cadence(mut self, steps: usize) -> Self {
        self.config.pacing.cadence = steps;
        self
    }

    pub fn channel_bound(mut self, bound: usize) -> Self {
        self.config.channel_bound = bound;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        EngineConfigBuilder::new()
    }
}

/// A running job. `join` waits for both the worker and the progress consumer and hands back the
/// job's value together with the caller's sink.
///
/// The engine stays busy until the consumer has delivered the last notification to the sink, so
/// a paced animation finishes before the next job can start.
#[derive(Debug)]
pub struct JobHandle<T, S> {
    job: &'static str,
    worker: JoinHandle<T>,
    consumer: JoinHandle<S>,
}

impl<T, S> JobHandle<T, S> {
    pub fn join(self) -> Result<(T, S)> {
        let job = self.job;
        let panicked = |_| -> Error {
            warn!("{} job panicked", job);
            ErrorKind::WorkerPanicked(job).into()
        };
        let value = self.worker.join().map_err(panicked)?;
        let sink = self.consumer.join().map_err(panicked)?;
        Ok((value, sink))
    }
}

pub struct MazeEngine {
    grid: Arc<RwLock<LargeMazeGrid>>,
    state: Arc<AtomicU8>,
    rng: Mutex<StdRng>,
    config: EngineConfig,
}

impl MazeEngine {
    /// Fails with `InvalidDimensions` if a dimension is zero or the grid is too large to index.
    pub fn new(config: EngineConfig) -> Result<MazeEngine> {
        let grid = large_rect_grid(config.rows, config.columns)
            .ok_or_else(|| ErrorKind::InvalidDimensions(config.rows.0, config.columns.0))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        debug!("new maze engine with a {} x {} grid", config.rows.0, config.columns.0);

        Ok(MazeEngine {
            grid: Arc::new(RwLock::new(grid)),
            state: Arc::new(AtomicU8::new(ExecutionState::Idle.as_u8())),
            rng: Mutex::new(rng),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Carve a new maze in the background.
    pub fn generate<S>(&self, mode: MazeMode, sink: S) -> Result<JobHandle<GenerationSummary, S>>
        where S: ProgressSink + Send + 'static
    {
        let guard = StateGuard::acquire(&self.state, ExecutionState::Generating)?;

        // each job gets its own rng drawn from the engine's, so a seeded engine replays the same
        // sequence of mazes
        let job_seed = self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen();
        let mut rng = StdRng::seed_from_u64(job_seed);

        self.spawn(guard, "generate", sink, move |grid, channel| {
            generators::generate(grid, mode, &mut rng, channel)
        })
    }

    /// Breadth or depth first search in the background.
    pub fn solve_unweighted<S>(&self,
                               strategy: UnweightedStrategy,
                               sink: S)
                               -> Result<JobHandle<SearchResult, S>>
        where S: ProgressSink + Send + 'static
    {
        let guard = StateGuard::acquire(&self.state, ExecutionState::Solving)?;
        self.spawn(guard, "unweighted solve", sink, move |grid, channel| {
            pathing::solve_unweighted(grid, strategy, channel)
        })
    }

    /// Dijkstra or A* search in the background.
    pub fn solve_weighted<S>(&self,
                             strategy: WeightedStrategy,
                             sink: S)
                             -> Result<JobHandle<SearchResult, S>>
        where S: ProgressSink + Send + 'static
    {
        let guard = StateGuard::acquire(&self.state, ExecutionState::Solving)?;
        self.spawn(guard, "weighted solve", sink, move |grid, channel| {
            pathing::solve_weighted(grid, strategy, channel)
        })
    }

    /// Clear the search flags left by the last solve.
    pub fn reset_search(&self) -> Result<()> {
        self.with_grid_mut(|grid| grid.reset(ResetMode::Search))
    }

    /// Read the grid while no job is running. The engine is `Editing` until `f` returns, so jobs
    /// requested meanwhile are rejected.
    pub fn with_grid<T, F>(&self, f: F) -> Result<T>
        where F: FnOnce(&LargeMazeGrid) -> T
    {
        let _guard = StateGuard::acquire(&self.state, ExecutionState::Editing)?;
        let grid = self.grid.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&grid))
    }

    /// Change the grid while no job is running, e.g. to set terrain by hand. The engine is
    /// `Editing` until `f` returns.
    pub fn with_grid_mut<T, F>(&self, f: F) -> Result<T>
        where F: FnOnce(&mut LargeMazeGrid) -> T
    {
        let _guard = StateGuard::acquire(&self.state, ExecutionState::Editing)?;
        let mut grid = self.grid.write().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut grid))
    }

    /// Non blocking read access for observers. None while a job holds the grid.
    pub fn try_grid(&self) -> Option<RwLockReadGuard<LargeMazeGrid>> {
        self.grid.try_read().ok()
    }

    fn spawn<T, S, F>(&self,
                      guard: StateGuard,
                      job: &'static str,
                      sink: S,
                      work: F)
                      -> Result<JobHandle<T, S>>
        where T: Send + 'static,
              S: ProgressSink + Send + 'static,
              F: FnOnce(&mut LargeMazeGrid, &mut ChannelSink) -> T + Send + 'static
    {
        debug!("starting {} job", job);
        let (sender, receiver) = sync_channel(self.config.channel_bound);
        let grid = Arc::clone(&self.grid);

        // shared by both threads, the engine goes idle once the worker and the consumer are done
        let guard = Arc::new(guard);
        let consumer_guard = Arc::clone(&guard);

        let worker = thread::Builder::new()
            .name(format!("maze {}", job))
            .spawn(move || {
                // dropped last: the grid lock and the channel are released first
                let _guard = guard;
                let mut channel = ChannelSink::new(sender);
                let mut grid = grid.write().unwrap_or_else(PoisonError::into_inner);
                let value = work(&mut *grid, &mut channel);
                debug!("{} job finished", job);
                value
            })?;

        let pacing = self.config.pacing;
        let consumer = thread::Builder::new()
            .name(format!("maze {} progress", job))
            .spawn(move || {
                let _guard = consumer_guard;
                progress::pump(receiver, sink, pacing)
            })?;

        Ok(JobHandle { job, worker, consumer })
    }
}


#[cfg(test)]
mod tests {

    use std::sync::mpsc::{channel, Receiver};

    use super::*;
    use crate::cells::GridCoordinate;
    use crate::progress::{NoProgress, StepKind, StepRecorder};

    fn small_engine(seed: u64) -> MazeEngine {
        MazeEngine::new(EngineConfigBuilder::new().rows(4).columns(4).seed(Some(seed)).build()).unwrap()
    }

    /// Holds up the consumer on the first step until released.
    struct GateSink {
        release: Receiver<()>,
        opened: bool,
        steps: usize,
    }

    impl ProgressSink for GateSink {
        fn on_step(&mut self, _: StepKind, _: GridCoordinate) {
            if !self.opened {
                let _ = self.release.recv();
                self.opened = true;
            }
            self.steps += 1;
        }
    }

    /// Notes the engine state each time a notification arrives.
    struct StateWatcher {
        state: Arc<AtomicU8>,
        seen: Vec<ExecutionState>,
    }

    impl StateWatcher {
        fn record(&mut self) {
            self.seen.push(ExecutionState::from_u8(self.state.load(Ordering::SeqCst)));
        }
    }

    impl ProgressSink for StateWatcher {
        fn on_step(&mut self, _: StepKind, _: GridCoordinate) {
            self.record();
        }

        fn on_generated(&mut self, _: &GenerationSummary) {
            self.record();
        }
    }

    fn is_busy(err: &Error, expected: ExecutionState) -> bool {
        match *err.kind() {
            ErrorKind::Busy(state) => state == expected,
            _ => false,
        }
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.rows, RowsCount(35));
        assert_eq!(config.columns, ColumnsCount(50));
        assert_eq!(config.pacing.cadence, 1);
        assert_eq!(config.pacing.step_delay, Duration::from_millis(0));
    }

    #[test]
    fn generate_then_solve() {
        let engine = small_engine(1);
        assert_eq!(engine.state(), ExecutionState::Idle);

        let (summary, recorder) = engine.generate(MazeMode::Standard, StepRecorder::default())
                                        .unwrap()
                                        .join()
                                        .unwrap();
        assert_eq!(summary.passages, 15);
        assert_eq!(recorder.count(StepKind::WallRemoved), 17);
        assert_eq!(recorder.generated, Some(summary));
        assert_eq!(engine.state(), ExecutionState::Idle);

        let (result, recorder) = engine.solve_unweighted(UnweightedStrategy::BreadthFirst,
                                                         StepRecorder::default())
                                       .unwrap()
                                       .join()
                                       .unwrap();
        assert!(result.found);
        assert_eq!(recorder.completed, Some(result.clone()));
        assert!(engine.with_grid(|g| pathing::is_valid_path(g, &result.path)).unwrap());
        assert_eq!(engine.state(), ExecutionState::Idle);
    }

    #[test]
    fn weighted_solvers_agree_on_cost() {
        let engine = MazeEngine::new(EngineConfigBuilder::new().rows(12).columns(15).seed(Some(9)).build())
            .unwrap();
        engine.generate(MazeMode::WeightedTerrain, NoProgress).unwrap().join().unwrap();

        let (dijkstra, _) = engine.solve_weighted(WeightedStrategy::Dijkstra, NoProgress)
                                  .unwrap()
                                  .join()
                                  .unwrap();
        let (astar, _) = engine.solve_weighted(WeightedStrategy::AStar, NoProgress)
                               .unwrap()
                               .join()
                               .unwrap();
        assert!(dijkstra.found && astar.found);
        assert_eq!(dijkstra.total_cost, astar.total_cost);
        assert!(astar.cells_visited <= dijkstra.cells_visited);
    }

    #[test]
    fn requests_are_rejected_while_generating() {
        let engine = MazeEngine::new(EngineConfigBuilder::new()
                                         .rows(4)
                                         .columns(4)
                                         .seed(Some(3))
                                         .channel_bound(0)
                                         .build())
            .unwrap();
        let (release, gate) = channel();
        let sink = GateSink { release: gate, opened: false, steps: 0 };

        let job = engine.generate(MazeMode::Standard, sink).unwrap();
        assert_eq!(engine.state(), ExecutionState::Generating);

        let rejected = engine.solve_unweighted(UnweightedStrategy::BreadthFirst, NoProgress);
        assert!(is_busy(&rejected.err().unwrap(), ExecutionState::Generating));
        let rejected = engine.generate(MazeMode::WeightedTerrain, NoProgress);
        assert!(is_busy(&rejected.err().unwrap(), ExecutionState::Generating));
        assert!(is_busy(&engine.reset_search().unwrap_err(), ExecutionState::Generating));
        assert_eq!(engine.state(), ExecutionState::Generating);

        release.send(()).unwrap();
        let (summary, sink) = job.join().unwrap();
        assert_eq!(summary.passages, 15);
        assert_eq!(sink.steps, 17);
        assert_eq!(engine.state(), ExecutionState::Idle);

        // the rejected solve never touched the grid
        let searched = engine.with_grid(|g| g.search_visited_count()).unwrap();
        assert_eq!(searched, 0);
        let terrain = engine.with_grid(|g| g.iter().all(|c| g.terrain_cost(c) == 1)).unwrap();
        assert!(terrain);
    }

    #[test]
    fn seeded_engines_replay_the_same_mazes() {
        let walls = |engine: &MazeEngine| {
            engine.generate(MazeMode::WeightedTerrain, NoProgress).unwrap().join().unwrap();
            engine.with_grid(|g| g.iter().map(|c| (g.walls(c), g.terrain_cost(c))).collect::<Vec<_>>())
                  .unwrap()
        };
        let (a, b) = (small_engine(17), small_engine(17));
        assert_eq!(walls(&a), walls(&b));
        assert_eq!(walls(&a), walls(&b));
    }

    #[test]
    fn reset_search_clears_the_last_solve() {
        let engine = small_engine(5);
        engine.generate(MazeMode::Standard, NoProgress).unwrap().join().unwrap();
        engine.solve_weighted(WeightedStrategy::AStar, NoProgress).unwrap().join().unwrap();
        assert!(engine.with_grid(|g| g.search_visited_count()).unwrap() > 0);

        engine.reset_search().unwrap();
        assert_eq!(engine.with_grid(|g| g.search_visited_count()).unwrap(), 0);
        assert!(engine.try_grid().is_some());
    }

    #[test]
    fn manual_edits_feed_the_next_solve() {
        let engine = small_engine(6);
        engine.generate(MazeMode::Standard, NoProgress).unwrap().join().unwrap();
        let end = engine.with_grid_mut(|g| {
            let end = g.end();
            for n in g.open_neighbours(end).iter() {
                g.restore_wall(end, *n);
            }
            end
        }).unwrap();

        let (result, _) = engine.solve_unweighted(UnweightedStrategy::DepthFirst, NoProgress)
                                .unwrap()
                                .join()
                                .unwrap();
        assert!(!result.found);
        assert!(!result.path.contains(&end));
        assert_eq!(engine.state(), ExecutionState::Idle);
    }

    #[test]
    fn unusable_dimensions_are_rejected() {
        let dimensions_error = |rows, columns| {
            let config = EngineConfigBuilder::new().rows(rows).columns(columns).build();
            match MazeEngine::new(config) {
                Err(err) => match *err.kind() {
                    ErrorKind::InvalidDimensions(r, c) => r == rows && c == columns,
                    _ => false,
                },
                Ok(_) => false,
            }
        };
        assert!(dimensions_error(0, 10));
        assert!(dimensions_error(10, 0));
        assert!(dimensions_error(70_000, 70_000));
        assert!(MazeEngine::new(EngineConfig::default()).is_ok());
    }

    #[test]
    fn jobs_are_rejected_while_a_grid_closure_runs() {
        let engine = small_engine(8);
        let (state, rejected_generate, rejected_reset) = engine.with_grid_mut(|g| {
            let inside = engine.state();
            let generate = engine.generate(MazeMode::Standard, NoProgress).err();
            let reset = engine.reset_search().err();
            g.set_terrain_cost(g.end(), 5).unwrap();
            (inside, generate, reset)
        }).unwrap();

        assert_eq!(state, ExecutionState::Editing);
        assert!(is_busy(&rejected_generate.unwrap(), ExecutionState::Editing));
        assert!(is_busy(&rejected_reset.unwrap(), ExecutionState::Editing));
        assert_eq!(engine.state(), ExecutionState::Idle);

        // nothing was generated over the edit
        assert_eq!(engine.with_grid(|g| g.terrain_cost(g.end())).unwrap(), 5);
        assert_eq!(engine.with_grid(|g| g.passages_count()).unwrap(), 0);
    }

    #[test]
    fn engine_stays_busy_until_the_animation_is_delivered() {
        let engine = MazeEngine::new(EngineConfigBuilder::new()
                                         .rows(3)
                                         .columns(3)
                                         .seed(Some(4))
                                         .step_delay(Duration::from_millis(5))
                                         .build())
            .unwrap();
        let watcher = StateWatcher { state: Arc::clone(&engine.state), seen: Vec::new() };

        let (_, watcher) = engine.generate(MazeMode::Standard, watcher).unwrap().join().unwrap();
        // 8 passages, entrance, exit and the summary
        assert_eq!(watcher.seen.len(), 11);
        assert!(watcher.seen.iter().all(|state| *state == ExecutionState::Generating));
        assert_eq!(engine.state(), ExecutionState::Idle);
    }
}
