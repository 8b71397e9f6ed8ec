use docopt::Docopt;
use fnv::FnvHashMap;
use log::{info, LevelFilter, Log, Metadata, Record};
use maze_engine::{
    cells::GridCoordinate,
    engine::{EngineConfigBuilder, MazeEngine},
    generators::{self, GenerationSummary, MazeMode},
    grid_displays::MazeDisplay,
    pathing::{SearchResult, UnweightedStrategy, WeightedStrategy},
    progress::{ProgressSink, StepKind},
};
use rand::{rngs::StdRng, SeedableRng};
use serde_derive::Deserialize;
use std::{
    fs::File,
    io,
    io::prelude::*,
    time::Duration,
};

const USAGE: &str = "Maze engine

Usage:
    maze_driver -h | --help
    maze_driver [--rows=<n>] [--columns=<n>] [--weighted] [--solver=<name>] [--seed=<n>] [--delay-ms=<n>] [--cadence=<n>] [--block-passages=<n>] [--text-out=<path>] [--verbose]

Options:
    -h --help               Show this screen.
    --rows=<n>              Number of grid rows [default: 35].
    --columns=<n>           Number of grid columns [default: 50].
    --weighted              Scatter mud and water over the maze. Solving then uses terrain costs.
    --solver=<name>         Route finder: bfs, dfs, dijkstra or astar [default: bfs].
    --seed=<n>              Seed the random source for a repeatable maze.
    --delay-ms=<n>          Pause this many milliseconds between batches of animation steps [default: 0].
    --cadence=<n>           Animation steps per batch [default: 1].
    --block-passages=<n>    Wall up n random passages after generating, which can leave the end unreachable.
    --text-out=<path>       Write the text rendering to a file instead of standard output.
    --verbose               Debug level logging.
";
#[derive(Debug, Deserialize)]
struct MazeArgs {
    flag_rows: usize,
    flag_columns: usize,
    flag_weighted: bool,
    flag_solver: String,
    flag_seed: Option<u64>,
    flag_delay_ms: u64,
    flag_cadence: usize,
    flag_block_passages: Option<usize>,
    flag_text_out: String,
    flag_verbose: bool,
}

mod errors {
    // Create the Error, ErrorKind, ResultExt, and Result types
    // The engine's own errors are linked so `?` works on engine requests.
    use error_chain::*;
    error_chain! {

        links {
            Engine(::maze_engine::errors::Error, ::maze_engine::errors::ErrorKind);
        }

        foreign_links {
            DocOptFailure(::docopt::Error);
            Io(::std::io::Error);
        }
    }
}
use crate::errors::*;

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
enum Solver {
    Unweighted(UnweightedStrategy),
    Weighted(WeightedStrategy),
}

impl Solver {
    fn from_arg(name: &str) -> Result<Solver> {
        match name.to_lowercase().as_str() {
            "bfs" => Ok(Solver::Unweighted(UnweightedStrategy::BreadthFirst)),
            "dfs" => Ok(Solver::Unweighted(UnweightedStrategy::DepthFirst)),
            "dijkstra" => Ok(Solver::Weighted(WeightedStrategy::Dijkstra)),
            "astar" => Ok(Solver::Weighted(WeightedStrategy::AStar)),
            _ => Err(format!("unknown solver '{}', expected bfs, dfs, dijkstra or astar", name).into()),
        }
    }
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|_| "a logger is already installed")?;
    log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    Ok(())
}

/// Tallies the animation steps of a job as they arrive.
#[derive(Debug, Default)]
struct StepCounter {
    counts: FnvHashMap<StepKind, usize>,
    last_cell: Option<GridCoordinate>,
}

impl StepCounter {
    fn count(&self, kind: StepKind) -> usize {
        self.counts.get(&kind).cloned().unwrap_or(0)
    }
}

impl ProgressSink for StepCounter {
    fn on_step(&mut self, kind: StepKind, cell: GridCoordinate) {
        *self.counts.entry(kind).or_insert(0) += 1;
        self.last_cell = Some(cell);
    }

    fn on_generated(&mut self, summary: &GenerationSummary) {
        info!("maze ready: {} passages ({:?})", summary.passages, summary.mode);
    }

    fn on_complete(&mut self, result: &SearchResult) {
        info!("search finished after visiting {} cells", result.cells_visited);
    }
}

fn main() -> Result<()> {

    let args: MazeArgs = Docopt::new(USAGE).and_then(|d| d.deserialize())?;
    init_logging(args.flag_verbose)?;

    let solver = Solver::from_arg(&args.flag_solver)?;

    let config = EngineConfigBuilder::new()
        .rows(args.flag_rows)
        .columns(args.flag_columns)
        .seed(args.flag_seed)
        .step_delay(Duration::from_millis(args.flag_delay_ms))
        .cadence(args.flag_cadence)
        .build();
    let engine = MazeEngine::new(config)?;

    let mode = if args.flag_weighted {
        MazeMode::WeightedTerrain
    } else {
        MazeMode::Standard
    };
    let (summary, generation_steps) = engine.generate(mode, StepCounter::default())?.join()?;
    println!("Generated a {} x {} maze with {} passages ({} walls removed)",
             args.flag_rows,
             args.flag_columns,
             summary.passages,
             generation_steps.count(StepKind::WallRemoved));

    if let Some(wall_count) = args.flag_block_passages {
        let mut rng = match args.flag_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let blocked = engine.with_grid_mut(|grid| generators::block_passages(grid, wall_count, &mut rng))?;
        println!("Blocked {} passages", blocked);
    }

    let (result, search_steps) = match solver {
        Solver::Unweighted(strategy) => engine.solve_unweighted(strategy, StepCounter::default())?.join()?,
        Solver::Weighted(strategy) => engine.solve_weighted(strategy, StepCounter::default())?.join()?,
    };
    if result.found {
        println!("{:?}: path of {} cells costing {}, {} cells visited",
                 solver,
                 result.path.len(),
                 result.total_cost,
                 result.cells_visited);
    } else {
        println!("{:?}: no path from start to end, {} cells visited (last at {:?})",
                 solver,
                 result.cells_visited,
                 search_steps.last_cell);
    }

    let text = engine.with_grid(|grid| MazeDisplay::with_path(grid, &result.path).to_string())?;
    if args.flag_text_out.is_empty() {
        println!("{}", text);
    } else {
        write_text_to_file(&text, &args.flag_text_out)
            .chain_err(|| format!("Failed to write maze to text file {}", args.flag_text_out))?;
    }

    Ok(())
}

fn write_text_to_file(data: &str, file_name: &str) -> io::Result<()> {
    let mut f = File::create(file_name)?;
    f.write_all(data.as_bytes())?;
    Ok(())
}
