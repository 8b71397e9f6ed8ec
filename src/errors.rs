// Create the Error, ErrorKind, ResultExt, and Result types
// Result is a typedef of std `Result` with the error type our own `Error`
// ResultExt adds the `chain_err` trait method.
use error_chain::*;

use crate::engine::ExecutionState;

error_chain! {

    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        Busy(state: ExecutionState) {
            description("the maze engine is already running a job")
            display("request rejected, the maze engine is currently {:?}", state)
        }

        WorkerPanicked(job: &'static str) {
            description("a background maze job panicked")
            display("the background {} job panicked before completing", job)
        }

        InvalidDimensions(rows: usize, columns: usize) {
            description("the grid dimensions cannot be used")
            display("cannot build a {} x {} grid, it needs at least one cell and at most u32::MAX cells and passages", rows, columns)
        }

        InvalidTerrainCost(cost: u32) {
            description("terrain costs must be positive")
            display("invalid terrain cost {}, costs must be at least 1", cost)
        }
    }
}
