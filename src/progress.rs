//! Step notifications from the maze algorithms to whatever is animating them.
//!
//! The algorithms only ever talk to a `ProgressSink`. When a job runs in the background the sink
//! it is handed is a `ChannelSink`, and `pump` on the consumer thread forwards the messages to the
//! caller's sink, pausing between batches of steps so a renderer can show them.

use std::sync::mpsc::{Receiver, SyncSender};
use std::thread;
use std::time::Duration;

use crate::cells::GridCoordinate;
use crate::generators::GenerationSummary;
use crate::pathing::SearchResult;

#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum StepKind {
    WallRemoved,
    CellVisited,
    PathCellAdded,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Step {
    pub kind: StepKind,
    pub cell: GridCoordinate,
}

pub trait ProgressSink {
    fn on_step(&mut self, kind: StepKind, cell: GridCoordinate);

    fn on_generated(&mut self, _summary: &GenerationSummary) {}

    fn on_complete(&mut self, _result: &SearchResult) {}
}

impl<'a, S: ProgressSink + ?Sized> ProgressSink for &'a mut S {
    #[inline]
    fn on_step(&mut self, kind: StepKind, cell: GridCoordinate) {
        (**self).on_step(kind, cell)
    }

    fn on_generated(&mut self, summary: &GenerationSummary) {
        (**self).on_generated(summary)
    }

    fn on_complete(&mut self, result: &SearchResult) {
        (**self).on_complete(result)
    }
}

/// Discards every notification.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    #[inline]
    fn on_step(&mut self, _: StepKind, _: GridCoordinate) {}
}

/// Keeps every notification, mostly useful for tests and replays.
#[derive(Clone, Debug, Default)]
pub struct StepRecorder {
    pub steps: Vec<Step>,
    pub generated: Option<GenerationSummary>,
    pub completed: Option<SearchResult>,
}

impl StepRecorder {
    pub fn count(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|step| step.kind == kind).count()
    }

    pub fn cells(&self, kind: StepKind) -> Vec<GridCoordinate> {
        self.steps
            .iter()
            .filter(|step| step.kind == kind)
            .map(|step| step.cell)
            .collect()
    }
}

impl ProgressSink for StepRecorder {
    fn on_step(&mut self, kind: StepKind, cell: GridCoordinate) {
        self.steps.push(Step { kind, cell });
    }

    fn on_generated(&mut self, summary: &GenerationSummary) {
        self.generated = Some(*summary);
    }

    fn on_complete(&mut self, result: &SearchResult) {
        self.completed = Some(result.clone());
    }
}

/// Messages sent from a background job to its consumer.
#[derive(Clone, Debug)]
pub enum Progress {
    Step(Step),
    Generated(GenerationSummary),
    Solved(SearchResult),
}

/// Worker side of the progress channel.
///
/// A bounded channel blocks the worker while the consumer is behind, which ties the pace of the
/// algorithm to the pace of the animation. A consumer that has gone away is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: SyncSender<Progress>,
}

impl ChannelSink {
    pub fn new(sender: SyncSender<Progress>) -> ChannelSink {
        ChannelSink { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn on_step(&mut self, kind: StepKind, cell: GridCoordinate) {
        let _ = self.sender.send(Progress::Step(Step { kind, cell }));
    }

    fn on_generated(&mut self, summary: &GenerationSummary) {
        let _ = self.sender.send(Progress::Generated(*summary));
    }

    fn on_complete(&mut self, result: &SearchResult) {
        let _ = self.sender.send(Progress::Solved(result.clone()));
    }
}

/// How the consumer spaces out step notifications.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Pacing {
    /// Pause after each batch of steps. Zero means no pausing at all.
    pub step_delay: Duration,
    /// Steps per batch.
    pub cadence: usize,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            step_delay: Duration::from_millis(0),
            cadence: 1,
        }
    }
}

/// Forward every message from a job to `sink` until the job hangs up, then hand the sink back.
pub fn pump<S: ProgressSink>(receiver: Receiver<Progress>, mut sink: S, pacing: Pacing) -> S {
    let cadence = pacing.cadence.max(1);
    let mut steps_in_batch = 0;

    for message in receiver {
        match message {
            Progress::Step(step) => {
                sink.on_step(step.kind, step.cell);
                steps_in_batch += 1;
                if steps_in_batch >= cadence {
                    steps_in_batch = 0;
                    if pacing.step_delay > Duration::from_millis(0) {
                        thread::sleep(pacing.step_delay);
                    }
                }
            }
            Progress::Generated(summary) => sink.on_generated(&summary),
            Progress::Solved(result) => sink.on_complete(&result),
        }
    }

    sink
}
