//! Timer-driven simulation of the check pipeline.
//!
//! One tokio task owns the tick interval, the completion poll and the settle
//! delay. Both periodic arms, failure injection and cancellation go through
//! the same mutex, so no two of them ever interleave mutations of the stage
//! list. Once [`Simulation::cancel`] returns, nothing mutates the pipeline or
//! emits an outcome again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

use crate::core::invariants::validate_pipeline_invariants;
use crate::core::pipeline::{Pipeline, PipelineSnapshot, StageFailure, TickOutcome};
use crate::core::types::CheckResult;

const EVENT_CAPACITY: usize = 256;

/// Periods of the simulation timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTiming {
    pub tick_interval: Duration,
    pub poll_interval: Duration,
    /// Wait between the last stage finishing and the completion event.
    pub settle_delay: Duration,
}

impl SimulationTiming {
    /// Both periodic timers need a non-zero period.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick interval must be non-zero".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("poll interval must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Default for SimulationTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(800),
            poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_millis(1000),
        }
    }
}

/// Progress notifications broadcast to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageProgress {
        index: usize,
        stage: String,
        progress: u8,
        overall_progress: u8,
    },
    StageDone {
        index: usize,
        stage: String,
    },
    StageStarted {
        index: usize,
        stage: String,
        progress: u8,
    },
    /// Every stage is done; the settle delay has started.
    PipelineComplete,
    /// The settle delay elapsed and the result was delivered.
    Completed { result: CheckResult },
    Failed { failure: StageFailure },
}

/// The single terminal outcome of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Completed(CheckResult),
    Failed(StageFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Settling,
    Finished,
    Cancelled,
}

struct SimulationState {
    pipeline: Pipeline,
    phase: Phase,
    completed_at: Option<Instant>,
    outcome_tx: Option<oneshot::Sender<SimulationOutcome>>,
    ticks: u32,
}

impl SimulationState {
    fn finish(&mut self, outcome: SimulationOutcome) {
        self.phase = Phase::Finished;
        if let Some(tx) = self.outcome_tx.take() {
            // The receiver may already be gone.
            let _ = tx.send(outcome);
        }
    }
}

/// Handle to a running simulation. Dropping it tears the simulation down.
pub struct Simulation {
    state: Arc<Mutex<SimulationState>>,
    events: broadcast::Sender<PipelineEvent>,
    task: JoinHandle<()>,
}

impl Simulation {
    /// Start driving `pipeline`; `result` is delivered on completion.
    ///
    /// A pipeline that is already halted reports its failure immediately.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        pipeline: Pipeline,
        timing: SimulationTiming,
        result: CheckResult,
    ) -> Result<(Self, oneshot::Receiver<SimulationOutcome>), String> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self::spawn_with_events(pipeline, timing, result, events)
    }

    /// Like [`Simulation::spawn`], publishing events on an existing channel.
    pub fn spawn_with_events(
        pipeline: Pipeline,
        timing: SimulationTiming,
        result: CheckResult,
        events: broadcast::Sender<PipelineEvent>,
    ) -> Result<(Self, oneshot::Receiver<SimulationOutcome>), String> {
        timing.validate()?;
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let start = Instant::now();
        info!(
            stages = pipeline.stages().len(),
            running = ?pipeline.running_index(),
            "starting pipeline simulation"
        );

        let halted = pipeline.failure().cloned();
        let mut initial = SimulationState {
            completed_at: pipeline.is_complete().then_some(start),
            pipeline,
            phase: Phase::Running,
            outcome_tx: Some(outcome_tx),
            ticks: 0,
        };
        if let Some(failure) = halted {
            warn!(stage = %failure.stage, "pipeline already halted");
            emit(
                &events,
                PipelineEvent::Failed {
                    failure: failure.clone(),
                },
            );
            initial.finish(SimulationOutcome::Failed(failure));
        }
        let state = Arc::new(Mutex::new(initial));
        let task = tokio::spawn(drive(
            Arc::clone(&state),
            events.clone(),
            timing,
            result,
            start,
        ));

        Ok((
            Self {
                state,
                events,
                task,
            },
            outcome_rx,
        ))
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        lock(&self.state).pipeline.snapshot()
    }

    /// Number of ticks applied so far.
    pub fn ticks(&self) -> u32 {
        lock(&self.state).ticks
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// True once an outcome was delivered or the simulation was cancelled.
    pub fn is_finished(&self) -> bool {
        matches!(
            lock(&self.state).phase,
            Phase::Finished | Phase::Cancelled
        )
    }

    /// Fail the running stage: halts the pipeline and delivers a `Failed`
    /// outcome instead of the completion event.
    pub fn fail_running(&self, reason: &str) -> Result<StageFailure, String> {
        let mut state = lock(&self.state);
        if state.phase != Phase::Running {
            return Err("simulation is not running".to_string());
        }
        let failure = state.pipeline.fail_running(reason)?;
        warn!(stage = %failure.stage, reason = %failure.reason, "pipeline stage failed");
        emit(&self.events, PipelineEvent::Failed {
            failure: failure.clone(),
        });
        state.finish(SimulationOutcome::Failed(failure.clone()));
        drop(state);
        self.task.abort();
        Ok(failure)
    }

    /// Cancel all timers. Returns false if the simulation had already ended.
    pub fn cancel(&self) -> bool {
        let mut state = lock(&self.state);
        let active = matches!(state.phase, Phase::Running | Phase::Settling);
        if active {
            state.phase = Phase::Cancelled;
            state.outcome_tx = None;
            info!(ticks = state.ticks, "pipeline simulation cancelled");
        }
        drop(state);
        self.task.abort();
        active
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.cancel();
    }
}

enum PollOutcome {
    Continue,
    Settle(Instant),
    Stop,
}

async fn drive(
    state: Arc<Mutex<SimulationState>>,
    events: broadcast::Sender<PipelineEvent>,
    timing: SimulationTiming,
    result: CheckResult,
    start: Instant,
) {
    if lock(&state).phase != Phase::Running {
        return;
    }
    let mut tick = interval_at(start + timing.tick_interval, timing.tick_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poll = interval_at(start + timing.poll_interval, timing.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = loop {
        tokio::select! {
            biased;
            at = tick.tick() => {
                if !on_tick(&state, &events, at) {
                    return;
                }
            }
            at = poll.tick() => {
                match on_poll(&state, &events, at, timing.settle_delay) {
                    PollOutcome::Continue => {}
                    PollOutcome::Settle(deadline) => break deadline,
                    PollOutcome::Stop => return,
                }
            }
        }
    };
    drop(tick);
    drop(poll);

    sleep_until(deadline).await;

    let mut guard = lock(&state);
    if guard.phase != Phase::Settling {
        return;
    }
    info!(ticks = guard.ticks, "pipeline settled, delivering result");
    emit(&events, PipelineEvent::Completed {
        result: result.clone(),
    });
    guard.finish(SimulationOutcome::Completed(result));
}

fn on_tick(
    state: &Mutex<SimulationState>,
    events: &broadcast::Sender<PipelineEvent>,
    at: Instant,
) -> bool {
    let mut guard = lock(state);
    if guard.phase != Phase::Running {
        return false;
    }
    guard.ticks += 1;
    let outcome = guard.pipeline.tick();
    debug!(tick = guard.ticks, ?outcome, "pipeline tick");
    debug_assert!(
        validate_pipeline_invariants(&guard.pipeline).is_empty(),
        "pipeline invariants violated after tick"
    );

    let pipeline = &guard.pipeline;
    let stage_name = |index: usize| pipeline.stages()[index].name().to_string();
    match outcome {
        TickOutcome::Progressed { index, progress } => {
            emit(events, PipelineEvent::StageProgress {
                index,
                stage: stage_name(index),
                progress,
                overall_progress: pipeline.overall_progress(),
            });
        }
        TickOutcome::Advanced { finished, started } => {
            info!(finished = %stage_name(finished), started = %stage_name(started), "stage done");
            emit(events, PipelineEvent::StageDone {
                index: finished,
                stage: stage_name(finished),
            });
            emit(events, PipelineEvent::StageStarted {
                index: started,
                stage: stage_name(started),
                progress: pipeline.stages()[started].progress(),
            });
        }
        TickOutcome::Completed { finished } => {
            info!(finished = %stage_name(finished), "last stage done");
            emit(events, PipelineEvent::StageDone {
                index: finished,
                stage: stage_name(finished),
            });
        }
        TickOutcome::Idle => {}
    }
    if matches!(outcome, TickOutcome::Completed { .. }) {
        guard.completed_at = Some(at);
    }
    true
}

fn on_poll(
    state: &Mutex<SimulationState>,
    events: &broadcast::Sender<PipelineEvent>,
    at: Instant,
    settle_delay: Duration,
) -> PollOutcome {
    let mut guard = lock(state);
    if guard.phase != Phase::Running {
        return PollOutcome::Stop;
    }
    if !guard.pipeline.is_complete() {
        return PollOutcome::Continue;
    }

    let done_at = guard.completed_at.unwrap_or(at);
    guard.phase = Phase::Settling;
    debug!(?settle_delay, "pipeline complete, timers stopped");
    emit(events, PipelineEvent::PipelineComplete);
    PollOutcome::Settle(done_at + settle_delay)
}

/// Publish to observers. Having no subscribers is not an error.
fn emit(events: &broadcast::Sender<PipelineEvent>, event: PipelineEvent) {
    if events.send(event).is_err() {
        debug!("no pipeline event subscribers");
    }
}

fn lock(state: &Mutex<SimulationState>) -> MutexGuard<'_, SimulationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
