//! Ordered agent pipeline with a single running stage.
//!
//! The pipeline keeps an explicit `running` index next to the per-stage
//! statuses; every mutation goes through [`Pipeline::tick`] or
//! [`Pipeline::fail_running`], so at most one stage is ever running.

use serde::{Deserialize, Serialize};

use crate::core::invariants::{validate_stage_definitions, validate_stages};
use crate::core::types::{StageDefinition, StageStatus};

/// Progress parameters for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Percentage added to the running stage on each tick.
    pub progress_increment: u8,
    /// Progress a stage starts with when it begins running.
    pub initial_progress: u8,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            progress_increment: 15,
            initial_progress: 10,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.progress_increment) {
            return Err(format!(
                "progress_increment must be in 1..=100 (got {})",
                self.progress_increment
            ));
        }
        if !(1..=100).contains(&self.initial_progress) {
            return Err(format!(
                "initial_progress must be in 1..=100 (got {})",
                self.initial_progress
            ));
        }
        Ok(())
    }
}

/// One agent in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStage {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) status: StageStatus,
    pub(crate) progress: u8,
}

impl AgentStage {
    pub fn pending(definition: &StageDefinition) -> Self {
        Self::seeded(definition, StageStatus::Pending, 0)
    }

    /// Stage with an explicit status and progress (checked when the pipeline
    /// is built).
    pub fn seeded(definition: &StageDefinition, status: StageStatus, progress: u8) -> Self {
        Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            status,
            progress,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    fn transition(&mut self, next: StageStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "stage '{}': illegal transition {} -> {}",
            self.name,
            self.status.as_str(),
            next.as_str()
        );
        self.status = next;
    }
}

/// Why the pipeline halted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub index: usize,
    pub stage: String,
    pub reason: String,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The running stage gained progress.
    Progressed { index: usize, progress: u8 },
    /// The running stage finished and the next pending stage started.
    Advanced { finished: usize, started: usize },
    /// The running stage finished and no pending stage remains.
    Completed { finished: usize },
    /// Nothing is running (complete or halted).
    Idle,
}

/// Point-in-time copy of the pipeline for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub stages: Vec<AgentStage>,
    pub running: Option<usize>,
    pub overall_progress: u8,
    pub complete: bool,
    pub failure: Option<StageFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<AgentStage>,
    running: Option<usize>,
    settings: PipelineSettings,
    failure: Option<StageFailure>,
}

impl Pipeline {
    /// All stages pending; the first one starts running immediately.
    pub fn new(definitions: &[StageDefinition], settings: PipelineSettings) -> Result<Self, String> {
        check_definitions(definitions)?;
        let stages = definitions.iter().map(AgentStage::pending).collect();
        Self::from_stages(stages, settings)
    }

    /// First `completed` stages done, the next one running at `progress`,
    /// the rest pending.
    pub fn resume(
        definitions: &[StageDefinition],
        completed: usize,
        progress: u8,
        settings: PipelineSettings,
    ) -> Result<Self, String> {
        check_definitions(definitions)?;
        if completed > definitions.len() {
            return Err(format!(
                "cannot resume after {} completed stages: pipeline has {}",
                completed,
                definitions.len()
            ));
        }
        let stages = definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| match index {
                i if i < completed => AgentStage::seeded(definition, StageStatus::Done, 100),
                i if i == completed => {
                    AgentStage::seeded(definition, StageStatus::Running, progress)
                }
                _ => AgentStage::pending(definition),
            })
            .collect();
        Self::from_stages(stages, settings)
    }

    /// Build from an arbitrary (valid) status assignment.
    ///
    /// When nothing is running and nothing has failed, the first pending
    /// stage is started.
    pub fn from_stages(stages: Vec<AgentStage>, settings: PipelineSettings) -> Result<Self, String> {
        settings.validate()?;
        let errors = validate_stages(&stages);
        if !errors.is_empty() {
            return Err(format!("invalid pipeline: {}", errors.join("; ")));
        }

        let running = stages
            .iter()
            .position(|stage| stage.status == StageStatus::Running);
        let failure = stages
            .iter()
            .position(|stage| stage.status == StageStatus::Failed)
            .map(|index| StageFailure {
                index,
                stage: stages[index].name.clone(),
                reason: "seeded as failed".to_string(),
            });

        let mut pipeline = Self {
            stages,
            running,
            settings,
            failure,
        };
        if pipeline.running.is_none() && pipeline.failure.is_none() {
            pipeline.start_next_pending();
        }
        Ok(pipeline)
    }

    /// Advance the running stage by one increment, or finish it and start
    /// the next pending stage once it has reached 100.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(index) = self.running else {
            return TickOutcome::Idle;
        };
        let increment = self.settings.progress_increment;
        let stage = &mut self.stages[index];

        if stage.progress < 100 {
            stage.progress = stage.progress.saturating_add(increment).min(100);
            return TickOutcome::Progressed {
                index,
                progress: stage.progress,
            };
        }

        stage.transition(StageStatus::Done);
        self.running = None;
        match self.start_next_pending() {
            Some(started) => TickOutcome::Advanced {
                finished: index,
                started,
            },
            None => {
                debug_assert!(self.is_complete());
                TickOutcome::Completed { finished: index }
            }
        }
    }

    /// Mark the running stage failed and halt the pipeline.
    pub fn fail_running(&mut self, reason: &str) -> Result<StageFailure, String> {
        let index = self
            .running
            .ok_or_else(|| "no running stage to fail".to_string())?;
        let stage = &mut self.stages[index];
        stage.transition(StageStatus::Failed);
        self.running = None;

        let failure = StageFailure {
            index,
            stage: stage.name.clone(),
            reason: reason.to_string(),
        };
        self.failure = Some(failure.clone());
        Ok(failure)
    }

    fn start_next_pending(&mut self) -> Option<usize> {
        let index = self
            .stages
            .iter()
            .position(|stage| stage.status == StageStatus::Pending)?;
        let stage = &mut self.stages[index];
        stage.transition(StageStatus::Running);
        stage.progress = self.settings.initial_progress;
        self.running = Some(index);
        Some(index)
    }

    pub fn stages(&self) -> &[AgentStage] {
        &self.stages
    }

    pub fn running_index(&self) -> Option<usize> {
        self.running
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    pub fn is_halted(&self) -> bool {
        self.failure.is_some()
    }

    /// True iff every stage is done.
    pub fn is_complete(&self) -> bool {
        self.stages
            .iter()
            .all(|stage| stage.status == StageStatus::Done)
    }

    /// Rounded mean of stage progress (halves round up).
    pub fn overall_progress(&self) -> u8 {
        let count = self.stages.len() as u32;
        let sum: u32 = self
            .stages
            .iter()
            .map(|stage| u32::from(stage.progress))
            .sum();
        ((2 * sum + count) / (2 * count)) as u8
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            stages: self.stages.clone(),
            running: self.running,
            overall_progress: self.overall_progress(),
            complete: self.is_complete(),
            failure: self.failure.clone(),
        }
    }
}

fn check_definitions(definitions: &[StageDefinition]) -> Result<(), String> {
    let errors = validate_stage_definitions(definitions);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("invalid stage list: {}", errors.join("; ")))
    }
}
