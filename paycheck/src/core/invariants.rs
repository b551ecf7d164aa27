//! Pipeline invariants.
//!
//! - Stage names are non-empty and unique.
//! - Progress is within `[0, 100]`: 0 while pending, 100 once done.
//! - At most one stage is running, and never alongside a failed stage.

use std::collections::HashSet;

use crate::core::pipeline::{AgentStage, Pipeline};
use crate::core::types::{StageDefinition, StageStatus};

/// Check a stage list before it becomes a pipeline.
///
/// Returns stable error messages (empty on success).
pub fn validate_stage_definitions(definitions: &[StageDefinition]) -> Vec<String> {
    let mut errors = Vec::new();
    if definitions.is_empty() {
        errors.push("pipeline must have at least one stage".to_string());
    }
    check_names(definitions.iter().map(|d| d.name.as_str()), &mut errors);
    errors
}

/// Check per-stage status/progress consistency and the single-runner rule.
pub fn validate_stages(stages: &[AgentStage]) -> Vec<String> {
    let mut errors = Vec::new();
    if stages.is_empty() {
        errors.push("pipeline must have at least one stage".to_string());
    }
    check_names(stages.iter().map(|s| s.name.as_str()), &mut errors);

    for stage in stages {
        if stage.progress > 100 {
            errors.push(format!(
                "stage '{}': progress {} exceeds 100",
                stage.name, stage.progress
            ));
        }
        match stage.status {
            StageStatus::Pending if stage.progress != 0 => errors.push(format!(
                "stage '{}': pending stage must have progress 0 (got {})",
                stage.name, stage.progress
            )),
            StageStatus::Done if stage.progress != 100 => errors.push(format!(
                "stage '{}': done stage must have progress 100 (got {})",
                stage.name, stage.progress
            )),
            _ => {}
        }
    }

    let running = count(stages, StageStatus::Running);
    if running > 1 {
        errors.push(format!(
            "at most one stage may be running (found {})",
            running
        ));
    }
    if running > 0 && count(stages, StageStatus::Failed) > 0 {
        errors.push("no stage may run after a stage has failed".to_string());
    }
    errors
}

/// Full check of a built pipeline, including its running index.
pub fn validate_pipeline_invariants(pipeline: &Pipeline) -> Vec<String> {
    let stages = pipeline.stages();
    let mut errors = validate_stages(stages);

    let actual = stages
        .iter()
        .position(|stage| stage.status == StageStatus::Running);
    if actual != pipeline.running_index() {
        errors.push(format!(
            "running index {:?} does not match running stage {:?}",
            pipeline.running_index(),
            actual
        ));
    }
    if pipeline.is_halted() != (count(stages, StageStatus::Failed) > 0) {
        errors.push("halt state does not match failed stages".to_string());
    }
    errors
}

fn check_names<'a>(names: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for (index, name) in names.enumerate() {
        if name.trim().is_empty() {
            errors.push(format!("stage {}: name must not be empty", index));
        } else if !seen.insert(name) {
            errors.push(format!("duplicate stage name '{}'", name));
        }
    }
}

fn count(stages: &[AgentStage], status: StageStatus) -> usize {
    stages.iter().filter(|stage| stage.status == status).count()
}
