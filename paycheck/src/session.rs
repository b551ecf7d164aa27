//! Orchestration for one intake session.
//!
//! The [`StepView`] trait decouples wizard navigation from presentation: the
//! session asks the view what to do on each step, and runs the check
//! simulation itself while the check step is showing. Tests use scripted
//! views that return predetermined actions.

use anyhow::{Result, anyhow};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::pipeline::{PipelineSnapshot, StageFailure};
use crate::core::types::CheckResult;
use crate::core::wizard::{WizardController, WizardStep};
use crate::core::wizard_data::{WizardData, WizardPatch};
use crate::io::config::CheckConfig;
use crate::simulator::{Simulation, SimulationOutcome};

/// What the user chose on a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Submit the step's data (if any) and move forward.
    Next(Option<WizardPatch>),
    Back,
    /// Revisit an earlier step via its indicator.
    JumpTo(WizardStep),
    /// Leave the wizard.
    Close,
}

/// Reply to a progress update while the check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckControl {
    Continue,
    /// Stop the check and leave the wizard.
    Cancel,
    /// Report the running stage as failed with the given reason.
    FailStage(String),
}

/// Abstraction over step presentation.
pub trait StepView {
    /// Show `step` with the current form data and return the user's choice.
    ///
    /// Never called for [`WizardStep::RunCheck`]; that step is driven by the
    /// simulation and reported through [`StepView::on_progress`].
    fn render(&mut self, step: WizardStep, data: &WizardData) -> Result<StepAction>;

    /// Observe the pipeline after each simulation event.
    fn on_progress(&mut self, _snapshot: &PipelineSnapshot) -> CheckControl {
        CheckControl::Continue
    }
}

/// How a session ended. Every variant carries the final form data.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// Closed from the results step.
    Finished(WizardData),
    /// Closed (or the check cancelled) before reaching the results step.
    Cancelled { step: WizardStep, data: WizardData },
    /// A pipeline stage failed; the wizard stayed on the check step.
    CheckFailed {
        failure: StageFailure,
        data: WizardData,
    },
}

impl SessionEnd {
    pub fn data(&self) -> &WizardData {
        match self {
            SessionEnd::Finished(data)
            | SessionEnd::Cancelled { data, .. }
            | SessionEnd::CheckFailed { data, .. } => data,
        }
    }

    pub fn into_data(self) -> WizardData {
        match self {
            SessionEnd::Finished(data)
            | SessionEnd::Cancelled { data, .. }
            | SessionEnd::CheckFailed { data, .. } => data,
        }
    }
}

enum CheckEnd {
    Completed(CheckResult),
    Failed(StageFailure),
    Cancelled,
}

/// One pass through the wizard, from the seed to a [`SessionEnd`].
pub struct IntakeSession {
    controller: WizardController,
    config: CheckConfig,
    result: CheckResult,
}

impl IntakeSession {
    pub fn new(seed: WizardData, config: CheckConfig) -> Self {
        Self {
            controller: WizardController::new(seed),
            config,
            result: CheckResult::simulated(),
        }
    }

    /// Replace the result delivered when the check completes.
    pub fn with_result(mut self, result: CheckResult) -> Self {
        self.result = result;
        self
    }

    /// Drive the wizard until the view closes it or the check fails.
    ///
    /// The check simulation lives only while the check step is showing; it is
    /// torn down on every exit from that step, including errors.
    pub async fn run<V: StepView>(mut self, view: &mut V) -> Result<SessionEnd> {
        loop {
            let step = self.controller.current_step();
            debug!(header = %self.controller.header(), "showing step");

            if step == WizardStep::RunCheck {
                match self.run_check(view).await? {
                    CheckEnd::Completed(result) => {
                        self.controller.apply_check_result(result);
                    }
                    CheckEnd::Failed(failure) => {
                        return Ok(SessionEnd::CheckFailed {
                            failure,
                            data: self.controller.into_data(),
                        });
                    }
                    CheckEnd::Cancelled => {
                        return Ok(SessionEnd::Cancelled {
                            step,
                            data: self.controller.into_data(),
                        });
                    }
                }
                continue;
            }

            match view.render(step, self.controller.data())? {
                StepAction::Next(patch) if step.is_terminal() => {
                    self.controller.advance(patch);
                    return Ok(SessionEnd::Finished(self.controller.into_data()));
                }
                StepAction::Next(patch) => {
                    self.controller.advance(patch);
                }
                StepAction::Back => {
                    self.controller.retreat();
                }
                StepAction::JumpTo(target) => {
                    if !self.controller.jump_to(target) {
                        debug!(from = ?step, to = ?target, "ignoring jump to a step not yet completed");
                    }
                }
                StepAction::Close if step.is_terminal() => {
                    return Ok(SessionEnd::Finished(self.controller.into_data()));
                }
                StepAction::Close => {
                    info!(step = ?step, "wizard closed early");
                    return Ok(SessionEnd::Cancelled {
                        step,
                        data: self.controller.into_data(),
                    });
                }
            }
        }
    }

    async fn run_check<V: StepView>(&self, view: &mut V) -> Result<CheckEnd> {
        self.config.validate()?;
        let pipeline = self.config.build_pipeline()?;
        let (simulation, mut outcome) =
            Simulation::spawn(pipeline, self.config.timing(), self.result.clone())
                .map_err(|err| anyhow!(err))?;
        let mut events = simulation.subscribe();

        if let Some(end) = apply_control(&simulation, view.on_progress(&simulation.snapshot())) {
            return Ok(end);
        }

        loop {
            tokio::select! {
                biased;
                delivered = &mut outcome => return check_end(delivered),
                event = events.recv() => {
                    match event {
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "progress observer lagged behind");
                        }
                        Err(RecvError::Closed) => return check_end((&mut outcome).await),
                    }
                    let control = view.on_progress(&simulation.snapshot());
                    if let Some(end) = apply_control(&simulation, control) {
                        return Ok(end);
                    }
                }
            }
        }
    }
}

fn apply_control(simulation: &Simulation, control: CheckControl) -> Option<CheckEnd> {
    match control {
        CheckControl::Continue => None,
        CheckControl::Cancel => {
            simulation.cancel();
            Some(CheckEnd::Cancelled)
        }
        CheckControl::FailStage(reason) => match simulation.fail_running(&reason) {
            Ok(failure) => Some(CheckEnd::Failed(failure)),
            Err(err) => {
                warn!(error = %err, "cannot fail stage");
                None
            }
        },
    }
}

fn check_end(delivered: Result<SimulationOutcome, oneshot::error::RecvError>) -> Result<CheckEnd> {
    match delivered {
        Ok(SimulationOutcome::Completed(result)) => Ok(CheckEnd::Completed(result)),
        Ok(SimulationOutcome::Failed(failure)) => Ok(CheckEnd::Failed(failure)),
        Err(_) => Err(anyhow!("check simulation ended without an outcome")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StageStatus;
    use crate::test_support::ScriptedView;
    use std::time::Duration;
    use tokio::time::Instant;

    fn forward() -> StepAction {
        StepAction::Next(None)
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_reaches_results_with_check_result() {
        let start = Instant::now();
        let mut view = ScriptedView::new(vec![forward(), forward(), forward(), StepAction::Close]);
        let session = IntakeSession::new(WizardData::demo_seed(), CheckConfig::default());

        let end = session.run(&mut view).await.expect("run");

        assert_eq!(
            view.rendered,
            vec![
                WizardStep::MetaDetails,
                WizardStep::UploadDocuments,
                WizardStep::ReviewExtracted,
                WizardStep::Results,
            ]
        );
        let elapsed = start.elapsed().as_millis();
        assert!((51_400..=51_402).contains(&elapsed), "elapsed {elapsed}ms");
        match end {
            SessionEnd::Finished(data) => {
                assert_eq!(data.results, Some(CheckResult::simulated()));
            }
            other => panic!("unexpected end: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn progress_observer_sees_single_running_stage() {
        let mut view = ScriptedView::new(vec![forward(), forward(), forward(), forward()]);
        let session = IntakeSession::new(WizardData::demo_seed(), CheckConfig::default());

        session.run(&mut view).await.expect("run");

        assert!(!view.snapshots.is_empty());
        for snapshot in &view.snapshots {
            let running = snapshot
                .stages
                .iter()
                .filter(|stage| stage.status() == StageStatus::Running)
                .count();
            assert!(running <= 1);
        }
        let last = view.snapshots.last().expect("snapshot");
        assert!(last.complete);
        assert_eq!(last.overall_progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_check_leaves_wizard_on_check_step() {
        let mut view = ScriptedView::new(vec![forward(), forward(), forward()])
            .with_control(|snapshot| {
                if snapshot.overall_progress >= 20 {
                    CheckControl::Cancel
                } else {
                    CheckControl::Continue
                }
            });
        let session = IntakeSession::new(WizardData::demo_seed(), CheckConfig::default());

        let end = session.run(&mut view).await.expect("run");

        match end {
            SessionEnd::Cancelled { step, data } => {
                assert_eq!(step, WizardStep::RunCheck);
                assert!(data.results.is_none());
            }
            other => panic!("unexpected end: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stage_failure_ends_session_without_results() {
        let mut view = ScriptedView::new(vec![forward(), forward(), forward()])
            .with_control(|snapshot| match snapshot.running {
                Some(3) => CheckControl::FailStage("payslip unreadable".to_string()),
                _ => CheckControl::Continue,
            });
        let session = IntakeSession::new(WizardData::demo_seed(), CheckConfig::default());

        let end = session.run(&mut view).await.expect("run");

        match end {
            SessionEnd::CheckFailed { failure, data } => {
                assert_eq!(failure.index, 3);
                assert_eq!(failure.stage, "Payslip Agent");
                assert_eq!(failure.reason, "payslip unreadable");
                assert!(data.results.is_none());
            }
            other => panic!("unexpected end: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn back_and_jump_navigation_before_check() {
        let mut view = ScriptedView::new(vec![
            StepAction::Next(Some(WizardPatch {
                role_title: Some("Cook".to_string()),
                ..WizardPatch::default()
            })),
            forward(),
            StepAction::JumpTo(WizardStep::Results),
            StepAction::Back,
            forward(),
            StepAction::JumpTo(WizardStep::MetaDetails),
            StepAction::Close,
        ]);
        let session = IntakeSession::new(WizardData::demo_seed(), CheckConfig::default());

        let end = session.run(&mut view).await.expect("run");

        assert_eq!(
            view.rendered,
            vec![
                WizardStep::MetaDetails,
                WizardStep::UploadDocuments,
                WizardStep::ReviewExtracted,
                WizardStep::ReviewExtracted,
                WizardStep::UploadDocuments,
                WizardStep::ReviewExtracted,
                WizardStep::MetaDetails,
            ]
        );
        match end {
            SessionEnd::Cancelled { step, data } => {
                assert_eq!(step, WizardStep::MetaDetails);
                assert_eq!(data.role_title, "Cook");
            }
            other => panic!("unexpected end: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_is_an_error() {
        let mut view = ScriptedView::new(vec![forward(), forward(), forward()]);
        let config = CheckConfig {
            stages: Vec::new(),
            ..CheckConfig::default()
        };
        let session = IntakeSession::new(WizardData::demo_seed(), config);

        let err = session.run(&mut view).await.unwrap_err();
        assert!(err.to_string().contains("at least one stage"));
    }

    /// Zero timer periods fail the session instead of stalling it.
    #[tokio::test(start_paused = true)]
    async fn zero_tick_interval_is_an_error() {
        let mut view = ScriptedView::new(vec![forward(), forward(), forward()]);
        let config = CheckConfig {
            tick_interval_ms: 0,
            ..CheckConfig::default()
        };
        let session = IntakeSession::new(WizardData::demo_seed(), config);

        let err = tokio::time::timeout(Duration::from_secs(3_600), session.run(&mut view))
            .await
            .expect("session returns")
            .unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));
        assert!(view.snapshots.is_empty());
    }
}
