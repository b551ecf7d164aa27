//! Non-interactive CLI front end for `paycheck run`.
//!
//! Steps are answered from command-line flags; the check step prints one
//! progress line per pipeline change to stderr.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use crate::core::pipeline::PipelineSnapshot;
use crate::core::wizard::WizardStep;
use crate::core::wizard_data::{WizardData, WizardPatch};
use crate::session::{CheckControl, StepAction, StepView};

/// Answers supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliAnswers {
    pub role_title: Option<String>,
    pub contract: Option<PathBuf>,
    pub worksheet: Option<PathBuf>,
    pub payslip: Option<PathBuf>,
    /// Fail the check when this stage starts running.
    pub fail_at: Option<String>,
}

pub struct CliView {
    answers: CliAnswers,
    quiet: bool,
    last_line: Option<String>,
}

impl CliView {
    pub fn new(answers: CliAnswers, quiet: bool) -> Self {
        Self {
            answers,
            quiet,
            last_line: None,
        }
    }

    fn say(&self, line: &str) {
        if !self.quiet {
            eprintln!("{}", line);
        }
    }

    fn meta_patch(&self) -> Option<WizardPatch> {
        self.answers.role_title.as_ref().map(|title| WizardPatch {
            role_title: Some(title.clone()),
            ..WizardPatch::default()
        })
    }

    fn documents_patch(&self) -> Option<WizardPatch> {
        let patch = WizardPatch {
            contract_file: self.answers.contract.clone(),
            worksheet_file: self.answers.worksheet.clone(),
            payslip_file: self.answers.payslip.clone(),
            ..WizardPatch::default()
        };
        (!patch.is_empty()).then_some(patch)
    }
}

/// Confirmed summary of the uploaded documents.
fn review_patch(data: &WizardData) -> WizardPatch {
    let documents: Vec<String> = [&data.contract_file, &data.worksheet_file, &data.payslip_file]
        .into_iter()
        .flatten()
        .map(|path| path.display().to_string())
        .collect();
    WizardPatch {
        extracted_data: Some(json!({
            "documents": documents,
            "confirmed": true,
        })),
        ..WizardPatch::default()
    }
}

/// One progress line, e.g. `[ 47%] Calculator Agent: Computing entitlements (60%)`.
pub fn progress_line(snapshot: &PipelineSnapshot) -> String {
    let detail = match (snapshot.running, &snapshot.failure) {
        (_, Some(failure)) => format!("{} failed: {}", failure.stage, failure.reason),
        (Some(index), None) => {
            let stage = &snapshot.stages[index];
            format!(
                "{}: {} ({}%)",
                stage.name(),
                stage.description(),
                stage.progress()
            )
        }
        (None, None) if snapshot.complete => "all agents done".to_string(),
        (None, None) => "idle".to_string(),
    };
    format!("[{:>3}%] {}", snapshot.overall_progress, detail)
}

impl StepView for CliView {
    fn render(&mut self, step: WizardStep, data: &WizardData) -> Result<StepAction> {
        self.say(&step.header());
        let action = match step {
            WizardStep::MetaDetails => StepAction::Next(self.meta_patch()),
            WizardStep::UploadDocuments => StepAction::Next(self.documents_patch()),
            WizardStep::ReviewExtracted => StepAction::Next(Some(review_patch(data))),
            WizardStep::RunCheck => StepAction::Next(None),
            WizardStep::Results => StepAction::Close,
        };
        Ok(action)
    }

    fn on_progress(&mut self, snapshot: &PipelineSnapshot) -> CheckControl {
        let line = progress_line(snapshot);
        if self.last_line.as_deref() != Some(line.as_str()) {
            self.say(&line);
            self.last_line = Some(line);
        }

        let running = snapshot
            .running
            .and_then(|index| snapshot.stages.get(index));
        match (&self.answers.fail_at, running) {
            (Some(target), Some(stage)) if stage.name() == target => {
                CheckControl::FailStage(format!("failure injected at {}", target))
            }
            _ => CheckControl::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{Pipeline, PipelineSettings};
    use crate::core::types::default_stage_definitions;

    fn view(answers: CliAnswers) -> CliView {
        CliView::new(answers, true)
    }

    #[test]
    fn meta_step_applies_role_override_only_when_given() {
        let data = WizardData::demo_seed();
        let mut plain = view(CliAnswers::default());
        assert_eq!(
            plain.render(WizardStep::MetaDetails, &data).expect("render"),
            StepAction::Next(None)
        );

        let mut overridden = view(CliAnswers {
            role_title: Some("Cook".to_string()),
            ..CliAnswers::default()
        });
        match overridden
            .render(WizardStep::MetaDetails, &data)
            .expect("render")
        {
            StepAction::Next(Some(patch)) => {
                assert_eq!(patch.role_title.as_deref(), Some("Cook"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn review_step_lists_uploaded_documents() {
        let data = WizardData {
            payslip_file: Some(PathBuf::from("payslip.pdf")),
            ..WizardData::demo_seed()
        };
        let mut cli = view(CliAnswers::default());
        match cli
            .render(WizardStep::ReviewExtracted, &data)
            .expect("render")
        {
            StepAction::Next(Some(patch)) => {
                assert_eq!(
                    patch.extracted_data,
                    Some(json!({ "documents": ["payslip.pdf"], "confirmed": true }))
                );
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn results_step_closes() {
        let mut cli = view(CliAnswers::default());
        assert_eq!(
            cli.render(WizardStep::Results, &WizardData::demo_seed())
                .expect("render"),
            StepAction::Close
        );
    }

    #[test]
    fn progress_line_names_running_stage() {
        let pipeline = Pipeline::resume(
            &default_stage_definitions(),
            5,
            45,
            PipelineSettings::default(),
        )
        .expect("pipeline");
        assert_eq!(
            progress_line(&pipeline.snapshot()),
            "[ 61%] Calculator Agent: Computing entitlements (45%)"
        );
    }

    #[test]
    fn fail_at_triggers_on_matching_running_stage() {
        let pipeline = Pipeline::new(&default_stage_definitions(), PipelineSettings::default())
            .expect("pipeline");
        let mut cli = view(CliAnswers {
            fail_at: Some("Award Agent".to_string()),
            ..CliAnswers::default()
        });
        assert_eq!(
            cli.on_progress(&pipeline.snapshot()),
            CheckControl::FailStage("failure injected at Award Agent".to_string())
        );

        let mut other = view(CliAnswers {
            fail_at: Some("Guardrail Agent".to_string()),
            ..CliAnswers::default()
        });
        assert_eq!(
            other.on_progress(&pipeline.snapshot()),
            CheckControl::Continue
        );
    }
}
