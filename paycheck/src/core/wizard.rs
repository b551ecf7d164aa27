//! Five-step intake wizard controller.
//!
//! The step pointer is a closed enum, so it can never leave `[1, 5]`. All
//! displayed progress (indicators, header) is derived from the pointer alone.

use serde::{Deserialize, Serialize};

use crate::core::types::{CheckResult, StageStatus};
use crate::core::wizard_data::{WizardData, WizardPatch};

/// Steps of the intake wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    MetaDetails,
    UploadDocuments,
    ReviewExtracted,
    RunCheck,
    Results,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::MetaDetails,
        WizardStep::UploadDocuments,
        WizardStep::ReviewExtracted,
        WizardStep::RunCheck,
        WizardStep::Results,
    ];

    pub const COUNT: u8 = 5;

    /// 1-based step number.
    pub fn number(self) -> u8 {
        match self {
            WizardStep::MetaDetails => 1,
            WizardStep::UploadDocuments => 2,
            WizardStep::ReviewExtracted => 3,
            WizardStep::RunCheck => 4,
            WizardStep::Results => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::MetaDetails => "Meta details",
            WizardStep::UploadDocuments => "Upload documents",
            WizardStep::ReviewExtracted => "Review extracted info",
            WizardStep::RunCheck => "Run Agentic Check",
            WizardStep::Results => "Results",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    pub fn is_terminal(self) -> bool {
        self == WizardStep::Results
    }

    /// Header line, e.g. `Step 2 of 5: Upload documents`.
    pub fn header(self) -> String {
        format!("Step {} of {}: {}", self.number(), Self::COUNT, self.label())
    }
}

/// Progress indicator entry for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepIndicator {
    pub step: WizardStep,
    pub number: u8,
    pub label: &'static str,
    pub status: StageStatus,
}

/// Owns the step pointer and the accumulated form data.
#[derive(Debug, Clone)]
pub struct WizardController {
    current: WizardStep,
    data: WizardData,
}

impl WizardController {
    pub fn new(seed: WizardData) -> Self {
        Self {
            current: WizardStep::MetaDetails,
            data: seed,
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.current
    }

    pub fn data(&self) -> &WizardData {
        &self.data
    }

    pub fn into_data(self) -> WizardData {
        self.data
    }

    /// Merge `patch`, then move forward one step (clamped at the last step).
    pub fn advance(&mut self, patch: Option<WizardPatch>) -> WizardStep {
        if let Some(patch) = patch {
            patch.merge_into(&mut self.data);
        }
        if let Some(next) = self.current.next() {
            self.current = next;
        }
        self.current
    }

    /// Move back one step (clamped at the first step).
    pub fn retreat(&mut self) -> WizardStep {
        if let Some(prev) = self.current.prev() {
            self.current = prev;
        }
        self.current
    }

    /// Revisit a completed step. Returns false (and changes nothing) unless
    /// `step` comes strictly before the current step.
    pub fn jump_to(&mut self, step: WizardStep) -> bool {
        if step >= self.current {
            return false;
        }
        self.current = step;
        true
    }

    /// Completion subscriber for the check pipeline.
    ///
    /// Merges the result and advances only while the check step is showing;
    /// returns whether the result was applied.
    pub fn apply_check_result(&mut self, result: CheckResult) -> bool {
        if self.current != WizardStep::RunCheck {
            return false;
        }
        self.advance(Some(WizardPatch::with_results(result)));
        true
    }

    pub fn step_indicators(&self) -> Vec<StepIndicator> {
        WizardStep::ALL
            .iter()
            .map(|&step| StepIndicator {
                step,
                number: step.number(),
                label: step.label(),
                status: indicator_status(step, self.current),
            })
            .collect()
    }

    pub fn header(&self) -> String {
        self.current.header()
    }
}

fn indicator_status(step: WizardStep, current: WizardStep) -> StageStatus {
    if step < current || (step == current && step.is_terminal()) {
        StageStatus::Done
    } else if step == current {
        StageStatus::Running
    } else {
        StageStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn controller() -> WizardController {
        WizardController::new(WizardData::demo_seed())
    }

    /// Any mix of advance/retreat keeps the pointer within the five steps.
    #[test]
    fn advance_and_retreat_stay_in_range() {
        let mut wizard = controller();
        for _ in 0..10 {
            wizard.advance(None);
        }
        assert_eq!(wizard.current_step(), WizardStep::Results);
        for _ in 0..10 {
            wizard.retreat();
        }
        assert_eq!(wizard.current_step(), WizardStep::MetaDetails);

        let ops = [true, true, false, true, true, true, true, false, false, true];
        for advance in ops {
            let step = if advance {
                wizard.advance(None)
            } else {
                wizard.retreat()
            };
            assert!((1..=5).contains(&step.number()));
        }
    }

    /// Advancing at the last step still merges data.
    #[test]
    fn advance_at_results_merges_without_moving() {
        let mut wizard = controller();
        for _ in 0..4 {
            wizard.advance(None);
        }
        let step = wizard.advance(Some(WizardPatch {
            classification_level: Some("Level 3".to_string()),
            ..WizardPatch::default()
        }));
        assert_eq!(step, WizardStep::Results);
        assert_eq!(wizard.data().classification_level, "Level 3");
    }

    /// `jump_to(k)` moves iff `k` is strictly before the current step.
    #[test]
    fn jump_to_only_moves_backwards() {
        let mut wizard = controller();
        wizard.advance(None);
        wizard.advance(None);
        assert_eq!(wizard.current_step(), WizardStep::ReviewExtracted);

        assert!(!wizard.jump_to(WizardStep::Results));
        assert!(!wizard.jump_to(WizardStep::ReviewExtracted));
        assert_eq!(wizard.current_step(), WizardStep::ReviewExtracted);

        assert!(wizard.jump_to(WizardStep::MetaDetails));
        assert_eq!(wizard.current_step(), WizardStep::MetaDetails);
    }

    #[test]
    fn jump_to_exhaustive_over_all_pairs() {
        for from in WizardStep::ALL {
            for to in WizardStep::ALL {
                let mut wizard = controller();
                while wizard.current_step() != from {
                    wizard.advance(None);
                }
                let moved = wizard.jump_to(to);
                assert_eq!(moved, to < from, "from {from:?} to {to:?}");
                let expected = if to < from { to } else { from };
                assert_eq!(wizard.current_step(), expected);
            }
        }
    }

    /// Step data accumulates; revisiting a step overwrites only its keys.
    #[test]
    fn form_data_merges_across_steps() {
        let mut wizard = WizardController::new(WizardData::default());
        wizard.advance(Some(WizardPatch {
            role_title: Some("Educator".to_string()),
            ..WizardPatch::default()
        }));
        wizard.advance(Some(WizardPatch {
            contract_file: Some(PathBuf::from("contract.pdf")),
            ..WizardPatch::default()
        }));
        assert_eq!(wizard.data().role_title, "Educator");
        assert_eq!(
            wizard.data().contract_file,
            Some(PathBuf::from("contract.pdf"))
        );

        assert!(wizard.jump_to(WizardStep::MetaDetails));
        wizard.advance(Some(WizardPatch {
            role_title: Some("Cook".to_string()),
            ..WizardPatch::default()
        }));
        assert_eq!(wizard.data().role_title, "Cook");
        assert_eq!(
            wizard.data().contract_file,
            Some(PathBuf::from("contract.pdf"))
        );
    }

    #[test]
    fn indicators_derive_from_current_step() {
        let mut wizard = controller();
        wizard.advance(None);
        wizard.advance(None);
        let statuses: Vec<StageStatus> = wizard
            .step_indicators()
            .iter()
            .map(|indicator| indicator.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                StageStatus::Done,
                StageStatus::Done,
                StageStatus::Running,
                StageStatus::Pending,
                StageStatus::Pending,
            ]
        );
        assert_eq!(wizard.header(), "Step 3 of 5: Review extracted info");
    }

    #[test]
    fn results_step_shows_every_indicator_done() {
        let mut wizard = controller();
        for _ in 0..4 {
            wizard.advance(None);
        }
        assert!(
            wizard
                .step_indicators()
                .iter()
                .all(|indicator| indicator.status == StageStatus::Done)
        );
    }

    /// The completion event only lands while the check step is showing.
    #[test]
    fn check_result_applies_only_on_check_step() {
        let mut wizard = controller();
        assert!(!wizard.apply_check_result(CheckResult::simulated()));
        assert!(wizard.data().results.is_none());

        for _ in 0..3 {
            wizard.advance(None);
        }
        assert_eq!(wizard.current_step(), WizardStep::RunCheck);
        assert!(wizard.apply_check_result(CheckResult::simulated()));
        assert_eq!(wizard.current_step(), WizardStep::Results);
        assert_eq!(wizard.data().results, Some(CheckResult::simulated()));
    }

    #[test]
    fn step_numbers_round_trip() {
        assert_eq!(WizardStep::from_number(0), None);
        assert_eq!(WizardStep::from_number(6), None);
        for step in WizardStep::ALL {
            assert_eq!(WizardStep::from_number(step.number()), Some(step));
        }
    }
}
