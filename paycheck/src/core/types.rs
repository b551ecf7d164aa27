//! Shared deterministic types for the intake core.
//!
//! These types define stable contracts between the wizard, the pipeline and
//! the simulator. They must not depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a pipeline stage (also used for wizard step indicators).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Done => "done",
            StageStatus::Failed => "failed",
        }
    }

    /// Allowed single-step transitions: pending → running → done | failed.
    pub fn can_transition_to(self, next: StageStatus) -> bool {
        matches!(
            (self, next),
            (StageStatus::Pending, StageStatus::Running)
                | (StageStatus::Running, StageStatus::Done)
                | (StageStatus::Running, StageStatus::Failed)
        )
    }
}

/// Name and description of one agent in the check pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub name: String,
    pub description: String,
}

impl StageDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// The nine agents of the pay check pipeline, in execution order.
pub fn default_stage_definitions() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new("Award Agent", "Identifying applicable Modern Award"),
        StageDefinition::new("Contract Agent", "Parsing employment contract"),
        StageDefinition::new("Worksheet Agent", "Extracting shift data"),
        StageDefinition::new("Payslip Agent", "Reading payment information"),
        StageDefinition::new("Retrieval Agent", "Fetching Award facts and clauses"),
        StageDefinition::new("Calculator Agent", "Computing entitlements"),
        StageDefinition::new(
            "Underpayment Detector",
            "Comparing paid vs entitled amounts",
        ),
        StageDefinition::new("Explanation Agent", "Generating plain-English summary"),
        StageDefinition::new("Guardrail Agent", "Validating output quality"),
    ]
}

/// Outcome classification of a pay check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayClassification {
    Underpaid,
    Overpaid,
    Correct,
}

impl PayClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            PayClassification::Underpaid => "underpaid",
            PayClassification::Overpaid => "overpaid",
            PayClassification::Correct => "correct",
        }
    }
}

/// Result payload carried by the pipeline completion event.
///
/// Amounts are whole cents. `difference_cents` is `paid - entitled`, so a
/// negative value means the employee was underpaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub status: PayClassification,
    pub paid_cents: i64,
    pub entitled_cents: i64,
    pub difference_cents: i64,
    pub anomaly_score: u8,
    pub confidence: f64,
}

impl CheckResult {
    /// Build a result from amounts, deriving the difference and classification.
    pub fn from_amounts(
        paid_cents: i64,
        entitled_cents: i64,
        anomaly_score: u8,
        confidence: f64,
    ) -> Self {
        let difference_cents = paid_cents - entitled_cents;
        let status = match difference_cents {
            d if d < 0 => PayClassification::Underpaid,
            d if d > 0 => PayClassification::Overpaid,
            _ => PayClassification::Correct,
        };
        Self {
            status,
            paid_cents,
            entitled_cents,
            difference_cents,
            anomaly_score,
            confidence,
        }
    }

    /// Fixed result produced by the simulated pipeline.
    pub fn simulated() -> Self {
        Self::from_amounts(54_000, 61_200, 86, 0.86)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stages only move forward, one step at a time.
    #[test]
    fn stage_transitions_never_regress() {
        assert!(StageStatus::Pending.can_transition_to(StageStatus::Running));
        assert!(StageStatus::Running.can_transition_to(StageStatus::Done));
        assert!(StageStatus::Running.can_transition_to(StageStatus::Failed));
        assert!(!StageStatus::Pending.can_transition_to(StageStatus::Done));
        assert!(!StageStatus::Done.can_transition_to(StageStatus::Running));
        assert!(!StageStatus::Failed.can_transition_to(StageStatus::Running));
        assert!(!StageStatus::Running.can_transition_to(StageStatus::Pending));
    }

    #[test]
    fn simulated_result_is_underpaid_by_72_dollars() {
        let result = CheckResult::simulated();
        assert_eq!(result.status, PayClassification::Underpaid);
        assert_eq!(result.difference_cents, -7_200);
    }

    #[test]
    fn equal_amounts_are_correct() {
        let result = CheckResult::from_amounts(100, 100, 0, 1.0);
        assert_eq!(result.status, PayClassification::Correct);
        assert_eq!(result.difference_cents, 0);
    }

    #[test]
    fn check_result_serializes_camel_case() {
        let json = serde_json::to_value(CheckResult::simulated()).expect("serialize");
        assert_eq!(json["status"], "underpaid");
        assert_eq!(json["paidCents"], 54_000);
        assert_eq!(json["differenceCents"], -7_200);
    }
}
