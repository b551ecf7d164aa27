//! Accumulated wizard form data and partial updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::CheckResult;

/// Everything the wizard has collected so far.
///
/// Metadata fields come from the seed. Documents, extracted data and results
/// stay `None` until the step that produces them completes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardData {
    pub organisation_type: String,
    pub organisation_name: String,
    pub employment_type: String,
    pub role_title: String,
    pub classification_level: String,
    pub period_start: String,
    pub period_end: String,
    pub state: String,
    pub has_public_holiday: bool,

    pub contract_file: Option<PathBuf>,
    pub worksheet_file: Option<PathBuf>,
    pub payslip_file: Option<PathBuf>,

    pub extracted_data: Option<Value>,

    pub results: Option<CheckResult>,
}

impl WizardData {
    /// Seed used by `paycheck init`.
    pub fn demo_seed() -> Self {
        Self {
            organisation_type: "Childcare".to_string(),
            organisation_name: "BrightSteps Early Learning".to_string(),
            employment_type: "Casual".to_string(),
            role_title: "Educator".to_string(),
            classification_level: String::new(),
            period_start: "2025-08-01".to_string(),
            period_end: "2025-08-14".to_string(),
            state: "VIC".to_string(),
            has_public_holiday: false,
            ..Self::default()
        }
    }
}

/// Partial data returned by a step view; `Some` fields overwrite, `None` keep.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WizardPatch {
    pub organisation_type: Option<String>,
    pub organisation_name: Option<String>,
    pub employment_type: Option<String>,
    pub role_title: Option<String>,
    pub classification_level: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub state: Option<String>,
    pub has_public_holiday: Option<bool>,
    pub contract_file: Option<PathBuf>,
    pub worksheet_file: Option<PathBuf>,
    pub payslip_file: Option<PathBuf>,
    pub extracted_data: Option<Value>,
    pub results: Option<CheckResult>,
}

impl WizardPatch {
    pub fn with_results(result: CheckResult) -> Self {
        Self {
            results: Some(result),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge set fields into `data`, leaving every other key untouched.
    pub fn merge_into(self, data: &mut WizardData) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut data.organisation_type, self.organisation_type);
        set(&mut data.organisation_name, self.organisation_name);
        set(&mut data.employment_type, self.employment_type);
        set(&mut data.role_title, self.role_title);
        set(&mut data.classification_level, self.classification_level);
        set(&mut data.period_start, self.period_start);
        set(&mut data.period_end, self.period_end);
        set(&mut data.state, self.state);
        set(&mut data.has_public_holiday, self.has_public_holiday);
        set_opt(&mut data.contract_file, self.contract_file);
        set_opt(&mut data.worksheet_file, self.worksheet_file);
        set_opt(&mut data.payslip_file, self.payslip_file);
        set_opt(&mut data.extracted_data, self.extracted_data);
        set_opt(&mut data.results, self.results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_only_set_fields() {
        let mut data = WizardData::demo_seed();
        WizardPatch {
            role_title: Some("Room Leader".to_string()),
            payslip_file: Some(PathBuf::from("payslip.pdf")),
            ..WizardPatch::default()
        }
        .merge_into(&mut data);

        assert_eq!(data.role_title, "Room Leader");
        assert_eq!(data.payslip_file, Some(PathBuf::from("payslip.pdf")));
        assert_eq!(data.organisation_name, "BrightSteps Early Learning");
        assert_eq!(data.contract_file, None);
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let mut data = WizardData::demo_seed();
        let patch = WizardPatch::default();
        assert!(patch.is_empty());
        patch.merge_into(&mut data);
        assert_eq!(data, WizardData::demo_seed());
    }

    #[test]
    fn seed_uses_camel_case_keys() {
        let data: WizardData = serde_json::from_str(
            r#"{"organisationName":"Acme","roleTitle":"Educator","hasPublicHoliday":true}"#,
        )
        .expect("parse seed");
        assert_eq!(data.organisation_name, "Acme");
        assert_eq!(data.role_title, "Educator");
        assert!(data.has_public_holiday);
        assert!(data.results.is_none());
    }
}
