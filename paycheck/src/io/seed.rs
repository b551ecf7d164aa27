//! Wizard seed loading with schema + semantic validation.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::wizard_data::WizardData;

const STATES: [&str; 8] = ["ACT", "NSW", "NT", "QLD", "SA", "TAS", "VIC", "WA"];

static ISO_DATE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(\d{4})-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap());

/// Load and validate the seed from disk (schema + semantic checks).
pub fn load_seed(schema_path: &Path, seed_path: &Path) -> Result<WizardData> {
    debug!(path = %seed_path.display(), "loading seed");
    let contents = fs::read_to_string(seed_path)
        .with_context(|| format!("read seed {}", seed_path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse seed {}", seed_path.display()))?;
    validate_schema(schema_path, &value)?;
    let seed: WizardData = serde_json::from_value(value)
        .with_context(|| format!("deserialize seed {}", seed_path.display()))?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        return Err(anyhow!("seed validation failed: {}", errors.join("; ")));
    }
    Ok(seed)
}

/// Checks the schema cannot express: date format, period order, state code.
pub fn validate_seed(seed: &WizardData) -> Vec<String> {
    let mut errors = Vec::new();
    let start_ok = check_date("periodStart", &seed.period_start, &mut errors);
    let end_ok = check_date("periodEnd", &seed.period_end, &mut errors);
    // ISO dates order lexicographically.
    if start_ok && end_ok && seed.period_start > seed.period_end {
        errors.push(format!(
            "periodStart {} is after periodEnd {}",
            seed.period_start, seed.period_end
        ));
    }
    if !STATES.contains(&seed.state.as_str()) {
        errors.push(format!(
            "state '{}' is not one of {}",
            seed.state,
            STATES.join(", ")
        ));
    }
    errors
}

fn check_date(field: &str, value: &str, errors: &mut Vec<String>) -> bool {
    if ISO_DATE_RE.is_match(value) {
        return true;
    }
    errors.push(format!("{} '{}' is not a YYYY-MM-DD date", field, value));
    false
}

fn validate_schema(schema_path: &Path, seed: &Value) -> Result<()> {
    let schema_contents = fs::read_to_string(schema_path)
        .with_context(|| format!("read schema {}", schema_path.display()))?;
    let schema_value: Value = serde_json::from_str(&schema_contents)
        .with_context(|| format!("parse schema {}", schema_path.display()))?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(seed) {
        let messages = compiled
            .iter_errors(seed)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "seed schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
