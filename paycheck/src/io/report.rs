//! Results report and final snapshot for `paycheck run`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use super::init::write_json;
use crate::core::types::CheckResult;
use crate::core::wizard_data::WizardData;

const RESULTS_TEMPLATE: &str = include_str!("templates/results.md");

#[derive(Debug, Serialize)]
struct DocumentContext {
    label: &'static str,
    path: String,
}

#[derive(Debug, Serialize)]
struct ResultContext {
    status: &'static str,
    paid: String,
    entitled: String,
    difference: String,
    anomaly_score: u8,
    confidence: u32,
}

impl ResultContext {
    fn from_result(result: &CheckResult) -> Self {
        Self {
            status: result.status.as_str(),
            paid: format_cents(result.paid_cents),
            entitled: format_cents(result.entitled_cents),
            difference: format_cents(result.difference_cents),
            anomaly_score: result.anomaly_score,
            confidence: (result.confidence * 100.0).round() as u32,
        }
    }
}

/// Render the Markdown results report for `data`.
pub fn render_report(data: &WizardData) -> Result<String> {
    let env = Environment::new();
    let template = env
        .template_from_str(RESULTS_TEMPLATE)
        .context("load results template")?;

    let documents: Vec<DocumentContext> = [
        ("Contract", &data.contract_file),
        ("Worksheet", &data.worksheet_file),
        ("Payslip", &data.payslip_file),
    ]
    .into_iter()
    .filter_map(|(label, path)| {
        path.as_ref().map(|path| DocumentContext {
            label,
            path: path.display().to_string(),
        })
    })
    .collect();

    let rendered = template
        .render(context! {
            organisation_name => data.organisation_name,
            organisation_type => data.organisation_type,
            role_title => data.role_title,
            employment_type => data.employment_type,
            classification_level => data.classification_level,
            period_start => data.period_start,
            period_end => data.period_end,
            state => data.state,
            has_public_holiday => data.has_public_holiday,
            documents => documents,
            result => data.results.as_ref().map(ResultContext::from_result),
        })
        .context("render results report")?;
    Ok(rendered)
}

/// Write the final wizard snapshot (JSON) and the rendered report.
pub fn write_outputs(result_path: &Path, report_path: &Path, data: &WizardData) -> Result<()> {
    debug!(path = %result_path.display(), "writing wizard snapshot");
    write_json(result_path, data)?;
    let mut report = render_report(data)?;
    report.push('\n');
    fs::write(report_path, report).with_context(|| format!("write {}", report_path.display()))
}

/// Format whole cents as dollars, e.g. `-7200` → `-$72.00`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}
