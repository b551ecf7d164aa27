//! Initialization helpers for `.paycheck/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use super::config::{CheckConfig, write_config};
use crate::core::wizard_data::WizardData;

pub const SEED_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/seed/v1.schema.json"
));

/// All canonical paths within `.paycheck/` for a project root.
#[derive(Debug, Clone)]
pub struct PaycheckPaths {
    pub paycheck_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub seed_path: PathBuf,
    pub schema_path: PathBuf,
    pub result_path: PathBuf,
    pub report_path: PathBuf,
}

impl PaycheckPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let paycheck_dir = root.into().join(".paycheck");
        Self {
            paycheck_dir: paycheck_dir.clone(),
            gitignore_path: paycheck_dir.join(".gitignore"),
            config_path: paycheck_dir.join("config.toml"),
            seed_path: paycheck_dir.join("seed.json"),
            schema_path: paycheck_dir.join("seed.schema.json"),
            result_path: paycheck_dir.join("result.json"),
            report_path: paycheck_dir.join("report.md"),
        }
    }
}

/// Options for `init_paycheck`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing files.
    pub force: bool,
}

/// Create `.paycheck/` scaffolding in `root`: default config, demo seed and
/// the seed schema.
///
/// Fails if `.paycheck/` already exists unless `options.force` is set.
pub fn init_paycheck(root: &Path, options: &InitOptions) -> Result<PaycheckPaths> {
    let paths = PaycheckPaths::new(root);
    if paths.paycheck_dir.exists() && !options.force {
        return Err(anyhow!(
            "paycheck init: .paycheck already exists (use --force to overwrite)"
        ));
    }
    if paths.paycheck_dir.exists() && !paths.paycheck_dir.is_dir() {
        return Err(anyhow!(
            "paycheck init: .paycheck exists but is not a directory"
        ));
    }

    create_dir(&paths.paycheck_dir)?;
    write_file(&paths.gitignore_path, PAYCHECK_GITIGNORE)?;
    write_config(&paths.config_path, &CheckConfig::default())?;
    write_file(&paths.schema_path, SEED_SCHEMA)?;
    write_json(&paths.seed_path, &WizardData::demo_seed())?;

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_file(path, &buf)
}

const PAYCHECK_GITIGNORE: &str = "result.json\nreport.md\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    fn read_to_string(path: &Path) -> String {
        fs::read_to_string(path).expect("read file")
    }

    /// init creates config, seed, schema and gitignore.
    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_paycheck(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.paycheck_dir.is_dir());
        assert!(paths.gitignore_path.is_file());
        assert!(paths.config_path.is_file());
        assert!(paths.seed_path.is_file());
        assert!(paths.schema_path.is_file());
        assert!(!paths.result_path.exists());

        assert_eq!(
            load_config(&paths.config_path).expect("config"),
            CheckConfig::default()
        );
        let seed: WizardData =
            serde_json::from_str(&read_to_string(&paths.seed_path)).expect("seed");
        assert_eq!(seed, WizardData::demo_seed());
        assert_eq!(read_to_string(&paths.schema_path), SEED_SCHEMA);
    }

    #[test]
    fn init_without_force_refuses_existing_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_paycheck(temp.path(), &InitOptions { force: false }).expect("init");
        let err = init_paycheck(temp.path(), &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn init_with_force_restores_seed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_paycheck(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(&paths.seed_path, "{}").expect("write custom");

        init_paycheck(temp.path(), &InitOptions { force: true }).expect("re-init");
        let seed: WizardData =
            serde_json::from_str(&read_to_string(&paths.seed_path)).expect("seed");
        assert_eq!(seed, WizardData::demo_seed());
    }
}
