//! Check configuration stored under `.paycheck/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::invariants::validate_stage_definitions;
use crate::core::pipeline::{Pipeline, PipelineSettings};
use crate::core::types::{StageDefinition, default_stage_definitions};
use crate::simulator::SimulationTiming;

/// Pipeline configuration (TOML).
///
/// Edited by humans; missing fields default to the standard nine-agent
/// pipeline with 800 ms ticks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckConfig {
    /// Period of the progress tick in milliseconds.
    pub tick_interval_ms: u64,

    /// Period of the completion poll in milliseconds.
    pub poll_interval_ms: u64,

    /// Wait between the last stage finishing and the result being delivered.
    pub settle_delay_ms: u64,

    /// Percentage added to the running stage per tick.
    pub progress_increment: u8,

    /// Progress a stage starts with when it begins running.
    pub initial_progress: u8,

    pub seeding: Seeding,

    pub stages: Vec<StageDefinition>,
}

/// Initial status assignment for the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Seeding {
    /// Every stage pending; the first starts running.
    #[default]
    Fresh,
    /// First `completed` stages done, the next running at `progress`.
    Resume { completed: usize, progress: u8 },
}

impl Default for CheckConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        let timing = SimulationTiming::default();
        Self {
            tick_interval_ms: timing.tick_interval.as_millis() as u64,
            poll_interval_ms: timing.poll_interval.as_millis() as u64,
            settle_delay_ms: timing.settle_delay.as_millis() as u64,
            progress_increment: settings.progress_increment,
            initial_progress: settings.initial_progress,
            seeding: Seeding::Fresh,
            stages: default_stage_definitions(),
        }
    }
}

impl CheckConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(anyhow!("tick_interval_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        self.pipeline_settings().validate().map_err(|err| anyhow!(err))?;

        let errors = validate_stage_definitions(&self.stages);
        if !errors.is_empty() {
            return Err(anyhow!("stages: {}", errors.join("; ")));
        }

        if let Seeding::Resume {
            completed,
            progress,
        } = self.seeding
        {
            if completed > self.stages.len() {
                return Err(anyhow!(
                    "seeding.completed {} exceeds stage count {}",
                    completed,
                    self.stages.len()
                ));
            }
            if progress > 100 {
                return Err(anyhow!("seeding.progress must be <= 100"));
            }
        }
        Ok(())
    }

    pub fn timing(&self) -> SimulationTiming {
        SimulationTiming {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            progress_increment: self.progress_increment,
            initial_progress: self.initial_progress,
        }
    }

    /// Build the initial pipeline according to `seeding`.
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        let settings = self.pipeline_settings();
        let pipeline = match self.seeding {
            Seeding::Fresh => Pipeline::new(&self.stages, settings),
            Seeding::Resume {
                completed,
                progress,
            } => Pipeline::resume(&self.stages, completed, progress, settings),
        };
        pipeline.map_err(|err| anyhow!(err))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CheckConfig::default()`.
pub fn load_config(path: &Path) -> Result<CheckConfig> {
    if !path.exists() {
        let cfg = CheckConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CheckConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CheckConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
