//! Test-only helpers: scripted views, fast configs and scratch projects.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::pipeline::PipelineSnapshot;
use crate::core::wizard::WizardStep;
use crate::core::wizard_data::WizardData;
use crate::io::config::{CheckConfig, write_config};
use crate::io::init::{InitOptions, PaycheckPaths, init_paycheck};
use crate::session::{CheckControl, StepAction, StepView};

type ControlFn = Box<dyn FnMut(&PipelineSnapshot) -> CheckControl>;

/// View that replays a fixed list of actions and records what it was shown.
pub struct ScriptedView {
    actions: VecDeque<StepAction>,
    control: Option<ControlFn>,
    /// Steps rendered, in order.
    pub rendered: Vec<WizardStep>,
    /// Every progress snapshot observed during the check.
    pub snapshots: Vec<PipelineSnapshot>,
}

impl ScriptedView {
    pub fn new(actions: Vec<StepAction>) -> Self {
        Self {
            actions: actions.into(),
            control: None,
            rendered: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    /// Decide progress replies with `control` instead of always continuing.
    pub fn with_control(
        mut self,
        control: impl FnMut(&PipelineSnapshot) -> CheckControl + 'static,
    ) -> Self {
        self.control = Some(Box::new(control));
        self
    }
}

impl StepView for ScriptedView {
    fn render(&mut self, step: WizardStep, _data: &WizardData) -> Result<StepAction> {
        self.rendered.push(step);
        self.actions
            .pop_front()
            .ok_or_else(|| anyhow!("script exhausted at {}", step.header()))
    }

    fn on_progress(&mut self, snapshot: &PipelineSnapshot) -> CheckControl {
        self.snapshots.push(snapshot.clone());
        match self.control.as_mut() {
            Some(control) => control(snapshot),
            None => CheckControl::Continue,
        }
    }
}

/// Default pipeline with millisecond timers, for tests on the real clock.
pub fn fast_config() -> CheckConfig {
    CheckConfig {
        tick_interval_ms: 2,
        poll_interval_ms: 1,
        settle_delay_ms: 20,
        ..CheckConfig::default()
    }
}

/// Scratch project with initialized `.paycheck/` scaffolding.
pub struct TestProject {
    pub dir: TempDir,
    pub paths: PaycheckPaths,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let paths = init_paycheck(dir.path(), &InitOptions { force: false })?;
        Ok(Self { dir, paths })
    }

    /// Initialized project whose config uses [`fast_config`].
    pub fn fast() -> Result<Self> {
        let project = Self::new()?;
        write_config(&project.paths.config_path, &fast_config())?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
