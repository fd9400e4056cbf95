//! Build, deploy and test pipeline.
//!
//! Structure:
//! - `descriptor` - temporary `build.xml` synthesis
//! - `manifest` - test runner patching in `AndroidManifest.xml`
//! - `compile` - build step (descriptor + manifest + build tool)
//! - `device` - install, instrument, report fetch and uninstall via the bridge
//! - `clean` - removal of compiled output
//! - `summary` - per-run record written with `--summary`

mod clean;
mod compile;
pub mod descriptor;
mod device;
pub mod manifest;
pub mod summary;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::exec::{self, CommandExecutor, CommandLine};
use crate::target::Target;
use std::fs;
use summary::{RunSummary, Step};
use tracing::{debug, error, info, warn};

/// One orchestrator run over a fixed configuration.
pub struct Pipeline<'a> {
    config: &'a Config,
    exec: &'a dyn CommandExecutor,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, exec: &'a dyn CommandExecutor) -> Self {
        Self { config, exec }
    }

    fn execute(&self, cmd: &CommandLine) -> PipelineResult<()> {
        exec::run_checked(self.exec, cmd)
    }

    /// Create the host reports directory if it is missing.
    ///
    /// Only the last component is created, so a workspace without a
    /// `tests/` tree fails here instead of growing one.
    pub fn prepare(&self) -> PipelineResult<()> {
        let reports = self.config.reports_dir();
        if !reports.exists() {
            info!(path = %reports.display(), "creating reports directory");
            fs::create_dir(&reports).map_err(PipelineError::io("create", &reports))?;
        }
        Ok(())
    }

    /// Run every step in order and return what happened.
    pub fn run(&self) -> PipelineResult<RunSummary> {
        let mut summary = RunSummary::start();
        self.run_recorded(&mut summary)?;
        Ok(summary)
    }

    /// Like [`Pipeline::run`], but fills `summary` even when a step fails.
    ///
    /// The first failing step aborts the run. With cleanup-on-failure
    /// enabled, compiled output is removed before the error is returned, and
    /// packages this run installed on a physical device are uninstalled.
    pub fn run_recorded(&self, summary: &mut RunSummary) -> PipelineResult<()> {
        let result = self.run_steps(summary);

        if let Err(e) = &result {
            error!(error = %e, "pipeline aborted");
            if self.config.cleanup_on_failure {
                self.recover(summary);
            }
        }

        summary.finish(&result);
        result
    }

    fn run_steps(&self, summary: &mut RunSummary) -> PipelineResult<()> {
        step(summary, Step::Prepare, || self.prepare())?;
        for target in Target::ALL {
            step(summary, Step::build(target), || self.build(target))?;
        }
        for target in Target::ALL {
            step(summary, Step::install(target), || self.install(target))?;
        }
        step(summary, Step::Instrument, || self.run_instrumentation())?;
        step(summary, Step::FetchReport, || self.fetch_report())?;
        step(summary, Step::Cleanup, || {
            self.cleanup();
            Ok(())
        })?;
        step(summary, Step::Uninstall, || self.uninstall())
    }

    fn recover(&self, summary: &RunSummary) {
        warn!("running best-effort cleanup after failure");
        self.cleanup();

        if !self.config.device.is_physical() {
            return;
        }
        if summary
            .failure
            .as_ref()
            .is_some_and(|f| f.step == Step::Uninstall)
        {
            debug!("uninstall step failed, not retrying it");
            return;
        }
        // never touch packages this run did not put on the device
        for target in Target::ALL {
            if !summary.completed.contains(&Step::install(target)) {
                continue;
            }
            if let Err(e) = self.uninstall_target(target) {
                warn!(%target, error = %e, "best-effort uninstall failed");
            }
        }
    }
}

fn step(
    summary: &mut RunSummary,
    step: Step,
    f: impl FnOnce() -> PipelineResult<()>,
) -> PipelineResult<()> {
    info!(%step, "step started");
    let result = f();
    summary.record(step, &result);
    result
}
