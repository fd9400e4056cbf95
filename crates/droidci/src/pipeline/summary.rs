//! Machine-readable record of a pipeline run.

use crate::error::{PipelineError, PipelineResult};
use crate::target::Target;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Prepare,
    BuildApplication,
    BuildTests,
    InstallApplication,
    InstallTests,
    Instrument,
    FetchReport,
    Cleanup,
    Uninstall,
}

impl Step {
    pub fn build(target: Target) -> Self {
        match target {
            Target::Application => Self::BuildApplication,
            Target::Tests => Self::BuildTests,
        }
    }

    pub fn install(target: Target) -> Self {
        match target {
            Target::Application => Self::InstallApplication,
            Target::Tests => Self::InstallTests,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::BuildApplication => "build-application",
            Self::BuildTests => "build-tests",
            Self::InstallApplication => "install-application",
            Self::InstallTests => "install-tests",
            Self::Instrument => "instrument",
            Self::FetchReport => "fetch-report",
            Self::Cleanup => "cleanup",
            Self::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub step: Step,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub completed: Vec<Step>,
    pub failure: Option<Failure>,
    pub success: bool,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::start()
    }
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            completed: Vec::new(),
            failure: None,
            success: false,
        }
    }

    pub(crate) fn record(&mut self, step: Step, result: &PipelineResult<()>) {
        match result {
            Ok(()) => self.completed.push(step),
            Err(e) => {
                self.failure = Some(Failure {
                    step,
                    error: e.to_string(),
                });
            }
        }
    }

    pub(crate) fn finish(&mut self, result: &PipelineResult<()>) {
        self.finished_at = Some(Utc::now());
        self.success = result.is_ok();
    }

    pub fn write_to(&self, path: &Path) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::io("serialize summary for", path)(e.into()))?;
        fs::write(path, json + "\n").map_err(PipelineError::io("write", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandStatus;

    #[test]
    fn test_summary_records_failure() {
        let mut summary = RunSummary::start();
        summary.record(Step::BuildApplication, &Ok(()));
        let failed: PipelineResult<()> = Err(PipelineError::CommandFailed {
            command: "ant -quiet debug".into(),
            status: CommandStatus::from_code(1),
        });
        summary.record(Step::BuildTests, &failed);
        summary.finish(&failed);

        assert_eq!(summary.completed, [Step::BuildApplication]);
        assert_eq!(summary.failure.as_ref().unwrap().step, Step::BuildTests);
        assert!(!summary.success);
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn test_summary_json_uses_step_ids() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("summary.json");

        let mut summary = RunSummary::start();
        summary.record(Step::FetchReport, &Ok(()));
        summary.finish(&Ok(()));
        summary.write_to(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["completed"][0], "fetch-report");
        assert_eq!(json["success"], true);
        assert!(json["failure"].is_null());
    }

    #[test]
    fn test_step_ids_match_serde_names() {
        for step in [Step::Prepare, Step::InstallTests, Step::Uninstall] {
            let json = serde_json::to_value(step).unwrap();
            assert_eq!(json, step.id());
        }
    }
}
