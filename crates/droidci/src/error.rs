//! Pipeline error types.

use crate::exec::CommandStatus;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// An external tool ran and exited unsuccessfully.
    #[error("command `{command}` failed with {status}")]
    CommandFailed {
        command: String,
        status: CommandStatus,
    },

    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting on `{command}`")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("command `{command}` timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Adapter for `map_err` on filesystem calls.
    pub(crate) fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
