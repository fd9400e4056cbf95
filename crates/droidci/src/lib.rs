//! # droidci
//!
//! Continuous-integration driver for an Android application and its
//! instrumentation test package.
//!
//! One run compiles both packages with Ant (writing a throwaway `build.xml`
//! where a tree has none), installs them through `adb`, runs the tests with
//! the JUnit report runner, pulls `junit-report.xml` into
//! `<workspace>/tests/reports` and removes the compiled output.
//!
//! ```no_run
//! use droidci::{Config, Overrides, Pipeline, SystemExecutor};
//!
//! let config = Config::resolve(Overrides {
//!     workspace: Some("/var/lib/jenkins/workspace/app".into()),
//!     emulator: Some("emulator-5554".into()),
//!     ..Overrides::default()
//! })?;
//! let exec = SystemExecutor::new(config.command_timeout);
//! Pipeline::new(&config, &exec).run()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod target;

pub use config::{Config, Overrides, Settings};
pub use error::{PipelineError, PipelineResult};
pub use exec::{CommandExecutor, CommandLine, CommandStatus, RecordingExecutor, SystemExecutor};
pub use pipeline::Pipeline;
pub use target::{DeviceKind, DeviceSelector, Target};
