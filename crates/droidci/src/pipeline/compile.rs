//! Build step: compile one source tree into a debug APK.

use super::descriptor::{self, DescriptorState, DESCRIPTOR_FILE};
use super::manifest::{self, MANIFEST_FILE};
use super::Pipeline;
use crate::error::{PipelineError, PipelineResult};
use crate::exec::CommandLine;
use crate::target::Target;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

impl Pipeline<'_> {
    /// Compile `target` with `<build_tool> -quiet debug`.
    ///
    /// A `build.xml` is synthesized when the tree has none and removed
    /// after a successful build. The build tool runs with the source tree as
    /// its working directory; this process's own directory never changes.
    pub fn build(&self, target: Target) -> PipelineResult<()> {
        let dir = self.config.source_dir(target);
        let descriptor_path = dir.join(DESCRIPTOR_FILE);

        let state = descriptor::ensure_descriptor(&dir, target, self.config);
        match &state {
            DescriptorState::Existing => {
                info!(path = %descriptor_path.display(), "build descriptor exists");
            }
            DescriptorState::Synthesized(content) => {
                info!(path = %descriptor_path.display(), "no build descriptor, writing a temporary one");
                fs::write(&descriptor_path, content)
                    .map_err(PipelineError::io("write", &descriptor_path))?;
            }
        }

        let result = self.patch_and_compile(target, &dir);

        if state.created() {
            if result.is_ok() {
                info!(path = %descriptor_path.display(), "removing temporary build descriptor");
                fs::remove_file(&descriptor_path)
                    .map_err(PipelineError::io("remove", &descriptor_path))?;
            } else if self.config.cleanup_on_failure {
                if let Err(e) = fs::remove_file(&descriptor_path) {
                    warn!(path = %descriptor_path.display(), error = %e, "could not remove temporary build descriptor");
                }
            } else {
                warn!(path = %descriptor_path.display(), "build failed, leaving temporary build descriptor in place");
            }
        }

        result
    }

    fn patch_and_compile(&self, target: Target, dir: &Path) -> PipelineResult<()> {
        if target == Target::Tests {
            let manifest_path = dir.join(MANIFEST_FILE);
            if manifest::patch_if_default(&manifest_path)? {
                info!(path = %manifest_path.display(), "switched test runner to the JUnit report runner");
            } else {
                debug!(path = %manifest_path.display(), "test runner already set");
            }
        }

        info!(%target, "compiling");
        let cmd = CommandLine::new(&self.config.build_tool)
            .args(["-quiet", "debug"])
            .current_dir(dir);
        self.execute(&cmd)?;
        info!(%target, "compiled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides, Settings};
    use crate::exec::RecordingExecutor;
    use crate::pipeline::manifest::{DEFAULT_RUNNER, REPORT_RUNNER};
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn workspace(cleanup_on_failure: bool) -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("trunk")).unwrap();
        fs::create_dir_all(tmp.path().join("tests")).unwrap();
        fs::write(
            tmp.path().join("tests").join(MANIFEST_FILE),
            format!("<instrumentation {DEFAULT_RUNNER} />\n"),
        )
        .unwrap();

        let o = Overrides {
            workspace: Some(tmp.path().to_path_buf()),
            emulator: Some("avd1".into()),
            no_cleanup_on_failure: !cleanup_on_failure,
            ..Overrides::default()
        };
        let config = Config::from_parts(tmp.path().to_path_buf(), Settings::default(), o).unwrap();
        (tmp, config)
    }

    #[test]
    fn test_synthesized_descriptor_exists_during_build_and_is_removed() {
        let (_tmp, config) = workspace(true);
        let descriptor = config.app_dir().join(DESCRIPTOR_FILE);
        let seen = Rc::new(Cell::new(false));

        let exec = {
            let seen = Rc::clone(&seen);
            let descriptor = descriptor.clone();
            RecordingExecutor::new().on_run(move |_| seen.set(descriptor.exists()))
        };
        Pipeline::new(&config, &exec).build(Target::Application).unwrap();

        assert!(seen.get(), "descriptor must be on disk while the build tool runs");
        assert!(!descriptor.exists());

        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].argv(), ["ant", "-quiet", "debug"]);
        assert_eq!(calls[0].cwd(), Some(config.app_dir().as_path()));
    }

    #[test]
    fn test_existing_descriptor_is_preserved() {
        let (_tmp, config) = workspace(true);
        let descriptor = config.app_dir().join(DESCRIPTOR_FILE);
        fs::write(&descriptor, "<project name=\"mine\"/>\n").unwrap();

        let exec = RecordingExecutor::new();
        Pipeline::new(&config, &exec).build(Target::Application).unwrap();

        assert_eq!(
            fs::read_to_string(&descriptor).unwrap(),
            "<project name=\"mine\"/>\n"
        );
    }

    #[test]
    fn test_tests_build_patches_manifest() {
        let (_tmp, config) = workspace(true);
        let exec = RecordingExecutor::new();
        Pipeline::new(&config, &exec).build(Target::Tests).unwrap();

        let manifest = fs::read_to_string(config.tests_dir().join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest, format!("<instrumentation {REPORT_RUNNER} />\n"));
        assert_eq!(exec.calls()[0].cwd(), Some(config.tests_dir().as_path()));
    }

    #[test]
    fn test_application_build_does_not_touch_manifest() {
        let (_tmp, config) = workspace(true);
        let exec = RecordingExecutor::new();
        Pipeline::new(&config, &exec).build(Target::Application).unwrap();

        let manifest = fs::read_to_string(config.tests_dir().join(MANIFEST_FILE)).unwrap();
        assert!(manifest.contains(DEFAULT_RUNNER));
    }

    #[test]
    fn test_failed_build_keeps_descriptor_without_cleanup() {
        let (_tmp, config) = workspace(false);
        let exec = RecordingExecutor::new().fail_when("debug", 1);

        let err = Pipeline::new(&config, &exec)
            .build(Target::Application)
            .unwrap_err();
        assert!(matches!(err, PipelineError::CommandFailed { .. }));
        assert!(config.app_dir().join(DESCRIPTOR_FILE).exists());
    }

    #[test]
    fn test_failed_build_removes_descriptor_with_cleanup() {
        let (_tmp, config) = workspace(true);
        let exec = RecordingExecutor::new().fail_when("debug", 1);

        assert!(Pipeline::new(&config, &exec).build(Target::Tests).is_err());
        assert!(!config.tests_dir().join(DESCRIPTOR_FILE).exists());
    }

    #[test]
    fn test_missing_manifest_aborts_before_compiling() {
        let (_tmp, config) = workspace(true);
        fs::remove_file(config.tests_dir().join(MANIFEST_FILE)).unwrap();
        let exec = RecordingExecutor::new();

        let err = Pipeline::new(&config, &exec).build(Target::Tests).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(exec.calls().is_empty());
        assert!(!config.tests_dir().join(DESCRIPTOR_FILE).exists());
    }
}
