//! Device bridge steps: install, instrument, pull report, uninstall.

use super::manifest::REPORT_RUNNER_CLASS;
use super::Pipeline;
use crate::error::PipelineResult;
use crate::exec::CommandLine;
use crate::target::{DeviceSelector, Target};
use tracing::{debug, info};

const REPORT_FILE: &str = "junit-report.xml";

impl Pipeline<'_> {
    /// `adb <selector>` with no subcommand yet.
    fn bridge(&self) -> CommandLine {
        CommandLine::new(&self.config.adb).args(self.config.device.bridge_args())
    }

    /// Where the report runner leaves its results on the device.
    pub fn report_device_path(&self) -> String {
        format!(
            "/data/data/{}/files/{REPORT_FILE}",
            self.config.package_name()
        )
    }

    pub fn install(&self, target: Target) -> PipelineResult<()> {
        let apk = self.config.apk_path(target);
        info!(%target, apk = %apk.display(), device = %self.config.device, "installing");
        self.execute(&self.bridge().arg("install").arg(&apk))?;
        info!(%target, "installed");
        Ok(())
    }

    pub fn run_instrumentation(&self) -> PipelineResult<()> {
        let component = format!("{}/{REPORT_RUNNER_CLASS}", self.config.tests_package());
        info!(%component, "running instrumentation");
        self.execute(
            &self
                .bridge()
                .args(["shell", "am", "instrument", "-w"])
                .arg(&component),
        )
    }

    pub fn fetch_report(&self) -> PipelineResult<()> {
        let reports_dir = self.config.reports_dir();
        let remote = self.report_device_path();
        info!(%remote, dest = %reports_dir.display(), "fetching test report");
        self.execute(&self.bridge().arg("pull").arg(&remote).arg(&reports_dir))
    }

    /// Remove both packages from a physical device. Emulators are left as they are.
    pub fn uninstall(&self) -> PipelineResult<()> {
        match &self.config.device {
            DeviceSelector::Emulator(id) => {
                debug!(emulator = %id, "skipping uninstall on emulator");
                Ok(())
            }
            DeviceSelector::Physical => {
                info!("uninstalling packages from device");
                for target in Target::ALL {
                    self.uninstall_target(target)?;
                }
                Ok(())
            }
        }
    }

    /// Remove the package built from `target`, whatever the device mode.
    pub(crate) fn uninstall_target(&self, target: Target) -> PipelineResult<()> {
        let package = self.config.package(target);
        self.execute(&self.bridge().arg("uninstall").arg(&package))
    }
}
