use clap::{Args, Parser, Subcommand};
use droidci::{DeviceKind, Overrides, Target};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "droidci")]
#[command(about = "Build, install and instrument-test an Android app and its test package")]
pub struct Cli {
    #[command(flatten)]
    pub opts: GlobalOpts,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Args)]
pub struct GlobalOpts {
    /// Workspace root containing `trunk/` and `tests/`.
    #[arg(long, env = "WORKSPACE", global = true)]
    pub workspace: Option<PathBuf>,

    /// Settings file (default: `<workspace>/droidci.toml` if present).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    pub device: Option<DeviceKind>,

    /// Emulator serial, used with `--device emulator`.
    #[arg(long, env = "ANDROID_AVD_DEVICE", global = true)]
    pub emulator: Option<String>,

    #[arg(long, global = true)]
    pub sdk_dir: Option<PathBuf>,

    /// Device bridge binary (default: `<sdk-dir>/platform-tools/adb`).
    #[arg(long, global = true)]
    pub adb: Option<PathBuf>,

    #[arg(long, global = true)]
    pub build_tool: Option<String>,

    #[arg(long, global = true)]
    pub company: Option<String>,

    #[arg(long, global = true)]
    pub app_name: Option<String>,

    /// SDK platform written into generated build descriptors, e.g. `android-8`.
    #[arg(long, global = true)]
    pub platform_target: Option<String>,

    /// Kill any external command still running after this many seconds.
    #[arg(long, value_name = "SECS", global = true)]
    pub command_timeout: Option<u64>,

    /// Abort immediately on failure without removing build output.
    #[arg(long, global = true)]
    pub no_cleanup_on_failure: bool,

    /// More log output (-v debug, -vv trace). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalOpts {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            workspace: self.workspace.clone(),
            settings: self.settings.clone(),
            emulator: self.emulator.clone(),
            device: self.device,
            sdk_dir: self.sdk_dir.clone(),
            adb: self.adb.clone(),
            build_tool: self.build_tool.clone(),
            company: self.company.clone(),
            app_name: self.app_name.clone(),
            platform_target: self.platform_target.clone(),
            command_timeout: self.command_timeout,
            no_cleanup_on_failure: self.no_cleanup_on_failure,
        }
    }
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Build, install, run the instrumentation tests, fetch the report and clean up.
    Run {
        /// Write a JSON run summary here, also when the run fails.
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Print the build.xml that would be generated for a source tree.
    Descriptor {
        #[arg(long, value_enum, default_value_t = Target::Application)]
        target: Target,
    },

    /// Point the test manifest at the JUnit report runner.
    PatchManifest,

    /// Remove compiled output of both source trees.
    Clean,

    /// Uninstall both packages (physical device only).
    Uninstall,

    /// Print the resolved settings as TOML, in `droidci.toml` form.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "droidci",
            "run",
            "--workspace",
            "/ws",
            "--device",
            "physical",
            "--company",
            "acme",
            "--summary",
            "/tmp/summary.json",
        ])
        .unwrap();

        let o = cli.opts.overrides();
        assert_eq!(o.workspace, Some(PathBuf::from("/ws")));
        assert_eq!(o.device, Some(DeviceKind::Physical));
        assert_eq!(o.company.as_deref(), Some("acme"));
        assert!(matches!(cli.cmd, Cmd::Run { summary: Some(_) }));
    }

    #[test]
    fn test_descriptor_target_defaults_to_application() {
        let cli = Cli::try_parse_from(["droidci", "descriptor"]).unwrap();
        assert!(matches!(
            cli.cmd,
            Cmd::Descriptor {
                target: Target::Application
            }
        ));
    }
}
