//! Run configuration.
//!
//! Built once at startup and passed by reference to every step. Values are
//! layered: built-in defaults, then an optional `droidci.toml` in the
//! workspace root, then command-line flags and environment variables.

use crate::target::{DeviceKind, DeviceSelector, Target};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "droidci.toml";

const APP_SOURCE_DIR: &str = "trunk";
const TESTS_SOURCE_DIR: &str = "tests";
const REPORTS_DIR: &str = "reports";
const OUTPUT_DIR: &str = "bin";

/// Project settings as stored in `droidci.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub sdk_dir: PathBuf,
    /// Device bridge binary; `<sdk_dir>/platform-tools/adb` when unset.
    pub adb: Option<PathBuf>,
    pub build_tool: String,
    pub company: String,
    pub app_name: String,
    pub platform_target: String,
    pub device: DeviceKind,
    /// Emulator serial, used when neither `--emulator` nor `ANDROID_AVD_DEVICE` is set.
    pub emulator: Option<String>,
    /// Per-command timeout in seconds.
    pub command_timeout: Option<u64>,
    pub cleanup_on_failure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sdk_dir: PathBuf::from("/opt/android-sdk-update-manager"),
            adb: None,
            build_tool: "ant".to_string(),
            company: "company".to_string(),
            app_name: "app".to_string(),
            platform_target: "android-8".to_string(),
            device: DeviceKind::Emulator,
            emulator: None,
            command_timeout: None,
            cleanup_on_failure: true,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workspace: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub emulator: Option<String>,
    pub device: Option<DeviceKind>,
    pub sdk_dir: Option<PathBuf>,
    pub adb: Option<PathBuf>,
    pub build_tool: Option<String>,
    pub company: Option<String>,
    pub app_name: Option<String>,
    pub platform_target: Option<String>,
    pub command_timeout: Option<u64>,
    pub no_cleanup_on_failure: bool,
}

/// Fully resolved, immutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workspace: PathBuf,
    pub sdk_dir: PathBuf,
    pub adb: PathBuf,
    pub build_tool: String,
    pub company: String,
    pub app_name: String,
    pub platform_target: String,
    pub device: DeviceSelector,
    pub command_timeout: Option<Duration>,
    pub cleanup_on_failure: bool,
}

impl Config {
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let Some(workspace) = overrides.workspace.clone() else {
            bail!("Workspace root is not set (pass --workspace or export WORKSPACE)");
        };

        let settings = match &overrides.settings {
            Some(path) if !path.exists() => {
                bail!("Settings file not found: {}", path.display())
            }
            Some(path) => Settings::load(path)?,
            None => Settings::load(&workspace.join(SETTINGS_FILE))?,
        };

        Self::from_parts(workspace, settings, overrides)
    }

    pub fn from_parts(workspace: PathBuf, settings: Settings, o: Overrides) -> Result<Self> {
        let sdk_dir = o.sdk_dir.unwrap_or(settings.sdk_dir);
        let adb = o
            .adb
            .or(settings.adb)
            .unwrap_or_else(|| sdk_dir.join("platform-tools/adb"));

        let device = match o.device.unwrap_or(settings.device) {
            DeviceKind::Physical => DeviceSelector::Physical,
            DeviceKind::Emulator => {
                let id = o
                    .emulator
                    .or(settings.emulator)
                    .filter(|id| !id.is_empty())
                    .context(
                    "Emulator mode needs a device id (pass --emulator or export ANDROID_AVD_DEVICE)",
                )?;
                DeviceSelector::Emulator(id)
            }
        };

        let app_name = o.app_name.unwrap_or(settings.app_name);
        let company = o.company.unwrap_or(settings.company);
        if app_name.is_empty() || company.is_empty() {
            bail!("Application and company names must not be empty");
        }

        Ok(Self {
            workspace,
            sdk_dir,
            adb,
            build_tool: o.build_tool.unwrap_or(settings.build_tool),
            company,
            app_name,
            platform_target: o.platform_target.unwrap_or(settings.platform_target),
            device,
            command_timeout: o
                .command_timeout
                .or(settings.command_timeout)
                .map(Duration::from_secs),
            cleanup_on_failure: settings.cleanup_on_failure && !o.no_cleanup_on_failure,
        })
    }

    /// The settings that reproduce this configuration when loaded from a
    /// settings file in the same workspace.
    pub fn to_settings(&self) -> Settings {
        let (device, emulator) = match &self.device {
            DeviceSelector::Emulator(id) => (DeviceKind::Emulator, Some(id.clone())),
            DeviceSelector::Physical => (DeviceKind::Physical, None),
        };
        Settings {
            sdk_dir: self.sdk_dir.clone(),
            adb: Some(self.adb.clone()),
            build_tool: self.build_tool.clone(),
            company: self.company.clone(),
            app_name: self.app_name.clone(),
            platform_target: self.platform_target.clone(),
            device,
            emulator,
            command_timeout: self.command_timeout.map(|t| t.as_secs()),
            cleanup_on_failure: self.cleanup_on_failure,
        }
    }

    pub fn app_dir(&self) -> PathBuf {
        self.workspace.join(APP_SOURCE_DIR)
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.workspace.join(TESTS_SOURCE_DIR)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.tests_dir().join(REPORTS_DIR)
    }

    pub fn source_dir(&self, target: Target) -> PathBuf {
        match target {
            Target::Application => self.app_dir(),
            Target::Tests => self.tests_dir(),
        }
    }

    /// Compiled-output directory removed by cleanup.
    pub fn output_dir(&self, target: Target) -> PathBuf {
        self.source_dir(target).join(OUTPUT_DIR)
    }

    /// `com.<company>.<app>`
    pub fn package_name(&self) -> String {
        format!("com.{}.{}", self.company, self.app_name)
    }

    pub fn tests_package(&self) -> String {
        format!("{}.tests", self.package_name())
    }

    /// Package installed from `target`'s APK.
    pub fn package(&self, target: Target) -> String {
        match target {
            Target::Application => self.package_name(),
            Target::Tests => self.tests_package(),
        }
    }

    /// Build-tool project name, which also names the built APK.
    pub fn project_name(&self, target: Target) -> String {
        match target {
            Target::Application => self.app_name.clone(),
            Target::Tests => format!("{}tests", self.app_name),
        }
    }

    pub fn apk_path(&self, target: Target) -> PathBuf {
        self.output_dir(target)
            .join(format!("{}-debug.apk", self.project_name(target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(workspace: &str) -> Overrides {
        Overrides {
            workspace: Some(PathBuf::from(workspace)),
            emulator: Some("avd1".into()),
            company: Some("acme".into()),
            ..Overrides::default()
        }
    }

    #[test]
    fn test_defaults_follow_sdk_layout() {
        let config = Config::from_parts("/ws".into(), Settings::default(), overrides("/ws")).unwrap();
        assert_eq!(config.adb, Path::new("/opt/android-sdk-update-manager/platform-tools/adb"));
        assert_eq!(config.build_tool, "ant");
        assert_eq!(config.platform_target, "android-8");
        assert_eq!(config.device, DeviceSelector::Emulator("avd1".into()));
        assert!(config.cleanup_on_failure);
        assert_eq!(config.command_timeout, None);
    }

    #[test]
    fn test_apk_paths() {
        let config = Config::from_parts("/ws".into(), Settings::default(), overrides("/ws")).unwrap();
        assert_eq!(
            config.apk_path(Target::Application),
            Path::new("/ws/trunk/bin/app-debug.apk")
        );
        assert_eq!(
            config.apk_path(Target::Tests),
            Path::new("/ws/tests/bin/apptests-debug.apk")
        );
        assert_eq!(config.reports_dir(), Path::new("/ws/tests/reports"));
    }

    #[test]
    fn test_package_names() {
        let config = Config::from_parts("/ws".into(), Settings::default(), overrides("/ws")).unwrap();
        assert_eq!(config.package_name(), "com.acme.app");
        assert_eq!(config.tests_package(), "com.acme.app.tests");
        assert_eq!(config.package(Target::Application), "com.acme.app");
        assert_eq!(config.package(Target::Tests), "com.acme.app.tests");
    }

    #[test]
    fn test_emulator_mode_requires_id() {
        let mut o = overrides("/ws");
        o.emulator = None;
        let err = Config::from_parts("/ws".into(), Settings::default(), o).unwrap_err();
        assert!(err.to_string().contains("ANDROID_AVD_DEVICE"));
    }

    #[test]
    fn test_physical_mode_ignores_emulator_id() {
        let mut o = overrides("/ws");
        o.device = Some(DeviceKind::Physical);
        let config = Config::from_parts("/ws".into(), Settings::default(), o).unwrap();
        assert_eq!(config.device, DeviceSelector::Physical);
    }

    #[test]
    fn test_flags_override_settings_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SETTINGS_FILE),
            "app-name = \"notes\"\ncompany = \"initech\"\ncommand-timeout = 600\ncleanup-on-failure = true\n",
        )
        .unwrap();

        let o = Overrides {
            workspace: Some(tmp.path().to_path_buf()),
            emulator: Some("avd1".into()),
            company: Some("acme".into()),
            no_cleanup_on_failure: true,
            ..Overrides::default()
        };
        let config = Config::resolve(o).unwrap();
        assert_eq!(config.app_name, "notes");
        assert_eq!(config.company, "acme");
        assert_eq!(config.command_timeout, Some(Duration::from_secs(600)));
        assert!(!config.cleanup_on_failure);
    }

    #[test]
    fn test_missing_settings_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let settings = Settings::load(&tmp.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_explicit_missing_settings_file_is_an_error() {
        let mut o = overrides("/ws");
        o.settings = Some(PathBuf::from("/nonexistent/droidci.toml"));
        assert!(Config::resolve(o).is_err());
    }

    #[test]
    fn test_workspace_is_required() {
        let err = Config::resolve(Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("WORKSPACE"));
    }

    #[test]
    fn test_emulator_id_from_settings_file() {
        let mut o = overrides("/ws");
        o.emulator = None;
        let settings = Settings {
            emulator: Some("avd9".into()),
            ..Settings::default()
        };
        let config = Config::from_parts("/ws".into(), settings, o).unwrap();
        assert_eq!(config.device, DeviceSelector::Emulator("avd9".into()));
    }

    #[test]
    fn test_printed_settings_load_back_to_same_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut o = overrides("/ws");
        o.workspace = Some(tmp.path().to_path_buf());
        o.command_timeout = Some(90);
        o.no_cleanup_on_failure = true;
        let config = Config::resolve(o).unwrap();

        let text = toml::to_string_pretty(&config.to_settings()).unwrap();
        assert!(text.contains("command-timeout = 90"));
        fs::write(tmp.path().join(SETTINGS_FILE), text).unwrap();

        let reloaded = Config::resolve(Overrides {
            workspace: Some(tmp.path().to_path_buf()),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(reloaded, config);
    }
}
