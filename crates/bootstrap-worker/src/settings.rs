// Installer settings: built-in defaults, an optional JSON settings file, and
// Z80_BOOTSTRAP_* environment overrides, applied in that order.

use anyhow::{Context, Result};
use bootstrap_sdk::IOUtil;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{self, variables};

/// File looked up in the install root when no settings file is named explicitly.
const DEFAULT_SETTINGS_FILE_NAME: &str = "bootstrap.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    pub version: String,
    /// Source archive. `http(s)://` URLs are downloaded; anything else is a local path.
    pub archive_url: String,
    pub configure_args: Vec<String>,
    /// Executable aliases created after install, as `(existing, alias)` names in `bin/`.
    pub links: Vec<(String, String)>,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        let version = "4.2.0".to_string();
        Self {
            archive_url: format!(
                "https://downloads.sourceforge.net/project/sdcc/sdcc/{version}/sdcc-src-{version}.tar.bz2"
            ),
            version,
            configure_args: [
                "--disable-pic14-port",
                "--disable-pic16-port",
                "--disable-ucsim",
                "--disable-doc",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            links: vec![("sdasz80".to_string(), "as-z80".to_string())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkSettings {
    pub repository_url: String,
    pub directory_name: String,
    pub recursive: bool,
    pub build_target: String,
    /// Path relative to the framework checkout whose presence means the tools are built.
    pub tools_marker: String,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            repository_url: "git@github.com:retro-engine/retro-engine.git".to_string(),
            directory_name: "retro-engine".to_string(),
            recursive: true,
            build_target: "tools".to_string(),
            tools_marker: "tools/bin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Everything the installer creates lives under this directory.
    pub install_root: PathBuf,
    /// Shell profile that receives the environment block.
    pub profile_path: PathBuf,
    pub package_manager: String,
    /// Overrides the architecture-derived package root.
    pub package_root: Option<PathBuf>,
    /// Per-step timeout. `None` waits forever.
    pub step_timeout_secs: Option<u64>,
    /// Directory names, relative to the install root, left by earlier installer releases.
    pub legacy_directories: Vec<String>,
    pub toolchain: ToolchainSettings,
    pub framework: FrameworkSettings,
}

impl Settings {
    /// Defaults rooted at the given home directory.
    pub fn with_home(home: &Path) -> Self {
        Self {
            install_root: home.join("z80"),
            profile_path: home.join(".zshrc"),
            package_manager: constants::PACKAGE_MANAGER.to_string(),
            package_root: None,
            step_timeout_secs: None,
            legacy_directories: vec!["z80engine".to_string(), "sdcc-src".to_string()],
            toolchain: ToolchainSettings::default(),
            framework: FrameworkSettings::default(),
        }
    }

    /// Load settings for this process: defaults, then the settings file if
    /// there is one, then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&home_dir(), |key: &str| std::env::var(key).ok())
    }

    /// [`Settings::load`] with an explicit home directory and variable lookup.
    pub fn load_from(home: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::with_home(home);
        let explicit = lookup(variables::SETTINGS_FILE).map(PathBuf::from);
        let install_root = lookup(variables::INSTALL_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.install_root.clone());
        let implicit = install_root.join(DEFAULT_SETTINGS_FILE_NAME);

        let mut settings = match explicit {
            Some(path) => IOUtil::load_object::<Settings>(&path)
                .with_context(|| format!("Failed to load settings file '{}'", path.display()))?,
            None if implicit.is_file() => IOUtil::load_object::<Settings>(&implicit)?,
            None => defaults,
        };
        // 0 disables the timeout wherever it was set.
        settings.step_timeout_secs = settings.step_timeout_secs.filter(|secs| *secs > 0);

        settings.apply_overrides(lookup)?;
        Ok(settings)
    }

    /// Apply `Z80_BOOTSTRAP_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = lookup(variables::INSTALL_ROOT) {
            self.install_root = PathBuf::from(root);
        }
        if let Some(profile) = lookup(variables::PROFILE) {
            self.profile_path = PathBuf::from(profile);
        }
        if let Some(root) = lookup(variables::PACKAGE_ROOT) {
            self.package_root = Some(PathBuf::from(root));
        }
        if let Some(secs) = lookup(variables::STEP_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().with_context(|| {
                format!("{} must be a whole number of seconds, got '{secs}'", variables::STEP_TIMEOUT_SECS)
            })?;
            self.step_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(url) = lookup(variables::FRAMEWORK_URL) {
            self.framework.repository_url = url;
        }
        if let Some(url) = lookup(variables::TOOLCHAIN_URL) {
            self.toolchain.archive_url = url;
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_home(&home_dir())
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_rooted_at_home() {
        let settings = Settings::with_home(Path::new("/Users/dev"));
        assert_eq!(settings.install_root, PathBuf::from("/Users/dev/z80"));
        assert_eq!(settings.profile_path, PathBuf::from("/Users/dev/.zshrc"));
        assert_eq!(settings.package_manager, "brew");
        assert!(settings.step_timeout_secs.is_none());
        assert!(settings.toolchain.archive_url.contains("sdcc-src-4.2.0"));
    }

    #[test]
    fn env_overrides_win() {
        let mut settings = Settings::with_home(Path::new("/Users/dev"));
        settings
            .apply_overrides(lookup_from(&[
                (variables::INSTALL_ROOT, "/opt/z80"),
                (variables::STEP_TIMEOUT_SECS, "900"),
                (variables::FRAMEWORK_URL, "https://example.com/engine.git"),
            ]))
            .unwrap();

        assert_eq!(settings.install_root, PathBuf::from("/opt/z80"));
        assert_eq!(settings.step_timeout_secs, Some(900));
        assert_eq!(settings.framework.repository_url, "https://example.com/engine.git");
    }

    #[test]
    fn zero_timeout_means_none() {
        let mut settings = Settings::with_home(Path::new("/h"));
        settings
            .apply_overrides(lookup_from(&[(variables::STEP_TIMEOUT_SECS, "0")]))
            .unwrap();
        assert!(settings.step_timeout_secs.is_none());
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut settings = Settings::with_home(Path::new("/h"));
        let err = settings
            .apply_overrides(lookup_from(&[(variables::STEP_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(variables::STEP_TIMEOUT_SECS));
    }

    #[test]
    fn partial_settings_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.json");
        std::fs::write(
            &path,
            r#"{"install_root": "/srv/z80", "framework": {"build_target": "all"}}"#,
        )
        .unwrap();

        let settings: Settings = IOUtil::load_object(&path).unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/srv/z80"));
        assert_eq!(settings.framework.build_target, "all");
        assert_eq!(settings.framework.directory_name, "retro-engine");
        assert_eq!(settings.toolchain.version, "4.2.0");
    }

    #[test]
    fn zero_timeout_in_settings_file_means_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{"step_timeout_secs": 0}"#).unwrap();
        let file = path.display().to_string();

        let settings =
            Settings::load_from(dir.path(), lookup_from(&[(variables::SETTINGS_FILE, file.as_str())]))
                .unwrap();

        assert!(settings.step_timeout_secs.is_none());
    }

    #[test]
    fn implicit_settings_file_in_install_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("z80");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(
            root.join("bootstrap.json"),
            r#"{"step_timeout_secs": 1800, "package_manager": "port"}"#,
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), lookup_from(&[])).unwrap();

        assert_eq!(settings.step_timeout_secs, Some(1800));
        assert_eq!(settings.package_manager, "port");
    }
}
