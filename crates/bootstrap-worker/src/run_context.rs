// RunContext: the resolved, read-only inputs of one installer run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{Architecture, CURRENT_ARCHITECTURE};
use crate::settings::Settings;

/// Everything a step may consult while it runs. Built once per run and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunContext {
    refresh: bool,
    architecture: Architecture,
    install_root: PathBuf,
    profile_path: PathBuf,
    package_manager: String,
    package_root: PathBuf,
    step_timeout: Option<Duration>,
}

impl RunContext {
    pub fn new(settings: &Settings, refresh: bool) -> Self {
        Self::for_architecture(settings, refresh, CURRENT_ARCHITECTURE)
    }

    pub fn for_architecture(settings: &Settings, refresh: bool, architecture: Architecture) -> Self {
        let package_root = settings
            .package_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(architecture.package_root()));

        Self {
            refresh,
            architecture,
            install_root: settings.install_root.clone(),
            profile_path: settings.profile_path.clone(),
            package_manager: settings.package_manager.clone(),
            package_root,
            step_timeout: settings
                .step_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Whether this run forces re-execution and displacement.
    pub fn refresh(&self) -> bool {
        self.refresh
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Directory holding downloaded and extracted sources.
    pub fn source_root(&self) -> PathBuf {
        self.install_root.join("src")
    }

    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }

    pub fn package_manager(&self) -> &str {
        &self.package_manager
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }
}
