// Fakes shared by the orchestrator and plan tests.

use async_trait::async_trait;
use bootstrap_sdk::{ProcessError, ProcessOutput};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::command_runner::{CommandRunner, Downloader};
use crate::constants::Architecture;
use crate::profile::ProfileResource;
use crate::run_context::RunContext;
use crate::settings::Settings;
use crate::step::CommandSpec;

type Handler = Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput, ProcessError> + Send + Sync>;

pub fn ok() -> ProcessOutput {
    ProcessOutput::default()
}

pub fn exit(code: i32, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        exit_code: code,
        stderr: stderr.lines().map(str::to_string).collect(),
    }
}

/// Records every command and answers with a scripted handler.
pub struct FakeCommandRunner {
    calls: Mutex<Vec<CommandSpec>>,
    handler: Handler,
    hang: bool,
}

impl FakeCommandRunner {
    pub fn new(
        handler: impl Fn(&CommandSpec) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            hang: false,
        }
    }

    pub fn succeeding() -> Self {
        Self::new(|_| Ok(ok()))
    }

    /// Never returns until cancelled.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    pub fn rendered_calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        cancel: CancellationToken,
    ) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().push(command.clone());
        if self.hang {
            cancel.cancelled().await;
            return Err(ProcessError::Cancelled {
                file_name: command.program.clone(),
            });
        }
        (self.handler)(command)
    }
}

/// Writes a placeholder archive, or fails when `fail` is set.
#[derive(Default)]
pub struct FakeDownloader {
    pub fail: bool,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("Download failed with HTTP 404 for {url}");
        }
        std::fs::write(dest, b"archive")?;
        Ok(())
    }
}

/// A temporary home directory with a package root that already has `brew`.
pub struct Sandbox {
    dir: tempfile::TempDir,
    settings: Settings,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = Settings::with_home(dir.path());
        let package_root = dir.path().join("homebrew");
        settings.package_root = Some(package_root.clone());
        make_executable(&package_root.join("bin").join("brew"));
        Self { dir, settings }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn package_root(&self) -> PathBuf {
        self.dir.path().join("homebrew")
    }

    pub fn profile(&self) -> ProfileResource {
        ProfileResource::new(&self.settings.profile_path)
    }

    pub fn context(&self, refresh: bool) -> RunContext {
        RunContext::for_architecture(&self.settings, refresh, Architecture::Arm64)
    }
}

/// Create an executable shell stub at `path`, including parent directories.
pub fn make_executable(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, "#!/bin/sh\nexit 0\n").expect("write stub");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}
