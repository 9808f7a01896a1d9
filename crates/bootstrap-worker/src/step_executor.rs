// StepExecutor: performs the action of one step.

use bootstrap_sdk::{IOUtil, ProcessError, TraceWriter};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command_runner::{CommandRunner, Downloader};
use crate::errors::ProvisionError;
use crate::fetch;
use crate::profile::ProfileResource;
use crate::run_context::RunContext;
use crate::step::{CommandSpec, StepKind};

/// Dispatches a [`StepKind`] to its implementation.
pub struct StepExecutor {
    commands: Arc<dyn CommandRunner>,
    downloader: Arc<dyn Downloader>,
    profile: ProfileResource,
    trace: Arc<dyn TraceWriter>,
}

impl StepExecutor {
    pub fn new(
        commands: Arc<dyn CommandRunner>,
        downloader: Arc<dyn Downloader>,
        profile: ProfileResource,
        trace: Arc<dyn TraceWriter>,
    ) -> Self {
        Self {
            commands,
            downloader,
            profile,
            trace,
        }
    }

    pub async fn execute(
        &self,
        kind: &StepKind,
        ctx: &RunContext,
        cancel: CancellationToken,
    ) -> Result<(), ProvisionError> {
        match kind {
            StepKind::RequireExecutable { program, guidance } => {
                Err(ProvisionError::DependencyInstall {
                    package: program.clone(),
                    reason: format!("'{program}' was not found and cannot be installed automatically"),
                    guidance: Some(guidance.clone()),
                })
            }
            StepKind::InstallPackage { package } => {
                self.install_package(ctx, package, cancel).await
            }
            StepKind::FetchArchive { url, target } => {
                fetch::fetch_archive(
                    self.downloader.as_ref(),
                    self.commands.as_ref(),
                    self.trace.as_ref(),
                    url,
                    target,
                    cancel,
                )
                .await
            }
            StepKind::CloneRepository {
                url,
                target,
                recursive,
            } => {
                fetch::clone_repository(
                    self.commands.as_ref(),
                    self.trace.as_ref(),
                    url,
                    target,
                    *recursive,
                    cancel,
                )
                .await
            }
            StepKind::RunBuild {
                working_dir,
                commands,
            } => self.run_build(working_dir, commands, cancel).await,
            StepKind::InjectProfile { marker, lines } => {
                if self.profile.inject(marker, lines)? {
                    self.trace.info(&format!(
                        "Added environment block to '{}'",
                        self.profile.path().display()
                    ));
                }
                Ok(())
            }
            StepKind::LinkExecutable { source, link } => link_executable(source, link),
            StepKind::RemoveLegacy { paths } => {
                for path in paths {
                    if path.symlink_metadata().is_ok() {
                        self.trace
                            .info(&format!("Removing legacy directory '{}'", path.display()));
                        IOUtil::delete_directory_async(path)
                            .await
                            .map_err(|e| ProvisionError::Displace {
                                path: path.clone(),
                                reason: format!("{e:#}"),
                            })?;
                    }
                }
                Ok(())
            }
        }
    }

    async fn install_package(
        &self,
        ctx: &RunContext,
        package: &str,
        cancel: CancellationToken,
    ) -> Result<(), ProvisionError> {
        let install_error = |reason: String| ProvisionError::DependencyInstall {
            package: package.to_string(),
            reason,
            guidance: None,
        };

        let spec = CommandSpec::new(ctx.package_manager())
            .arg("install")
            .arg(package);
        let output = self
            .commands
            .run(&spec, cancel)
            .await
            .map_err(|e| cancelled_or(e, install_error))?;
        output
            .ensure_success(&spec.program, &spec.args)
            .map_err(|e| install_error(e.to_string()))
    }

    async fn run_build(
        &self,
        working_dir: &Path,
        commands: &[CommandSpec],
        cancel: CancellationToken,
    ) -> Result<(), ProvisionError> {
        let build_error = |reason: String| ProvisionError::Build {
            working_dir: working_dir.to_path_buf(),
            reason,
        };

        if !working_dir.is_dir() {
            return Err(build_error("directory does not exist".to_string()));
        }

        for command in commands {
            self.trace.info(&format!("Running `{command}`"));
            let output = self
                .commands
                .run(command, cancel.clone())
                .await
                .map_err(|e| cancelled_or(e, build_error))?;
            output
                .ensure_success(&command.program, &command.args)
                .map_err(|e| build_error(e.to_string()))?;
        }
        Ok(())
    }
}

fn cancelled_or(err: ProcessError, other: impl Fn(String) -> ProvisionError) -> ProvisionError {
    match err {
        ProcessError::Cancelled { .. } => ProvisionError::Cancelled,
        e => other(e.to_string()),
    }
}

#[cfg(unix)]
fn link_executable(source: &Path, link: &Path) -> Result<(), ProvisionError> {
    if !source.exists() {
        return Err(ProvisionError::io(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "link source does not exist"),
        ));
    }
    std::os::unix::fs::symlink(source, link).map_err(|e| ProvisionError::io(link, e))
}

#[cfg(not(unix))]
fn link_executable(source: &Path, link: &Path) -> Result<(), ProvisionError> {
    std::fs::copy(source, link)
        .map(|_| ())
        .map_err(|e| ProvisionError::io(link, e))
}
