// Fetch-or-reuse actions: archive download + extraction, repository clone.

use bootstrap_sdk::{ProcessError, ProcessOutput, TraceWriter};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::command_runner::{CommandRunner, Downloader};
use crate::errors::ProvisionError;
use crate::step::CommandSpec;

/// stderr fragments git prints when it could not authenticate.
const AUTH_FAILURE_PATTERNS: &[&str] = &[
    "Permission denied (publickey",
    "Authentication failed",
    "could not read Username",
    "Host key verification failed",
    "terminal prompts disabled",
];

/// Download `url` and extract it into `target`'s parent directory.
///
/// Nothing is rolled back on failure: a partial extraction stays on disk.
pub async fn fetch_archive(
    downloader: &dyn Downloader,
    commands: &dyn CommandRunner,
    trace: &dyn TraceWriter,
    url: &str,
    target: &Path,
    cancel: CancellationToken,
) -> Result<(), ProvisionError> {
    let fetch_error = |reason: String| ProvisionError::Fetch {
        source_url: url.to_string(),
        reason,
    };

    let parent = target
        .parent()
        .ok_or_else(|| fetch_error(format!("'{}' has no parent directory", target.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;

    let archive = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(parent)
        .map_err(|e| ProvisionError::io(parent, e))?;

    trace.info(&format!("Downloading {url}"));
    downloader
        .download(url, archive.path())
        .await
        .map_err(|e| fetch_error(format!("{e:#}")))?;

    let extract = CommandSpec::new("tar")
        .arg("-xf")
        .arg(archive.path().to_string_lossy())
        .arg("-C")
        .arg(parent.to_string_lossy());
    trace.info(&format!("Extracting into '{}'", parent.display()));
    let output = run(commands, &extract, cancel, fetch_error).await?;
    output
        .ensure_success(&extract.program, &extract.args)
        .map_err(|e| fetch_error(e.to_string()))?;

    if !target.is_dir() {
        return Err(fetch_error(format!(
            "archive did not produce '{}'",
            target.display()
        )));
    }
    Ok(())
}

/// Clone `url` into `target` with git.
pub async fn clone_repository(
    commands: &dyn CommandRunner,
    trace: &dyn TraceWriter,
    url: &str,
    target: &Path,
    recursive: bool,
    cancel: CancellationToken,
) -> Result<(), ProvisionError> {
    let fetch_error = |reason: String| ProvisionError::Fetch {
        source_url: url.to_string(),
        reason,
    };

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
    }

    let mut clone = CommandSpec::new("git").arg("clone");
    if recursive {
        clone = clone.arg("--recursive");
    }
    let clone = clone.arg(url).arg(target.to_string_lossy());

    trace.info(&format!("Cloning {url}"));
    let output = run(commands, &clone, cancel, fetch_error).await?;
    if output.success() {
        return Ok(());
    }

    let stderr = output.stderr_text();
    if is_auth_failure(&stderr) {
        return Err(ProvisionError::AuthFetch {
            source_url: url.to_string(),
            guidance: auth_guidance(url),
        });
    }
    Err(fetch_error(format!(
        "git exited with code {}: {}",
        output.exit_code,
        stderr.lines().last().unwrap_or_default()
    )))
}

async fn run(
    commands: &dyn CommandRunner,
    spec: &CommandSpec,
    cancel: CancellationToken,
    on_error: impl Fn(String) -> ProvisionError,
) -> Result<ProcessOutput, ProvisionError> {
    commands.run(spec, cancel).await.map_err(|e| match e {
        ProcessError::Cancelled { .. } => ProvisionError::Cancelled,
        other => on_error(other.to_string()),
    })
}

pub fn is_auth_failure(stderr: &str) -> bool {
    AUTH_FAILURE_PATTERNS.iter().any(|p| stderr.contains(p))
}

/// What the user should do to make the clone work next time.
pub fn auth_guidance(url: &str) -> String {
    if url.starts_with("git@") || url.starts_with("ssh://") {
        let host = url
            .trim_start_matches("ssh://")
            .split(['/', ':'])
            .next()
            .unwrap_or("git@github.com");
        format!(
            "The repository is cloned over SSH and no accepted key was offered. \
             Add an SSH key to your account (ssh-keygen -t ed25519, then upload the .pub file), \
             load it with ssh-add, and check access with `ssh -T {host}`. \
             Alternatively set {} to the HTTPS URL of the repository.",
            crate::constants::variables::FRAMEWORK_URL
        )
    } else {
        "The repository is cloned over HTTPS and the credentials were rejected. \
         Configure a credential helper (git config --global credential.helper osxkeychain) \
         and use a personal access token as the password."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_auth_failures() {
        assert!(is_auth_failure(
            "git@github.com: Permission denied (publickey).\nfatal: Could not read from remote repository."
        ));
        assert!(is_auth_failure(
            "fatal: could not read Username for 'https://github.com': terminal prompts disabled"
        ));
        assert!(!is_auth_failure("fatal: repository 'x' does not exist"));
    }

    #[test]
    fn ssh_guidance_names_host() {
        let guidance = auth_guidance("git@github.com:retro-engine/retro-engine.git");
        assert!(guidance.contains("ssh -T git@github.com"));
        assert!(guidance.contains("Z80_BOOTSTRAP_FRAMEWORK_URL"));
    }

    #[test]
    fn https_guidance_mentions_token() {
        let guidance = auth_guidance("https://github.com/retro-engine/retro-engine.git");
        assert!(guidance.contains("personal access token"));
    }
}
