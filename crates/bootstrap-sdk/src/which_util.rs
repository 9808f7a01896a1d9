use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Locates executables on a search path.
pub struct WhichUtil;

impl WhichUtil {
    /// Locate `command` on the process `PATH`.
    ///
    /// - If `require` is true and the command is not found, returns an error.
    /// - If `require` is false and the command is not found, returns `Ok(None)`.
    pub fn which(command: &str, require: bool) -> anyhow::Result<Option<PathBuf>> {
        if command.is_empty() {
            if require {
                anyhow::bail!("command must not be empty");
            }
            return Ok(None);
        }

        match which::which(command) {
            Ok(path) => Ok(Some(path)),
            Err(_) if !require => Ok(None),
            Err(e) => anyhow::bail!(
                "{command}: command not found ({e}). Make sure '{command}' is installed and its location included in the 'PATH' environment variable."
            ),
        }
    }

    /// Locate `command` on an explicit search path instead of the process `PATH`.
    pub fn which_in(command: &str, search_path: impl AsRef<OsStr>) -> Option<PathBuf> {
        if command.is_empty() {
            return None;
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());
        which::which_in(command, Some(search_path), cwd).ok()
    }
}
