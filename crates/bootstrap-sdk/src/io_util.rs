use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::{thread, time::Duration};

/// Number of attempts made by [`IOUtil::delete_directory`].
const DELETE_ATTEMPTS: u32 = 3;

/// Filesystem helpers shared by the provisioning steps.
pub struct IOUtil;

impl IOUtil {
    /// Recursively delete a directory with retry logic.
    ///
    /// A missing path is not an error. Symlinks are unlinked, never followed.
    pub fn delete_directory(path: &Path) -> Result<()> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect '{}'", path.display()))
            }
        };

        if meta.file_type().is_symlink() || meta.is_file() {
            return fs::remove_file(path)
                .with_context(|| format!("Failed to remove '{}'", path.display()));
        }

        let mut last_err = None;
        for attempt in 0..DELETE_ATTEMPTS {
            if let Err(e) = Self::make_writable_recursive(path) {
                tracing::debug!(
                    "Failed to clear read-only bits (attempt {}): {}",
                    attempt + 1,
                    e
                );
            }

            match fs::remove_dir_all(path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < DELETE_ATTEMPTS {
                        thread::sleep(Duration::from_millis(100 * (attempt as u64 + 1)));
                    }
                }
            }
        }

        let err = last_err.unwrap_or_else(|| std::io::Error::other("unknown error"));
        Err(err).with_context(|| {
            format!(
                "Failed to delete directory '{}' after {} attempts",
                path.display(),
                DELETE_ATTEMPTS
            )
        })
    }

    /// [`IOUtil::delete_directory`] on tokio's blocking pool. Use this from
    /// async code, since the retry backoff sleeps the calling thread.
    pub async fn delete_directory_async(path: &Path) -> Result<()> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::delete_directory(&owned))
            .await
            .with_context(|| format!("Deletion of '{}' did not complete", path.display()))?
    }

    /// Rename `from` to `to`. Fails if `to` already exists.
    pub fn rename_directory(from: &Path, to: &Path) -> Result<()> {
        if to.symlink_metadata().is_ok() {
            anyhow::bail!(
                "Cannot rename '{}' to '{}': destination already exists",
                from.display(),
                to.display()
            );
        }
        fs::rename(from, to).with_context(|| {
            format!("Failed to rename '{}' to '{}'", from.display(), to.display())
        })
    }

    /// Read a file and deserialize it from JSON.
    pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file '{}'", path.display()))?;
        let value = serde_json::from_str(&json)
            .with_context(|| format!("Failed to deserialize JSON from '{}'", path.display()))?;
        Ok(value)
    }

    /// Read a file's bytes, treating a missing file as empty.
    pub fn read_or_empty(path: &Path) -> std::io::Result<Vec<u8>> {
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Whether `needle` occurs in the file. Bytes that are not UTF-8 never
    /// match; a missing or unreadable file contains nothing.
    pub fn file_contains_text(path: &Path, needle: &str) -> bool {
        Self::read_or_empty(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).contains(needle))
            .unwrap_or(false)
    }

    /// Append `text` to a file, creating the file (not its parents) if needed.
    pub fn append_text(path: &Path, text: &str) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(text.as_bytes())?;
        file.flush()
    }

    fn make_writable_recursive(path: &Path) -> Result<()> {
        if path.is_dir() {
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    Self::make_writable_recursive(&entry.path())?;
                } else {
                    Self::make_writable(&entry.path())?;
                }
            }
        }
        Self::make_writable(path)
    }

    fn make_writable(path: &Path) -> Result<()> {
        let Ok(meta) = fs::symlink_metadata(path) else {
            return Ok(());
        };
        if meta.file_type().is_symlink() {
            return Ok(());
        }
        let mut perms = meta.permissions();
        if perms.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(path, perms)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        install_root: String,
    }

    #[test]
    fn load_object_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootstrap.json");
        fs::write(&path, r#"{"install_root": "/opt/z80"}"#).unwrap();
        let loaded: Settings = IOUtil::load_object(&path).unwrap();
        assert_eq!(loaded.install_root, "/opt/z80");
    }

    #[test]
    fn delete_directory_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IOUtil::delete_directory(&dir.path().join("absent")).is_ok());
    }

    #[test]
    fn delete_directory_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("sdcc_old").join("src");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("main.c"), b"int main;").unwrap();

        IOUtil::delete_directory(&dir.path().join("sdcc_old")).unwrap();
        assert!(!dir.path().join("sdcc_old").exists());
    }

    #[tokio::test]
    async fn delete_directory_async_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("retro-engine_old").join("tools");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("Makefile"), "all:\n").unwrap();

        IOUtil::delete_directory_async(&dir.path().join("retro-engine_old"))
            .await
            .unwrap();
        assert!(!dir.path().join("retro-engine_old").exists());
    }

    #[test]
    fn rename_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("engine");
        let to = dir.path().join("engine_old");
        fs::create_dir(&from).unwrap();
        fs::create_dir(&to).unwrap();

        assert!(IOUtil::rename_directory(&from, &to).is_err());
        assert!(from.exists());
    }

    #[test]
    fn append_text_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".zshrc");
        IOUtil::append_text(&path, "a\n").unwrap();
        IOUtil::append_text(&path, "b\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = IOUtil::read_or_empty(&dir.path().join("nope")).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn file_contains_text_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".zshrc");
        fs::write(&path, b"# caf\xe9\n# >>> block >>>\n").unwrap();

        assert!(IOUtil::file_contains_text(&path, "# >>> block >>>"));
        assert!(!IOUtil::file_contains_text(&path, "export SDCC_HOME"));
        assert!(!IOUtil::file_contains_text(&dir.path().join("absent"), "#"));
    }
}
