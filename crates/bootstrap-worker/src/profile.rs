// Shell profile handle used for environment configuration injection.

use bootstrap_sdk::IOUtil;
use std::path::{Path, PathBuf};

use crate::errors::ProvisionError;

/// A persistent profile file that receives an append-once block.
///
/// Passed to the injection step explicitly; nothing else touches the profile.
#[derive(Debug, Clone)]
pub struct ProfileResource {
    path: PathBuf,
}

impl ProfileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `marker` already appears anywhere in the profile. A missing or
    /// unreadable profile has no marker; non-UTF-8 content is tolerated.
    pub fn contains_marker(&self, marker: &str) -> bool {
        IOUtil::file_contains_text(&self.path, marker)
    }

    /// Append `marker` followed by `lines`, unless the marker is already there.
    ///
    /// Returns whether anything was written. Existing content is never edited.
    pub fn inject(&self, marker: &str, lines: &[String]) -> Result<bool, ProvisionError> {
        if self.contains_marker(marker) {
            return Ok(false);
        }

        let existing = IOUtil::read_or_empty(&self.path).unwrap_or_default();
        let mut block = String::new();
        if existing.last().is_some_and(|b| *b != b'\n') {
            block.push('\n');
        }
        block.push('\n');
        block.push_str(marker);
        block.push('\n');
        for line in lines {
            block.push_str(line);
            block.push('\n');
        }

        IOUtil::append_text(&self.path, &block).map_err(|e| ProvisionError::io(&self.path, e))?;
        Ok(true)
    }
}
