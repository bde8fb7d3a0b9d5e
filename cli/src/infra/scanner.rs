//! Filesystem infrastructure: implements `StackScanner`.

use std::path::Path;

use crate::application::ports::StackScanner;
use crate::domain::error::ScanError;
use crate::domain::stack::{IGNORE_MARKER, MANIFEST_FILENAMES, Stack, StackName, is_hidden};

/// Lists stacks by reading the inventory root directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStackScanner;

impl StackScanner for FsStackScanner {
    fn scan(&self, root: &Path) -> Result<Vec<Stack>, ScanError> {
        let entries = std::fs::read_dir(root).map_err(|source| {
            if root.exists() && !root.is_dir() {
                ScanError::NotADirectory(root.to_path_buf())
            } else {
                ScanError::RootUnreadable {
                    path: root.to_path_buf(),
                    source,
                }
            }
        })?;

        let mut stacks = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(root = %root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(dir_name) = entry.file_name().to_str().map(String::from) else {
                tracing::debug!(path = %path.display(), "skipping non UTF-8 directory name");
                continue;
            };
            if is_hidden(&dir_name) {
                continue;
            }
            let name = match StackName::new(dir_name) {
                Ok(name) => name,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping directory");
                    continue;
                }
            };

            let stack = Stack {
                manifest: self.manifest_in(&path),
                ignored: path.join(IGNORE_MARKER).exists(),
                name,
                path,
            };
            if stack.ignored {
                tracing::debug!(stack = %stack.name, "stack has ignore marker, excluding");
            } else if stack.manifest.is_none() {
                tracing::debug!(stack = %stack.name, "no compose manifest found, excluding");
            }
            stacks.push(stack);
        }

        stacks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stacks)
    }

    fn manifest_in(&self, dir: &Path) -> Option<&'static str> {
        MANIFEST_FILENAMES
            .iter()
            .copied()
            .find(|file| dir.join(file).is_file())
    }
}
