//! Recursive listing of a mod's staging directory.

use crate::error::ListError;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file or directory found below the listed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub is_directory: bool,
}

/// Lists every descendant of `root`, directories included.
///
/// A missing root is logged and yields an empty listing. Any other failure is
/// returned to the caller.
pub fn walk_directory(root: &Path) -> Result<Vec<ListedEntry>, ListError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let root_missing = err.depth() == 0
                    && err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::NotFound);
                if root_missing {
                    log::warn!("Mod directory {:?} does not exist, no files to report", root);
                    return Ok(Vec::new());
                }
                let path = err.path().unwrap_or(root).to_path_buf();
                return Err(ListError {
                    path,
                    source: io::Error::from(err),
                });
            }
        };

        entries.push(ListedEntry {
            path: entry.path().to_path_buf(),
            is_directory: entry.file_type().is_dir(),
        });
    }

    Ok(entries)
}

/// Async wrapper running [`walk_directory`] on the blocking pool.
pub async fn list_directory(root: &Path) -> Result<Vec<ListedEntry>, ListError> {
    let owned_root = root.to_path_buf();
    tokio::task::spawn_blocking(move || walk_directory(&owned_root))
        .await
        .map_err(|e| ListError {
            path: root.to_path_buf(),
            source: io::Error::other(e.to_string()),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lists_nested_files_and_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("textures/armor")).unwrap();
        fs::write(dir.path().join("plugin.esp"), "x").unwrap();
        fs::write(dir.path().join("textures/armor/iron.dds"), "x").unwrap();

        let mut entries = walk_directory(dir.path()).unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(entries.len(), 4);
        assert_eq!(entries.iter().filter(|e| e.is_directory).count(), 2);
        assert!(entries
            .iter()
            .any(|e| e.path == dir.path().join("textures/armor/iron.dds") && !e.is_directory));
        assert!(entries.iter().all(|e| e.path != dir.path()));
    }

    #[test]
    fn missing_root_yields_empty_listing() {
        let dir = TempDir::new().unwrap();
        let entries = walk_directory(&dir.path().join("not-there")).unwrap();
        assert!(entries.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("inner.txt"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through the mode bits.
        let readable = fs::read_dir(&locked).is_ok();
        let result = walk_directory(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        let err = result.unwrap_err();
        assert_eq!(err.path, locked);
        assert_eq!(err.source.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn async_listing_matches_sync_listing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let entries = list_directory(dir.path()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_directory));
    }
}
