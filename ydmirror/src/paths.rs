use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Listings return paths in the `disk:/...` form marking resources that
/// live on the Disk itself.
const STORAGE_PREFIX: &str = "disk:";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("remote path is empty")]
    Empty,
    #[error("remote path contains unsupported component: {0}")]
    UnsupportedComponent(String),
}

pub fn strip_storage_prefix(remote_path: &str) -> &str {
    remote_path
        .strip_prefix(STORAGE_PREFIX)
        .unwrap_or(remote_path)
}

/// Maps a remote path under the local mirror root. Remote paths are
/// POSIX-like ("disk:/Docs/A.txt"); the storage prefix is dropped and the
/// remaining components land below `local_root`.
pub fn local_path_for(local_root: &Path, remote_path: &str) -> Result<PathBuf, PathError> {
    let relative = strip_storage_prefix(remote_path);
    if relative.is_empty() {
        return Err(PathError::Empty);
    }

    let mut out = local_root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => continue,
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(remote_path.to_string()));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_storage_prefix() {
        assert_eq!(strip_storage_prefix("disk:/Docs/A.txt"), "/Docs/A.txt");
        assert_eq!(strip_storage_prefix("/Docs/A.txt"), "/Docs/A.txt");
    }

    #[test]
    fn maps_remote_path_under_local_root() {
        let root = PathBuf::from("/mirror/user@example.com");
        let mapped = local_path_for(&root, "disk:/Docs/A.txt").unwrap();
        assert_eq!(mapped, PathBuf::from("/mirror/user@example.com/Docs/A.txt"));
    }

    #[test]
    fn maps_unprefixed_path() {
        let root = PathBuf::from("/mirror");
        let mapped = local_path_for(&root, "/Docs").unwrap();
        assert_eq!(mapped, PathBuf::from("/mirror/Docs"));
    }

    #[test]
    fn rejects_parent_dir() {
        let root = PathBuf::from("/mirror");
        assert!(matches!(
            local_path_for(&root, "disk:/../secret"),
            Err(PathError::UnsupportedComponent(_))
        ));
    }

    #[test]
    fn rejects_empty_path() {
        let root = PathBuf::from("/mirror");
        assert!(matches!(
            local_path_for(&root, "disk:"),
            Err(PathError::Empty)
        ));
    }
}
