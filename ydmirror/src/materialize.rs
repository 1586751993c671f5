use std::io;
use std::path::Path;

use thiserror::Error;
use ydmirror_core::Resource;

use crate::paths::{PathError, local_path_for};

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("failed to create {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Creates the local mirror of the directory registry under `local_root`,
/// ancestors included. Idempotent: existing directories are fine. Must
/// finish before any download starts, since transfers assume their
/// destination directory exists.
pub async fn materialize(
    local_root: &Path,
    directories: &[Resource],
) -> Result<(), MaterializeError> {
    create_dir(local_root).await?;
    for directory in directories {
        let path = local_path_for(local_root, &directory.path)?;
        log::debug!("creating directory: {}", path.display());
        create_dir(&path).await?;
    }
    Ok(())
}

async fn create_dir(path: &Path) -> Result<(), MaterializeError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| MaterializeError::Create {
            path: path.display().to_string(),
            source,
        })
}
