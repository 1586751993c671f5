use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use md5::Context;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("download integrity check failed: expected {expected_md5}, got {actual_md5}")]
    IntegrityMismatch {
        expected_md5: String,
        actual_md5: String,
    },
}

/// Streams file contents from a download href to local disk. Concurrency is
/// the scheduler's concern; this client runs one transfer per call. The
/// destination directory must already exist (materialization runs first).
#[derive(Clone, Default)]
pub struct TransferClient {
    http: Client,
}

impl TransferClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn download_to_path(&self, href: &str, target: &Path) -> Result<(), TransferError> {
        self.download_to_path_checked(href, target, None).await
    }

    /// Downloads into `<target>.partial` and renames into place, so a failed
    /// transfer never leaves a truncated file at the final path. When
    /// `expected_md5` is given the body hash is verified before the rename.
    pub async fn download_to_path_checked(
        &self,
        href: &str,
        target: &Path,
        expected_md5: Option<&str>,
    ) -> Result<(), TransferError> {
        let url = Url::parse(href)?;
        let response = self.http.get(url).send().await?.error_for_status()?;

        let partial = partial_path(target);
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut md5 = expected_md5.map(|_| Context::new());

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            if let Some(ctx) = md5.as_mut() {
                ctx.consume(&chunk);
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let (Some(expected_md5), Some(ctx)) = (expected_md5, md5) {
            let actual_md5 = format!("{:x}", ctx.compute());
            if actual_md5 != expected_md5.to_ascii_lowercase() {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(TransferError::IntegrityMismatch {
                    expected_md5: expected_md5.to_ascii_lowercase(),
                    actual_md5,
                });
            }
        }

        tokio::fs::rename(partial, target).await?;
        Ok(())
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
