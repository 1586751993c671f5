use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use ydmirror_core::{Resource, YadiskClient};

use crate::paths::local_path_for;
use crate::transfer::{TransferClient, TransferError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download link request failed: {0}")]
    Link(#[from] ydmirror_core::YadiskError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// One file download bound to its destination, carrying a `[k/total]`
/// sequence label for progress reporting.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub position: usize,
    pub total: usize,
    pub remote_path: String,
    pub dest: PathBuf,
    pub md5: Option<String>,
}

impl TransferTask {
    pub fn label(&self) -> String {
        format!("[{}/{}]", self.position, self.total)
    }
}

#[derive(Debug)]
pub struct TransferFailure {
    pub label: String,
    pub remote_path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub attempted: usize,
    pub failures: Vec<TransferFailure>,
}

impl DownloadReport {
    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failures.len())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatches one download task per file with at most `max_streams`
/// transfers in flight, and waits for every task to reach a terminal state.
/// A failing transfer is recorded and logged with its task identity but
/// never cancels the rest of the batch.
pub async fn download_all(
    client: &YadiskClient,
    transfer: &TransferClient,
    files: &[Resource],
    local_root: &Path,
    max_streams: usize,
) -> DownloadReport {
    let total = files.len();
    let mut failures = Vec::new();
    let mut tasks = Vec::with_capacity(total);
    for (index, file) in files.iter().enumerate() {
        let position = index + 1;
        match local_path_for(local_root, &file.path) {
            Ok(dest) => tasks.push(TransferTask {
                position,
                total,
                remote_path: file.path.clone(),
                dest,
                md5: file.md5.clone(),
            }),
            Err(err) => failures.push(TransferFailure {
                label: format!("[{position}/{total}]"),
                remote_path: file.path.clone(),
                message: err.to_string(),
            }),
        }
    }

    let fetch = {
        let client = client.clone();
        let transfer = transfer.clone();
        move |task: TransferTask| {
            let client = client.clone();
            let transfer = transfer.clone();
            async move {
                let link = client.get_download_link(&task.remote_path).await?;
                transfer
                    .download_to_path_checked(link.href.as_str(), &task.dest, task.md5.as_deref())
                    .await?;
                Ok(())
            }
        }
    };

    failures.extend(run_bounded(tasks, max_streams, fetch).await);
    DownloadReport {
        attempted: total,
        failures,
    }
}

/// Fan-out driver: spawns every task up front, but each one must acquire a
/// permit from the shared semaphore before doing any work. The permit is
/// held for the duration of the transfer and released on every exit path,
/// success or failure, so the in-flight count never exceeds `max_streams`
/// and no slot is ever lost.
async fn run_bounded<F, Fut>(
    tasks: Vec<TransferTask>,
    max_streams: usize,
    fetch: F,
) -> Vec<TransferFailure>
where
    F: Fn(TransferTask) -> Fut,
    Fut: Future<Output = Result<(), DownloadError>> + Send + 'static,
{
    let limit = Arc::new(Semaphore::new(max_streams.max(1)));
    let mut identities = Vec::with_capacity(tasks.len());
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        identities.push((task.label(), task.remote_path.clone()));
        let limit = Arc::clone(&limit);
        let work = fetch(task);
        handles.push(tokio::spawn(async move {
            let _permit = limit
                .acquire_owned()
                .await
                .map_err(|_| "download limiter closed".to_string())?;
            work.await.map_err(|err| err.to_string())
        }));
    }

    let mut failures = Vec::new();
    for ((label, remote_path), outcome) in identities.into_iter().zip(join_all(handles).await) {
        match outcome {
            Ok(Ok(())) => log::info!("downloaded file {label}: {remote_path}"),
            Ok(Err(message)) => {
                log::error!("download failed {label}: {remote_path}: {message}");
                failures.push(TransferFailure {
                    label,
                    remote_path,
                    message,
                });
            }
            Err(join_err) => {
                let message = format!("download task aborted: {join_err}");
                log::error!("download failed {label}: {remote_path}: {message}");
                failures.push(TransferFailure {
                    label,
                    remote_path,
                    message,
                });
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use ydmirror_core::ResourceType;

    fn probe_task(position: usize, total: usize) -> TransferTask {
        TransferTask {
            position,
            total,
            remote_path: format!("disk:/file-{position}.bin"),
            dest: PathBuf::from(format!("/tmp/file-{position}.bin")),
            md5: None,
        }
    }

    fn file_entry(path: &str) -> Resource {
        Resource {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            resource_type: ResourceType::File,
            size: None,
            md5: None,
        }
    }

    #[tokio::test]
    async fn in_flight_count_never_exceeds_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (1..=12).map(|i| probe_task(i, 12)).collect();

        let failures = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let completed = Arc::clone(&completed);
            run_bounded(tasks, 3, move |_task| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                let completed = Arc::clone(&completed);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
        };

        assert!(failures.is_empty());
        assert_eq!(completed.load(Ordering::SeqCst), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn limit_of_one_serializes_transfers() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (1..=5).map(|i| probe_task(i, 5)).collect();

        let failures = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            run_bounded(tasks, 1, move |_task| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
        };

        assert!(failures.is_empty());
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_failing_transfer_does_not_cancel_the_batch() {
        let completed = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (1..=5).map(|i| probe_task(i, 5)).collect();

        let failures = {
            let completed = Arc::clone(&completed);
            run_bounded(tasks, 2, move |task| {
                let completed = Arc::clone(&completed);
                async move {
                    if task.position == 3 {
                        return Err(DownloadError::Transfer(TransferError::Io(
                            io::Error::other("simulated transfer failure"),
                        )));
                    }
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
        };

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].label, "[3/5]");
        assert_eq!(failures[0].remote_path, "disk:/file-3.bin");
        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn download_all_fetches_links_and_writes_files() {
        let server = MockServer::start().await;
        for (name, body) in [("a.txt", "alpha"), ("b.txt", "bravo")] {
            Mock::given(method("GET"))
                .and(path("/v1/disk/resources/download"))
                .and(query_param("path", format!("disk:/{name}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "href": format!("{}/dl/{name}", server.uri()),
                    "method": "GET",
                    "templated": false
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path(format!("/dl/{name}")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body.as_bytes()))
                .mount(&server)
                .await;
        }

        let local = tempdir().unwrap();
        let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
        let files = vec![file_entry("disk:/a.txt"), file_entry("disk:/b.txt")];

        let report = download_all(
            &client,
            &TransferClient::new(),
            &files,
            local.path(),
            4,
        )
        .await;

        assert!(report.all_succeeded());
        assert_eq!(report.succeeded(), 2);
        assert_eq!(std::fs::read(local.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(local.path().join("b.txt")).unwrap(), b"bravo");
    }

    #[tokio::test]
    async fn unmappable_path_is_reported_without_a_request() {
        let server = MockServer::start().await;
        let local = tempdir().unwrap();
        let client = YadiskClient::with_base_url(&server.uri(), "test-token").unwrap();
        let files = vec![file_entry("disk:/../escape.txt")];

        let report = download_all(
            &client,
            &TransferClient::new(),
            &files,
            local.path(),
            4,
        )
        .await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label, "[1/1]");
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }
}
