use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use ydmirror_core::YadiskClient;

use crate::collect::collect_files;
use crate::crawl::{ListingErrorPolicy, crawl};
use crate::materialize::materialize;
use crate::scheduler::download_all;
use crate::transfer::TransferClient;

#[derive(Clone, Debug)]
pub struct MirrorOptions {
    pub remote_root: String,
    pub local_root: PathBuf,
    pub max_streams: usize,
    pub on_listing_error: ListingErrorPolicy,
}

#[derive(Debug)]
pub struct MirrorSummary {
    pub directories: usize,
    pub files: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Runs the full mirror pipeline: token check, directory discovery, file
/// collection, local materialization, then the bounded download fan-out.
/// Each phase completes before the next begins; the registries are final by
/// the time they are read.
pub async fn mirror_user(
    client: &YadiskClient,
    transfer: &TransferClient,
    options: &MirrorOptions,
) -> anyhow::Result<MirrorSummary> {
    let started = Instant::now();

    if client
        .check_token()
        .await
        .context("access token check request failed")?
    {
        log::info!("access token check: success");
    } else {
        anyhow::bail!("access token check failed: token rejected");
    }

    let info = client
        .get_disk_info()
        .await
        .context("failed to fetch disk info")?;
    log::info!(
        "used disk space: {:.2} MB",
        info.used_space as f64 / (1024.0 * 1024.0)
    );

    log::info!("listing user directories...");
    let directories = crawl(client, &options.remote_root, options.on_listing_error).await?;
    log::info!("found directories count: {}", directories.len());

    log::info!("listing user files...");
    let files = collect_files(
        client,
        &options.remote_root,
        &directories,
        options.on_listing_error,
    )
    .await?;
    log::info!("found files to download: {}", files.len());

    materialize(&options.local_root, &directories).await?;

    log::info!("downloading user files...");
    let report = download_all(
        client,
        transfer,
        &files,
        &options.local_root,
        options.max_streams,
    )
    .await;

    let elapsed = started.elapsed();
    log::info!(
        "downloaded {} of {} files in {:.2} minutes",
        report.succeeded(),
        report.attempted,
        elapsed.as_secs_f64() / 60.0
    );
    if !report.all_succeeded() {
        log::warn!("{} files failed to download", report.failures.len());
    }

    Ok(MirrorSummary {
        directories: directories.len(),
        files: report.attempted,
        failed: report.failures.len(),
        elapsed,
    })
}
