use std::collections::VecDeque;

use thiserror::Error;
use ydmirror_core::{Resource, ResourceType, YadiskClient, YadiskError};

pub(crate) const LISTING_PAGE_SIZE: u32 = 100;

/// What to do when a directory listing fails mid-crawl. `Abort` stops the
/// whole run; `SkipSubtree` logs the failed path and leaves that branch
/// unexplored while the rest of the crawl continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingErrorPolicy {
    Abort,
    SkipSubtree,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("listing {path} failed: {source}")]
    Listing {
        path: String,
        #[source]
        source: YadiskError,
    },
}

/// Walks the remote namespace from `root` and returns every directory
/// reachable from it, in discovery order.
///
/// Driven by an explicit work queue rather than recursion: each dequeued
/// path is listed once, its directory children are appended to the registry
/// and enqueued for their own listing. A directory is only ever discovered
/// by its single parent listing, so no path is visited twice.
pub async fn crawl(
    client: &YadiskClient,
    root: &str,
    policy: ListingErrorPolicy,
) -> Result<Vec<Resource>, CrawlError> {
    let mut registry = Vec::new();
    let mut pending = VecDeque::from([root.to_string()]);

    while let Some(path) = pending.pop_front() {
        let items = match client.list_directory_all(&path, LISTING_PAGE_SIZE).await {
            Ok(items) => items,
            Err(source) => match policy {
                ListingErrorPolicy::Abort => {
                    return Err(CrawlError::Listing { path, source });
                }
                ListingErrorPolicy::SkipSubtree => {
                    log::warn!("skipping subtree {path}: listing failed: {source}");
                    continue;
                }
            },
        };
        for item in items {
            if item.resource_type == ResourceType::Dir {
                pending.push_back(item.path.clone());
                registry.push(item);
            }
        }
    }

    Ok(registry)
}
