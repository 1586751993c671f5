use ydmirror_core::{Resource, ResourceType, YadiskClient};

use crate::crawl::{CrawlError, LISTING_PAGE_SIZE, ListingErrorPolicy};

/// Enumerates every file that is an immediate child of `root` or of a
/// directory in `directories`, as one flat list. Each file path shows up in
/// exactly one parent listing, so no dedup is needed. Must run after the
/// crawl so the directory registry is final; call volume is one listing per
/// known directory.
pub async fn collect_files(
    client: &YadiskClient,
    root: &str,
    directories: &[Resource],
    policy: ListingErrorPolicy,
) -> Result<Vec<Resource>, CrawlError> {
    let mut files = Vec::new();
    list_files_into(client, root, policy, &mut files).await?;
    for directory in directories {
        list_files_into(client, &directory.path, policy, &mut files).await?;
    }
    Ok(files)
}

async fn list_files_into(
    client: &YadiskClient,
    path: &str,
    policy: ListingErrorPolicy,
    files: &mut Vec<Resource>,
) -> Result<(), CrawlError> {
    let items = match client.list_directory_all(path, LISTING_PAGE_SIZE).await {
        Ok(items) => items,
        Err(source) => match policy {
            ListingErrorPolicy::Abort => {
                return Err(CrawlError::Listing {
                    path: path.to_string(),
                    source,
                });
            }
            ListingErrorPolicy::SkipSubtree => {
                log::warn!("skipping files under {path}: listing failed: {source}");
                return Ok(());
            }
        },
    };
    files.extend(
        items
            .into_iter()
            .filter(|item| item.resource_type == ResourceType::File),
    );
    Ok(())
}
