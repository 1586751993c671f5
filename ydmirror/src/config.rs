use std::path::PathBuf;

use anyhow::Context;

use crate::crawl::ListingErrorPolicy;

const DEFAULT_REMOTE_ROOT: &str = "/";
const DEFAULT_LOCAL_ROOT: &str = ".";
const DEFAULT_MAX_STREAMS: usize = 10;

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub client_id: String,
    pub client_secret: String,
    pub remote_root: String,
    pub local_root: PathBuf,
    pub max_streams: usize,
    pub on_listing_error: ListingErrorPolicy,
}

impl MirrorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = std::env::var("CLIENT_ID").context("CLIENT_ID is not set")?;
        let client_secret = std::env::var("CLIENT_SECRET").context("CLIENT_SECRET is not set")?;
        let remote_root = std::env::var("YDMIRROR_REMOTE_ROOT")
            .unwrap_or_else(|_| DEFAULT_REMOTE_ROOT.to_string());
        let local_root = PathBuf::from(
            std::env::var("YDMIRROR_LOCAL_ROOT").unwrap_or_else(|_| DEFAULT_LOCAL_ROOT.to_string()),
        );
        let max_streams = read_usize_env("YDMIRROR_MAX_STREAMS", DEFAULT_MAX_STREAMS);
        let on_listing_error = match std::env::var("YDMIRROR_ON_LISTING_ERROR") {
            Ok(value) => parse_listing_policy(&value)
                .with_context(|| format!("invalid YDMIRROR_ON_LISTING_ERROR: {value}"))?,
            Err(_) => ListingErrorPolicy::Abort,
        };

        Ok(Self {
            client_id,
            client_secret,
            remote_root,
            local_root,
            max_streams,
            on_listing_error,
        })
    }
}

fn parse_listing_policy(value: &str) -> Option<ListingErrorPolicy> {
    match value.to_ascii_lowercase().as_str() {
        "abort" => Some(ListingErrorPolicy::Abort),
        "skip" => Some(ListingErrorPolicy::SkipSubtree),
        _ => None,
    }
}

fn read_usize_env(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
