pub mod collect;
pub mod config;
pub mod crawl;
pub mod materialize;
pub mod paths;
pub mod run;
pub mod scheduler;
pub mod transfer;
