mod client;
mod service_app;

pub use client::{
    DiskInfo, Resource, ResourceList, ResourceType, TransferLink, YadiskClient, YadiskError,
};
pub use service_app::{ServiceAppClient, ServiceAppError, ServiceAppToken};
