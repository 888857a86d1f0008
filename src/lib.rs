pub mod builder;
pub mod cache;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod search;
pub mod snapshot;
pub mod tracing;
pub mod version;
pub mod worker;

pub use descriptor::PackageDescriptor;
pub use snapshot::{Snapshot, SnapshotMeta};
pub use worker::{WorkerRequest, WorkerResponse, spawn_worker};
