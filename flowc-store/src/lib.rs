pub mod memory;
pub mod repository;
pub mod snapshot;

#[cfg(feature = "etcd")]
pub mod etcd;

pub use memory::InMemoryRepository;
pub use repository::{
    DeploymentPatch, EnvironmentPatch, GatewayPatch, ListenerPatch, Repository,
};
pub use snapshot::SnapshotCache;
