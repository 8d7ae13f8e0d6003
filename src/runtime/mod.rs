use crate::types::ContainerRecord;
use async_trait::async_trait;
use thiserror::Error;

pub mod docker;
pub use docker::DockerRuntime;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to connect to container runtime: {0}")]
    Connect(#[source] bollard::errors::Error),
    #[error("failed to list containers: {0}")]
    List(#[source] bollard::errors::Error),
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List running containers that carry the routing label.
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DiscoveryError>;
}
