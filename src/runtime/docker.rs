use super::{ContainerRuntime, DiscoveryError};
use crate::types::{parse_slugs, ContainerRecord};
use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::ContainerSummary;
use bollard::{Docker, API_DEFAULT_VERSION};
use log::{debug, info};
use std::collections::HashMap;

/// Seconds before a Docker API request is abandoned.
const DOCKER_TIMEOUT_SECS: u64 = 120;

pub struct DockerRuntime {
    docker: Docker,
    slug_label: String,
}

impl DockerRuntime {
    /// Build a client for `docker_host`, or the local defaults when unset.
    ///
    /// No request is made here; an unreachable daemon shows up on the first
    /// listing.
    pub fn new(docker_host: Option<&str>, slug_label: String) -> Result<Self, DiscoveryError> {
        let docker = Self::connect(docker_host).map_err(DiscoveryError::Connect)?;
        Ok(Self { docker, slug_label })
    }

    fn connect(docker_host: Option<&str>) -> Result<Docker, bollard::errors::Error> {
        match docker_host {
            None => Docker::connect_with_local_defaults(),
            Some(host) if host.starts_with("http://") || host.starts_with("tcp://") => {
                info!("Connecting to Docker over HTTP at {}", host);
                Docker::connect_with_http(host, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            Some(host) => {
                let path = host.trim_start_matches("unix://");
                info!("Connecting to Docker socket at {}", path);
                Docker::connect_with_socket(path, DOCKER_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DiscoveryError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![self.slug_label.clone()]);
        let opts = ListContainersOptions::<String> {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(opts))
            .await
            .map_err(DiscoveryError::List)?;
        debug!("Docker reported {} labelled containers", containers.len());

        Ok(containers
            .iter()
            .map(|c| record_from_summary(c, &self.slug_label))
            .collect())
    }
}

/// Extract the routing view of a container listing entry.
fn record_from_summary(summary: &ContainerSummary, slug_label: &str) -> ContainerRecord {
    let name = summary
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .or_else(|| summary.id.clone())
        .unwrap_or_default();

    let slugs = summary
        .labels
        .as_ref()
        .and_then(|labels| labels.get(slug_label))
        .map(|value| parse_slugs(value))
        .unwrap_or_default();

    let published_ports = summary
        .ports
        .as_ref()
        .map(|ports| ports.iter().filter_map(|p| p.public_port).collect())
        .unwrap_or_default();

    ContainerRecord {
        name,
        slugs,
        published_ports,
    }
}
