//! Data structures shared by the reconciliation loop.
//!
//! Route names and backends are plain strings.  The router owns their
//! validation; this daemon only moves them around and compares them.

use std::collections::BTreeMap;

/// Fully-qualified name the router matches incoming requests against.
pub type RouteName = String;

/// `host:port` destination a route resolves to.
pub type Backend = String;

/// Name -> backend table.  Ordered so that plans and logs are stable.
pub type RouteMap = BTreeMap<RouteName, Backend>;

/// One running container as seen by the discovery collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Container name (or id), used for log messages only.
    pub name: String,
    /// Slugs parsed from the routing label.
    pub slugs: Vec<String>,
    /// Published (host side) ports in the order the runtime reports them.
    pub published_ports: Vec<u16>,
}

impl ContainerRecord {
    /// Backend for this container on `host_ip`, from its first published port.
    pub fn backend(&self, host_ip: &str) -> Option<Backend> {
        self.published_ports
            .first()
            .map(|port| format!("{}:{}", host_ip, port))
    }
}

/// Split a label value into slugs: comma separated, trimmed, empties dropped.
pub fn parse_slugs(label: &str) -> Vec<String> {
    label
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A single change to push to the router.
///
/// Mirrors the add/remove messages of the router API: an upsert either
/// creates the route or replaces its backend, a delete drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteChange {
    Upsert { name: RouteName, backend: Backend },
    Delete { name: RouteName },
}

impl RouteChange {
    pub fn name(&self) -> &str {
        match self {
            RouteChange::Upsert { name, .. } | RouteChange::Delete { name } => name,
        }
    }
}
