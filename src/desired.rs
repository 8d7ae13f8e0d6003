//! Desired-state builder.
//!
//! Both inputs, discovered containers and manual entries from the routing
//! file, are first turned into [`RouteSource`] values and then expanded by
//! one function.  Sources are applied in order, so anything later in the
//! list overwrites earlier names: containers go first, manual entries last.

use log::warn;

use crate::config::{ManualEntry, RouteConfig};
use crate::types::{Backend, ContainerRecord, RouteMap, RouteName};

/// Which suffixes a source is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffixes<'a> {
    /// `default_domain_suffix`, always appended to the slug.
    Default,
    /// Per-entry override list.  A suffix containing `.` maps the bare slug.
    Override(&'a [String]),
}

/// One producer of routes: a set of slugs pointing at a single backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSource<'a> {
    pub slugs: Vec<&'a str>,
    pub backend: Backend,
    pub suffixes: Suffixes<'a>,
}

impl<'a> RouteSource<'a> {
    /// Source for a discovered container, `None` if it cannot be routed.
    ///
    /// A container carrying slugs but no published port is logged and
    /// skipped.
    pub fn from_container(record: &'a ContainerRecord, host_ip: &str) -> Option<Self> {
        if record.slugs.is_empty() {
            return None;
        }
        let Some(backend) = record.backend(host_ip) else {
            warn!(
                "Container {} has slugs {:?} but no published port, skipping",
                record.name, record.slugs
            );
            return None;
        };
        Some(Self {
            slugs: record.slugs.iter().map(String::as_str).collect(),
            backend,
            suffixes: Suffixes::Default,
        })
    }

    /// Source for a manual entry from the routing file.
    pub fn from_manual(slug: &'a str, entry: &'a ManualEntry) -> Self {
        let suffixes = match entry.override_suffix.as_deref() {
            Some(list) if !list.is_empty() => Suffixes::Override(list),
            _ => Suffixes::Default,
        };
        Self {
            slugs: vec![slug],
            backend: entry.backend(),
            suffixes,
        }
    }

    fn route_names(&self, defaults: &[String]) -> Vec<RouteName> {
        let mut names = Vec::new();
        for slug in &self.slugs {
            match self.suffixes {
                Suffixes::Default => {
                    for suffix in defaults {
                        names.push(format!("{}.{}", slug, suffix));
                    }
                }
                Suffixes::Override(list) => {
                    for suffix in list {
                        if suffix.contains('.') {
                            names.push(slug.to_string());
                        } else {
                            names.push(format!("{}.{}", slug, suffix));
                        }
                    }
                }
            }
        }
        names
    }
}

/// Expand sources into a name -> backend table, later sources winning.
pub fn expand<'a, I>(sources: I, defaults: &[String]) -> RouteMap
where
    I: IntoIterator<Item = RouteSource<'a>>,
{
    let mut desired = RouteMap::new();
    for source in sources {
        for name in source.route_names(defaults) {
            desired.insert(name, source.backend.clone());
        }
    }
    desired
}

/// Build the desired routing table for one cycle.
pub fn build(config: &RouteConfig, containers: &[ContainerRecord], host_ip: &str) -> RouteMap {
    let discovered = containers
        .iter()
        .filter_map(|record| RouteSource::from_container(record, host_ip));
    let manual = config
        .manual
        .iter()
        .map(|(slug, entry)| RouteSource::from_manual(slug, entry));

    expand(discovered.chain(manual), &config.default_domain_suffix)
}
