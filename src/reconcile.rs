//! Diff and apply.
//!
//! One cycle loads the routing file, lists containers, builds the desired
//! table, fetches the router's table and pushes the difference.  Nothing
//! carries over between cycles except a copy of the last parsed routing
//! file, kept for diagnostics.
//!
//! Cycles are idempotent: repeating one against the state it produced
//! issues no calls, so cycles started by overlapping triggers converge on
//! the same router state without a lock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::RwLock;

use crate::config::{ConfigError, RouteConfig};
use crate::desired;
use crate::router::{RouterApi, RouterError};
use crate::runtime::ContainerRuntime;
use crate::types::{RouteChange, RouteMap};

/// Why a cycle ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    ConfigChanged,
    Timer,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::ConfigChanged => write!(f, "config change"),
            Trigger::Timer => write!(f, "timer"),
        }
    }
}

/// Result of pushing a plan to the router.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub upserted: usize,
    pub deleted: usize,
    pub failed: Vec<(RouteChange, RouterError)>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub enum SkipReason {
    Config(ConfigError),
    Fetch(RouterError),
    InProgress,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Applied(ApplyReport),
    NoChanges,
    Skipped(SkipReason),
}

/// Changes that turn `observed` into `desired`.
///
/// Upserts for new or changed names come first, then deletes for names
/// the router has but `desired` does not.  Each group is in name order.
pub fn plan(desired: &RouteMap, observed: &RouteMap) -> Vec<RouteChange> {
    let upserts = desired
        .iter()
        .filter(|(name, backend)| observed.get(*name) != Some(*backend))
        .map(|(name, backend)| RouteChange::Upsert {
            name: name.clone(),
            backend: backend.clone(),
        });
    let deletes = observed
        .keys()
        .filter(|name| !desired.contains_key(*name))
        .map(|name| RouteChange::Delete { name: name.clone() });

    upserts.chain(deletes).collect()
}

/// Push every change, continuing past failures.
pub async fn apply(router: &dyn RouterApi, changes: Vec<RouteChange>) -> ApplyReport {
    let mut report = ApplyReport::default();
    for change in changes {
        let result = match &change {
            RouteChange::Upsert { name, backend } => {
                info!("Setting route {} -> {}", name, backend);
                router.upsert_route(name, backend).await
            }
            RouteChange::Delete { name } => {
                info!("Deleting route {}", name);
                router.delete_route(name).await
            }
        };
        match result {
            Ok(()) => match change {
                RouteChange::Upsert { .. } => report.upserted += 1,
                RouteChange::Delete { .. } => report.deleted += 1,
            },
            Err(e) => {
                error!("Failed to update route {}: {}", change.name(), e);
                report.failed.push((change, e));
            }
        }
    }
    report
}

/// Runs reconciliation cycles against long-lived runtime and router clients.
pub struct Reconciler {
    runtime: Arc<dyn ContainerRuntime>,
    router: Arc<dyn RouterApi>,
    config_path: PathBuf,
    host_ip: String,
    skip_overlapping: bool,
    running: AtomicBool,
    last_config: RwLock<Option<Arc<RouteConfig>>>,
}

impl Reconciler {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        router: Arc<dyn RouterApi>,
        config_path: PathBuf,
        host_ip: String,
    ) -> Self {
        Self {
            runtime,
            router,
            config_path,
            host_ip,
            skip_overlapping: false,
            running: AtomicBool::new(false),
            last_config: RwLock::new(None),
        }
    }

    /// Skip triggers that arrive while a cycle is still running.
    pub fn skip_overlapping(mut self, skip: bool) -> Self {
        self.skip_overlapping = skip;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Last routing file that parsed successfully.  Diagnostics only.
    pub async fn last_config(&self) -> Option<Arc<RouteConfig>> {
        self.last_config.read().await.clone()
    }

    /// Run one cycle and log its outcome.
    pub async fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        debug!("Reconciliation triggered by {}", trigger);
        let outcome = if self.skip_overlapping {
            if self.running.swap(true, Ordering::AcqRel) {
                CycleOutcome::Skipped(SkipReason::InProgress)
            } else {
                let outcome = self.reconcile().await;
                self.running.store(false, Ordering::Release);
                outcome
            }
        } else {
            self.reconcile().await
        };

        match &outcome {
            CycleOutcome::Applied(report) if report.is_clean() => info!(
                "Cycle ({}): applied {} upserts, {} deletes",
                trigger, report.upserted, report.deleted
            ),
            CycleOutcome::Applied(report) => warn!(
                "Cycle ({}): applied {} upserts, {} deletes, {} failed",
                trigger,
                report.upserted,
                report.deleted,
                report.failed.len()
            ),
            CycleOutcome::NoChanges => debug!("Cycle ({}): no changes needed", trigger),
            CycleOutcome::Skipped(SkipReason::Config(e)) => {
                warn!("Cycle ({}) skipped, configuration unusable: {}", trigger, e)
            }
            CycleOutcome::Skipped(SkipReason::Fetch(e)) => {
                warn!("Cycle ({}) skipped, cannot read router state: {}", trigger, e)
            }
            CycleOutcome::Skipped(SkipReason::InProgress) => {
                debug!("Cycle ({}) skipped, another cycle is running", trigger)
            }
        }
        outcome
    }

    async fn reconcile(&self) -> CycleOutcome {
        let config = match RouteConfig::load(&self.config_path) {
            Ok(config) => Arc::new(config),
            Err(e) => return CycleOutcome::Skipped(SkipReason::Config(e)),
        };
        self.remember_config(&config).await;

        let containers = match self.runtime.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                error!("Container discovery failed, using manual routes only: {}", e);
                Vec::new()
            }
        };

        let desired = desired::build(&config, &containers, &self.host_ip);

        let observed = match self.router.list_routes().await {
            Ok(observed) => observed,
            Err(e) => return CycleOutcome::Skipped(SkipReason::Fetch(e)),
        };

        let changes = plan(&desired, &observed);
        if changes.is_empty() {
            return CycleOutcome::NoChanges;
        }
        CycleOutcome::Applied(apply(self.router.as_ref(), changes).await)
    }

    async fn remember_config(&self, config: &Arc<RouteConfig>) {
        let mut last = self.last_config.write().await;
        if last.as_deref() != Some(config.as_ref()) {
            info!(
                "Loaded {}: {} default suffixes, {} manual entries",
                self.config_path.display(),
                config.default_domain_suffix.len(),
                config.manual.len()
            );
            *last = Some(Arc::clone(config));
        }
    }
}
