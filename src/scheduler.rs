//! Trigger scheduler.
//!
//! Cycles start at startup, on every change to the routing file, and on a
//! fixed timer that catches container changes the file never sees.  Each
//! trigger spawns its own cycle task; cycles may overlap unless the
//! reconciler was built with `skip_overlapping`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::reconcile::{Reconciler, Trigger};

pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    period: Duration,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, period: Duration) -> Self {
        Self { reconciler, period }
    }

    /// Run forever, spawning one cycle per trigger.
    pub async fn run(self) -> anyhow::Result<()> {
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();

        // Dropping the watcher stops it, so it lives as long as this loop.
        let _watcher = match watch_config(self.reconciler.config_path(), trigger_tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(
                    "Cannot watch {}: {}. Relying on the {:?} timer only.",
                    self.reconciler.config_path().display(),
                    e,
                    self.period
                );
                None
            }
        };

        trigger_tx.send(Trigger::Startup)?;

        let timer_tx = trigger_tx.clone();
        let period = self.period;
        let timer = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and startup already ran.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if timer_tx.send(Trigger::Timer).is_err() {
                    break;
                }
            }
        });
        drop(trigger_tx);

        info!("Scheduler running, rescanning every {:?}", self.period);
        while let Some(trigger) = trigger_rx.recv().await {
            let reconciler = Arc::clone(&self.reconciler);
            tokio::spawn(async move {
                reconciler.run_cycle(trigger).await;
            });
        }

        timer.abort();
        Err(anyhow::anyhow!("Trigger channel closed"))
    }
}

/// Watch the directory holding `path` and send a trigger whenever an event
/// touches the file.  Editors often replace files instead of writing them in
/// place, which a watch on the file itself would miss.
fn watch_config(
    path: &Path,
    trigger_tx: mpsc::UnboundedSender<Trigger>,
) -> notify::Result<RecommendedWatcher> {
    let file_name = path.file_name().map(|n| n.to_os_string());
    let dir: PathBuf = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if touches_config {
                    debug!("Config file event: {:?}", event.kind);
                    let _ = trigger_tx.send(Trigger::ConfigChanged);
                }
            }
            Err(e) => error!("Config watch error: {}", e),
        },
        notify::Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("Watching {} for changes", path.display());
    Ok(watcher)
}
