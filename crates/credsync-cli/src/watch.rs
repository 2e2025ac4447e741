//! Polling watch source for a directory of spec documents

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use credsync_core::logging::SharedLogger;
use credsync_core::{log_debug, log_error, log_info, log_warn, EventRouter, WatchEvent};

use crate::specs::{load_dir, Snapshot};

/// Events turning `old` into `new`
///
/// Objects present in both are reported as modified even when unchanged,
/// so every poll doubles as a full resync.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<WatchEvent> {
    let mut events = Vec::new();
    for (key, object) in new {
        match old.get(key) {
            Some(previous) => events.push(WatchEvent::Modified {
                old: previous.clone(),
                new: object.clone(),
            }),
            None => events.push(WatchEvent::Added(object.clone())),
        }
    }
    for (key, object) in old {
        if !new.contains_key(key) {
            events.push(WatchEvent::Deleted(object.clone()));
        }
    }
    events
}

/// Re-reads a spec directory on a fixed interval and emits the differences
pub struct DirectoryWatcher {
    dir: PathBuf,
    namespace: String,
    interval: Duration,
    logger: SharedLogger,
    snapshot: Snapshot,
    origins: BTreeMap<String, PathBuf>,
}

impl DirectoryWatcher {
    pub fn new(dir: impl Into<PathBuf>, namespace: impl Into<String>, interval: Duration, logger: SharedLogger) -> Self {
        Self {
            dir: dir.into(),
            namespace: namespace.into(),
            interval,
            logger,
            snapshot: Snapshot::new(),
            origins: BTreeMap::new(),
        }
    }

    /// Read the directory once and return the events since the last poll
    ///
    /// Objects from a file that fails to load keep their last good
    /// definition and are never reported as deleted.
    pub fn poll(&mut self) -> Vec<WatchEvent> {
        match load_dir(&self.dir, &self.namespace, &self.logger) {
            Ok(mut next) => {
                let kept = next.retain_failed_from(&self.snapshot, &self.origins);
                if kept > 0 {
                    log_warn!(self.logger, "keeping last good definition of {} objects", kept);
                }
                let events = diff(&self.snapshot, &next.objects);
                self.snapshot = next.objects;
                self.origins = next.origins;
                events
            }
            Err(e) => {
                log_error!(self.logger, "unable to read {}: {}", self.dir.display(), e);
                Vec::new()
            }
        }
    }

    /// Poll until `shutdown` resolves, forwarding every event to `router`
    ///
    /// Returns early if the dispatchers have gone away.
    pub async fn run(mut self, router: EventRouter, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        log_info!(self.logger, "watching {} every {:?}", self.dir.display(), self.interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log_info!(self.logger, "shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let events = self.poll();
                    log_debug!(self.logger, "poll produced {} events", events.len());
                    for event in events {
                        if router.send(event).await.is_err() {
                            log_error!(self.logger, "dispatchers stopped, ending watch");
                            return;
                        }
                    }
                }
            }
        }
    }
}
