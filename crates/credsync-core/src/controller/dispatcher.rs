//! Event dispatch: ordered per object, concurrent across objects

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::handler::{EventHandler, WatchEvent};
use super::reconciler::Reconciler;
use crate::logging::SharedLogger;
use crate::resolver::CredentialResolver;
use crate::secrets::SecretStore;
use crate::types::SpecKind;
use crate::{log_debug, log_error, log_info, log_warn};

/// A worker reporting how many events it has handled after a delete
type Idle = (String, u64);

struct Worker {
    queue: mpsc::UnboundedSender<WatchEvent>,
    handle: JoinHandle<()>,
    sent: u64,
}

enum Next {
    Event(Option<WatchEvent>),
    Idle(Idle),
}

/// Dispatches the events of one spec kind
///
/// Every object key gets its own worker task, so events for the same
/// object are handled one at a time in arrival order while different
/// objects proceed concurrently.
///
/// After handling a delete a worker reports its handled count. If nothing
/// was queued for the key since, the worker is dropped; otherwise it keeps
/// running, so a re-added object can never overtake a pending delete.
pub struct Dispatcher {
    kind: SpecKind,
    handler: Arc<dyn EventHandler>,
    logger: SharedLogger,
    workers: HashMap<String, Worker>,
    idle_tx: mpsc::UnboundedSender<Idle>,
    idle_rx: mpsc::UnboundedReceiver<Idle>,
}

impl Dispatcher {
    pub fn new(kind: SpecKind, handler: Arc<dyn EventHandler>, logger: SharedLogger) -> Self {
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        Self {
            kind,
            handler,
            logger,
            workers: HashMap::new(),
            idle_tx,
            idle_rx,
        }
    }

    pub fn kind(&self) -> SpecKind {
        self.kind
    }

    /// Number of live per-object workers
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Consume `events` until the sender side closes, then wait for every
    /// queued event to be handled
    pub async fn run(mut self, mut events: mpsc::Receiver<WatchEvent>) {
        log_info!(self.logger, "{} dispatcher started", self.kind);
        loop {
            let next = tokio::select! {
                event = events.recv() => Next::Event(event),
                Some(idle) = self.idle_rx.recv() => Next::Idle(idle),
            };
            match next {
                Next::Event(Some(event)) => self.dispatch(event),
                Next::Event(None) => break,
                Next::Idle((key, handled)) => self.reap(&key, handled),
            }
        }

        let workers: Vec<_> = self.workers.drain().collect();
        for (key, worker) in workers {
            drop(worker.queue);
            if let Err(e) = worker.handle.await {
                log_error!(self.logger, "worker for {} {} failed: {}", self.kind, key, e);
            }
        }
        log_info!(self.logger, "{} dispatcher stopped", self.kind);
    }

    fn dispatch(&mut self, event: WatchEvent) {
        if event.kind() != self.kind {
            log_warn!(
                self.logger,
                "{} dispatcher ignoring {} event for {} {}",
                self.kind,
                event.action(),
                event.kind(),
                event.key()
            );
            return;
        }

        let key = event.key();
        log_debug!(self.logger, "{} {} {}", self.kind, key, event.action());

        let handler = &self.handler;
        let idle_tx = &self.idle_tx;
        let worker = self
            .workers
            .entry(key.clone())
            .or_insert_with(|| spawn_worker(key.clone(), Arc::clone(handler), idle_tx.clone()));
        match worker.queue.send(event) {
            Ok(()) => worker.sent += 1,
            Err(mpsc::error::SendError(event)) => {
                // The worker task is gone (it panicked); start a fresh one.
                log_warn!(self.logger, "restarting worker for {} {}", self.kind, key);
                let mut fresh = spawn_worker(key.clone(), Arc::clone(&self.handler), self.idle_tx.clone());
                match fresh.queue.send(event) {
                    Ok(()) => fresh.sent += 1,
                    Err(e) => log_error!(
                        self.logger,
                        "dropping {} event for {} {}: {}",
                        e.0.action(),
                        self.kind,
                        key,
                        e
                    ),
                }
                self.workers.insert(key, fresh);
            }
        }
    }

    /// Drop the worker for `key` if it has handled everything sent to it
    fn reap(&mut self, key: &str, handled: u64) {
        let drained = self.workers.get(key).map_or(false, |w| w.sent == handled);
        if drained {
            self.workers.remove(key);
            log_debug!(self.logger, "{} {} deleted, worker released", self.kind, key);
        }
    }
}

fn spawn_worker(key: String, handler: Arc<dyn EventHandler>, idle: mpsc::UnboundedSender<Idle>) -> Worker {
    let (queue, mut rx) = mpsc::unbounded_channel::<WatchEvent>();
    let handle = tokio::spawn(async move {
        let mut handled = 0;
        while let Some(event) = rx.recv().await {
            let deleted = matches!(event, WatchEvent::Deleted(_));
            event.dispatch(handler.as_ref()).await;
            handled += 1;
            if deleted {
                // Fails only once the dispatcher is shutting down.
                idle.send((key.clone(), handled)).ok();
            }
        }
    });
    Worker {
        queue,
        handle,
        sent: 0,
    }
}

/// Splits a mixed event source into one channel per spec kind
#[derive(Clone)]
pub struct EventRouter {
    projects: mpsc::Sender<WatchEvent>,
    resources: mpsc::Sender<WatchEvent>,
}

impl EventRouter {
    pub fn new(projects: mpsc::Sender<WatchEvent>, resources: mpsc::Sender<WatchEvent>) -> Self {
        Self {
            projects,
            resources,
        }
    }

    /// A router plus the receiving ends for the project and resource
    /// dispatchers
    pub fn channel(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<WatchEvent>, mpsc::Receiver<WatchEvent>) {
        let (projects, project_rx) = mpsc::channel(capacity);
        let (resources, resource_rx) = mpsc::channel(capacity);
        (Self::new(projects, resources), project_rx, resource_rx)
    }

    /// Forward `event` to the channel for its kind
    pub async fn send(&self, event: WatchEvent) -> Result<(), mpsc::error::SendError<WatchEvent>> {
        match event.kind() {
            SpecKind::Project => self.projects.send(event).await,
            SpecKind::Resource => self.resources.send(event).await,
        }
    }
}

/// Two dispatchers, one per spec kind, sharing one resolver and store
pub struct Controller {
    reconciler: Arc<Reconciler>,
    logger: SharedLogger,
}

impl Controller {
    pub fn new(resolver: Arc<CredentialResolver>, store: Arc<dyn SecretStore>, logger: SharedLogger) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(resolver, store, Arc::clone(&logger))),
            logger,
        }
    }

    /// Run both dispatchers until both event channels close
    pub async fn run(&self, projects: mpsc::Receiver<WatchEvent>, resources: mpsc::Receiver<WatchEvent>) {
        let handler: Arc<dyn EventHandler> = self.reconciler.clone();
        let project_dispatcher = Dispatcher::new(SpecKind::Project, Arc::clone(&handler), Arc::clone(&self.logger));
        let resource_dispatcher = Dispatcher::new(SpecKind::Resource, handler, Arc::clone(&self.logger));

        tokio::join!(
            project_dispatcher.run(projects),
            resource_dispatcher.run(resources)
        );
    }
}
