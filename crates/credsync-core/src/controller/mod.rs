//! Reconciliation of spec objects driven by watch events
//!
//! - `EventHandler` / `WatchEvent`: transport-independent event interface
//! - `Reconciler`: validate, resolve, render and store one object
//! - `Dispatcher` / `Controller`: per-kind dispatch with per-object ordering

mod handler;
mod reconciler;
mod dispatcher;

pub use handler::{EventHandler, WatchEvent};
pub use reconciler::{ReconcileError, Reconciler, Stage};
pub use dispatcher::{Controller, Dispatcher, EventRouter};
