//! Logger that discards every line

use std::sync::Arc;

use super::traits::{Logger, SharedLogger};

/// Drops all messages; the default when no console is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }

    /// A discarding logger ready to hand to resolvers and reconcilers
    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{log_error, log_info};

    #[test]
    fn test_shared_noop_accepts_macros() {
        let logger = NoOpLogger::shared();
        log_info!(logger, "reconciled {}", "apps/db");
        log_error!(logger, "{} failed", "resolve");
    }
}
