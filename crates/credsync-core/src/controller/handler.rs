//! Watch events and the handler interface they are delivered to

use async_trait::async_trait;

use crate::types::{SpecKind, SpecObject};

/// Receives add/update/delete notifications for spec objects
///
/// Implementations must not assume anything about the transport that
/// produced the event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_add(&self, object: &SpecObject);

    async fn on_update(&self, old: &SpecObject, new: &SpecObject);

    async fn on_delete(&self, object: &SpecObject);
}

/// A single notification from the watch mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(SpecObject),
    Modified { old: SpecObject, new: SpecObject },
    Deleted(SpecObject),
}

impl WatchEvent {
    /// The object the event is about (the new version for updates)
    pub fn object(&self) -> &SpecObject {
        match self {
            WatchEvent::Added(object) | WatchEvent::Deleted(object) => object,
            WatchEvent::Modified { new, .. } => new,
        }
    }

    pub fn key(&self) -> String {
        self.object().key()
    }

    pub fn kind(&self) -> SpecKind {
        self.object().kind()
    }

    /// Short event name for log lines
    pub fn action(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "added",
            WatchEvent::Modified { .. } => "modified",
            WatchEvent::Deleted(_) => "deleted",
        }
    }

    /// Deliver the event to the matching handler method
    pub async fn dispatch(self, handler: &dyn EventHandler) {
        match self {
            WatchEvent::Added(object) => handler.on_add(&object).await,
            WatchEvent::Modified { old, new } => handler.on_update(&old, &new).await,
            WatchEvent::Deleted(object) => handler.on_delete(&object).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::types::{ObjectMeta, Resource, ResourceSpec};

    /// Records every call as `"<action> <key>"`
    #[derive(Default)]
    pub(crate) struct RecordingHandler {
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn on_add(&self, object: &SpecObject) {
            self.calls.lock().push(format!("add {}", object.key()));
        }

        async fn on_update(&self, old: &SpecObject, new: &SpecObject) {
            self.calls
                .lock()
                .push(format!("update {} {} -> {}", new.key(), old.summary(), new.summary()));
        }

        async fn on_delete(&self, object: &SpecObject) {
            self.calls.lock().push(format!("delete {}", object.key()));
        }
    }

    pub(crate) fn resource(name: &str, label: &str) -> SpecObject {
        SpecObject::Resource(Resource {
            metadata: ObjectMeta::new("default", name),
            spec: ResourceSpec::new(label),
        })
    }

    #[test]
    fn test_event_accessors() {
        let event = WatchEvent::Modified {
            old: resource("db", "db-old"),
            new: resource("db", "db-new"),
        };
        assert_eq!(event.key(), "default/db");
        assert_eq!(event.kind(), SpecKind::Resource);
        assert_eq!(event.action(), "modified");
        assert_eq!(event.object().summary(), "resource: db-new");
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_handler_methods() {
        let handler = RecordingHandler::default();

        WatchEvent::Added(resource("a", "x")).dispatch(&handler).await;
        WatchEvent::Modified {
            old: resource("a", "x"),
            new: resource("a", "y"),
        }
        .dispatch(&handler)
        .await;
        WatchEvent::Deleted(resource("a", "y")).dispatch(&handler).await;

        assert_eq!(
            *handler.calls.lock(),
            vec![
                "add default/a".to_string(),
                "update default/a resource: x -> resource: y".to_string(),
                "delete default/a".to_string(),
            ]
        );
    }
}
