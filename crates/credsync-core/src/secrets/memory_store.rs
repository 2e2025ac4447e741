//! In-memory secret store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{SecretObject, SecretStore, SecretStoreError, SecretStoreResult};

/// In-memory secret store for testing and dry runs
///
/// Secrets are keyed by `namespace/name` and lost when the store is
/// dropped. A store built with `with_failure` rejects every write.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, SecretObject>>,
    failure: Option<String>,
}

impl MemorySecretStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write with `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Get the number of secrets in the store
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a secret synchronously
    pub fn get_sync(&self, namespace: &str, name: &str) -> Option<SecretObject> {
        self.secrets.read().get(&key(namespace, name)).cloned()
    }

    /// Insert a secret synchronously (useful for initialization)
    pub fn insert_sync(&self, secret: SecretObject) {
        self.secrets.write().insert(secret.key(), secret);
    }

    fn check_writable(&self) -> SecretStoreResult<()> {
        match &self.failure {
            Some(message) => Err(SecretStoreError::Other(message.clone())),
            None => Ok(()),
        }
    }
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, namespace: &str, name: &str) -> SecretStoreResult<SecretObject> {
        let key = key(namespace, name);
        self.secrets
            .read()
            .get(&key)
            .cloned()
            .ok_or(SecretStoreError::NotFound(key))
    }

    async fn create(&self, secret: &SecretObject) -> SecretStoreResult<()> {
        self.check_writable()?;
        let mut secrets = self.secrets.write();
        let key = secret.key();
        if secrets.contains_key(&key) {
            return Err(SecretStoreError::AlreadyExists(key));
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }

    async fn update(&self, secret: &SecretObject) -> SecretStoreResult<()> {
        self.check_writable()?;
        let mut secrets = self.secrets.write();
        match secrets.get_mut(&secret.key()) {
            Some(existing) => {
                *existing = secret.clone();
                Ok(())
            }
            None => Err(SecretStoreError::NotFound(secret.key())),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> SecretStoreResult<()> {
        self.check_writable()?;
        let key = key(namespace, name);
        match self.secrets.write().remove(&key) {
            Some(_) => Ok(()),
            None => Err(SecretStoreError::NotFound(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn secret(name: &str, value: &str) -> SecretObject {
        SecretObject {
            name: name.to_string(),
            namespace: "default".to_string(),
            secret_type: "Opaque".to_string(),
            owner_references: Vec::new(),
            data: BTreeMap::from([("KEY".to_string(), value.as_bytes().to_vec())]),
        }
    }

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());
        assert!(store.get("default", "s").await.unwrap_err().is_not_found());

        store.create(&secret("s", "v1")).await.unwrap();
        assert!(matches!(
            store.create(&secret("s", "v1")).await,
            Err(SecretStoreError::AlreadyExists(_))
        ));

        store.update(&secret("s", "v2")).await.unwrap();
        assert_eq!(store.get("default", "s").await.unwrap().data["KEY"], b"v2");

        store.delete("default", "s").await.unwrap();
        assert!(store.delete("default", "s").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemorySecretStore::new();
        assert!(store.update(&secret("s", "v")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let store = MemorySecretStore::new();

        store.upsert(&secret("s", "v1")).await.unwrap();
        assert_eq!(store.len(), 1);

        store.upsert(&secret("s", "v2")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_sync("default", "s").unwrap().data["KEY"], b"v2");
    }

    #[tokio::test]
    async fn test_failing_store_rejects_writes() {
        let store = MemorySecretStore::new().with_failure("read-only");
        store.insert_sync(secret("s", "v"));

        assert!(matches!(store.upsert(&secret("s", "x")).await, Err(SecretStoreError::Other(_))));
        assert_eq!(store.get_sync("default", "s").unwrap().data["KEY"], b"v");
    }
}
