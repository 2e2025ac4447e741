//! Secret store backed by a directory of JSON files

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::traits::{SecretObject, SecretStore, SecretStoreError, SecretStoreResult};
use crate::types::{is_valid_namespace, is_valid_object_name};
use crate::debug_log;

/// Stores each secret as `<root>/<namespace>/<name>.json`
///
/// Data values are base64 encoded in the file. A secret is written to a
/// hidden sibling file and renamed over the target, so readers see
/// either the old or the new content. Writes through one store are
/// serialized; there is no locking between processes sharing a root.
#[derive(Debug)]
pub struct DirectorySecretStore {
    root: PathBuf,
    writes: Mutex<()>,
}

impl DirectorySecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writes: Mutex::new(()),
        }
    }

    /// File a secret is stored in
    ///
    /// Names and namespaces that could step outside the root are
    /// rejected with `InvalidName`.
    pub fn path(&self, namespace: &str, name: &str) -> SecretStoreResult<PathBuf> {
        if !is_valid_namespace(namespace) || !is_valid_object_name(name) {
            return Err(SecretStoreError::InvalidName(format!("{}/{}", namespace, name)));
        }
        Ok(self.root.join(namespace).join(format!("{}.json", name)))
    }

    async fn exists(&self, path: &Path) -> SecretStoreResult<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the secret next to `path` and return the staged file
    async fn stage(&self, path: &Path, secret: &SecretObject) -> SecretStoreResult<PathBuf> {
        let staged = path.with_file_name(format!(".{}.json.tmp", secret.name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(secret)?;
        fs::write(&staged, content).await?;
        Ok(staged)
    }

    /// Move a staged file into place, removing it if that fails
    async fn commit(&self, staged: &Path, path: &Path, replace: bool) -> SecretStoreResult<()> {
        // hard_link fails if the target exists, rename would replace it
        let result = if replace {
            fs::rename(staged, path).await
        } else {
            fs::hard_link(staged, path).await
        };
        if !replace || result.is_err() {
            let _ = fs::remove_file(staged).await;
        }
        result.map_err(SecretStoreError::from)
    }
}

#[async_trait]
impl SecretStore for DirectorySecretStore {
    fn name(&self) -> &str {
        "directory"
    }

    async fn get(&self, namespace: &str, name: &str) -> SecretStoreResult<SecretObject> {
        let path = self.path(namespace, name)?;
        match fs::read(&path).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SecretStoreError::NotFound(format!("{}/{}", namespace, name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, secret: &SecretObject) -> SecretStoreResult<()> {
        let path = self.path(&secret.namespace, &secret.name)?;
        let _guard = self.writes.lock().await;
        let staged = self.stage(&path, secret).await?;
        match self.commit(&staged, &path, false).await {
            Err(SecretStoreError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                Err(SecretStoreError::AlreadyExists(secret.key()))
            }
            Err(e) => Err(e),
            Ok(()) => {
                debug_log!("created secret {} at {}", secret.key(), path.display());
                Ok(())
            }
        }
    }

    async fn update(&self, secret: &SecretObject) -> SecretStoreResult<()> {
        let path = self.path(&secret.namespace, &secret.name)?;
        let _guard = self.writes.lock().await;
        if !self.exists(&path).await? {
            return Err(SecretStoreError::NotFound(secret.key()));
        }
        let staged = self.stage(&path, secret).await?;
        self.commit(&staged, &path, true).await?;
        debug_log!("updated secret {} at {}", secret.key(), path.display());
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> SecretStoreResult<()> {
        let path = self.path(namespace, name)?;
        let _guard = self.writes.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SecretStoreError::NotFound(format!("{}/{}", namespace, name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn secret(value: &[u8]) -> SecretObject {
        SecretObject {
            name: "registry".to_string(),
            namespace: "apps".to_string(),
            secret_type: "kubernetes.io/dockercfg".to_string(),
            owner_references: Vec::new(),
            data: BTreeMap::from([(".dockercfg".to_string(), value.to_vec())]),
        }
    }

    #[tokio::test]
    async fn test_directory_store_layout() {
        let dir = TempDir::new().unwrap();
        let store = DirectorySecretStore::new(dir.path());

        store.upsert(&secret(b"{}")).await.unwrap();

        let path = dir.path().join("apps").join("registry.json");
        assert_eq!(store.path("apps", "registry").unwrap(), path);
        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["data"][".dockercfg"], "e30=");
    }

    #[tokio::test]
    async fn test_directory_store_crud() {
        let dir = TempDir::new().unwrap();
        let store = DirectorySecretStore::new(dir.path());

        assert!(store.update(&secret(b"a")).await.unwrap_err().is_not_found());
        store.create(&secret(b"a")).await.unwrap();
        assert!(matches!(
            store.create(&secret(b"a")).await,
            Err(SecretStoreError::AlreadyExists(_))
        ));

        store.upsert(&secret(b"b")).await.unwrap();
        assert_eq!(store.get("apps", "registry").await.unwrap(), secret(b"b"));

        store.delete("apps", "registry").await.unwrap();
        assert!(store.get("apps", "registry").await.unwrap_err().is_not_found());
        assert!(store.delete("apps", "registry").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_names_cannot_leave_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("out");
        let store = DirectorySecretStore::new(&root);

        let mut escaping = secret(b"x");
        escaping.name = "../../escaped".to_string();
        assert!(matches!(
            store.upsert(&escaping).await,
            Err(SecretStoreError::InvalidName(_))
        ));
        assert!(!dir.path().join("escaped.json").exists());

        assert!(store.path("..", "registry").is_err());
        assert!(store.path("apps", "a/b").is_err());
        assert!(store.get("apps", "..").await.is_err());
        assert!(store.delete("../apps", "registry").await.is_err());
    }

    #[tokio::test]
    async fn test_writes_leave_no_staged_files() {
        let dir = TempDir::new().unwrap();
        let store = DirectorySecretStore::new(dir.path());

        store.upsert(&secret(b"a")).await.unwrap();
        store.upsert(&secret(b"b")).await.unwrap();
        assert!(store.create(&secret(b"c")).await.is_err());

        let names: Vec<String> = std::fs::read_dir(dir.path().join("apps"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["registry.json".to_string()]);
        assert_eq!(store.get("apps", "registry").await.unwrap(), secret(b"b"));
    }
}
