//! Loading spec objects from YAML documents on disk

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use credsync_core::logging::SharedLogger;
use credsync_core::{log_error, log_warn, SpecObject};

/// Spec objects keyed by `<kind>/<namespace>/<name>`
pub type Snapshot = BTreeMap<String, SpecObject>;

/// A spec file that could not be read or parsed
#[derive(Debug)]
pub struct SpecFileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for SpecFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

impl Error for SpecFileError {}

/// Key identifying an object within a snapshot
pub fn snapshot_key(object: &SpecObject) -> String {
    format!("{}/{}", object.kind(), object.key())
}

/// Parse every document in a (multi-document) YAML string
///
/// Documents without `metadata.namespace` are placed in `namespace`.
/// Empty documents are skipped.
pub fn parse_documents(content: &str, namespace: &str) -> Result<Vec<SpecObject>, serde_yaml::Error> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let mut value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        default_namespace(&mut value, namespace);
        objects.push(serde_yaml::from_value(value)?);
    }
    Ok(objects)
}

fn default_namespace(value: &mut Value, namespace: &str) {
    if let Some(Value::Mapping(metadata)) = value.get_mut("metadata") {
        let key = Value::from("namespace");
        if !metadata.contains_key(&key) {
            metadata.insert(key, Value::from(namespace));
        }
    }
}

/// Load the spec objects of one file
pub fn load_file(path: &Path, namespace: &str) -> Result<Vec<SpecObject>, SpecFileError> {
    let error = |message: String| SpecFileError {
        path: path.to_path_buf(),
        message,
    };
    let content = fs::read_to_string(path).map_err(|e| error(e.to_string()))?;
    parse_documents(&content, namespace).map_err(|e| error(e.to_string()))
}

/// Result of reading a spec directory
#[derive(Debug, Default)]
pub struct LoadedDir {
    pub objects: Snapshot,
    /// File each object was read from, by snapshot key
    pub origins: BTreeMap<String, PathBuf>,
    /// Files that could not be read or parsed
    pub failed: BTreeSet<PathBuf>,
}

impl LoadedDir {
    /// Keep `previous` objects whose file failed to load this time
    ///
    /// A file that is broken or half written must not look like a
    /// deletion of everything it used to define.
    pub fn retain_failed_from(&mut self, previous: &Snapshot, origins: &BTreeMap<String, PathBuf>) -> usize {
        let mut kept = 0;
        for (key, path) in origins {
            if !self.failed.contains(path) || self.objects.contains_key(key) {
                continue;
            }
            if let Some(object) = previous.get(key) {
                self.objects.insert(key.clone(), object.clone());
                self.origins.insert(key.clone(), path.clone());
                kept += 1;
            }
        }
        kept
    }
}

/// Load every `.yaml`/`.yml` file in `dir` (not recursive)
///
/// Files that fail to parse are logged and recorded in `failed` so that
/// one broken document does not hide the others. An object defined twice
/// keeps the later definition in file name order.
pub fn load_dir(dir: &Path, namespace: &str, logger: &SharedLogger) -> std::io::Result<LoadedDir> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_spec_file(path))
        .collect();
    paths.sort();

    let mut loaded = LoadedDir::default();
    for path in paths {
        match load_file(&path, namespace) {
            Ok(objects) => {
                for object in objects {
                    let key = snapshot_key(&object);
                    if loaded.objects.insert(key.clone(), object).is_some() {
                        log_warn!(logger, "{} defined more than once, using {}", key, path.display());
                    }
                    loaded.origins.insert(key, path.clone());
                }
            }
            Err(e) => {
                log_error!(logger, "skipping spec file {}", e);
                loaded.failed.insert(path);
            }
        }
    }
    Ok(loaded)
}

fn is_spec_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map_or(false, |ext| ext == "yaml" || ext == "yml")
}
