//! Flattening merged credentials into a single key/value map

use std::collections::BTreeMap;

use crate::error::{CredentialError, CredentialResult};
use crate::types::CredentialValue;

/// Flatten every resource's credentials into one map
///
/// Values are keyed by alias when one is declared. Two values landing on
/// the same key fail with `DuplicateAliasKey`. Resources are visited in
/// label order, so the reported key is deterministic.
pub fn flatten(
    per_resource: &BTreeMap<String, Vec<CredentialValue>>,
) -> CredentialResult<BTreeMap<String, String>> {
    let mut flat = BTreeMap::new();
    for values in per_resource.values() {
        insert_all(&mut flat, values)?;
    }
    Ok(flat)
}

/// Flatten the credentials of a single resource
pub fn flatten_resource(values: &[CredentialValue]) -> CredentialResult<BTreeMap<String, String>> {
    let mut flat = BTreeMap::new();
    insert_all(&mut flat, values)?;
    Ok(flat)
}

fn insert_all(flat: &mut BTreeMap<String, String>, values: &[CredentialValue]) -> CredentialResult<()> {
    for cv in values {
        let key = cv.effective_key();
        if flat.contains_key(key) {
            return Err(CredentialError::DuplicateAliasKey(key.to_string()));
        }
        flat.insert(key.to_string(), cv.effective_value().to_string());
    }
    Ok(())
}
