//! Filtering provider values down to the requested credentials

use std::collections::BTreeMap;

use crate::error::{CredentialError, CredentialResult};
use crate::types::{CredentialSpec, CredentialValue};

/// Merge one resource's provider values with the credentials it requests
///
/// With no requested credentials every provider value passes through
/// under its own key. Otherwise provider keys that were not requested are
/// dropped, requested keys pick up their alias, and requested keys the
/// provider does not hold are filled from their default. A missing key
/// without a default fails with `CredentialDefaultNotSet`.
///
/// Every requested key appears exactly once in the output.
pub fn merge_credentials(
    resource_label: &str,
    provider_values: &BTreeMap<String, String>,
    requested: &[CredentialSpec],
) -> CredentialResult<Vec<CredentialValue>> {
    if requested.is_empty() {
        return Ok(provider_values
            .iter()
            .map(|(key, value)| CredentialValue::new(CredentialSpec::new(key.as_str()), value.as_str()))
            .collect());
    }

    let mut merged: Vec<CredentialValue> = provider_values
        .iter()
        .filter_map(|(key, value)| {
            requested
                .iter()
                .find(|spec| &spec.key == key)
                .map(|spec| CredentialValue::new(spec.clone(), value.as_str()))
        })
        .collect();

    for spec in requested {
        if merged.iter().any(|cv| cv.key() == spec.key) {
            continue;
        }
        if spec.default.is_empty() {
            return Err(CredentialError::CredentialDefaultNotSet {
                resource: resource_label.to_string(),
                key: spec.key.clone(),
            });
        }
        merged.push(CredentialValue::new(spec.clone(), spec.default.as_str()));
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_request_passes_everything() {
        let merged = merge_credentials("db", &values(&[("HOST", "h"), ("PORT", "1")]), &[]).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|cv| cv.spec.name.is_empty() && cv.spec.default.is_empty()));
    }

    #[test]
    fn test_unrequested_keys_are_dropped() {
        let merged = merge_credentials(
            "db",
            &values(&[("HOST", "h"), ("PASSWORD", "secret")]),
            &[CredentialSpec::new("HOST")],
        )
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].key(), "HOST");
    }

    #[test]
    fn test_alias_and_default_attached() {
        let merged = merge_credentials(
            "db",
            &values(&[("HOST", "db.internal")]),
            &[CredentialSpec::new("HOST").with_name("DB_HOST").with_default("localhost")],
        )
        .unwrap();

        assert_eq!(merged[0].effective_key(), "DB_HOST");
        assert_eq!(merged[0].value, "db.internal");
        assert_eq!(merged[0].spec.default, "localhost");
    }

    #[test]
    fn test_default_fills_missing_key() {
        let requested = [
            CredentialSpec::new("HOST"),
            CredentialSpec::new("PORT").with_default("5432"),
        ];
        let merged = merge_credentials("db", &values(&[("HOST", "db.internal")]), &requested).unwrap();

        let port = merged.iter().find(|cv| cv.key() == "PORT").unwrap();
        assert_eq!(port.value, "5432");
    }

    #[test]
    fn test_missing_key_without_default() {
        let err = merge_credentials("db", &values(&[]), &[CredentialSpec::new("PASSWORD")]).unwrap_err();
        match err {
            CredentialError::CredentialDefaultNotSet { resource, key } => {
                assert_eq!(resource, "db");
                assert_eq!(key, "PASSWORD");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_every_requested_key_exactly_once() {
        let requested = [
            CredentialSpec::new("A"),
            CredentialSpec::new("B").with_default("b"),
            CredentialSpec::new("C").with_default("c"),
        ];
        let provided = values(&[("A", "1"), ("C", "3"), ("D", "4")]);
        let merged = merge_credentials("r", &provided, &requested).unwrap();

        assert_eq!(merged.len(), requested.len());
        for spec in &requested {
            assert_eq!(merged.iter().filter(|cv| cv.key() == spec.key).count(), 1);
        }
        let c = merged.iter().find(|cv| cv.key() == "C").unwrap();
        assert_eq!(c.value, "3");
    }
}
