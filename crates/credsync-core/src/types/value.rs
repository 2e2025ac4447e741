//! Merged credential values

use super::spec::CredentialSpec;

/// A credential value paired with the spec entry that selected it
///
/// `value` is either what the provider returned or the spec's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialValue {
    pub spec: CredentialSpec,
    pub value: String,
}

impl CredentialValue {
    pub fn new(spec: CredentialSpec, value: impl Into<String>) -> Self {
        Self {
            spec,
            value: value.into(),
        }
    }

    /// Provider key this value came from
    pub fn key(&self) -> &str {
        &self.spec.key
    }

    /// Alias if declared, else the provider key
    pub fn effective_key(&self) -> &str {
        self.spec.effective_key()
    }

    /// The value, falling back to the declared default when empty
    pub fn effective_value(&self) -> &str {
        if self.value.is_empty() {
            &self.spec.default
        } else {
            &self.value
        }
    }
}
