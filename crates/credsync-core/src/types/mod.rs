//! Core types for credential specs and spec objects
//!
//! This module contains the declarative specs delivered by the watch
//! mechanism and the values produced while resolving them.

mod spec;
mod object;
mod value;

pub use spec::{CredentialSpec, ResourceSpec, ProjectSpec, SecretType};
pub use object::{is_valid_namespace, is_valid_object_name, ObjectMeta, Project, Resource, SpecObject, SpecKind, API_VERSION};
pub use value::CredentialValue;
