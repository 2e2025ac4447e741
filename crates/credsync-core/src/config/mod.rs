//! Controller configuration
//!
//! YAML file (`~/.config/credsync/config.yaml` by default) with
//! environment variable overrides.

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{ControllerConfig, DEFAULT_API_URL, DEFAULT_RESYNC_SECS};
