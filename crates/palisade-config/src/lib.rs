//! Configuration system for the Palisade authentication gateway.
//!
//! Provides TOML-based configuration with:
//! - One `[[profile]]` table per protected destination
//! - Gateway-wide defaults (`[gateway]`) that profiles may override
//! - Provider-issued client-secret JSON files as a source of OAuth credentials
//! - Validation into immutable [`Profile`] descriptors
//!
//! Anything that fails validation is a [`ConfigError`]; callers are expected
//! to treat it as fatal.

pub mod discovery;
pub mod error;
pub mod profile;
pub mod resolver;
pub mod types;

pub use discovery::{
    LoadedConfig, discover_config_path, load_config, load_config_file, xdg_config_dir,
};
pub use error::{ConfigError, Result};
pub use profile::{
    DEFAULT_BIND_ADDRESS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SCOPES, Destination, OAuthSettings,
    Profile,
};
pub use resolver::resolve_profiles;
pub use types::*;
