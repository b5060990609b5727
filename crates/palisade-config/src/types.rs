//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [gateway]                # defaults shared by every profile
//! [[profile]]              # one table per protected destination
//! [profile.oauth]          # OAuth client for the profile above
//! ```
//!
//! These are the raw, unvalidated shapes. See [`crate::resolver`] for the
//! conversion into [`crate::Profile`].

use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PalisadeConfig {
    /// Gateway-wide defaults.
    pub gateway: GatewaySection,

    /// Profile tables (`[[profile]]`).
    #[serde(rename = "profile")]
    pub profiles: Vec<ProfileSection>,
}

impl PalisadeConfig {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Upper bound for provider and backend calls, in seconds.
    pub request_timeout_secs: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

/// One `[[profile]]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSection {
    /// Profile name; scopes the session cookie.
    pub name: String,

    /// Port the profile's listener binds to.
    pub port: u16,

    /// Interface to bind to. Defaults to all interfaces.
    pub bind: Option<IpAddr>,

    /// Upstream service URL (proxy mode).
    pub destination: Option<String>,

    /// Directory to serve (static mode).
    pub static_dir: Option<PathBuf>,

    /// HTML page shown to unauthenticated visitors.
    pub welcome_page: Option<PathBuf>,

    /// Per-profile override of `gateway.request_timeout_secs`.
    pub request_timeout_secs: Option<u64>,

    /// OAuth client settings.
    pub oauth: OAuthSection,
}

/// `[profile.oauth]` table.
///
/// Every field is optional here so that values can come from a
/// `credentials_file`; inline values take priority over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    /// Path to a provider-issued client-secret JSON file.
    pub credentials_file: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub authorize_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub scopes: Option<Vec<String>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client-secret file
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-issued client-secret document (`{"web": {...}}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSecretFile {
    #[serde(default)]
    pub web: WebClientSecret,
}

/// The `web` object of a client-secret document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebClientSecret {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
    pub auth_uri: String,
    pub token_uri: String,
}
