//! Validated profile descriptors.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Scopes requested when a profile does not list its own.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Bound on provider and backend calls when nothing is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interface profiles listen on when `bind` is not set.
pub const DEFAULT_BIND_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// One protected destination. Immutable after load.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub bind_address: SocketAddr,
    pub destination: Destination,
    pub welcome_page: Option<PathBuf>,
    pub request_timeout: Duration,
    pub oauth: OAuthSettings,
}

impl Profile {
    /// Port the profile listens on.
    pub fn port(&self) -> u16 {
        self.bind_address.port()
    }

    /// Whether unauthenticated visitors get a landing page instead of a login redirect.
    pub fn has_welcome_page(&self) -> bool {
        self.welcome_page.is_some()
    }
}

/// Where authenticated requests go. Exactly one per profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Reverse-proxy to an upstream service.
    Backend(Url),
    /// Serve files from a directory.
    Static(PathBuf),
}

impl Destination {
    pub fn is_backend(&self) -> bool {
        matches!(self, Destination::Backend(_))
    }

    pub fn backend_url(&self) -> Option<&Url> {
        match self {
            Destination::Backend(url) => Some(url),
            Destination::Static(_) => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Backend(url) => write!(f, "proxy → {}", url),
            Destination::Static(dir) => write!(f, "static → {}", dir.display()),
        }
    }
}

/// OAuth client parameters for one profile.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_endpoint", &self.authorize_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("scopes", &self.scopes)
            .finish()
    }
}
