//! Validation of raw profile tables into [`Profile`] descriptors.
//!
//! Resolution rules:
//! 1. Relative paths resolve against the config file's directory
//! 2. OAuth values: inline `[profile.oauth]` field → `credentials_file` → error
//! 3. Timeout: profile override → `[gateway]` default → [`DEFAULT_REQUEST_TIMEOUT`]
//!
//! Problems that make a profile unusable are errors. Problems the gateway can
//! run around (a missing welcome page) become warnings.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::profile::{
    DEFAULT_BIND_ADDRESS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SCOPES, Destination, OAuthSettings,
    Profile,
};
use crate::types::{ClientSecretFile, GatewaySection, OAuthSection, PalisadeConfig, ProfileSection};
use crate::{ConfigError, Result};

/// Validate every profile in `config`.
///
/// `base_dir` anchors relative paths. Non-fatal findings are appended to `warnings`.
pub fn resolve_profiles(
    config: &PalisadeConfig,
    base_dir: &Path,
    warnings: &mut Vec<String>,
) -> Result<Vec<Profile>> {
    if config.profiles.is_empty() {
        return Err(ConfigError::NoProfiles);
    }

    let mut names: HashSet<&str> = HashSet::new();
    let mut ports: HashMap<u16, &str> = HashMap::new();
    let mut profiles = Vec::with_capacity(config.profiles.len());

    for section in &config.profiles {
        validate_name(&section.name)?;
        if !names.insert(section.name.as_str()) {
            return Err(ConfigError::DuplicateProfile(section.name.clone()));
        }
        if section.port == 0 {
            return Err(ConfigError::MissingField {
                field: "port".to_string(),
                profile: section.name.clone(),
            });
        }
        if let Some(first) = ports.insert(section.port, section.name.as_str()) {
            return Err(ConfigError::DuplicatePort {
                port: section.port,
                first: first.to_string(),
                second: section.name.clone(),
            });
        }

        profiles.push(resolve_profile(section, &config.gateway, base_dir, warnings)?);
    }

    Ok(profiles)
}

fn resolve_profile(
    section: &ProfileSection,
    gateway: &GatewaySection,
    base_dir: &Path,
    warnings: &mut Vec<String>,
) -> Result<Profile> {
    let name = &section.name;

    let destination = resolve_destination(section, base_dir, warnings)?;
    let oauth = resolve_oauth(name, &section.oauth, base_dir, warnings)?;

    let welcome_page = match &section.welcome_page {
        Some(path) => {
            let path = anchor(base_dir, path);
            if path.is_file() {
                Some(path)
            } else {
                warnings.push(format!(
                    "profile '{}': welcome page not found at {}, unauthenticated visitors will be sent to login",
                    name,
                    path.display()
                ));
                None
            }
        }
        None => None,
    };

    let timeout_secs = section
        .request_timeout_secs
        .or(gateway.request_timeout_secs);
    let request_timeout = match timeout_secs {
        Some(0) => {
            return Err(ConfigError::Invalid {
                profile: name.clone(),
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_REQUEST_TIMEOUT,
    };

    Ok(Profile {
        name: name.clone(),
        bind_address: SocketAddr::new(section.bind.unwrap_or(DEFAULT_BIND_ADDRESS), section.port),
        destination,
        welcome_page,
        request_timeout,
        oauth,
    })
}

/// Profile names end up in cookie names, so keep them to token characters.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidProfileName(name.to_string()))
    }
}

fn resolve_destination(
    section: &ProfileSection,
    base_dir: &Path,
    warnings: &mut Vec<String>,
) -> Result<Destination> {
    let name = &section.name;
    let destination = section.destination.as_deref().map(str::trim).filter(|d| !d.is_empty());

    match (destination, &section.static_dir) {
        (Some(_), Some(_)) => Err(ConfigError::Destination {
            profile: name.clone(),
            reason: "set either destination or static_dir, not both".to_string(),
        }),
        (None, None) => Err(ConfigError::Destination {
            profile: name.clone(),
            reason: "must specify either static_dir or destination".to_string(),
        }),
        (Some(raw), None) => {
            let url = parse_url(name, "destination", raw)?;
            Ok(Destination::Backend(url))
        }
        (None, Some(dir)) => {
            let dir = anchor(base_dir, dir);
            if !dir.is_dir() {
                warnings.push(format!(
                    "profile '{}': static_dir {} does not exist yet",
                    name,
                    dir.display()
                ));
            }
            Ok(Destination::Static(dir))
        }
    }
}

fn resolve_oauth(
    profile: &str,
    section: &OAuthSection,
    base_dir: &Path,
    warnings: &mut Vec<String>,
) -> Result<OAuthSettings> {
    let file = match &section.credentials_file {
        Some(path) => load_client_secret(&anchor(base_dir, path))?,
        None => ClientSecretFile::default(),
    };
    let web = file.web;

    if section.redirect_uri.is_none() && web.redirect_uris.len() > 1 {
        warnings.push(format!(
            "profile '{}': multiple redirect URIs, using first: {}",
            profile, web.redirect_uris[0]
        ));
    }

    let client_id = required(profile, "client_id", section.client_id.clone(), web.client_id)?;
    let client_secret = required(
        profile,
        "client_secret",
        section.client_secret.clone(),
        web.client_secret,
    )?;
    let redirect_uri = required(
        profile,
        "redirect_uri",
        section.redirect_uri.clone(),
        web.redirect_uris.into_iter().next().unwrap_or_default(),
    )?;
    let authorize_endpoint = required(
        profile,
        "authorize_endpoint",
        section.authorize_endpoint.clone(),
        web.auth_uri,
    )?;
    let token_endpoint = required(
        profile,
        "token_endpoint",
        section.token_endpoint.clone(),
        web.token_uri,
    )?;

    parse_url(profile, "redirect_uri", &redirect_uri)?;
    parse_url(profile, "authorize_endpoint", &authorize_endpoint)?;
    parse_url(profile, "token_endpoint", &token_endpoint)?;

    let scopes = match &section.scopes {
        Some(scopes) if !scopes.is_empty() => scopes.clone(),
        _ => DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
    };

    Ok(OAuthSettings {
        client_id,
        client_secret,
        redirect_uri,
        authorize_endpoint,
        token_endpoint,
        scopes,
    })
}

fn load_client_secret(path: &Path) -> Result<ClientSecretFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Credentials {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::Credentials {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Inline value wins; empty strings count as missing.
fn required(
    profile: &str,
    field: &str,
    inline: Option<String>,
    from_file: String,
) -> Result<String> {
    inline
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| Some(from_file.trim().to_string()).filter(|v| !v.is_empty()))
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
            profile: profile.to_string(),
        })
}

fn parse_url(profile: &str, field: &str, raw: &str) -> Result<Url> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        profile: profile.to_string(),
        field: field.to_string(),
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn anchor(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
