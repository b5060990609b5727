//! Config file discovery and loading.
//!
//! Resolution order (first hit wins):
//! 1. Explicit path (`--config` / `PALISADE_CONFIG`, handled by the caller)
//! 2. `./palisade.toml` (project-local)
//! 3. `~/.config/palisade/palisade.toml` (XDG user config)

use std::path::{Path, PathBuf};

use crate::profile::Profile;
use crate::resolver::resolve_profiles;
use crate::types::PalisadeConfig;
use crate::{ConfigError, Result};

/// Default config filename, both project-local and inside the XDG directory.
const CONFIG_FILE: &str = "palisade.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "palisade";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "PALISADE_CONFIG_DIR";

/// Result of loading and validating a config file.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Validated profiles, in file order.
    pub profiles: Vec<Profile>,
    /// File the profiles were loaded from.
    pub source: PathBuf,
    /// Non-fatal findings (missing welcome pages, ambiguous redirect URIs).
    pub warnings: Vec<String>,
}

/// Discover, load and validate the gateway config.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = discover_config_path(explicit)?;
    load_config_file(&path)
}

/// Load and validate a config file at a known path.
pub fn load_config_file(path: &Path) -> Result<LoadedConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = PalisadeConfig::from_toml(&contents)?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut warnings = Vec::new();
    let profiles = resolve_profiles(&config, base_dir, &mut warnings)?;

    Ok(LoadedConfig {
        profiles,
        source: path.to_path_buf(),
        warnings,
    })
}

/// Pick the config file to load.
///
/// An explicit path is returned as-is (a missing file surfaces later as
/// [`ConfigError::ReadFile`]). Otherwise the project-local file, then the XDG
/// file, must exist.
pub fn discover_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = xdg_config_dir() {
        candidates.push(dir.join(CONFIG_FILE));
    }

    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| ConfigError::NotFound {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Get the XDG config directory for palisade.
///
/// Checks `PALISADE_CONFIG_DIR` env var first, then falls back to platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
