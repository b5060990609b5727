//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to read or parse an OAuth client-secret file.
    #[error("failed to load OAuth credentials '{path}': {reason}")]
    Credentials { path: String, reason: String },

    /// No config file was found in any of the searched locations.
    #[error("no config file found (searched: {searched})")]
    NotFound { searched: String },

    /// The config declares no profiles.
    #[error("no profiles configured: add at least one [[profile]] table")]
    NoProfiles,

    /// Profile name is empty or not usable in a cookie name.
    #[error("invalid profile name '{0}': use only letters, digits, '-' and '_'")]
    InvalidProfileName(String),

    /// Two profiles share a name.
    #[error("duplicate profile name '{0}'")]
    DuplicateProfile(String),

    /// Two profiles listen on the same port.
    #[error("profiles '{first}' and '{second}' both listen on port {port}")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
    },

    /// Missing required field.
    #[error("missing required field '{field}' in profile '{profile}'")]
    MissingField { field: String, profile: String },

    /// Neither or both of `destination` / `static_dir` are set.
    #[error("profile '{profile}': {reason}")]
    Destination { profile: String, reason: String },

    /// A field holds something that is not a usable URL.
    #[error("profile '{profile}': invalid {field} '{value}': {reason}")]
    InvalidUrl {
        profile: String,
        field: String,
        value: String,
        reason: String,
    },

    /// Other validation error.
    #[error("profile '{profile}': {message}")]
    Invalid { profile: String, message: String },
}
