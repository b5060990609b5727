//! Error types for the authorization flow.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can end an authorization flow.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The provider redirected back with an `error` parameter.
    #[error("OAuth error: {error}")]
    Provider {
        error: String,
        description: Option<String>,
    },

    /// The callback carried no authorization code.
    #[error("Missing authorization code")]
    MissingCode,

    /// Code-for-token exchange failed (network, timeout, provider rejection).
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// The token response had no identity assertion.
    #[error("No id_token in OAuth response")]
    IdentityAssertionMissing,

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FlowError {
    fn from(e: reqwest::Error) -> Self {
        FlowError::Exchange(e.to_string())
    }
}
