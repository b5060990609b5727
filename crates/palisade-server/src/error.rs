//! Error types for the gateway runtime.

use std::net::SocketAddr;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use palisade_oauth::FlowError;
use thiserror::Error;

/// Gateway error type.
///
/// Each variant maps to a fixed status and a short plaintext body. Details
/// (provider messages, upstream errors) go to the log, never to the browser.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider redirected back with an error.
    #[error("OAuth error: {error}")]
    ProviderError {
        error: String,
        description: Option<String>,
    },

    /// Callback without an authorization code.
    #[error("Missing authorization code")]
    MissingCode,

    /// Code-for-token exchange failed.
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Token response carried no identity assertion.
    #[error("No id_token in OAuth response")]
    IdentityAssertionMissing,

    /// A request reached the forwarder without a session.
    #[error("Unauthorized")]
    Unauthorized,

    /// The backend could not be reached or timed out.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FlowError> for GatewayError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Provider { error, description } => {
                GatewayError::ProviderError { error, description }
            }
            FlowError::MissingCode => GatewayError::MissingCode,
            FlowError::Exchange(msg) => GatewayError::ExchangeFailed(msg),
            FlowError::IdentityAssertionMissing => GatewayError::IdentityAssertionMissing,
            FlowError::Client(msg) => GatewayError::Internal(msg),
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ProviderError { .. } | GatewayError::MissingCode => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::ExchangeFailed(_)
            | GatewayError::IdentityAssertionMissing
            | GatewayError::Bind { .. }
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body shown to the browser.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::ProviderError { error, .. } => format!("OAuth error: {}", error),
            GatewayError::MissingCode => "Missing authorization code".to_string(),
            GatewayError::ExchangeFailed(_) => "Failed to exchange token".to_string(),
            GatewayError::IdentityAssertionMissing => "No id_token in OAuth response".to_string(),
            GatewayError::Unauthorized => "Unauthorized".to_string(),
            GatewayError::BackendUnavailable(_) => "Bad gateway".to_string(),
            GatewayError::Bind { .. } | GatewayError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            GatewayError::ProviderError { error, description } => {
                tracing::warn!(
                    status = %status,
                    error = %error,
                    description = description.as_deref().unwrap_or(""),
                    "OAuth error from provider"
                );
            }
            GatewayError::MissingCode | GatewayError::Unauthorized => {
                tracing::warn!(status = %status, error = %self, "Client error");
            }
            _ => {
                tracing::error!(status = %status, error = %self, "Gateway error");
            }
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}
