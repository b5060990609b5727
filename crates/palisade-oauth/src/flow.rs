//! Authorization-code flow orchestration.
//!
//! [`AuthorizationFlow::start`] turns a requested path into a provider
//! redirect; [`AuthorizationFlow::complete`] turns the provider's callback
//! into a [`Session`] plus the path to send the browser back to.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{FlowError, Result};
use crate::oauth::OAuthClient;
use crate::state::{encode_state, redirect_target};

/// An authenticated session. The cookie *is* the session; nothing is kept server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque identity assertion (conventionally an ID token).
    pub identity_assertion: String,
    /// When the browser should drop the session. `None` means "end of browser session".
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(identity_assertion: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            identity_assertion: identity_assertion.into(),
            expires_at,
        }
    }

    /// First few characters of the assertion, for log lines.
    pub fn assertion_prefix(&self) -> &str {
        let end = self
            .identity_assertion
            .char_indices()
            .nth(10)
            .map(|(idx, _)| idx)
            .unwrap_or(self.identity_assertion.len());
        &self.identity_assertion[..end]
    }
}

/// Query parameters of the provider's redirect back to `/callback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Successful end of a flow.
#[derive(Debug, Clone)]
pub struct CompletedFlow {
    pub session: Session,
    pub redirect_to: String,
}

/// The flow controller for one profile.
#[derive(Debug, Clone)]
pub struct AuthorizationFlow {
    client: OAuthClient,
}

impl AuthorizationFlow {
    pub fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Provider URL that starts a login and returns to `request_target` afterwards.
    pub fn start(&self, request_target: &str) -> String {
        let state = encode_state(request_target);
        let url = self.client.authorization_url(&state);
        tracing::debug!(target_path = %request_target, url = %url, "Generated OAuth URL");
        url
    }

    /// Handle the provider callback.
    ///
    /// Checks run in order: provider error, missing code, token exchange,
    /// identity assertion. Any failure ends the flow without a session.
    pub async fn complete(&self, params: &CallbackParams) -> Result<CompletedFlow> {
        if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(FlowError::Provider {
                error: error.to_string(),
                description: params.error_description.clone(),
            });
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(FlowError::MissingCode)?;

        tracing::debug!("Exchanging authorization code for token");
        let tokens = self.client.exchange_code(code).await?;

        let assertion = tokens
            .identity_assertion()
            .ok_or(FlowError::IdentityAssertionMissing)?;

        let session = Session::new(assertion, tokens.expires_at());
        let redirect_to = redirect_target(params.state.as_deref());

        Ok(CompletedFlow {
            session,
            redirect_to,
        })
    }
}
