//! Access gate: every request that is not part of the login flow needs a session.
//!
//! Without one, the visitor gets the welcome page (when configured) or is
//! sent to the provider with the requested path carried in `state`. With one,
//! the identity assertion is attached to the request for the downstream
//! handler.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use palisade_oauth::{LOGIN_PATH, ROOT_PATH};
use tracing::{debug, error, info};

use crate::error::GatewayError;
use crate::state::ProfileState;

/// Callback route of the login flow.
pub const CALLBACK_PATH: &str = "/callback";

/// Logout route.
pub const LOGOUT_PATH: &str = "/logout";

/// Paths that bypass the gate.
pub const FLOW_PATHS: [&str; 3] = [LOGIN_PATH, CALLBACK_PATH, LOGOUT_PATH];

/// Identity assertion of the authenticated caller, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion(pub String);

impl IdentityAssertion {
    /// `Authorization` header value carrying this assertion.
    pub fn bearer(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()
    }
}

pub fn is_flow_path(path: &str) -> bool {
    FLOW_PATHS.contains(&path)
}

/// Gate middleware.
pub async fn access_gate(
    State(state): State<ProfileState>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_flow_path(request.uri().path()) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let session = match state.sessions.load(&jar) {
        Ok(session) => session,
        Err(_) => {
            if state.profile.has_welcome_page() {
                debug!(profile = %state.name(), path = %request.uri().path(), "Serving welcome page");
                return welcome_page(&state).await;
            }
            let target = request_target(request.uri());
            info!(profile = %state.name(), target = %target, "No session, initiating OAuth flow");
            return start_flow(&state, target);
        }
    };

    debug!(
        profile = %state.name(),
        token_prefix = session.assertion_prefix(),
        "Valid session"
    );

    let assertion = IdentityAssertion(session.identity_assertion);
    let bearer = assertion.bearer();
    request.extensions_mut().insert(assertion);

    let mut response = next.run(request).await;

    // Static mode has no backend to receive the assertion; expose it on the response instead.
    if !state.profile.destination.is_backend()
        && let Some(value) = bearer
    {
        response.headers_mut().insert(header::AUTHORIZATION, value);
    }

    response
}

/// Path plus query of the request, as it should be restored after login.
pub fn request_target(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(ROOT_PATH)
}

/// Redirect the browser to the provider.
pub fn start_flow(state: &ProfileState, target: &str) -> Response {
    found(&state.flow.start(target))
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => GatewayError::Internal(format!("invalid redirect location: {}", location))
            .into_response(),
    }
}

/// Serve the profile's welcome page. The file is read on every request.
pub async fn welcome_page(state: &ProfileState) -> Response {
    let Some(path) = state.profile.welcome_page.as_deref() else {
        return GatewayError::Internal("no welcome page configured".to_string()).into_response();
    };

    match tokio::fs::read(path).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(profile = %state.name(), path = %path.display(), error = %e, "Failed to read welcome page");
            GatewayError::Internal(format!("welcome page unreadable: {}", e)).into_response()
        }
    }
}
