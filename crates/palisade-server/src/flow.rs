//! Login, callback and logout handlers.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use palisade_oauth::{CallbackParams, ROOT_PATH};
use tracing::info;

use crate::error::GatewayError;
use crate::gate::{found, start_flow, welcome_page};
use crate::state::ProfileState;

/// `GET /login`: always start a fresh flow that ends at `/`.
pub async fn login(State(state): State<ProfileState>) -> Response {
    info!(profile = %state.name(), "Initiating OAuth flow from login page");
    start_flow(&state, ROOT_PATH)
}

/// `GET /callback`: finish the flow, set the session cookie, go back to the
/// requested path. No cookie is set on any failure.
pub async fn callback(
    State(state): State<ProfileState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Response), GatewayError> {
    let done = state.flow.complete(&params).await?;

    let jar = state.sessions.save(jar, &done.session);
    info!(
        profile = %state.name(),
        token_prefix = done.session.assertion_prefix(),
        redirect = %done.redirect_to,
        "OAuth flow complete"
    );

    Ok((jar, found(&done.redirect_to)))
}

/// `GET /logout`: clear the cookie, then show the welcome page or go to `/`.
pub async fn logout(State(state): State<ProfileState>, jar: CookieJar) -> Response {
    let jar = state.sessions.clear(jar);
    info!(profile = %state.name(), "Logged out");

    let page = if state.profile.has_welcome_page() {
        welcome_page(&state).await
    } else {
        found(ROOT_PATH)
    };

    (jar, page).into_response()
}
