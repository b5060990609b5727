//! Reverse proxy to a profile's backend.
//!
//! Requests are replayed against the backend with the caller's identity
//! assertion as a bearer token and the client address in `X-Forwarded-For`.
//! Bodies are streamed in both directions; backend redirects are passed
//! through to the browser, never followed.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Uri, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tracing::debug;
use url::Url;

use crate::error::{GatewayError, Result};
use crate::gate::IdentityAssertion;
use crate::state::ProfileState;

/// `X-Forwarded-For`.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Connection-scoped headers never copied between hops.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards authenticated requests to one backend.
#[derive(Debug, Clone)]
pub struct Forwarder {
    base: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder that waits at most `timeout` for the backend to
    /// accept a connection and answer with a status line. Response bodies are
    /// streamed for as long as the backend keeps sending.
    pub fn new(backend: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mut base = backend;
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            base: base.as_str().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    /// Backend URL for a request: base path joined with the request path, query kept.
    pub fn target_url(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}{}", self.base, path_and_query)
    }

    /// Replay `request` against the backend.
    pub async fn forward(
        &self,
        request: Request,
        assertion: &IdentityAssertion,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let url = self.target_url(&parts.uri);

        let mut headers = strip_hop_by_hop(&parts.headers);
        headers.remove(header::HOST);
        headers.remove(header::AUTHORIZATION);
        if let Some(bearer) = assertion.bearer() {
            headers.insert(header::AUTHORIZATION, bearer);
        }
        headers.remove(&X_FORWARDED_FOR);
        if let Some(value) = client_addr.and_then(|a| HeaderValue::from_str(&a.ip().to_string()).ok())
        {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }

        let mut outbound = self
            .client
            .request(parts.method.clone(), &url)
            .headers(headers);
        if has_body(&parts.headers) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = tokio::time::timeout(self.timeout, outbound.send())
            .await
            .map_err(|_| {
                GatewayError::BackendUnavailable(format!(
                    "timed out {}: no response within {:?}",
                    url, self.timeout
                ))
            })?
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "unreachable" };
                GatewayError::BackendUnavailable(format!("{} {}: {}", reason, url, e))
            })?;

        let status = upstream.status();
        let response_headers = strip_hop_by_hop(upstream.headers());
        debug!(method = %parts.method, url = %url, status = %status, "Backend responded");

        let stream = upstream
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Fallback handler for proxy profiles.
pub async fn forward_handler(State(state): State<ProfileState>, request: Request) -> Response {
    let Some(forwarder) = state.forwarder.as_deref() else {
        return GatewayError::Internal("profile has no backend".to_string()).into_response();
    };
    let Some(assertion) = request.extensions().get::<IdentityAssertion>().cloned() else {
        return GatewayError::Unauthorized.into_response();
    };
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match forwarder.forward(request, &assertion, client_addr).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

fn has_body(headers: &HeaderMap) -> bool {
    headers.contains_key(header::TRANSFER_ENCODING)
        || headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() != "0")
}

/// Copy `headers` minus hop-by-hop ones, including any named in `Connection`.
fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name_str = name.as_str();
        if HOP_BY_HOP.contains(&name_str) || listed.iter().any(|l| l == name_str) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
