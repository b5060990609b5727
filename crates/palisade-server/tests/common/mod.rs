//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use futures::StreamExt;
use palisade_config::{DEFAULT_SCOPES, Destination, OAuthSettings, Profile};
use palisade_server::ProfileRuntime;
use reqwest::{Client, redirect::Policy};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A stub identity provider answering the token endpoint with `body`.
pub async fn start_provider(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

/// A stub identity provider whose token endpoint answers only after `delay`.
pub async fn start_slow_provider(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id_token": "tok123"}))
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

/// A backend with timing problems.
///
/// `/stall` sleeps for `delay` before sending anything. `/drip` sends its
/// status at once, then `chunks` body chunks spaced `delay / chunks` apart.
pub async fn start_slow_backend(delay: Duration, chunks: u32) -> Result<String> {
    let app = Router::new()
        .route(
            "/stall",
            get(move || async move {
                tokio::time::sleep(delay).await;
                "late"
            }),
        )
        .route(
            "/drip",
            get(move || async move {
                let gap = delay / chunks;
                let stream = futures::stream::iter(0..chunks).then(move |i| async move {
                    tokio::time::sleep(gap).await;
                    Ok::<_, Infallible>(Bytes::from(format!("chunk{};", i)))
                });
                Body::from_stream(stream)
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

/// A backend that echoes what it received as JSON and counts hits.
pub struct TestBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl TestBackend {
    pub async fn start() -> Result<Self> {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .fallback(echo)
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, hits })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body: Bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let header = |headers: &HeaderMap, name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let status = if parts.uri.path() == "/created" {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    (
        status,
        [("x-backend", "stub")],
        axum::Json(serde_json::json!({
            "method": parts.method.as_str(),
            "path": parts.uri.path(),
            "query": parts.uri.query(),
            "authorization": header(&parts.headers, "authorization"),
            "x_forwarded_for": header(&parts.headers, "x-forwarded-for"),
            "host": header(&parts.headers, "host"),
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

pub fn oauth_settings(token_endpoint: &str) -> OAuthSettings {
    OAuthSettings {
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "https://gw.example/callback".to_string(),
        authorize_endpoint: "https://idp.example/authorize".to_string(),
        token_endpoint: token_endpoint.to_string(),
        scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn profile(name: &str, destination: Destination, token_endpoint: &str) -> Profile {
    Profile {
        name: name.to_string(),
        bind_address: "127.0.0.1:0".parse().unwrap(),
        destination,
        welcome_page: None,
        request_timeout: Duration::from_secs(5),
        oauth: oauth_settings(token_endpoint),
    }
}

pub fn proxy_profile(name: &str, backend: &str, provider: &MockServer) -> Profile {
    profile(
        name,
        Destination::Backend(Url::parse(backend).unwrap()),
        &format!("{}/token", provider.uri()),
    )
}

/// A profile runtime listening on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: Client,
}

impl TestGateway {
    pub async fn start(profile: Profile) -> Result<Self> {
        let runtime = ProfileRuntime::new(profile)?;
        let addr = runtime.run_with_shutdown(std::future::pending()).await?;

        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { addr, client })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// GET with a single cookie attached.
    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("cookie", cookie)
            .send()
            .await
            .unwrap()
    }
}

/// `name=value` part of the response's Set-Cookie header.
pub fn cookie_pair(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
}

/// Location header of a redirect.
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The raw (still percent-encoded) `state` parameter of an authorize URL.
pub fn state_param(authorize_url: &str) -> String {
    authorize_url
        .split(['?', '&'])
        .find_map(|kv| kv.strip_prefix("state="))
        .unwrap_or_default()
        .to_string()
}
