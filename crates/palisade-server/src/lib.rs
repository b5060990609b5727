//! Per-profile HTTP runtime for the Palisade gateway.
//!
//! Each profile gets its own listener, cookie name, OAuth client and
//! downstream. Profiles share nothing at runtime.
//!
//! # Request pipeline
//!
//! - `/login`, `/callback`, `/logout` run the authorization-code flow
//! - every other path passes the [access gate](gate::access_gate)
//! - authenticated requests are reverse-proxied to the backend, or served
//!   from the static directory
//!
//! # Example
//!
//! ```ignore
//! use palisade_server::ProfileRuntime;
//!
//! let loaded = palisade_config::load_config(None)?;
//! for profile in loaded.profiles {
//!     let runtime = ProfileRuntime::new(profile)?;
//!     tokio::spawn(runtime.run());
//! }
//! ```

pub mod error;
pub mod flow;
pub mod forward;
pub mod gate;
pub mod session;
pub mod state;

pub use error::{GatewayError, Result};
pub use forward::Forwarder;
pub use gate::{CALLBACK_PATH, FLOW_PATHS, IdentityAssertion, LOGOUT_PATH, access_gate};
pub use session::{COOKIE_PREFIX, NoSession, SessionCodec};
pub use state::ProfileState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, extract::Request, middleware, routing::get};
use palisade_config::{Destination, Profile};
use palisade_oauth::LOGIN_PATH;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

/// The listener and router of one profile.
pub struct ProfileRuntime {
    state: ProfileState,
}

impl ProfileRuntime {
    /// Build the runtime for a validated profile.
    pub fn new(profile: Profile) -> Result<Self> {
        Ok(Self::from_state(ProfileState::new(profile)?))
    }

    /// Create a runtime from pre-built state.
    pub fn from_state(state: ProfileState) -> Self {
        Self { state }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.profile.bind_address
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let name = self.state.name().to_string();

        let router = Router::new()
            .route(LOGIN_PATH, get(flow::login))
            .route(CALLBACK_PATH, get(flow::callback))
            .route(LOGOUT_PATH, get(flow::logout));

        let router = match &self.state.profile.destination {
            Destination::Backend(_) => router.fallback(forward::forward_handler),
            Destination::Static(root) => router.fallback_service(ServeDir::new(root)),
        };

        router
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                gate::access_gate,
            ))
            .layer(
                TraceLayer::new_for_http().make_span_with(move |request: &Request| {
                    tracing::info_span!(
                        "request",
                        profile = %name,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .with_state(self.state.clone())
    }

    /// Bind the profile's listener. Failing to bind is fatal for the gateway.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.bind_address();
        TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Internal(format!("Failed to read local address: {}", e)))?;
        info!(
            profile = %self.name(),
            addr = %local_addr,
            destination = %self.state.profile.destination,
            "Starting profile"
        );

        let router = self.router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::Internal(format!("Server error: {}", e)))?;

        info!(profile = %self.name(), "Profile stopped");
        Ok(())
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Bind, then serve in the background until `shutdown` resolves. Returns the bound address.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<SocketAddr> {
        let listener = self.bind().await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Internal(format!("Failed to read local address: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = self.serve(listener, shutdown).await {
                tracing::error!(error = %e, "Profile runtime failed");
            }
        });

        Ok(local_addr)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{proxy_profile, static_profile};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_login_route() {
        let runtime = ProfileRuntime::new(proxy_profile("p1", "http://up:9000")).unwrap();
        let response = runtime
            .router()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_static_router_serves_files_behind_gate() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();
        let root = dir.path().to_str().unwrap();

        let router = ProfileRuntime::new(static_profile("site", root)).unwrap().router();

        let anonymous = router
            .clone()
            .oneshot(Request::get("/hello.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::FOUND);

        let authed = router
            .oneshot(
                Request::get("/hello.txt")
                    .header(header::COOKIE, "session_site=tok123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(authed.status(), StatusCode::OK);
        assert_eq!(authed.headers()[header::AUTHORIZATION], "Bearer tok123");
        let body = axum::body::to_bytes(authed.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hi");
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut profile = proxy_profile("p1", "http://up:9000");
        profile.bind_address = taken.local_addr().unwrap();

        let err = ProfileRuntime::new(profile).unwrap().bind().await.unwrap_err();
        assert!(matches!(err, GatewayError::Bind { .. }));
    }
}
