//! Authorize URL construction and code-for-token exchange.

use std::time::Duration;

use palisade_config::OAuthSettings;
use reqwest::header;

use crate::error::{FlowError, Result};
use crate::token::TokenResponse;

/// Build the authorization URL for the OAuth flow.
///
/// Parameters are emitted in sorted key order and include an offline-access hint.
pub fn build_authorization_url(settings: &OAuthSettings, state: &str) -> String {
    let scope = settings.scopes.join(" ");
    let params = [
        ("access_type", "offline"),
        ("client_id", settings.client_id.as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", scope.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if settings.authorize_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };

    format!("{}{}{}", settings.authorize_endpoint, separator, query)
}

/// OAuth client for one profile. Built once at startup, shared read-only.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    settings: OAuthSettings,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Create a client whose token requests are bounded by `timeout`.
    pub fn new(settings: OAuthSettings, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlowError::Client(e.to_string()))?;
        Ok(Self { settings, http })
    }

    /// Get the settings.
    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Authorization URL carrying `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        build_authorization_url(&self.settings, state)
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Any failure (transport, timeout, non-2xx, unparseable body) is
    /// [`FlowError::Exchange`]; nothing is retried.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.settings.token_endpoint)
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| FlowError::Exchange(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FlowError::Exchange(format!(
                "provider responded {}: {}",
                status,
                truncate(&error_text, 256)
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| FlowError::Exchange(format!("Failed to parse token response: {}", e)))?;

        tracing::debug!(
            token_type = tokens.token_type.as_deref().unwrap_or("unknown"),
            expires_in = ?tokens.expires_in,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Token exchange succeeded"
        );

        Ok(tokens)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(token_endpoint: &str) -> OAuthSettings {
        OAuthSettings {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://gw.example/callback".to_string(),
            authorize_endpoint: "https://idp.example/authorize".to_string(),
            token_endpoint: token_endpoint.to_string(),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        }
    }

    #[test]
    fn test_authorization_url() {
        let url = build_authorization_url(&settings("https://idp.example/token"), "L2Rhc2g=");

        assert_eq!(
            url,
            "https://idp.example/authorize?access_type=offline&client_id=cid\
             &redirect_uri=https%3A%2F%2Fgw.example%2Fcallback&response_type=code\
             &scope=openid%20email%20profile&state=L2Rhc2g%3D"
        );
    }

    #[test]
    fn test_authorization_url_with_existing_query() {
        let mut s = settings("https://idp.example/token");
        s.authorize_endpoint = "https://idp.example/authorize?tenant=x".to_string();

        let url = build_authorization_url(&s, "st");
        assert!(url.starts_with("https://idp.example/authorize?tenant=x&access_type=offline"));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header_matcher("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_secret=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "token_type": "Bearer",
                "expires_in": 3600,
                "id_token": "tok123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OAuthClient::new(settings(&format!("{}/token", server.uri())), Duration::from_secs(5))
                .unwrap();
        let tokens = client.exchange_code("abc").await.unwrap();

        assert_eq!(tokens.identity_assertion(), Some("tok123"));
        assert_eq!(tokens.expires_in, Some(3600));
        assert!(tokens.expires_at().is_some());
    }

    #[tokio::test]
    async fn test_exchange_code_provider_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let client =
            OAuthClient::new(settings(&format!("{}/token", server.uri())), Duration::from_secs(5))
                .unwrap();
        let err = client.exchange_code("stale").await.unwrap_err();

        match err {
            FlowError::Exchange(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client =
            OAuthClient::new(settings(&format!("{}/token", server.uri())), Duration::from_secs(5))
                .unwrap();
        assert!(matches!(
            client.exchange_code("abc").await.unwrap_err(),
            FlowError::Exchange(_)
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_unreachable() {
        // Nothing listens on port 9 (discard) in test environments.
        let client = OAuthClient::new(settings("http://127.0.0.1:9/token"), Duration::from_secs(2))
            .unwrap();
        assert!(matches!(
            client.exchange_code("abc").await.unwrap_err(),
            FlowError::Exchange(_)
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("hé", 5), "hé");
    }
}
