//! Token endpoint response.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Field holding the identity assertion among the response's extension fields.
pub const ID_TOKEN_FIELD: &str = "id_token";

/// Response from the token endpoint.
///
/// Only the standard fields are typed; everything else (including the
/// identity assertion) lands in [`TokenResponse::extra`].
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds. Some providers send it as a string.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
    /// When the response was received; anchors `expires_in`.
    #[serde(skip, default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl TokenResponse {
    /// The identity assertion, if the provider included one as a non-empty string.
    pub fn identity_assertion(&self) -> Option<&str> {
        self.extra
            .get(ID_TOKEN_FIELD)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
    }

    /// Absolute expiry. `None` when the provider gave no lifetime, or one too
    /// large to represent.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .filter(|secs| *secs > 0)
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| self.received_at.checked_add_signed(lifetime))
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
