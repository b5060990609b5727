//! Session persistence in a per-profile browser cookie.
//!
//! The cookie value is the identity assertion itself. Nothing is stored
//! server-side, so sessions survive restarts and there is no revocation
//! beyond clearing the cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use palisade_oauth::Session;
use time::OffsetDateTime;

/// Prefix of every session cookie; the profile name follows.
pub const COOKIE_PREFIX: &str = "session_";

/// No usable session cookie on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no session")]
pub struct NoSession;

/// Reads and writes the session cookie of one profile.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    cookie_name: String,
}

impl SessionCodec {
    pub fn for_profile(profile_name: &str) -> Self {
        Self {
            cookie_name: format!("{}{}", COOKIE_PREFIX, profile_name),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Attach the session cookie. Expiry follows the token; no expiry, or one
    /// past what a cookie date can carry, means a browser-session cookie.
    pub fn save(&self, jar: CookieJar, session: &Session) -> CookieJar {
        let mut cookie = self.base_cookie(session.identity_assertion.clone());
        if let Some(expires) = session
            .expires_at
            .and_then(|at| OffsetDateTime::from_unix_timestamp(at.timestamp()).ok())
        {
            cookie.set_expires(expires);
        }

        tracing::debug!(
            cookie = %self.cookie_name,
            token_prefix = session.assertion_prefix(),
            expires = ?session.expires_at,
            "Saved session"
        );
        jar.add(cookie)
    }

    /// Read the session from the request cookies. Absent and empty are both
    /// [`NoSession`].
    pub fn load(&self, jar: &CookieJar) -> Result<Session, NoSession> {
        let cookie = jar.get(&self.cookie_name).ok_or_else(|| {
            tracing::debug!(cookie = %self.cookie_name, "No session cookie");
            NoSession
        })?;

        if cookie.value().is_empty() {
            tracing::debug!(cookie = %self.cookie_name, "Empty session cookie");
            return Err(NoSession);
        }

        Ok(Session::new(cookie.value(), None))
    }

    /// Overwrite the cookie with an empty, already-expired one.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = self.base_cookie(String::new());
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(time::Duration::ZERO);
        tracing::debug!(cookie = %self.cookie_name, "Cleared session");
        jar.add(cookie)
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .build()
    }
}
