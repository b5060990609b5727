//! Flow State: the originally requested path, round-tripped through the
//! identity provider in the `state` parameter.
//!
//! The encoding is URL-safe base64 with padding. It is reversible and neither
//! encrypted nor signed, so anything decoded from it is treated as untrusted:
//! only same-origin relative paths are accepted as redirect targets.

use base64::{Engine, engine::general_purpose::URL_SAFE};

/// Path of the login route. Never used as a post-login target.
pub const LOGIN_PATH: &str = "/login";

/// Fallback redirect target.
pub const ROOT_PATH: &str = "/";

/// Encode a request target (path plus optional query) into a state token.
///
/// The login path is normalized to `/` so that finishing a login never lands
/// on `/login` again.
pub fn encode_state(target: &str) -> String {
    let target = if target.eq_ignore_ascii_case(LOGIN_PATH) {
        ROOT_PATH
    } else {
        target
    };
    URL_SAFE.encode(target.as_bytes())
}

/// Decode a state token back into a same-origin path.
///
/// Returns `None` when the token is not valid base64, not UTF-8, or does not
/// decode to a relative path on this origin.
pub fn decode_state(state: &str) -> Option<String> {
    let bytes = URL_SAFE.decode(state.trim()).ok()?;
    let path = String::from_utf8(bytes).ok()?;
    is_same_origin_path(&path).then_some(path)
}

/// Resolve the post-login redirect from an optional state token.
pub fn redirect_target(state: Option<&str>) -> String {
    match state.filter(|s| !s.is_empty()) {
        Some(state) => match decode_state(state) {
            Some(path) => {
                tracing::debug!(path = %path, "Decoded redirect path");
                path
            }
            None => {
                tracing::warn!(state = %state, "Rejected state parameter, redirecting to root");
                ROOT_PATH.to_string()
            }
        },
        None => {
            tracing::debug!("State parameter is empty");
            ROOT_PATH.to_string()
        }
    }
}

/// A path is same-origin when it starts with exactly one `/` and cannot be
/// read by a browser as a scheme-relative or absolute URL.
fn is_same_origin_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for path in ["/", "/dashboard", "/a/b?c=d&e=f", "/search?q=%20x", "/ünïcode"] {
            assert_eq!(decode_state(&encode_state(path)).as_deref(), Some(path));
        }
    }

    #[test]
    fn test_login_path_normalized() {
        assert_eq!(decode_state(&encode_state("/login")).as_deref(), Some("/"));
        assert_eq!(decode_state(&encode_state("/LOGIN")).as_deref(), Some("/"));
        // Only the bare login path is special
        assert_eq!(
            decode_state(&encode_state("/login/help")).as_deref(),
            Some("/login/help")
        );
    }

    #[test]
    fn test_encoding_is_url_safe_base64_with_padding() {
        assert_eq!(encode_state("/dashboard"), "L2Rhc2hib2FyZA==");
    }

    #[test]
    fn test_rejects_offsite_targets() {
        for target in [
            "https://evil.example/",
            "//evil.example",
            "/\\evil.example",
            "evil",
            "",
            "/ok\r\nSet-Cookie: x=y",
        ] {
            assert_eq!(decode_state(&URL_SAFE.encode(target)), None, "{target:?}");
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(decode_state("not base64!!"), None);
        assert_eq!(decode_state(&URL_SAFE.encode([0xff, 0xfe, 0x00])), None);
    }

    #[test]
    fn test_redirect_target_fallbacks() {
        assert_eq!(redirect_target(None), "/");
        assert_eq!(redirect_target(Some("")), "/");
        assert_eq!(redirect_target(Some("%%%")), "/");
        assert_eq!(redirect_target(Some(&encode_state("/x"))), "/x");
    }
}
