//! Per-profile state shared across handlers.

use std::sync::Arc;

use palisade_config::{Destination, Profile};
use palisade_oauth::{AuthorizationFlow, OAuthClient};

use crate::error::Result;
use crate::forward::Forwarder;
use crate::session::SessionCodec;

/// Everything a profile's handlers need. Built once at startup, cloned per request.
#[derive(Clone)]
pub struct ProfileState {
    /// The validated profile.
    pub profile: Arc<Profile>,

    /// Authorization-code flow for this profile's provider.
    pub flow: Arc<AuthorizationFlow>,

    /// Session cookie codec, keyed by profile name.
    pub sessions: SessionCodec,

    /// Backend forwarder. `None` in static mode.
    pub forwarder: Option<Arc<Forwarder>>,
}

impl ProfileState {
    /// Build the state for one profile. Both HTTP clients share the profile's timeout.
    pub fn new(profile: Profile) -> Result<Self> {
        let client = OAuthClient::new(profile.oauth.clone(), profile.request_timeout)?;

        let forwarder = match &profile.destination {
            Destination::Backend(url) => Some(Arc::new(Forwarder::new(
                url.clone(),
                profile.request_timeout,
            )?)),
            Destination::Static(_) => None,
        };

        Ok(Self {
            sessions: SessionCodec::for_profile(&profile.name),
            flow: Arc::new(AuthorizationFlow::new(client)),
            forwarder,
            profile: Arc::new(profile),
        })
    }

    /// Profile name, for log fields.
    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{proxy_profile, static_profile};

    #[test]
    fn test_proxy_state_has_forwarder() {
        let state = ProfileState::new(proxy_profile("p1", "http://up:9000")).unwrap();
        assert_eq!(state.name(), "p1");
        assert_eq!(state.sessions.cookie_name(), "session_p1");
        assert!(state.forwarder.is_some());
    }

    #[test]
    fn test_static_state_has_no_forwarder() {
        let state = ProfileState::new(static_profile("site", "/srv/site")).unwrap();
        assert!(state.forwarder.is_none());
    }
}
