//! OAuth 2.0 authorization-code flow for the Palisade gateway.
//!
//! # Components
//!
//! - [`state`]: the requested path carried through the provider in `state`
//! - [`oauth`]: authorize URL construction and code-for-token exchange
//! - [`token`]: token endpoint response and identity-assertion lookup
//! - [`flow`]: start/complete orchestration producing a [`Session`]

pub mod error;
pub mod flow;
pub mod oauth;
pub mod state;
pub mod token;

pub use error::{FlowError, Result};
pub use flow::{AuthorizationFlow, CallbackParams, CompletedFlow, Session};
pub use oauth::{OAuthClient, build_authorization_url};
pub use state::{LOGIN_PATH, ROOT_PATH, decode_state, encode_state, redirect_target};
pub use token::TokenResponse;
