//! Access-token resolution.
//!
//! A request carries an opaque [`Credential`] in the `AccessToken` header. An
//! [`IdentityProvider`] turns it into the provider's profile of the signed-in
//! account, and the [`IdentityResolver`] maps that profile onto a stored
//! [`User`](crate::database::models::User), creating one on first login.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod google;
pub mod resolver;

pub use google::GoogleProvider;
pub use resolver::{IdentityError, IdentityResolver};

/// Header carrying the bearer value on authenticated requests.
pub const ACCESS_TOKEN_HEADER: &str = "AccessToken";

/// Opaque bearer value presented by a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Never print the token itself.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Account details returned by the provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ProviderProfile {
    /// Stable subject identifier, the join key onto stored users.
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

/// Token issued by the provider at the end of the authorization-code flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider rejected the request with status {0}")]
    Rejected(u16),

    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// Pluggable strategy for turning credentials into provider identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page the login endpoint redirects the browser to.
    fn authorize_url(&self) -> String;

    /// Anti-forgery value that must come back on the callback.
    fn expected_state(&self) -> &str;

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError>;

    async fn user_info(&self, credential: &Credential) -> Result<ProviderProfile, ProviderError>;
}
