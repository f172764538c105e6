use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{Credential, IdentityProvider, ProviderError, ProviderProfile, ProviderToken};
use crate::config::OAuthConfig;

/// Google OAuth2 client: consent URL, code exchange and user-info lookup.
pub struct GoogleProvider {
    http: reqwest::Client,
    config: OAuthConfig,
    redirect_url: String,
}

/// Wire shape of Google's token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<TokenEndpointResponse> for ProviderToken {
    fn from(response: TokenEndpointResponse) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        }
    }
}

impl GoogleProvider {
    pub fn new(config: OAuthConfig, hostname: &str) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let redirect_url = config.redirect_url(hostname);

        Ok(Self {
            http,
            config,
            redirect_url,
        })
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self) -> String {
        let scope = self.config.scopes.join(" ");
        match url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", self.config.state.as_str()),
                ("access_type", "offline"),
            ],
        ) {
            Ok(url) => url.into(),
            Err(e) => {
                tracing::error!("Invalid OAuth authorization URL '{}': {}", self.config.auth_url, e);
                self.config.auth_url.clone()
            }
        }
    }

    fn expected_state(&self) -> &str {
        &self.config.state
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Rejected(response.status().as_u16()));
        }

        let token = response
            .json::<TokenEndpointResponse>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(token.into())
    }

    async fn user_info(&self, credential: &Credential) -> Result<ProviderProfile, ProviderError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Rejected(response.status().as_u16()));
        }

        let profile = response
            .json::<ProviderProfile>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if profile.sub.is_empty() {
            return Err(ProviderError::Decode("user info has no subject".to_string()));
        }
        Ok(profile)
    }
}
