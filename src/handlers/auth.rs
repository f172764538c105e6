use axum::{
    extract::{Query, State},
    response::{Json, Redirect},
};
use serde::Deserialize;

use crate::auth::{Credential, IdentityError, ProviderToken};
use crate::database::models::User;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{authenticate, AccessToken};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// GET /v1/auth - the user the presented access token belongs to
pub async fn current_user(
    State(state): State<AppState>,
    token: AccessToken,
) -> ApiResult<Json<User>> {
    let user = authenticate(&state.identity, &token, "invalid access token").await?;
    Ok(Json(user))
}

/// GET /v1/auth/google-login - entry point of the OAuth2 flow
pub async fn google_login(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.identity.provider().authorize_url())
}

/// GET /v1/auth/google-callback - finishes the OAuth2 flow
///
/// Exchanges the provider's code for a token, makes sure a user exists for
/// the signed-in account and hands the token back to the client, which
/// presents it in the `AccessToken` header from then on.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Json<ProviderToken>> {
    let provider = state.identity.provider();

    if query.state.as_deref() != Some(provider.expected_state()) {
        tracing::warn!("OAuth callback with mismatched state");
        return Err(ApiError::invalid_input("state did not match"));
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::invalid_input("missing authorization code"))?;

    let token = provider.exchange_code(&code).await.map_err(|e| {
        tracing::warn!("OAuth code exchange failed: {}", e);
        ApiError::invalid_input(format!("failed to exchange token: {}", e))
    })?;

    let user = state
        .identity
        .resolve(&Credential::new(token.access_token.clone()))
        .await
        .map_err(|e| match e {
            IdentityError::Unauthenticated => ApiError::invalid_input("failed to get user info"),
            other => other.into(),
        })?;

    tracing::info!("User {} signed in", user.id);
    Ok(Json(token))
}
