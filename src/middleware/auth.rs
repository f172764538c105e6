use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::auth::{Credential, IdentityError, IdentityResolver, ACCESS_TOKEN_HEADER};
use crate::database::models::User;
use crate::error::ApiError;

/// The `AccessToken` header, read but not yet resolved.
///
/// Resolution is left to the handler so that request parsing always runs
/// before the identity provider is contacted.
#[derive(Debug, Clone)]
pub struct AccessToken(pub Option<Credential>);

#[async_trait]
impl<S> FromRequestParts<S> for AccessToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Credential::new);

        Ok(Self(credential))
    }
}

/// Resolves the presented token to a user, or fails with `Unauthenticated`
/// carrying the endpoint-specific `message`.
pub async fn authenticate(
    resolver: &IdentityResolver,
    token: &AccessToken,
    message: &str,
) -> Result<User, ApiError> {
    let credential = token.0.as_ref().ok_or_else(|| {
        tracing::debug!("Request without {} header", ACCESS_TOKEN_HEADER);
        ApiError::unauthenticated(message)
    })?;

    match resolver.resolve(credential).await {
        Ok(user) => Ok(user),
        Err(IdentityError::Unauthenticated) => Err(ApiError::unauthenticated(message)),
        Err(other) => Err(other.into()),
    }
}
