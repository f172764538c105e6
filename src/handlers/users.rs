use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::database::models::{Role, User};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{authenticate, AccessToken, EntityId, ValidJson};
use crate::policy::{authorize, user_update_scope, Resource, UserUpdateScope};
use crate::server::AppState;
use crate::types::Action;

/// Body of PUT /v1/users/:id. Absent fields are left unchanged; fields the
/// caller may not change are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub birthdate: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub profile_picture_url: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdateRequest {
    fn validate(&self) -> ApiResult<()> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::invalid_input("invalid user: name cannot be empty"));
        }
        Ok(())
    }

    /// Copies the permitted field groups onto `user`.
    fn apply(self, user: &mut User, scope: UserUpdateScope) {
        if scope.profile {
            if let Some(name) = self.name {
                user.name = name;
            }
            if let Some(birthdate) = self.birthdate {
                user.birthdate = Some(birthdate);
            }
            if let Some(gender) = self.gender {
                user.gender = gender;
            }
            if let Some(url) = self.profile_picture_url {
                user.profile_picture_url = url;
            }
            if let Some(description) = self.description {
                user.description = description;
            }
            if let Some(short_description) = self.short_description {
                user.short_description = short_description;
            }
        }
        if scope.role {
            if let Some(role) = self.role {
                user.role = role;
            }
        }
    }
}

/// GET /v1/users
pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = state.users.get_all().await.map_err(|e| {
        tracing::error!("Could not list users: {}", e);
        ApiError::internal_error("could not get users")
    })?;
    Ok(Json(users))
}

/// GET /v1/users/:id
pub async fn get(State(state): State<AppState>, EntityId(id): EntityId) -> ApiResult<Json<User>> {
    let user = state
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user with provided id not found"))?;
    Ok(Json(user))
}

/// PUT /v1/users/:id - the user themself or an Administrator
pub async fn update(
    State(state): State<AppState>,
    token: AccessToken,
    EntityId(id): EntityId,
    ValidJson(payload): ValidJson<UserUpdateRequest>,
) -> ApiResult<Json<User>> {
    payload.validate()?;
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to update a user",
    )
    .await?;

    let mut user = state
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user with provided id not found"))?;

    authorize(Some(&caller), Action::Update, Resource::User(&user))
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} denied update of user {}", caller.id, id);
            ApiError::from(denial)
        })?;

    let scope = user_update_scope(&caller, &user);
    let previous_role = user.role;
    payload.apply(&mut user, scope);

    let user = state.users.update(&user).await?;
    if user.role != previous_role {
        tracing::info!(
            "User {} changed role of user {} from {} to {}",
            caller.id,
            user.id,
            previous_role,
            user.role
        );
    }
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryUsers;

    fn request() -> UserUpdateRequest {
        UserUpdateRequest {
            name: Some("Renamed".to_string()),
            description: Some("Bio".to_string()),
            role: Some(Role::Administrator),
            ..UserUpdateRequest::default()
        }
    }

    #[test]
    fn profile_scope_leaves_role_alone() {
        let mut user = MemoryUsers::user(1, "sub", "Original");
        request().apply(&mut user, UserUpdateScope { profile: true, role: false });
        assert_eq!(user.name, "Renamed");
        assert_eq!(user.description, "Bio");
        assert_eq!(user.role, Role::Reader);
    }

    #[test]
    fn role_scope_leaves_profile_alone() {
        let mut user = MemoryUsers::user(1, "sub", "Original");
        request().apply(&mut user, UserUpdateScope { profile: false, role: true });
        assert_eq!(user.name, "Original");
        assert_eq!(user.role, Role::Administrator);
    }

    #[test]
    fn blank_name_is_rejected() {
        let payload = UserUpdateRequest {
            name: Some("  ".to_string()),
            ..UserUpdateRequest::default()
        };
        assert!(payload.validate().is_err());
    }
}
