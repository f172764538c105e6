use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use crate::database::models::{Category, NewCategory};
use crate::database::DatabaseError;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{authenticate, AccessToken, EntityId, ValidJson};
use crate::policy::{authorize, Resource};
use crate::server::AppState;
use crate::types::Action;

/// Body of POST and PUT /v1/categories.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub image_url: String,
}

impl CategoryRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid_input("invalid category: name is required"));
        }
        Ok(())
    }
}

pub(crate) async fn load_category(state: &AppState, id: i64) -> ApiResult<Category> {
    state
        .categories
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("category not found"))
}

/// GET /v1/categories
pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let categories = state.categories.get_all().await.map_err(|e| {
        tracing::error!("Could not list categories: {}", e);
        ApiError::internal_error("could not get categories")
    })?;
    Ok(Json(categories))
}

/// GET /v1/categories/:id
pub async fn get(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<Category>> {
    Ok(Json(load_category(&state, id).await?))
}

/// POST /v1/categories - Administrator only
pub async fn create(
    State(state): State<AppState>,
    token: AccessToken,
    ValidJson(payload): ValidJson<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    payload.validate()?;
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to create a category",
    )
    .await?;

    authorize(Some(&caller), Action::Create, Resource::Categories)
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} denied category creation", caller.id);
            ApiError::from(denial)
        })?;

    let category = state
        .categories
        .create(NewCategory {
            name: payload.name,
            image_url: payload.image_url,
        })
        .await?;

    tracing::info!("Category {} created by user {}", category.id, caller.id);
    Ok(Json(category))
}

/// PUT /v1/categories/:id - Administrator only
pub async fn update(
    State(state): State<AppState>,
    token: AccessToken,
    EntityId(id): EntityId,
    ValidJson(payload): ValidJson<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    payload.validate()?;
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to update a category",
    )
    .await?;

    let mut category = load_category(&state, id).await?;

    authorize(Some(&caller), Action::Update, Resource::Category(&category))
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} denied update of category {}", caller.id, id);
            ApiError::from(denial)
        })?;

    category.name = payload.name;
    category.image_url = payload.image_url;

    let category = state.categories.update(&category).await?;
    Ok(Json(category))
}

/// DELETE /v1/categories/:id - Administrator only, and only once no article uses it
pub async fn delete(
    State(state): State<AppState>,
    token: AccessToken,
    EntityId(id): EntityId,
) -> ApiResult<impl IntoResponse> {
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to delete a category",
    )
    .await?;

    let category = load_category(&state, id).await?;

    authorize(Some(&caller), Action::Delete, Resource::Category(&category))
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} denied deletion of category {}", caller.id, id);
            ApiError::from(denial)
        })?;

    if state.articles.exists_in_category(category.id).await? {
        return Err(ApiError::invalid_input(
            "category is still used by articles and cannot be deleted",
        ));
    }

    state.categories.delete(category.id).await.map_err(|e| match e {
        err @ DatabaseError::ForeignKeyViolation(_) => ApiError::from(err),
        other => {
            tracing::error!("Could not delete category {}: {}", id, other);
            ApiError::internal_error("could not delete category")
        }
    })?;

    Ok(StatusCode::NO_CONTENT)
}
