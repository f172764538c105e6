use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use crate::database::models::{Article, ArticleDetail, NewArticle};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{authenticate, AccessToken, EntityId, ValidJson};
use crate::policy::{authorize, Resource};
use crate::server::AppState;
use crate::types::Action;

/// Body of POST and PUT /v1/articles.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRequest {
    pub category_id: i64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub tags: String,
}

impl ArticleRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.title.trim().is_empty() {
            return Err(ApiError::invalid_input("invalid article: title is required"));
        }
        Ok(())
    }
}

async fn load_article(state: &AppState, id: i64) -> ApiResult<Article> {
    state
        .articles
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("article not found"))
}

/// Referenced categories must exist; a dangling id is a client error.
async fn ensure_category_exists(state: &AppState, category_id: i64) -> ApiResult<()> {
    match state.categories.get(category_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::invalid_input(
            "category with provided id could not be retrieved",
        )),
    }
}

/// Loads the owner and category alongside the article.
async fn with_associations(state: &AppState, article: Article) -> ApiResult<ArticleDetail> {
    let user = state.users.get(article.user_id).await?;
    let category = state.categories.get(article.category_id).await?;
    Ok(ArticleDetail {
        article,
        user,
        category,
    })
}

/// GET /v1/articles
pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<ArticleDetail>>> {
    let articles = state.articles.get_all().await.map_err(|e| {
        tracing::error!("Could not list articles: {}", e);
        ApiError::internal_error("could not get articles")
    })?;

    let mut details = Vec::with_capacity(articles.len());
    for article in articles {
        details.push(with_associations(&state, article).await?);
    }
    Ok(Json(details))
}

/// GET /v1/articles/:id
pub async fn get(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ApiResult<Json<ArticleDetail>> {
    let article = load_article(&state, id).await?;
    Ok(Json(with_associations(&state, article).await?))
}

/// POST /v1/articles - Writers and Administrators
pub async fn create(
    State(state): State<AppState>,
    token: AccessToken,
    ValidJson(payload): ValidJson<ArticleRequest>,
) -> ApiResult<Json<ArticleDetail>> {
    payload.validate()?;
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to create an article",
    )
    .await?;

    authorize(Some(&caller), Action::Create, Resource::Articles)
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} ({}) denied article creation", caller.id, caller.role);
            ApiError::from(denial)
        })?;

    ensure_category_exists(&state, payload.category_id).await?;

    let article = state
        .articles
        .create(NewArticle {
            user_id: caller.id,
            category_id: payload.category_id,
            title: payload.title,
            body: payload.body,
            image_url: payload.image_url,
            tags: payload.tags,
        })
        .await?;

    tracing::info!("Article {} created by user {}", article.id, caller.id);
    Ok(Json(with_associations(&state, article).await?))
}

/// PUT /v1/articles/:id - owner only
pub async fn update(
    State(state): State<AppState>,
    token: AccessToken,
    EntityId(id): EntityId,
    ValidJson(payload): ValidJson<ArticleRequest>,
) -> ApiResult<Json<ArticleDetail>> {
    payload.validate()?;
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to update an article",
    )
    .await?;

    let mut article = load_article(&state, id).await?;

    authorize(Some(&caller), Action::Update, Resource::Article(&article))
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} denied update of article {}", caller.id, id);
            ApiError::from(denial)
        })?;

    ensure_category_exists(&state, payload.category_id).await?;

    article.category_id = payload.category_id;
    article.title = payload.title;
    article.body = payload.body;
    article.image_url = payload.image_url;
    article.tags = payload.tags;

    let article = state.articles.update(&article).await?;
    Ok(Json(with_associations(&state, article).await?))
}

/// DELETE /v1/articles/:id - owner or Administrator
pub async fn delete(
    State(state): State<AppState>,
    token: AccessToken,
    EntityId(id): EntityId,
) -> ApiResult<impl IntoResponse> {
    let caller = authenticate(
        &state.identity,
        &token,
        "you must be authenticated to delete an article",
    )
    .await?;

    let article = load_article(&state, id).await?;

    authorize(Some(&caller), Action::Delete, Resource::Article(&article))
        .into_result()
        .map_err(|denial| {
            tracing::warn!("User {} denied deletion of article {}", caller.id, id);
            ApiError::from(denial)
        })?;

    state.articles.delete(article.id).await.map_err(|e| {
        tracing::error!("Could not delete article {}: {}", id, e);
        ApiError::internal_error("could not delete article")
    })?;

    Ok(StatusCode::NO_CONTENT)
}
