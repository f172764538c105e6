use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    /// Creator of the article, never reassigned.
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub body: String,
    pub image_url: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub body: String,
    pub image_url: String,
    pub tags: String,
}

/// An article with its owner and category loaded alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub user: Option<User>,
    pub category: Option<Category>,
}
