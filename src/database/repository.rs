//! One capability trait per entity store. Handlers and the identity resolver
//! only ever see these traits; Postgres and in-memory implementations are
//! injected when the server state is built.

use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{Article, Category, NewArticle, NewCategory, NewUser, User};

#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Fails with `DatabaseError::UniqueViolation` when the subject already exists.
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn get(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn get_all(&self) -> Result<Vec<User>, DatabaseError>;
    async fn update(&self, user: &User) -> Result<User, DatabaseError>;
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
    async fn find_by_google_sub(&self, google_sub: &str) -> Result<Option<User>, DatabaseError>;
}

#[async_trait]
pub trait CategoriesRepository: Send + Sync {
    async fn create(&self, category: NewCategory) -> Result<Category, DatabaseError>;
    async fn get(&self, id: i64) -> Result<Option<Category>, DatabaseError>;
    async fn get_all(&self) -> Result<Vec<Category>, DatabaseError>;
    async fn update(&self, category: &Category) -> Result<Category, DatabaseError>;
    /// Fails with `DatabaseError::ForeignKeyViolation` while articles reference the category.
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ArticlesRepository: Send + Sync {
    async fn create(&self, article: NewArticle) -> Result<Article, DatabaseError>;
    async fn get(&self, id: i64) -> Result<Option<Article>, DatabaseError>;
    async fn get_all(&self) -> Result<Vec<Article>, DatabaseError>;
    async fn update(&self, article: &Article) -> Result<Article, DatabaseError>;
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
    /// Whether any article still references the category.
    async fn exists_in_category(&self, category_id: i64) -> Result<bool, DatabaseError>;
}
