use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::database::models::{Article, Category, NewArticle, NewCategory, NewUser, Role, User};
use crate::database::repository::{ArticlesRepository, CategoriesRepository, UsersRepository};

const USER_COLUMNS: &str = "id, google_sub, name, birthdate, gender, profile_picture_url, \
     description, short_description, role, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, image_url, created_at, updated_at";

const ARTICLE_COLUMNS: &str =
    "id, user_id, category_id, title, body, image_url, tags, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User, DatabaseError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        google_sub: row.try_get("google_sub")?,
        name: row.try_get("name")?,
        birthdate: row.try_get("birthdate")?,
        gender: row.try_get("gender")?,
        profile_picture_url: row.try_get("profile_picture_url")?,
        description: row.try_get("description")?,
        short_description: row.try_get("short_description")?,
        role: role.parse::<Role>().map_err(DatabaseError::InvalidValue)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, DatabaseError> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn article_from_row(row: &PgRow) -> Result<Article, DatabaseError> {
    Ok(Article {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        category_id: row.try_get("category_id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        image_url: row.try_get("image_url")?,
        tags: row.try_get("tags")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Maps a zero-row DELETE onto `NotFound`.
fn expect_deleted(rows_affected: u64, what: &str, id: i64) -> Result<(), DatabaseError> {
    if rows_affected == 0 {
        return Err(DatabaseError::NotFound(format!("{} {} not found", what, id)));
    }
    Ok(())
}

pub struct PgUsersRepository {
    pool: PgPool,
}

impl PgUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        let query = format!(
            "INSERT INTO users (google_sub, name, profile_picture_url, role) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(&user.google_sub)
            .bind(&user.name)
            .bind(&user.profile_picture_url)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        user_from_row(&row)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_all(&self) -> Result<Vec<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update(&self, user: &User) -> Result<User, DatabaseError> {
        let query = format!(
            "UPDATE users SET name = $2, birthdate = $3, gender = $4, profile_picture_url = $5, \
             description = $6, short_description = $7, role = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(user.birthdate)
            .bind(&user.gender)
            .bind(&user.profile_picture_url)
            .bind(&user.description)
            .bind(&user.short_description)
            .bind(user.role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {} not found", user.id)))?;
        user_from_row(&row)
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_deleted(result.rows_affected(), "user", id)
    }

    async fn find_by_google_sub(&self, google_sub: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE google_sub = $1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(google_sub)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

pub struct PgCategoriesRepository {
    pool: PgPool,
}

impl PgCategoriesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoriesRepository for PgCategoriesRepository {
    async fn create(&self, category: NewCategory) -> Result<Category, DatabaseError> {
        let query = format!(
            "INSERT INTO categories (name, image_url) VALUES ($1, $2) RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(&category.name)
            .bind(&category.image_url)
            .fetch_one(&self.pool)
            .await?;
        category_from_row(&row)
    }

    async fn get(&self, id: i64) -> Result<Option<Category>, DatabaseError> {
        let query = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Category>, DatabaseError> {
        let query = format!("SELECT {} FROM categories ORDER BY id", CATEGORY_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn update(&self, category: &Category) -> Result<Category, DatabaseError> {
        let query = format!(
            "UPDATE categories SET name = $2, image_url = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.image_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("category {} not found", category.id)))?;
        category_from_row(&row)
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_deleted(result.rows_affected(), "category", id)
    }
}

pub struct PgArticlesRepository {
    pool: PgPool,
}

impl PgArticlesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticlesRepository for PgArticlesRepository {
    async fn create(&self, article: NewArticle) -> Result<Article, DatabaseError> {
        let query = format!(
            "INSERT INTO articles (user_id, category_id, title, body, image_url, tags) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ARTICLE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(article.user_id)
            .bind(article.category_id)
            .bind(&article.title)
            .bind(&article.body)
            .bind(&article.image_url)
            .bind(&article.tags)
            .fetch_one(&self.pool)
            .await?;
        article_from_row(&row)
    }

    async fn get(&self, id: i64) -> Result<Option<Article>, DatabaseError> {
        let query = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Article>, DatabaseError> {
        let query = format!("SELECT {} FROM articles ORDER BY id", ARTICLE_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(article_from_row).collect()
    }

    async fn update(&self, article: &Article) -> Result<Article, DatabaseError> {
        // user_id is never updated.
        let query = format!(
            "UPDATE articles SET category_id = $2, title = $3, body = $4, image_url = $5, \
             tags = $6, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ARTICLE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(article.id)
            .bind(article.category_id)
            .bind(&article.title)
            .bind(&article.body)
            .bind(&article.image_url)
            .bind(&article.tags)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("article {} not found", article.id)))?;
        article_from_row(&row)
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_deleted(result.rows_affected(), "article", id)
    }

    async fn exists_in_category(&self, category_id: i64) -> Result<bool, DatabaseError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM articles WHERE category_id = $1)")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
