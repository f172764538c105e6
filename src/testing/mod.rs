//! In-memory repositories and a static identity provider.
//!
//! These implement the same traits as the Postgres store and the Google
//! client, so the full router can be driven without a database or network.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::{
    Credential, IdentityProvider, IdentityResolver, ProviderError, ProviderProfile, ProviderToken,
};
use crate::database::manager::{DatabaseError, HealthCheck};
use crate::database::models::{Article, Category, NewArticle, NewCategory, NewUser, Role, User};
use crate::database::repository::{ArticlesRepository, CategoriesRepository, UsersRepository};
use crate::config::SecurityConfig;
use crate::server::{app, AppState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Row storage shared by the three in-memory repositories.
struct Table<T> {
    rows: Mutex<BTreeMap<i64, T>>,
    next_id: AtomicI64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Stores a row under a caller-chosen id and keeps later ids above it.
    fn insert(&self, id: i64, row: T) {
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        lock(&self.rows).insert(id, row);
    }

    fn get(&self, id: i64) -> Option<T> {
        lock(&self.rows).get(&id).cloned()
    }

    fn all(&self) -> Vec<T> {
        lock(&self.rows).values().cloned().collect()
    }

    fn replace(&self, id: i64, row: T, what: &str) -> Result<T, DatabaseError> {
        let mut rows = lock(&self.rows);
        match rows.get_mut(&id) {
            Some(slot) => {
                *slot = row.clone();
                Ok(row)
            }
            None => Err(DatabaseError::NotFound(format!("{} {} not found", what, id))),
        }
    }

    fn remove(&self, id: i64, what: &str) -> Result<(), DatabaseError> {
        lock(&self.rows)
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", what, id)))
    }
}

pub struct MemoryUsers {
    table: Table<User>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }

    /// A Reader with the given id, subject and name; other fields empty.
    pub fn user(id: i64, google_sub: &str, name: &str) -> User {
        let now = Utc::now();
        User {
            id,
            google_sub: google_sub.to_string(),
            name: name.to_string(),
            birthdate: None,
            gender: String::new(),
            profile_picture_url: String::new(),
            description: String::new(),
            short_description: String::new(),
            role: Role::Reader,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn insert(&self, user: User) {
        self.table.insert(user.id, user);
    }
}

impl Default for MemoryUsers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsersRepository for MemoryUsers {
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        // Check and insert under one lock, like the unique index would.
        let mut rows = lock(&self.table.rows);
        if rows.values().any(|u| u.google_sub == user.google_sub) {
            return Err(DatabaseError::UniqueViolation("users_google_sub_key".to_string()));
        }
        let id = self.table.allocate_id();
        let created = User {
            name: user.name,
            profile_picture_url: user.profile_picture_url,
            role: user.role,
            ..Self::user(id, &user.google_sub, "")
        };
        rows.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.table.get(id))
    }

    async fn get_all(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.table.all())
    }

    async fn update(&self, user: &User) -> Result<User, DatabaseError> {
        let updated = User {
            updated_at: Utc::now(),
            ..user.clone()
        };
        self.table.replace(user.id, updated, "user")
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        self.table.remove(id, "user")
    }

    async fn find_by_google_sub(&self, google_sub: &str) -> Result<Option<User>, DatabaseError> {
        Ok(lock(&self.table.rows)
            .values()
            .find(|u| u.google_sub == google_sub)
            .cloned())
    }
}

pub struct MemoryCategories {
    table: Table<Category>,
    articles: Option<Arc<MemoryArticles>>,
}

impl MemoryCategories {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            articles: None,
        }
    }

    /// Refuses deletes while `articles` still holds rows in the category,
    /// like the `articles.category_id` foreign key.
    pub fn referenced_by(articles: Arc<MemoryArticles>) -> Self {
        Self {
            table: Table::new(),
            articles: Some(articles),
        }
    }

    pub fn insert(&self, category: Category) {
        self.table.insert(category.id, category);
    }
}

impl Default for MemoryCategories {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoriesRepository for MemoryCategories {
    async fn create(&self, category: NewCategory) -> Result<Category, DatabaseError> {
        let now = Utc::now();
        let created = Category {
            id: self.table.allocate_id(),
            name: category.name,
            image_url: category.image_url,
            created_at: now,
            updated_at: now,
        };
        self.table.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<Category>, DatabaseError> {
        Ok(self.table.get(id))
    }

    async fn get_all(&self) -> Result<Vec<Category>, DatabaseError> {
        Ok(self.table.all())
    }

    async fn update(&self, category: &Category) -> Result<Category, DatabaseError> {
        let updated = Category {
            updated_at: Utc::now(),
            ..category.clone()
        };
        self.table.replace(category.id, updated, "category")
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        if let Some(articles) = &self.articles {
            if articles.exists_in_category(id).await? {
                return Err(DatabaseError::ForeignKeyViolation(
                    "articles_category_id_fkey".to_string(),
                ));
            }
        }
        self.table.remove(id, "category")
    }
}

pub struct MemoryArticles {
    table: Table<Article>,
}

impl MemoryArticles {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }

    pub fn insert(&self, article: Article) {
        self.table.insert(article.id, article);
    }
}

impl Default for MemoryArticles {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticlesRepository for MemoryArticles {
    async fn create(&self, article: NewArticle) -> Result<Article, DatabaseError> {
        let now = Utc::now();
        let created = Article {
            id: self.table.allocate_id(),
            user_id: article.user_id,
            category_id: article.category_id,
            title: article.title,
            body: article.body,
            image_url: article.image_url,
            tags: article.tags,
            created_at: now,
            updated_at: now,
        };
        self.table.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<Article>, DatabaseError> {
        Ok(self.table.get(id))
    }

    async fn get_all(&self) -> Result<Vec<Article>, DatabaseError> {
        Ok(self.table.all())
    }

    async fn update(&self, article: &Article) -> Result<Article, DatabaseError> {
        let stored = self
            .table
            .get(article.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("article {} not found", article.id)))?;
        let updated = Article {
            user_id: stored.user_id,
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..article.clone()
        };
        self.table.replace(article.id, updated, "article")
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        self.table.remove(id, "article")
    }

    async fn exists_in_category(&self, category_id: i64) -> Result<bool, DatabaseError> {
        Ok(self
            .table
            .all()
            .iter()
            .any(|article| article.category_id == category_id))
    }
}

/// Identity provider answering from fixed token and code tables.
#[derive(Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, ProviderProfile>,
    codes: HashMap<String, ProviderToken>,
}

pub const STATIC_STATE: &str = "ingenialists";

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, profile: ProviderProfile) -> Self {
        self.tokens.insert(token.to_string(), profile);
        self
    }

    /// Registers an authorization code that exchanges into `access_token`.
    pub fn with_code(mut self, code: &str, access_token: &str) -> Self {
        self.codes.insert(
            code.to_string(),
            ProviderToken {
                access_token: access_token.to_string(),
                token_type: "Bearer".to_string(),
                refresh_token: None,
                expires_in: Some(3600),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    fn authorize_url(&self) -> String {
        format!("https://provider.test/authorize?state={}", STATIC_STATE)
    }

    fn expected_state(&self) -> &str {
        STATIC_STATE
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.codes.get(code).cloned().ok_or(ProviderError::Rejected(400))
    }

    async fn user_info(&self, credential: &Credential) -> Result<ProviderProfile, ProviderError> {
        self.tokens
            .get(credential.as_str())
            .cloned()
            .ok_or(ProviderError::Rejected(401))
    }
}

pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub fn profile(sub: &str, name: &str) -> ProviderProfile {
    ProviderProfile {
        sub: sub.to_string(),
        name: name.to_string(),
        picture: format!("https://img.test/{}.png", sub),
    }
}

/// Seeded application state for router tests.
///
/// | token           | user id | role          |
/// |-----------------|---------|---------------|
/// | `Administrator` | 1       | Administrator |
/// | `Writer`        | 2       | Writer        |
/// | `OtherWriter`   | 3       | Writer        |
/// | `Reader`        | 4       | Reader        |
/// | `Newcomer`      | -       | not stored    |
///
/// Code `valid-code` exchanges into the `Newcomer` token.
pub struct TestContext {
    pub users: Arc<MemoryUsers>,
    pub categories: Arc<MemoryCategories>,
    pub articles: Arc<MemoryArticles>,
    pub state: AppState,
}

pub const ADMIN_ID: i64 = 1;
pub const WRITER_ID: i64 = 2;
pub const OTHER_WRITER_ID: i64 = 3;
pub const READER_ID: i64 = 4;

impl TestContext {
    pub fn new() -> Self {
        let seeded = [
            (ADMIN_ID, "Administrator", Role::Administrator),
            (WRITER_ID, "Writer", Role::Writer),
            (OTHER_WRITER_ID, "OtherWriter", Role::Writer),
            (READER_ID, "Reader", Role::Reader),
        ];

        let users = Arc::new(MemoryUsers::new());
        let mut provider = StaticTokenProvider::new()
            .with_token("Newcomer", profile("sub-newcomer", "Newcomer"))
            .with_code("valid-code", "Newcomer");

        for (id, token, role) in seeded {
            let sub = format!("sub-{}", token.to_lowercase());
            users.insert(User {
                role,
                ..MemoryUsers::user(id, &sub, token)
            });
            provider = provider.with_token(token, profile(&sub, token));
        }

        let articles = Arc::new(MemoryArticles::new());
        let categories = Arc::new(MemoryCategories::referenced_by(articles.clone()));
        let identity = Arc::new(IdentityResolver::new(Arc::new(provider), users.clone()));

        let state = AppState {
            users: users.clone(),
            categories: categories.clone(),
            articles: articles.clone(),
            identity,
            health: Arc::new(AlwaysHealthy),
        };

        Self {
            users,
            categories,
            articles,
            state,
        }
    }

    /// Full router over the seeded state, CORS disabled.
    pub fn router(&self) -> axum::Router {
        let security = SecurityConfig {
            enable_cors: false,
            cors_origins: Vec::new(),
        };
        app(self.state.clone(), &security)
    }

    pub fn seed_category(&self, id: i64, name: &str) -> Category {
        let now = Utc::now();
        let category = Category {
            id,
            name: name.to_string(),
            image_url: format!("https://img.test/{}.png", id),
            created_at: now,
            updated_at: now,
        };
        self.categories.insert(category.clone());
        category
    }

    pub fn seed_article(&self, id: i64, owner: i64, category_id: i64, title: &str) -> Article {
        let now = Utc::now();
        let article = Article {
            id,
            user_id: owner,
            category_id,
            title: title.to_string(),
            body: format!("{} body", title),
            image_url: String::new(),
            tags: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.articles.insert(article.clone());
        article
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
