use axum::{
    http::HeaderValue,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{GoogleProvider, IdentityResolver, ProviderError};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::postgres::{PgArticlesRepository, PgCategoriesRepository, PgUsersRepository};
use crate::database::{
    ArticlesRepository, CategoriesRepository, DatabaseManager, HealthCheck, UsersRepository,
};
use crate::handlers;

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UsersRepository>,
    pub categories: Arc<dyn CategoriesRepository>,
    pub articles: Arc<dyn ArticlesRepository>,
    pub identity: Arc<IdentityResolver>,
    pub health: Arc<dyn HealthCheck>,
}

impl AppState {
    /// Wires the Postgres repositories and the Google identity provider.
    pub fn from_database(
        database: DatabaseManager,
        config: &AppConfig,
    ) -> Result<Self, ProviderError> {
        let pool = database.pool().clone();
        let users: Arc<dyn UsersRepository> = Arc::new(PgUsersRepository::new(pool.clone()));
        let provider = GoogleProvider::new(config.oauth.clone(), &config.server.hostname)?;
        tracing::info!("OAuth redirect URL: {}", provider.redirect_url());

        Ok(Self {
            users: users.clone(),
            categories: Arc::new(PgCategoriesRepository::new(pool.clone())),
            articles: Arc::new(PgArticlesRepository::new(pool)),
            identity: Arc::new(IdentityResolver::new(Arc::new(provider), users)),
            health: Arc::new(database),
        })
    }
}

pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .nest("/v1", v1_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(security)),
        )
}

fn v1_routes() -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(auth_routes())
        .merge(category_routes())
        .merge(article_routes())
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/users", get(users::get_all))
        .route("/users/:id", get(users::get).put(users::update))
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth", get(auth::current_user))
        .route("/auth/google-login", get(auth::google_login))
        .route("/auth/google-callback", get(auth::google_callback))
}

fn category_routes() -> Router<AppState> {
    use handlers::categories;

    Router::new()
        .route(
            "/categories",
            get(categories::get_all).post(categories::create),
        )
        .route(
            "/categories/:id",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
}

fn article_routes() -> Router<AppState> {
    use handlers::articles;

    Router::new()
        .route("/articles", get(articles::get_all).post(articles::create))
        .route(
            "/articles/:id",
            get(articles::get)
                .put(articles::update)
                .delete(articles::delete),
        )
}

/// Permissive when no origins are configured, otherwise an allow-list.
/// Disabled CORS grants no cross-origin access at all.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
