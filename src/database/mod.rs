pub mod manager;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager, HealthCheck};
pub use repository::{ArticlesRepository, CategoriesRepository, UsersRepository};
