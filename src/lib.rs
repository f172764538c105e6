pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod server;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
