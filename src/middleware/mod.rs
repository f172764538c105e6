pub mod auth;
pub mod extract;

pub use auth::{authenticate, AccessToken};
pub use extract::{EntityId, ValidJson};
