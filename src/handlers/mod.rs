// handlers/mod.rs - one module per resource under /v1
//
// Reads are public. Mutations follow the same sequence in every handler:
// parse body -> resolve identity -> load target -> consult policy -> mutate
// -> respond. Each step exits early with an ApiError.

pub mod articles;
pub mod auth;
pub mod categories;
pub mod system;
pub mod users;
