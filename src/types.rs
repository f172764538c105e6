/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Operations a request can perform on a resource.
/// Used by the authorization policy and for request logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Action::Read)
    }
}
