use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse permission tier attached to every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Reader,
    Writer,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "Reader",
            Role::Writer => "Writer",
            Role::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reader" => Ok(Role::Reader),
            "Writer" => Ok(Role::Writer),
            "Administrator" => Ok(Role::Administrator),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub google_sub: String,
    pub name: String,
    pub birthdate: Option<DateTime<Utc>>,
    pub gender: String,
    pub profile_picture_url: String,
    pub description: String,
    pub short_description: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// Fields known when a user first signs in through the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub google_sub: String,
    pub name: String,
    pub profile_picture_url: String,
    pub role: Role,
}
