use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Role labels a user can hold. Persisted as `USER` / `COACH` text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[serde(alias = "ROLE_USER")]
    User,
    #[serde(alias = "ROLE_COACH")]
    Coach,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Coach => "COACH",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let label = label.strip_prefix("ROLE_").unwrap_or(label);
        match label.to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "COACH" => Some(Role::Coach),
            _ => None,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub roles: Vec<String>,    // raw labels, see `User::role_set`
    pub coach_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Recognized roles, deduplicated. Unknown labels are dropped.
    pub fn role_set(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.iter().filter_map(|r| Role::parse(r)).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role_set().contains(&role)
    }
}

/// Values needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub roles: &'a [Role],
    pub coach_id: Option<Uuid>,
}
