use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Role, User};

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
    pub coach_id: Option<Uuid>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        let roles = user.role_set();
        Self {
            id: user.id,
            email: user.email,
            roles,
            coach_id: user.coach_id,
        }
    }
}

/// Entry of a user picker (coach list, assignee choices).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserChoice {
    pub id: Uuid,
    pub email: String,
}

impl From<User> for UserChoice {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Request body for `PUT /me/coach`. `null` clears the association.
#[derive(Debug, Deserialize)]
pub struct SetCoachRequest {
    pub coach_id: Option<Uuid>,
}
