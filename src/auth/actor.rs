use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use super::jwt::AuthUser;
use crate::{
    error::AppError,
    state::AppState,
    users::repo_types::{Role, User},
};

/// Authenticated caller with the roles currently stored for them.
///
/// Roles are loaded on every request rather than baked into the token, so a
/// role or coach change takes effect immediately.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Role that decides which routines the actor sees. Coach wins over user.
    pub fn scope_role(&self) -> Option<Role> {
        if self.has_role(Role::Coach) {
            Some(Role::Coach)
        } else if self.has_role(Role::User) {
            Some(Role::User)
        } else {
            None
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.role_set(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        match state.users.find_by_id(user_id).await? {
            Some(user) => Ok(Actor::from(&user)),
            None => {
                warn!(%user_id, "token subject no longer exists");
                Err(AppError::Unauthenticated("User not found"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(roles: &[Role]) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            email: "someone@gym.example".into(),
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn coach_takes_precedence() {
        assert_eq!(actor(&[Role::User, Role::Coach]).scope_role(), Some(Role::Coach));
        assert_eq!(actor(&[Role::User]).scope_role(), Some(Role::User));
        assert_eq!(actor(&[]).scope_role(), None);
    }
}
