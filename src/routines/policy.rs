//! Which routines an actor may see and edit.
//!
//! A coach sees their own routines plus every routine owned by a user they
//! coach. A regular user sees routines they own or that were assigned to them.
//! Anyone without a recognized role sees nothing.

use tracing::{debug, warn};
use uuid::Uuid;

use super::model::Routine;
use super::repo::RoutineStore;
use crate::{
    auth::actor::Actor,
    error::AppError,
    users::{repo::UserStore, repo_types::Role},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Coach { coach_id: Uuid, coached: Vec<Uuid> },
    Member { user_id: Uuid },
}

impl Scope {
    /// Whether `routine` falls inside this scope. Mirrors the store queries.
    pub fn permits(&self, routine: &Routine) -> bool {
        match self {
            Scope::Coach { coach_id, coached } => {
                routine.is_owned_by(*coach_id) || coached.contains(&routine.owner().id)
            }
            Scope::Member { user_id } => {
                routine.is_owned_by(*user_id)
                    || routine.assigned_to().is_some_and(|a| a.id == *user_id)
            }
        }
    }
}

pub async fn resolve_scope(actor: &Actor, users: &dyn UserStore) -> Result<Scope, AppError> {
    match actor.scope_role() {
        Some(Role::Coach) => {
            let coached = users.coached_user_ids(actor.id).await?;
            debug!(coach_id = %actor.id, coached = coached.len(), "coach scope resolved");
            Ok(Scope::Coach {
                coach_id: actor.id,
                coached,
            })
        }
        Some(Role::User) => Ok(Scope::Member { user_id: actor.id }),
        None => {
            warn!(user_id = %actor.id, "actor has no recognized role");
            Err(AppError::forbidden("User does not have any roles assigned."))
        }
    }
}

pub async fn resolve_visible_routines(
    actor: &Actor,
    users: &dyn UserStore,
    routines: &dyn RoutineStore,
) -> Result<Vec<Routine>, AppError> {
    let visible = match resolve_scope(actor, users).await? {
        Scope::Coach {
            coach_id,
            mut coached,
        } => {
            coached.push(coach_id);
            routines.list_owned_by(&coached).await?
        }
        Scope::Member { user_id } => routines.list_owned_or_assigned(user_id).await?,
    };
    Ok(visible)
}
