use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{Notice, RoutineForm, RoutineInput},
    model::{ExerciseDraft, Routine, UserRef},
    policy::{resolve_scope, resolve_visible_routines},
    repo::RoutineStore,
};
use crate::{
    auth::actor::Actor,
    error::AppError,
    forms::{available_fields, Field, FormKind},
    state::AppState,
    users::{dto::UserChoice, repo::UserStore},
};

pub const DELETE_REFUSED: &str = "You are not allowed to delete this routine.";
pub const ACCESS_REFUSED: &str = "You are not allowed to access this routine.";
pub const DELETED: &str = "Routine deleted successfully.";

#[derive(Clone)]
pub struct RoutineService {
    users: Arc<dyn UserStore>,
    routines: Arc<dyn RoutineStore>,
}

impl FromRef<AppState> for RoutineService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.routines.clone())
    }
}

impl RoutineService {
    pub fn new(users: Arc<dyn UserStore>, routines: Arc<dyn RoutineStore>) -> Self {
        Self { users, routines }
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Routine>, AppError> {
        resolve_visible_routines(actor, &*self.users, &*self.routines).await
    }

    /// A single routine, provided it is inside the actor's scope.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Routine, AppError> {
        let routine = self.routines.find(id).await?.ok_or(AppError::NotFound)?;
        let scope = resolve_scope(actor, &*self.users).await?;
        if !scope.permits(&routine) {
            warn!(user_id = %actor.id, routine_id = %id, "routine outside actor scope");
            return Err(AppError::forbidden(ACCESS_REFUSED));
        }
        Ok(routine)
    }

    /// Fields and assignee choices, derived fresh from the coach relationship.
    pub async fn form(&self, actor: &Actor) -> Result<RoutineForm, AppError> {
        let fields = available_fields(FormKind::Routine, &actor.roles);
        let assignees = if fields.contains(&Field::AssignedTo) {
            self.users
                .coached_users(actor.id)
                .await?
                .into_iter()
                .map(UserChoice::from)
                .collect()
        } else {
            Vec::new()
        };
        Ok(RoutineForm { fields, assignees })
    }

    /// Checks a requested assignee against the actor's current coached users.
    async fn resolve_assignee(
        &self,
        actor: &Actor,
        requested: Option<Uuid>,
    ) -> Result<Option<UserRef>, AppError> {
        let Some(assignee_id) = requested else {
            return Ok(None);
        };
        if !available_fields(FormKind::Routine, &actor.roles).contains(&Field::AssignedTo) {
            return Err(AppError::validation(
                "assigned_to is only available to coaches",
            ));
        }

        let coached = self.users.coached_users(actor.id).await?;
        match coached.into_iter().find(|u| u.id == assignee_id) {
            Some(user) => Ok(Some(UserRef {
                id: user.id,
                email: user.email,
            })),
            None => {
                warn!(coach_id = %actor.id, %assignee_id, "assignee is not coached by actor");
                Err(AppError::InvalidAssignment(assignee_id))
            }
        }
    }

    pub async fn create(&self, actor: &Actor, input: RoutineInput) -> Result<Routine, AppError> {
        let valid = input.validate()?;
        let assignee = self.resolve_assignee(actor, valid.assigned_to).await?;

        let owner = UserRef {
            id: actor.id,
            email: actor.email.clone(),
        };
        let mut routine = Routine::new(owner, valid.name, valid.focus);
        if let Some(assignee) = assignee {
            routine.assign_to(assignee);
        }
        for draft in valid.exercises {
            routine.add_exercise(ExerciseDraft { id: None, ..draft });
        }

        self.routines.insert(&routine).await?;
        info!(
            user_id = %actor.id,
            routine_id = %routine.id(),
            exercises = routine.exercises().len(),
            "routine created"
        );
        Ok(routine)
    }

    pub async fn edit(
        &self,
        actor: &Actor,
        id: Uuid,
        input: RoutineInput,
    ) -> Result<Routine, AppError> {
        let mut routine = self.get(actor, id).await?;
        let valid = input.validate()?;
        let assignee = self.resolve_assignee(actor, valid.assigned_to).await?;

        routine.name = valid.name;
        routine.focus = valid.focus;
        if let Some(assignee) = assignee {
            routine.assign_to(assignee);
        }
        routine.replace_exercises(valid.exercises);

        self.routines.update(&routine).await?;
        info!(user_id = %actor.id, routine_id = %id, "routine updated");
        Ok(routine)
    }

    /// Only the owner may delete, whatever their role.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<Notice, AppError> {
        let routine = self.routines.find(id).await?.ok_or(AppError::NotFound)?;
        if !routine.is_owned_by(actor.id) {
            warn!(user_id = %actor.id, routine_id = %id, owner_id = %routine.owner().id, "delete refused");
            return Err(AppError::forbidden(DELETE_REFUSED));
        }

        if !self.routines.delete(id).await? {
            return Err(AppError::NotFound);
        }
        info!(user_id = %actor.id, routine_id = %id, "routine deleted");
        Ok(Notice::success(DELETED))
    }
}
