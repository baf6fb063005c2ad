use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{PublicUser, SetCoachRequest, UserChoice},
    repo_types::Role,
};
use crate::{
    auth::actor::Actor,
    error::AppError,
    forms::{available_fields, Field, FormKind},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/coaches", get(list_coaches))
        .route("/me/coach", put(set_coach))
}

#[instrument(skip(state))]
pub async fn list_coaches(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserChoice>>, AppError> {
    let coaches = state.users.coaches().await?;
    Ok(Json(coaches.into_iter().map(UserChoice::from).collect()))
}

#[instrument(skip(state, actor, payload), fields(user_id = %actor.id))]
pub async fn set_coach(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<SetCoachRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload?;

    if !available_fields(FormKind::Registration, &actor.roles).contains(&Field::Coach) {
        return Err(AppError::forbidden("Only users can choose a coach."));
    }

    if let Some(coach_id) = payload.coach_id {
        if coach_id == actor.id {
            return Err(AppError::validation("You cannot coach yourself"));
        }
        match state.users.find_by_id(coach_id).await? {
            Some(coach) if coach.has_role(Role::Coach) => {}
            _ => {
                warn!(%coach_id, "unknown coach");
                return Err(AppError::validation("Unknown coach"));
            }
        }
    }

    state.users.set_coach(actor.id, payload.coach_id).await?;
    info!(coach_id = ?payload.coach_id, "coach updated");

    let user = state
        .users
        .find_by_id(actor.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(PublicUser::from(user)))
}
