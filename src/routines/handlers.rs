use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreatedRoutineResponse, Notice, RoutineForm, RoutineInput},
    service::RoutineService,
    view::{to_views, RoutineView},
};
use crate::{auth::actor::Actor, error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/routines", get(list_routines))
        .route("/routines/form", get(routine_form))
        .route("/routines/:id", get(get_routine))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/routines", post(create_routine))
        .route("/routines/:id", put(edit_routine).delete(delete_routine))
}

#[instrument(skip(service, actor), fields(user_id = %actor.id))]
pub async fn list_routines(
    State(service): State<RoutineService>,
    actor: Actor,
) -> Result<Json<Vec<RoutineView>>, AppError> {
    let routines = service.list(&actor).await?;
    Ok(Json(to_views(&routines)))
}

#[instrument(skip(service, actor), fields(user_id = %actor.id))]
pub async fn routine_form(
    State(service): State<RoutineService>,
    actor: Actor,
) -> Result<Json<RoutineForm>, AppError> {
    Ok(Json(service.form(&actor).await?))
}

#[instrument(skip(service, actor), fields(user_id = %actor.id))]
pub async fn get_routine(
    State(service): State<RoutineService>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<RoutineView>, AppError> {
    let routine = service.get(&actor, id).await?;
    Ok(Json(RoutineView::from(&routine)))
}

#[instrument(skip(service, actor, payload), fields(user_id = %actor.id))]
pub async fn create_routine(
    State(service): State<RoutineService>,
    actor: Actor,
    payload: Result<Json<RoutineInput>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedRoutineResponse>), AppError> {
    let Json(input) = payload?;
    let routine = service.create(&actor, input).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/routines/{}", routine.id())) {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedRoutineResponse {
            id: routine.id(),
            exercises: routine.exercises().iter().map(|e| e.id()).collect(),
        }),
    ))
}

#[instrument(skip(service, actor, payload), fields(user_id = %actor.id))]
pub async fn edit_routine(
    State(service): State<RoutineService>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Result<Json<RoutineInput>, JsonRejection>,
) -> Result<Json<RoutineView>, AppError> {
    let Json(input) = payload?;
    let routine = service.edit(&actor, id, input).await?;
    Ok(Json(RoutineView::from(&routine)))
}

#[instrument(skip(service, actor), fields(user_id = %actor.id))]
pub async fn delete_routine(
    State(service): State<RoutineService>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(service.delete(&actor, id).await?))
}
