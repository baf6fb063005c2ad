use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN},
    },
    error::AppError,
    forms::{available_fields, Field, FormKind},
    state::AppState,
    users::{
        dto::PublicUser,
        repo_types::{NewUser, Role, User},
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }

    let mut roles = payload.roles;
    roles.sort();
    roles.dedup();
    if roles.is_empty() {
        return Err(AppError::validation("At least one role is required"));
    }

    if let Some(coach_id) = payload.coach_id {
        if !available_fields(FormKind::Registration, &roles).contains(&Field::Coach) {
            return Err(AppError::validation("Only users can choose a coach"));
        }
        match state.users.find_by_id(coach_id).await? {
            Some(coach) if coach.has_role(Role::Coach) => {}
            _ => {
                warn!(%coach_id, "registration names an unknown coach");
                return Err(AppError::validation("Unknown coach"));
            }
        }
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            email: &payload.email,
            password_hash: &hash,
            roles: &roles,
            coach_id: payload.coach_id,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, roles = ?roles, "user registered");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthenticated("Invalid refresh token")
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthenticated("User not found"))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "user not found");
        AppError::Unauthenticated("User not found")
    })?;

    Ok(Json(PublicUser::from(user)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::test_support::{send, TestApp};

    #[tokio::test]
    async fn register_defaults_to_user_role_and_returns_tokens() {
        let app = TestApp::new();
        let (status, body) = send(
            &app.router(),
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "  New@Gym.Example ", "password": "long-enough"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "new@gym.example");
        assert_eq!(body["user"]["roles"], json!(["USER"]));
        assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn register_with_coach_requires_a_real_coach() {
        let app = TestApp::new();
        let coach = app.coach("coach@gym.example");
        let plain = app.user("plain@gym.example", None);

        let (status, body) = send(
            &app.router(),
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "a@gym.example", "password": "long-enough", "coach_id": coach.id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["coach_id"], json!(coach.id));

        let (status, _) = send(
            &app.router(),
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "b@gym.example", "password": "long-enough", "coach_id": plain.id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn coaches_cannot_pick_a_coach_at_registration() {
        let app = TestApp::new();
        let coach = app.coach("coach@gym.example");
        let (status, body) = send(
            &app.router(),
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "c2@gym.example",
                "password": "long-enough",
                "roles": ["COACH"],
                "coach_id": coach.id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let app = TestApp::new();
        app.user("taken@gym.example", None);
        let (status, _) = send(
            &app.router(),
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "taken@gym.example", "password": "long-enough"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_then_me() {
        let app = TestApp::new();
        let router = app.router();
        send(
            &router,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "me@gym.example", "password": "long-enough"})),
        )
        .await;

        let (status, body) = send(
            &router,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "me@gym.example", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");

        let (status, body) = send(
            &router,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "me@gym.example", "password": "long-enough"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["access_token"].as_str().unwrap().to_string();
        let refresh = body["refresh_token"].as_str().unwrap().to_string();

        let (status, me) = send(&router, "GET", "/api/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "me@gym.example");

        // refresh tokens are not accepted as bearer tokens
        let (status, _) = send(&router, "GET", "/api/v1/me", Some(&refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body): (StatusCode, Value) = send(
            &router,
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "me@gym.example");
    }
}
