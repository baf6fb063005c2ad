//! In-memory stores and request helpers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::FromRef,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::jwt::JwtKeys,
    routines::{model::Routine, repo::RoutineStore},
    state::AppState,
    users::{
        repo::UserStore,
        repo_types::{NewUser, Role, User},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    routines: HashMap<Uuid, Routine>,
}

/// Both repositories over one mutex. Every write checks its foreign keys
/// before touching the tables, so a rejected write changes nothing.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    /// Makes every following routine write fail as a broken commit would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self, tables: &Tables, routine: &Routine) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated commit failure");
        }
        let user_exists = |id: Uuid| tables.users.iter().any(|u| u.id == id);
        anyhow::ensure!(user_exists(routine.owner().id), "owner does not exist");
        if let Some(assignee) = routine.assigned_to() {
            anyhow::ensure!(user_exists(assignee.id), "assignee does not exist");
        }
        anyhow::ensure!(
            routine
                .exercises()
                .iter()
                .all(|e| e.routine_id() == routine.id()),
            "exercise references another routine"
        );
        Ok(())
    }

    pub fn insert_user(&self, email: &str, roles: &[Role], coach_id: Option<Uuid>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            coach_id,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables().users.push(user.clone());
        user
    }

    pub fn seed_routine(&self, routine: Routine) -> Uuid {
        let id = routine.id();
        self.tables().routines.insert(id, routine);
        id
    }

    pub fn routine(&self, id: Uuid) -> Option<Routine> {
        self.tables().routines.get(&id).cloned()
    }

    pub fn routine_count(&self) -> usize {
        self.tables().routines.len()
    }

    pub fn exercise_count(&self) -> usize {
        self.tables()
            .routines
            .values()
            .map(|r| r.exercises().len())
            .sum()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser<'_>) -> anyhow::Result<User> {
        anyhow::ensure!(
            self.tables().users.iter().all(|u| u.email != new.email),
            "duplicate email"
        );
        Ok(self.insert_user(new.email, new.roles, new.coach_id))
    }

    async fn coached_user_ids(&self, coach_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| u.coach_id == Some(coach_id))
            .map(|u| u.id)
            .collect())
    }

    async fn coached_users(&self, coach_id: Uuid) -> anyhow::Result<Vec<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| u.coach_id == Some(coach_id))
            .cloned()
            .collect())
    }

    async fn coaches(&self) -> anyhow::Result<Vec<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| u.has_role(Role::Coach))
            .cloned()
            .collect())
    }

    async fn set_coach(&self, user_id: Uuid, coach_id: Option<Uuid>) -> anyhow::Result<()> {
        let mut tables = self.tables();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| anyhow::anyhow!("no such user"))?;
        user.coach_id = coach_id;
        Ok(())
    }
}

#[async_trait]
impl RoutineStore for MemoryStore {
    async fn list_owned_by(&self, owners: &[Uuid]) -> anyhow::Result<Vec<Routine>> {
        Ok(self
            .tables()
            .routines
            .values()
            .filter(|r| owners.contains(&r.owner().id))
            .cloned()
            .collect())
    }

    async fn list_owned_or_assigned(&self, user_id: Uuid) -> anyhow::Result<Vec<Routine>> {
        Ok(self
            .tables()
            .routines
            .values()
            .filter(|r| r.is_owned_by(user_id) || r.assigned_to().is_some_and(|a| a.id == user_id))
            .cloned()
            .collect())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Routine>> {
        Ok(self.routine(id))
    }

    async fn insert(&self, routine: &Routine) -> anyhow::Result<()> {
        let mut tables = self.tables();
        anyhow::ensure!(
            !tables.routines.contains_key(&routine.id()),
            "duplicate routine id"
        );
        self.check_write(&tables, routine)?;
        tables.routines.insert(routine.id(), routine.clone());
        Ok(())
    }

    async fn update(&self, routine: &Routine) -> anyhow::Result<()> {
        let mut tables = self.tables();
        anyhow::ensure!(
            tables.routines.contains_key(&routine.id()),
            "routine does not exist"
        );
        self.check_write(&tables, routine)?;
        tables.routines.insert(routine.id(), routine.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated commit failure");
        }
        Ok(self.tables().routines.remove(&id).is_some())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let (state, store) = AppState::fake();
        Self { state, store }
    }

    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    pub fn user(&self, email: &str, coach_id: Option<Uuid>) -> User {
        self.store.insert_user(email, &[Role::User], coach_id)
    }

    pub fn coach(&self, email: &str) -> User {
        self.store.insert_user(email, &[Role::Coach], None)
    }

    pub fn user_with_roles(&self, email: &str, roles: &[Role], coach_id: Option<Uuid>) -> User {
        self.store.insert_user(email, roles, coach_id)
    }

    pub fn token(&self, user: &User) -> String {
        JwtKeys::from_ref(&self.state)
            .sign_access(user.id)
            .expect("sign access token")
    }
}

/// Sends one request through the router and decodes the JSON reply
/// (`Value::Null` when the body is not JSON).
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("valid request");

    let res = router.clone().oneshot(req).await.expect("infallible");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
