use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, Role, User};

const USER_COLUMNS: &str = "id, email, password_hash, roles, coach_id, created_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: NewUser<'_>) -> anyhow::Result<User>;
    /// Ids of every user whose coach is `coach_id`.
    async fn coached_user_ids(&self, coach_id: Uuid) -> anyhow::Result<Vec<Uuid>>;
    async fn coached_users(&self, coach_id: Uuid) -> anyhow::Result<Vec<User>>;
    async fn coaches(&self) -> anyhow::Result<Vec<User>>;
    async fn set_coach(&self, user_id: Uuid, coach_id: Option<Uuid>) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, new: NewUser<'_>) -> anyhow::Result<User> {
        let roles: Vec<String> = new.roles.iter().map(|r| r.as_str().to_string()).collect();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, roles, coach_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(roles)
        .bind(new.coach_id)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn coached_user_ids(&self, coach_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE coach_id = $1")
            .bind(coach_id)
            .fetch_all(&self.db)
            .await
            .context("list coached user ids")?;
        Ok(ids)
    }

    async fn coached_users(&self, coach_id: Uuid) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE coach_id = $1 ORDER BY email"
        ))
        .bind(coach_id)
        .fetch_all(&self.db)
        .await
        .context("list coached users")?;
        Ok(users)
    }

    async fn coaches(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE $1 = ANY(roles) ORDER BY email"
        ))
        .bind(Role::Coach.as_str())
        .fetch_all(&self.db)
        .await
        .context("list coaches")?;
        Ok(users)
    }

    async fn set_coach(&self, user_id: Uuid, coach_id: Option<Uuid>) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET coach_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(coach_id)
            .execute(&self.db)
            .await
            .context("update coach")?;
        Ok(())
    }
}
