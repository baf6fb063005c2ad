use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::Routine;
use super::repo_types::{ExerciseRow, RoutineRow};

#[async_trait]
pub trait RoutineStore: Send + Sync {
    /// Routines whose owner is any of `owners`.
    async fn list_owned_by(&self, owners: &[Uuid]) -> anyhow::Result<Vec<Routine>>;
    /// Routines owned by or assigned to `user_id`.
    async fn list_owned_or_assigned(&self, user_id: Uuid) -> anyhow::Result<Vec<Routine>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Routine>>;
    /// Writes the routine and all its exercises in one transaction.
    async fn insert(&self, routine: &Routine) -> anyhow::Result<()>;
    /// Rewrites the routine row and syncs its exercises in one transaction.
    async fn update(&self, routine: &Routine) -> anyhow::Result<()>;
    /// Removes the routine and its exercises. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const ROUTINE_SELECT: &str = r#"
    SELECT r.id, r.name, r.focus,
           r.owner_id, o.email AS owner_email,
           r.assigned_to_id, a.email AS assigned_to_email
      FROM routines r
      JOIN users o ON o.id = r.owner_id
      LEFT JOIN users a ON a.id = r.assigned_to_id
"#;

#[derive(Clone)]
pub struct PgRoutineStore {
    db: PgPool,
}

impl PgRoutineStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Loads the exercises of every row in one query and assembles routines.
    async fn hydrate(&self, rows: Vec<RoutineRow>) -> anyhow::Result<Vec<Routine>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let exercises = sqlx::query_as::<_, ExerciseRow>(
            r#"
            SELECT id, routine_id, name, series, repetitions, position
              FROM exercises
             WHERE routine_id = ANY($1)
             ORDER BY position ASC
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.db)
        .await
        .context("list exercises by routine")?;

        let mut by_routine: HashMap<Uuid, Vec<ExerciseRow>> = HashMap::new();
        for e in exercises {
            by_routine.entry(e.routine_id).or_default().push(e);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let exercises = by_routine.remove(&row.id).unwrap_or_default();
                Routine::restore(row, exercises)
            })
            .collect())
    }
}

async fn upsert_exercises_tx(
    tx: &mut Transaction<'_, Postgres>,
    routine: &Routine,
) -> anyhow::Result<()> {
    for (position, e) in routine.exercises().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO exercises (id, routine_id, name, series, repetitions, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
               SET name = EXCLUDED.name,
                   series = EXCLUDED.series,
                   repetitions = EXCLUDED.repetitions,
                   position = EXCLUDED.position
             WHERE exercises.routine_id = EXCLUDED.routine_id
            "#,
        )
        .bind(e.id())
        .bind(e.routine_id())
        .bind(e.name())
        .bind(e.series())
        .bind(e.repetitions())
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("upsert exercise {}", e.id()))?;
    }
    Ok(())
}

#[async_trait]
impl RoutineStore for PgRoutineStore {
    async fn list_owned_by(&self, owners: &[Uuid]) -> anyhow::Result<Vec<Routine>> {
        let rows = sqlx::query_as::<_, RoutineRow>(&format!(
            "{ROUTINE_SELECT} WHERE r.owner_id = ANY($1) ORDER BY r.created_at DESC"
        ))
        .bind(owners)
        .fetch_all(&self.db)
        .await
        .context("list routines by owners")?;
        self.hydrate(rows).await
    }

    async fn list_owned_or_assigned(&self, user_id: Uuid) -> anyhow::Result<Vec<Routine>> {
        let rows = sqlx::query_as::<_, RoutineRow>(&format!(
            "{ROUTINE_SELECT} WHERE r.owner_id = $1 OR r.assigned_to_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list routines owned or assigned")?;
        self.hydrate(rows).await
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Routine>> {
        let row = sqlx::query_as::<_, RoutineRow>(&format!("{ROUTINE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find routine")?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert(&self, routine: &Routine) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(
            r#"
            INSERT INTO routines (id, name, focus, owner_id, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(routine.id())
        .bind(&routine.name)
        .bind(&routine.focus)
        .bind(routine.owner().id)
        .bind(routine.assigned_to().map(|u| u.id))
        .execute(&mut *tx)
        .await
        .context("insert routine")?;

        upsert_exercises_tx(&mut tx, routine).await?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn update(&self, routine: &Routine) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        sqlx::query(
            r#"
            UPDATE routines
               SET name = $2, focus = $3, assigned_to_id = $4
             WHERE id = $1
            "#,
        )
        .bind(routine.id())
        .bind(&routine.name)
        .bind(&routine.focus)
        .bind(routine.assigned_to().map(|u| u.id))
        .execute(&mut *tx)
        .await
        .context("update routine")?;

        let kept: Vec<Uuid> = routine.exercises().iter().map(|e| e.id()).collect();
        sqlx::query("DELETE FROM exercises WHERE routine_id = $1 AND NOT (id = ANY($2))")
            .bind(routine.id())
            .bind(&kept[..])
            .execute(&mut *tx)
            .await
            .context("remove orphaned exercises")?;

        upsert_exercises_tx(&mut tx, routine).await?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        // exercises go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM routines WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete routine")?;
        Ok(result.rows_affected() > 0)
    }
}
