use sqlx::FromRow;
use uuid::Uuid;

/// Routine joined with the emails of its owner and assignee.
#[derive(Debug, Clone, FromRow)]
pub struct RoutineRow {
    pub id: Uuid,
    pub name: String,
    pub focus: String,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub assigned_to_id: Option<Uuid>,
    pub assigned_to_email: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseRow {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub name: String,
    pub series: i32,
    pub repetitions: i32,
    pub position: i32,
}
