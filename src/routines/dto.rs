use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::ExerciseDraft;
use crate::{error::AppError, forms::Field, users::dto::UserChoice};

#[derive(Debug, Default, Deserialize)]
pub struct ExerciseInput {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub series: Option<i32>,
    pub repetitions: Option<i32>,
}

/// Body of `POST /routines` and `PUT /routines/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct RoutineInput {
    pub name: Option<String>,
    pub focus: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseInput>,
    pub assigned_to: Option<Uuid>,
}

/// Input that passed field validation. Authorization is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRoutine {
    pub name: String,
    pub focus: String,
    pub exercises: Vec<ExerciseDraft>,
    pub assigned_to: Option<Uuid>,
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} must not be blank"))),
    }
}

fn required_count(value: Option<i32>, field: &str) -> Result<i32, AppError> {
    match value {
        Some(n) if n >= 1 => Ok(n),
        Some(_) => Err(AppError::validation(format!("{field} must be at least 1"))),
        None => Err(AppError::validation(format!("{field} is required"))),
    }
}

impl RoutineInput {
    pub fn validate(self) -> Result<ValidRoutine, AppError> {
        let name = required_text(self.name, "name")?;
        let focus = required_text(self.focus, "focus")?;
        let exercises = self
            .exercises
            .into_iter()
            .enumerate()
            .map(|(i, e)| {
                Ok(ExerciseDraft {
                    id: e.id,
                    name: required_text(e.name, &format!("exercises[{i}].name"))?,
                    series: required_count(e.series, &format!("exercises[{i}].series"))?,
                    repetitions: required_count(
                        e.repetitions,
                        &format!("exercises[{i}].repetitions"),
                    )?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(ValidRoutine {
            name,
            focus,
            exercises,
            assigned_to: self.assigned_to,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedRoutineResponse {
    pub id: Uuid,
    pub exercises: Vec<Uuid>,
}

/// What the routine form offers this actor right now.
#[derive(Debug, Serialize)]
pub struct RoutineForm {
    pub fields: BTreeSet<Field>,
    pub assignees: Vec<UserChoice>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
}

/// User-visible flash message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
}
