use serde::Serialize;
use uuid::Uuid;

use super::model::{Exercise, Routine};

/// Shown instead of an email when a routine has no assignee.
pub const NOT_ASSIGNED: &str = "Not assigned";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ExerciseView {
    pub id: Uuid,
    pub name: String,
    pub repetitions: i32,
    pub series: i32,
}

/// Display record of a routine the caller is already allowed to see.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoutineView {
    pub id: Uuid,
    pub name: String,
    pub focus: String,
    pub assigned_to: String,
    pub owner: String,
    pub exercises: Vec<ExerciseView>,
}

impl From<&Exercise> for ExerciseView {
    fn from(e: &Exercise) -> Self {
        Self {
            id: e.id(),
            name: e.name().to_string(),
            repetitions: e.repetitions(),
            series: e.series(),
        }
    }
}

impl From<&Routine> for RoutineView {
    fn from(r: &Routine) -> Self {
        Self {
            id: r.id(),
            name: r.name.clone(),
            focus: r.focus.clone(),
            assigned_to: r
                .assigned_to()
                .map(|u| u.email.clone())
                .unwrap_or_else(|| NOT_ASSIGNED.to_string()),
            owner: r.owner().email.clone(),
            exercises: r.exercises().iter().map(ExerciseView::from).collect(),
        }
    }
}

pub fn to_views(routines: &[Routine]) -> Vec<RoutineView> {
    routines.iter().map(RoutineView::from).collect()
}
