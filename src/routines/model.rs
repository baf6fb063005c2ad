use uuid::Uuid;

use super::repo_types::{ExerciseRow, RoutineRow};

/// Id plus display email of a user a routine points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: Uuid,
    pub email: String,
}

/// Validated exercise values, not yet attached to a routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseDraft {
    /// Existing exercise to update in place during an edit.
    pub id: Option<Uuid>,
    pub name: String,
    pub series: i32,
    pub repetitions: i32,
}

/// An exercise always belongs to exactly one routine. Only [`Routine`] creates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    id: Uuid,
    routine_id: Uuid,
    name: String,
    series: i32,
    repetitions: i32,
}

impl Exercise {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn routine_id(&self) -> Uuid {
        self.routine_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self) -> i32 {
        self.series
    }

    pub fn repetitions(&self) -> i32 {
        self.repetitions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routine {
    id: Uuid,
    pub name: String,
    pub focus: String,
    owner: UserRef,
    assigned_to: Option<UserRef>,
    exercises: Vec<Exercise>,
}

impl Routine {
    /// Fresh routine owned by `owner`. The id is minted here so exercises can
    /// reference it before anything is written.
    pub fn new(owner: UserRef, name: String, focus: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            focus,
            owner,
            assigned_to: None,
            exercises: Vec::new(),
        }
    }

    /// Rebuilds a routine from stored rows. Rows of other routines are skipped.
    pub(crate) fn restore(row: RoutineRow, exercises: Vec<ExerciseRow>) -> Self {
        let mut exercises: Vec<ExerciseRow> = exercises
            .into_iter()
            .filter(|e| e.routine_id == row.id)
            .collect();
        exercises.sort_by_key(|e| e.position);

        let assigned_to = match (row.assigned_to_id, row.assigned_to_email) {
            (Some(id), Some(email)) => Some(UserRef { id, email }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            focus: row.focus,
            owner: UserRef {
                id: row.owner_id,
                email: row.owner_email,
            },
            assigned_to,
            exercises: exercises
                .into_iter()
                .map(|e| Exercise {
                    id: e.id,
                    routine_id: e.routine_id,
                    name: e.name,
                    series: e.series,
                    repetitions: e.repetitions,
                })
                .collect(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> &UserRef {
        &self.owner
    }

    pub fn assigned_to(&self) -> Option<&UserRef> {
        self.assigned_to.as_ref()
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner.id == user_id
    }

    pub fn assign_to(&mut self, user: UserRef) {
        self.assigned_to = Some(user);
    }

    fn link(&self, draft: ExerciseDraft) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            routine_id: self.id,
            name: draft.name,
            series: draft.series,
            repetitions: draft.repetitions,
        }
    }

    /// Appends an exercise linked to this routine and returns its id.
    pub fn add_exercise(&mut self, draft: ExerciseDraft) -> Uuid {
        let exercise = self.link(draft);
        let id = exercise.id;
        self.exercises.push(exercise);
        id
    }

    pub fn remove_exercise(&mut self, id: Uuid) -> Option<Exercise> {
        let idx = self.exercises.iter().position(|e| e.id == id)?;
        Some(self.exercises.remove(idx))
    }

    /// Replaces the whole collection. Drafts naming one of this routine's
    /// exercises keep that id; anything else gets a new one. Exercises not
    /// named by any draft are dropped.
    pub fn replace_exercises(&mut self, drafts: Vec<ExerciseDraft>) {
        let mut next = Vec::with_capacity(drafts.len());
        for draft in drafts {
            match draft.id.and_then(|id| self.remove_exercise(id)) {
                Some(mut exercise) => {
                    exercise.name = draft.name;
                    exercise.series = draft.series;
                    exercise.repetitions = draft.repetitions;
                    next.push(exercise);
                }
                None => next.push(self.link(draft)),
            }
        }
        self.exercises = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserRef {
        UserRef {
            id: Uuid::new_v4(),
            email: "owner@gym.example".into(),
        }
    }

    fn draft(name: &str, series: i32, repetitions: i32) -> ExerciseDraft {
        ExerciseDraft {
            id: None,
            name: name.into(),
            series,
            repetitions,
        }
    }

    #[test]
    fn added_exercises_point_at_their_routine() {
        let mut routine = Routine::new(owner(), "Push Day".into(), "Chest".into());
        routine.add_exercise(draft("Bench", 3, 10));
        routine.add_exercise(draft("Dips", 4, 8));

        assert_eq!(routine.exercises().len(), 2);
        assert!(routine
            .exercises()
            .iter()
            .all(|e| e.routine_id() == routine.id()));
    }

    #[test]
    fn remove_exercise_detaches_it() {
        let mut routine = Routine::new(owner(), "Legs".into(), "Quads".into());
        let squat = routine.add_exercise(draft("Squat", 5, 5));
        let removed = routine.remove_exercise(squat).expect("present");
        assert_eq!(removed.name(), "Squat");
        assert!(routine.exercises().is_empty());
        assert!(routine.remove_exercise(squat).is_none());
    }

    #[test]
    fn replace_keeps_named_ids_and_drops_the_rest() {
        let mut routine = Routine::new(owner(), "Pull".into(), "Back".into());
        let rows = routine.add_exercise(draft("Rows", 3, 12));
        let curls = routine.add_exercise(draft("Curls", 3, 12));

        let foreign = Uuid::new_v4();
        routine.replace_exercises(vec![
            ExerciseDraft {
                id: Some(rows),
                ..draft("Barbell Rows", 4, 8)
            },
            ExerciseDraft {
                id: Some(foreign),
                ..draft("Pull-ups", 3, 6)
            },
        ]);

        let exercises = routine.exercises();
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].id(), rows);
        assert_eq!(exercises[0].name(), "Barbell Rows");
        assert_eq!(exercises[0].series(), 4);
        assert_ne!(exercises[1].id(), foreign);
        assert!(exercises.iter().all(|e| e.id() != curls));
        assert!(exercises.iter().all(|e| e.routine_id() == routine.id()));
    }

    #[test]
    fn restore_orders_by_position_and_ignores_stray_rows() {
        let routine_id = Uuid::new_v4();
        let owner = owner();
        let row = RoutineRow {
            id: routine_id,
            name: "Full Body".into(),
            focus: "General".into(),
            owner_id: owner.id,
            owner_email: owner.email.clone(),
            assigned_to_id: None,
            assigned_to_email: None,
        };
        let exercise = |name: &str, position: i32, routine_id: Uuid| ExerciseRow {
            id: Uuid::new_v4(),
            routine_id,
            name: name.into(),
            series: 3,
            repetitions: 10,
            position,
        };

        let routine = Routine::restore(
            row,
            vec![
                exercise("Second", 1, routine_id),
                exercise("Elsewhere", 0, Uuid::new_v4()),
                exercise("First", 0, routine_id),
            ],
        );

        let names: Vec<&str> = routine.exercises().iter().map(Exercise::name).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(routine.owner(), &owner);
        assert!(routine.assigned_to().is_none());
    }
}
