use std::collections::BTreeSet;

use serde::Serialize;

use crate::users::repo_types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Registration,
    Routine,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Email,
    Password,
    Roles,
    Coach,
    Name,
    Focus,
    Exercises,
    AssignedTo,
}

/// Fields a form offers to someone holding `roles`.
///
/// Registration only offers a coach picker to regular users, and the routine
/// form only offers an assignee picker to coaches.
pub fn available_fields(form: FormKind, roles: &[Role]) -> BTreeSet<Field> {
    let mut fields = BTreeSet::new();
    match form {
        FormKind::Registration => {
            fields.extend([Field::Email, Field::Password, Field::Roles]);
            if roles.contains(&Role::User) {
                fields.insert(Field::Coach);
            }
        }
        FormKind::Routine => {
            fields.extend([Field::Name, Field::Focus, Field::Exercises]);
            if roles.contains(&Role::Coach) {
                fields.insert(Field::AssignedTo);
            }
        }
    }
    fields
}
