//! Admission checks run before a candidate reaches the store.

use crate::models::StudentDraft;

pub const MIN_AGE: i32 = 15;
pub const MAX_AGE: i32 = 70;

/// Returns one message per violated rule; an empty list means the draft is accepted.
///
/// Every rule is evaluated, so a draft breaking three rules yields three messages.
pub fn validate(draft: &StudentDraft) -> Vec<String> {
    let mut errors = Vec::new();

    if draft.name.trim().chars().count() < 2 {
        errors.push("Name must be at least 2 characters long".to_string());
    }
    if !(MIN_AGE..=MAX_AGE).contains(&draft.age) {
        errors.push(format!("Age must be between {MIN_AGE} and {MAX_AGE}"));
    }
    if !draft.email.contains('@') {
        errors.push("Valid email address is required".to_string());
    }
    if !is_percentage(draft.performance) {
        errors.push("Performance must be between 0 and 100".to_string());
    }
    if draft.course.trim().chars().count() < 2 {
        errors.push("Course must be at least 2 characters long".to_string());
    }
    if let Some(attendance) = draft.attendance {
        if !is_percentage(attendance) {
            errors.push("Attendance must be between 0 and 100".to_string());
        }
    }

    errors
}

fn is_percentage(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}
