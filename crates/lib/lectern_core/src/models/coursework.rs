//! Assignment, submission, announcement and comment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub max_points: i32,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an assignment.
#[derive(Debug, Clone, Default)]
pub struct AssignmentDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub max_points: i32,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub max_points: Option<i32>,
}

impl AssignmentPatch {
    /// Apply the patch to an existing assignment, bumping `updated_at`.
    pub fn apply(self, mut assignment: Assignment, now: DateTime<Utc>) -> Assignment {
        if let Some(title) = self.title {
            assignment.title = title;
        }
        if let Some(description) = self.description {
            assignment.description = Some(description);
        }
        if let Some(due_at) = self.due_at {
            assignment.due_at = Some(due_at);
        }
        if let Some(max_points) = self.max_points {
            assignment.max_points = max_points;
        }
        assignment.updated_at = now;
        assignment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
    pub grade: Option<i32>,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub graded_by: Option<i64>,
}

/// A grade given by a teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub points: i32,
    pub feedback: Option<String>,
    pub graded_by: i64,
    pub graded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: i64,
    pub course_id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub announcement_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_given_fields() {
        let created = Utc::now();
        let original = Assignment {
            id: 1,
            course_id: 2,
            title: "Essay".into(),
            description: Some("500 words".into()),
            due_at: None,
            max_points: 10,
            created_by: 3,
            created_at: created,
            updated_at: created,
        };
        let later = created + chrono::Duration::minutes(5);
        let patched = AssignmentPatch {
            max_points: Some(20),
            ..Default::default()
        }
        .apply(original.clone(), later);

        assert_eq!(patched.title, "Essay");
        assert_eq!(patched.description.as_deref(), Some("500 words"));
        assert_eq!(patched.max_points, 20);
        assert_eq!(patched.updated_at, later);
    }
}
