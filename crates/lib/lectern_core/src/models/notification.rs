//! Notification models.
//!
//! A notification is a `kind` tag plus an opaque JSON `data` payload. The
//! broadcaster never looks inside `data`; clients interpret it per kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EnrollmentRequested,
    EnrollmentApproved,
    EnrollmentRejected,
    SubmissionCreated,
    SubmissionGraded,
    AssignmentCreated,
    Announcement,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EnrollmentRequested => "enrollment_requested",
            NotificationKind::EnrollmentApproved => "enrollment_approved",
            NotificationKind::EnrollmentRejected => "enrollment_rejected",
            NotificationKind::SubmissionCreated => "submission_created",
            NotificationKind::SubmissionGraded => "submission_graded",
            NotificationKind::AssignmentCreated => "assignment_created",
            NotificationKind::Announcement => "announcement",
        }
    }
}

/// A notification before it is addressed or persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub course_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub submission_id: Option<i64>,
    pub data: serde_json::Value,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            course_id: None,
            assignment_id: None,
            submission_id: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn course(mut self, course_id: i64) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn assignment(mut self, assignment_id: i64) -> Self {
        self.assignment_id = Some(assignment_id);
        self
    }

    pub fn submission(mut self, submission_id: i64) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Persisted notification owned by a single principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub course_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub submission_id: Option<i64>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Payload pushed over live connections.
///
/// `id` is present only for persisted notifications; role- and course-wide
/// broadcasts are ephemeral and carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<i64>,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LiveMessage {
    pub fn ephemeral(n: NewNotification, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            kind: n.kind,
            title: n.title,
            message: n.message,
            course_id: n.course_id,
            assignment_id: n.assignment_id,
            submission_id: n.submission_id,
            data: n.data,
            created_at,
        }
    }
}

impl From<&Notification> for LiveMessage {
    fn from(n: &Notification) -> Self {
        Self {
            id: Some(n.id),
            kind: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            course_id: n.course_id,
            assignment_id: n.assignment_id,
            submission_id: n.submission_id,
            data: n.data.clone(),
            created_at: n.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_live_message_omits_id() {
        let msg = LiveMessage::ephemeral(
            NewNotification::new(NotificationKind::Announcement, "Hi", "Welcome").course(4),
            Utc::now(),
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["kind"], "announcement");
        assert_eq!(json["courseId"], 4);
    }
}
