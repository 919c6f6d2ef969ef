//! Course, membership and enrollment-request models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::Role;

/// A course owned by the teacher who created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Membership row: the authorization ledger for a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub course_id: i64,
    pub principal_id: i64,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Membership joined with the member's profile, for roster listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseMember {
    pub principal_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "enrollment_status")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnrollmentStatus::Pending => "Pending",
            EnrollmentStatus::Approved => "Approved",
            EnrollmentStatus::Rejected => "Rejected",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(EnrollmentStatus::Pending),
            "approved" => Ok(EnrollmentStatus::Approved),
            "rejected" => Ok(EnrollmentStatus::Rejected),
            other => Err(format!("unknown enrollment status '{other}'")),
        }
    }
}

/// A student's request to join a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnrollmentRequest {
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub status: EnrollmentStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl EnrollmentRequest {
    pub fn is_pending(&self) -> bool {
        self.status == EnrollmentStatus::Pending
    }
}

/// Teacher decision on a pending enrollment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentDecision {
    Approve,
    Reject { reason: Option<String> },
}

impl EnrollmentDecision {
    /// Parse an `approve`/`reject` action (case-insensitive). The reason is
    /// kept only for rejections.
    pub fn parse(action: &str, reason: Option<String>) -> Option<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(EnrollmentDecision::Approve),
            "reject" => Some(EnrollmentDecision::Reject {
                reason: reason.filter(|r| !r.trim().is_empty()),
            }),
            _ => None,
        }
    }
}
