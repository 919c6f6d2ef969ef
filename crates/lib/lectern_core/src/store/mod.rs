//! Persistence seam.
//!
//! Services talk to storage only through these traits. `PgStore` is the
//! production implementation; `MemoryStore` backs tests and `--in-memory`
//! development runs. Both must honour the same conditional-update semantics
//! (refresh-token rotation, pending enrollment uniqueness, approval).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::auth::{
    NewRefreshToken, Principal, PrincipalWithPassword, RefreshTokenRecord, Role,
};
use crate::models::course::{Course, CourseMember, EnrollmentRequest, EnrollmentStatus, Membership};
use crate::models::coursework::{
    Announcement, Assignment, AssignmentDraft, Comment, Grade, Submission,
};
use crate::models::notification::{NewNotification, Notification};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Insert a principal. `Conflict` if the email is taken.
    async fn create_principal(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StoreResult<Principal>;

    async fn find_principal_by_email(&self, email: &str)
    -> StoreResult<Option<PrincipalWithPassword>>;

    async fn find_principal(&self, id: i64) -> StoreResult<Option<PrincipalWithPassword>>;

    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    async fn update_principal_name(&self, id: i64, name: &str) -> StoreResult<Option<Principal>>;

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord>;

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Flip `used` on an active token. Returns `false` if another caller got
    /// there first or the token was revoked in between.
    async fn mark_refresh_token_used(&self, id: i64) -> StoreResult<bool>;

    /// Revoke a single unused, unrevoked token.
    async fn revoke_refresh_token(&self, token_hash: &str) -> StoreResult<bool>;

    /// Revoke every unused, unrevoked token of a principal.
    async fn revoke_all_refresh_tokens(&self, principal_id: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Create a course and the owner's Teacher membership atomically.
    async fn create_course(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<Course>;

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>>;

    /// Courses the principal is a member of, in any role.
    async fn list_courses_for(&self, principal_id: i64) -> StoreResult<Vec<Course>>;

    async fn get_membership(&self, course_id: i64, principal_id: i64)
    -> StoreResult<Option<Membership>>;

    async fn list_members(&self, course_id: i64) -> StoreResult<Vec<CourseMember>>;

    async fn remove_membership(&self, course_id: i64, principal_id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Insert a Pending request. `Conflict` if one is already pending for the pair.
    async fn insert_enrollment_request(
        &self,
        course_id: i64,
        student_id: i64,
        requested_at: DateTime<Utc>,
    ) -> StoreResult<EnrollmentRequest>;

    async fn get_enrollment_request(&self, id: i64) -> StoreResult<Option<EnrollmentRequest>>;

    async fn find_pending_request(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<EnrollmentRequest>>;

    async fn list_requests_for_student(&self, student_id: i64)
    -> StoreResult<Vec<EnrollmentRequest>>;

    async fn list_requests_for_course(
        &self,
        course_id: i64,
        status: Option<EnrollmentStatus>,
    ) -> StoreResult<Vec<EnrollmentRequest>>;

    /// Approve a Pending request and add the Student membership in one step.
    /// `None` if the request is missing or no longer Pending.
    async fn approve_request(
        &self,
        id: i64,
        teacher_id: i64,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Option<EnrollmentRequest>>;

    /// Reject a Pending request. `None` if missing or no longer Pending.
    async fn reject_request(
        &self,
        id: i64,
        teacher_id: i64,
        reason: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Option<EnrollmentRequest>>;

    /// Delete a request only while it is still Pending.
    async fn delete_pending_request(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait CourseworkStore: Send + Sync {
    async fn create_assignment(
        &self,
        course_id: i64,
        created_by: i64,
        draft: &AssignmentDraft,
    ) -> StoreResult<Assignment>;

    async fn get_assignment(&self, id: i64) -> StoreResult<Option<Assignment>>;

    async fn list_assignments(&self, course_id: i64) -> StoreResult<Vec<Assignment>>;

    /// Persist the mutable fields of an assignment.
    async fn save_assignment(&self, assignment: &Assignment) -> StoreResult<bool>;

    /// Delete an assignment and its submissions.
    async fn delete_assignment(&self, id: i64) -> StoreResult<bool>;

    /// `Conflict` if the student already submitted this assignment.
    async fn create_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
        content: &str,
    ) -> StoreResult<Submission>;

    async fn get_submission(&self, id: i64) -> StoreResult<Option<Submission>>;

    /// All submissions of an assignment, or only one student's when given.
    async fn list_submissions(
        &self,
        assignment_id: i64,
        student_id: Option<i64>,
    ) -> StoreResult<Vec<Submission>>;

    async fn grade_submission(&self, id: i64, grade: &Grade) -> StoreResult<Option<Submission>>;
}

#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn create_announcement(
        &self,
        course_id: i64,
        author_id: i64,
        title: &str,
        body: &str,
    ) -> StoreResult<Announcement>;

    async fn get_announcement(&self, id: i64) -> StoreResult<Option<Announcement>>;

    async fn list_announcements(&self, course_id: i64) -> StoreResult<Vec<Announcement>>;

    async fn create_comment(
        &self,
        announcement_id: i64,
        author_id: i64,
        body: &str,
    ) -> StoreResult<Comment>;

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>>;

    async fn list_comments(&self, announcement_id: i64) -> StoreResult<Vec<Comment>>;

    async fn delete_comment(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(
        &self,
        user_id: i64,
        notification: &NewNotification,
    ) -> StoreResult<Notification>;

    /// Newest first.
    async fn list_notifications(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;

    async fn count_unread(&self, user_id: i64) -> StoreResult<i64>;

    /// Scoped to the owner; `false` if the row is missing or belongs to someone else.
    async fn mark_notification_read(&self, id: i64, user_id: i64) -> StoreResult<bool>;

    async fn mark_all_notifications_read(&self, user_id: i64) -> StoreResult<u64>;

    async fn delete_notification(&self, id: i64, user_id: i64) -> StoreResult<bool>;
}

/// Everything a Lectern backend provides.
pub trait Store:
    PrincipalStore
    + TokenStore
    + CourseStore
    + EnrollmentStore
    + CourseworkStore
    + AnnouncementStore
    + NotificationStore
{
}

impl<T> Store for T where
    T: PrincipalStore
        + TokenStore
        + CourseStore
        + EnrollmentStore
        + CourseworkStore
        + AnnouncementStore
        + NotificationStore
{
}
