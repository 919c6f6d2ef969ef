//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    AnnouncementStore, CourseStore, CourseworkStore, EnrollmentStore, NotificationStore,
    PrincipalStore, StoreError, StoreResult, TokenStore,
};
use crate::models::auth::{
    NewRefreshToken, Principal, PrincipalWithPassword, RefreshTokenRecord, Role,
};
use crate::models::course::{Course, CourseMember, EnrollmentRequest, EnrollmentStatus, Membership};
use crate::models::coursework::{
    Announcement, Assignment, AssignmentDraft, Comment, Grade, Submission,
};
use crate::models::notification::{NewNotification, Notification};

/// Store over a shared `PgPool`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique violation to `Conflict`, everything else to `Db`.
fn unique_conflict(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Db(e),
    }
}

// ---------------------------------------------------------------------------
// Principals
// ---------------------------------------------------------------------------

#[async_trait]
impl PrincipalStore for PgStore {
    async fn create_principal(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StoreResult<Principal> {
        sqlx::query_as::<_, Principal>(
            r#"
            INSERT INTO principals (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, role, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "email already registered"))
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PrincipalWithPassword>> {
        let row = sqlx::query_as::<_, PrincipalWithPassword>(
            "SELECT id, name, email, role, created_at, password_hash FROM principals WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_principal(&self, id: i64) -> StoreResult<Option<PrincipalWithPassword>> {
        let row = sqlx::query_as::<_, PrincipalWithPassword>(
            "SELECT id, name, email, role, created_at, password_hash FROM principals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM principals WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn update_principal_name(&self, id: i64, name: &str) -> StoreResult<Option<Principal>> {
        let row = sqlx::query_as::<_, Principal>(
            "UPDATE principals SET name = $1 WHERE id = $2 RETURNING id, name, email, role, created_at",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE principals SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Refresh tokens
// ---------------------------------------------------------------------------

#[async_trait]
impl TokenStore for PgStore {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        let row = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (principal_id, token_hash, jwt_id, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, principal_id, token_hash, jwt_id, used, revoked, issued_at, expires_at
            "#,
        )
        .bind(token.principal_id)
        .bind(&token.token_hash)
        .bind(&token.jwt_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "refresh token hash collision"))?;
        Ok(row)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, principal_id, token_hash, jwt_id, used, revoked, issued_at, expires_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_refresh_token_used(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET used = TRUE WHERE id = $1 AND used = FALSE AND revoked = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE token_hash = $1 AND used = FALSE AND revoked = FALSE",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_refresh_tokens(&self, principal_id: i64) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE principal_id = $1 AND used = FALSE AND revoked = FALSE",
        )
        .bind(principal_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Courses and memberships
// ---------------------------------------------------------------------------

#[async_trait]
impl CourseStore for PgStore {
    async fn create_course(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<Course> {
        let mut tx = self.pool.begin().await?;

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, owner_id, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO memberships (course_id, principal_id, role) VALUES ($1, $2, $3)")
            .bind(course.id)
            .bind(owner_id)
            .bind(Role::Teacher)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(course)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>> {
        let row = sqlx::query_as::<_, Course>(
            "SELECT id, name, description, owner_id, created_at FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_courses_for(&self, principal_id: i64) -> StoreResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, Course>(
            r#"
            SELECT c.id, c.name, c.description, c.owner_id, c.created_at
            FROM courses c
            JOIN memberships m ON m.course_id = c.id
            WHERE m.principal_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_membership(
        &self,
        course_id: i64,
        principal_id: i64,
    ) -> StoreResult<Option<Membership>> {
        let row = sqlx::query_as::<_, Membership>(
            r#"
            SELECT course_id, principal_id, role, joined_at
            FROM memberships
            WHERE course_id = $1 AND principal_id = $2
            "#,
        )
        .bind(course_id)
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_members(&self, course_id: i64) -> StoreResult<Vec<CourseMember>> {
        let rows = sqlx::query_as::<_, CourseMember>(
            r#"
            SELECT p.id AS principal_id, p.name, p.email, m.role, m.joined_at
            FROM memberships m
            JOIN principals p ON p.id = m.principal_id
            WHERE m.course_id = $1
            ORDER BY m.role DESC, p.name ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn remove_membership(&self, course_id: i64, principal_id: i64) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM memberships WHERE course_id = $1 AND principal_id = $2")
                .bind(course_id)
                .bind(principal_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Enrollment requests
// ---------------------------------------------------------------------------

const REQUEST_COLUMNS: &str = "id, course_id, student_id, status, requested_at, \
                               processed_at, processed_by, rejection_reason";

#[async_trait]
impl EnrollmentStore for PgStore {
    async fn insert_enrollment_request(
        &self,
        course_id: i64,
        student_id: i64,
        requested_at: DateTime<Utc>,
    ) -> StoreResult<EnrollmentRequest> {
        let sql = format!(
            "INSERT INTO enrollment_requests (course_id, student_id, requested_at) \
             VALUES ($1, $2, $3) RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(course_id)
            .bind(student_id)
            .bind(requested_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_conflict(e, "enrollment request already pending"))
    }

    async fn get_enrollment_request(&self, id: i64) -> StoreResult<Option<EnrollmentRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM enrollment_requests WHERE id = $1");
        let row = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_pending_request(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<EnrollmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests \
             WHERE course_id = $1 AND student_id = $2 AND status = 'Pending'"
        );
        let row = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(course_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_requests_for_student(
        &self,
        student_id: i64,
    ) -> StoreResult<Vec<EnrollmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests \
             WHERE student_id = $1 ORDER BY requested_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_requests_for_course(
        &self,
        course_id: i64,
        status: Option<EnrollmentStatus>,
    ) -> StoreResult<Vec<EnrollmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests \
             WHERE course_id = $1 AND ($2::enrollment_status IS NULL OR status = $2) \
             ORDER BY requested_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(course_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn approve_request(
        &self,
        id: i64,
        teacher_id: i64,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Option<EnrollmentRequest>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE enrollment_requests \
             SET status = 'Approved', processed_at = $2, processed_by = $3 \
             WHERE id = $1 AND status = 'Pending' \
             RETURNING {REQUEST_COLUMNS}"
        );
        let approved = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(id)
            .bind(processed_at)
            .bind(teacher_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(request) = approved else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO memberships (course_id, principal_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (course_id, principal_id) DO NOTHING",
        )
        .bind(request.course_id)
        .bind(request.student_id)
        .bind(Role::Student)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn reject_request(
        &self,
        id: i64,
        teacher_id: i64,
        reason: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Option<EnrollmentRequest>> {
        let sql = format!(
            "UPDATE enrollment_requests \
             SET status = 'Rejected', processed_at = $2, processed_by = $3, rejection_reason = $4 \
             WHERE id = $1 AND status = 'Pending' \
             RETURNING {REQUEST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(id)
            .bind(processed_at)
            .bind(teacher_id)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_pending_request(&self, id: i64) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM enrollment_requests WHERE id = $1 AND status = 'Pending'")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Assignments and submissions
// ---------------------------------------------------------------------------

const ASSIGNMENT_COLUMNS: &str =
    "id, course_id, title, description, due_at, max_points, created_by, created_at, updated_at";

const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, content, submitted_at, \
                                  grade, feedback, graded_at, graded_by";

#[async_trait]
impl CourseworkStore for PgStore {
    async fn create_assignment(
        &self,
        course_id: i64,
        created_by: i64,
        draft: &AssignmentDraft,
    ) -> StoreResult<Assignment> {
        let sql = format!(
            "INSERT INTO assignments (course_id, title, description, due_at, max_points, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Assignment>(&sql)
            .bind(course_id)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.due_at)
            .bind(draft.max_points)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_assignment(&self, id: i64) -> StoreResult<Option<Assignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1");
        let row = sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_assignments(&self, course_id: i64) -> StoreResult<Vec<Assignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE course_id = $1 \
             ORDER BY due_at ASC NULLS LAST, id ASC"
        );
        let rows = sqlx::query_as::<_, Assignment>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn save_assignment(&self, assignment: &Assignment) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE assignments
            SET title = $1, description = $2, due_at = $3, max_points = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&assignment.title)
        .bind(&assignment.description)
        .bind(assignment.due_at)
        .bind(assignment.max_points)
        .bind(assignment.updated_at)
        .bind(assignment.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_assignment(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
        content: &str,
    ) -> StoreResult<Submission> {
        let sql = format!(
            "INSERT INTO submissions (assignment_id, student_id, content) \
             VALUES ($1, $2, $3) RETURNING {SUBMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(assignment_id)
            .bind(student_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_conflict(e, "assignment already submitted"))
    }

    async fn get_submission(&self, id: i64) -> StoreResult<Option<Submission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");
        let row = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_submissions(
        &self,
        assignment_id: i64,
        student_id: Option<i64>,
    ) -> StoreResult<Vec<Submission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions \
             WHERE assignment_id = $1 AND ($2::BIGINT IS NULL OR student_id = $2) \
             ORDER BY submitted_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, Submission>(&sql)
            .bind(assignment_id)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn grade_submission(&self, id: i64, grade: &Grade) -> StoreResult<Option<Submission>> {
        let sql = format!(
            "UPDATE submissions SET grade = $2, feedback = $3, graded_at = $4, graded_by = $5 \
             WHERE id = $1 RETURNING {SUBMISSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .bind(grade.points)
            .bind(&grade.feedback)
            .bind(grade.graded_at)
            .bind(grade.graded_by)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Announcements and comments
// ---------------------------------------------------------------------------

#[async_trait]
impl AnnouncementStore for PgStore {
    async fn create_announcement(
        &self,
        course_id: i64,
        author_id: i64,
        title: &str,
        body: &str,
    ) -> StoreResult<Announcement> {
        let row = sqlx::query_as::<_, Announcement>(
            r#"
            INSERT INTO announcements (course_id, author_id, title, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, course_id, author_id, title, body, created_at
            "#,
        )
        .bind(course_id)
        .bind(author_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_announcement(&self, id: i64) -> StoreResult<Option<Announcement>> {
        let row = sqlx::query_as::<_, Announcement>(
            "SELECT id, course_id, author_id, title, body, created_at FROM announcements WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_announcements(&self, course_id: i64) -> StoreResult<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, Announcement>(
            r#"
            SELECT id, course_id, author_id, title, body, created_at
            FROM announcements
            WHERE course_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_comment(
        &self,
        announcement_id: i64,
        author_id: i64,
        body: &str,
    ) -> StoreResult<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (announcement_id, author_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, announcement_id, author_id, body, created_at
            "#,
        )
        .bind(announcement_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, Comment>(
            "SELECT id, announcement_id, author_id, body, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_comments(&self, announcement_id: i64) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, announcement_id, author_id, body, created_at
            FROM comments
            WHERE announcement_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(announcement_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, read, course_id, \
                                    assignment_id, submission_id, data, created_at";

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        user_id: i64,
        notification: &NewNotification,
    ) -> StoreResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications \
             (user_id, kind, title, message, course_id, assignment_id, submission_id, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(notification.kind)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.course_id)
            .bind(notification.assignment_id)
            .bind(notification.submission_id)
            .bind(&notification.data)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_notifications(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 AND (NOT $2 OR read = FALSE) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_unread(&self, user_id: i64) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_notification_read(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
