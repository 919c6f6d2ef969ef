//! In-memory store.
//!
//! All tables live behind one `RwLock`, so every write (including the
//! compare-and-set style updates) is serialized the same way row locks
//! serialize them in PostgreSQL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

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

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    principals: BTreeMap<i64, PrincipalWithPassword>,
    refresh_tokens: BTreeMap<i64, RefreshTokenRecord>,
    courses: BTreeMap<i64, Course>,
    memberships: BTreeMap<(i64, i64), Membership>,
    enrollment_requests: BTreeMap<i64, EnrollmentRequest>,
    assignments: BTreeMap<i64, Assignment>,
    submissions: BTreeMap<i64, Submission>,
    announcements: BTreeMap<i64, Announcement>,
    comments: BTreeMap<i64, Comment>,
    notifications: BTreeMap<i64, Notification>,
}

impl Tables {
    /// Ids are unique across all tables, which is fine for a test double.
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn create_principal(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StoreResult<Principal> {
        let mut t = self.tables.write().await;
        if t.principals.values().any(|p| p.principal.email == email) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        let principal = Principal {
            id: t.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            created_at: Utc::now(),
        };
        t.principals.insert(
            principal.id,
            PrincipalWithPassword {
                principal: principal.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(principal)
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PrincipalWithPassword>> {
        let t = self.tables.read().await;
        Ok(t.principals
            .values()
            .find(|p| p.principal.email == email)
            .cloned())
    }

    async fn find_principal(&self, id: i64) -> StoreResult<Option<PrincipalWithPassword>> {
        Ok(self.tables.read().await.principals.get(&id).cloned())
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.principals.values().any(|p| p.principal.email == email))
    }

    async fn update_principal_name(&self, id: i64, name: &str) -> StoreResult<Option<Principal>> {
        let mut t = self.tables.write().await;
        Ok(t.principals.get_mut(&id).map(|p| {
            p.principal.name = name.to_string();
            p.principal.clone()
        }))
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.principals.get_mut(&id) {
            Some(p) => {
                p.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshTokenRecord> {
        let mut t = self.tables.write().await;
        if t.refresh_tokens.values().any(|r| r.token_hash == token.token_hash) {
            return Err(StoreError::Conflict("refresh token hash collision".into()));
        }
        let record = RefreshTokenRecord {
            id: t.next_id(),
            principal_id: token.principal_id,
            token_hash: token.token_hash,
            jwt_id: token.jwt_id,
            used: false,
            revoked: false,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        };
        t.refresh_tokens.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let t = self.tables.read().await;
        Ok(t.refresh_tokens
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn mark_refresh_token_used(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.refresh_tokens.get_mut(&id) {
            Some(r) if !r.used && !r.revoked => {
                r.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t
            .refresh_tokens
            .values_mut()
            .find(|r| r.token_hash == token_hash && !r.used && !r.revoked)
        {
            Some(r) => {
                r.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_refresh_tokens(&self, principal_id: i64) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let mut revoked = 0;
        for r in t.refresh_tokens.values_mut() {
            if r.principal_id == principal_id && !r.used && !r.revoked {
                r.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn create_course(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<Course> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let course = Course {
            id: t.next_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            owner_id,
            created_at: now,
        };
        t.courses.insert(course.id, course.clone());
        t.memberships.insert(
            (course.id, owner_id),
            Membership {
                course_id: course.id,
                principal_id: owner_id,
                role: Role::Teacher,
                joined_at: now,
            },
        );
        Ok(course)
    }

    async fn get_course(&self, id: i64) -> StoreResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn list_courses_for(&self, principal_id: i64) -> StoreResult<Vec<Course>> {
        let t = self.tables.read().await;
        let mut courses: Vec<Course> = t
            .memberships
            .values()
            .filter(|m| m.principal_id == principal_id)
            .filter_map(|m| t.courses.get(&m.course_id).cloned())
            .collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(courses)
    }

    async fn get_membership(
        &self,
        course_id: i64,
        principal_id: i64,
    ) -> StoreResult<Option<Membership>> {
        let t = self.tables.read().await;
        Ok(t.memberships.get(&(course_id, principal_id)).cloned())
    }

    async fn list_members(&self, course_id: i64) -> StoreResult<Vec<CourseMember>> {
        let t = self.tables.read().await;
        let mut members: Vec<CourseMember> = t
            .memberships
            .values()
            .filter(|m| m.course_id == course_id)
            .filter_map(|m| {
                t.principals.get(&m.principal_id).map(|p| CourseMember {
                    principal_id: m.principal_id,
                    name: p.principal.name.clone(),
                    email: p.principal.email.clone(),
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        members.sort_by(|a, b| {
            let rank = |r: Role| if r == Role::Teacher { 0 } else { 1 };
            rank(a.role)
                .cmp(&rank(b.role))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(members)
    }

    async fn remove_membership(&self, course_id: i64, principal_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        Ok(t.memberships.remove(&(course_id, principal_id)).is_some())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn insert_enrollment_request(
        &self,
        course_id: i64,
        student_id: i64,
        requested_at: DateTime<Utc>,
    ) -> StoreResult<EnrollmentRequest> {
        let mut t = self.tables.write().await;
        let pending = t.enrollment_requests.values().any(|r| {
            r.course_id == course_id && r.student_id == student_id && r.is_pending()
        });
        if pending {
            return Err(StoreError::Conflict(
                "enrollment request already pending".into(),
            ));
        }
        let request = EnrollmentRequest {
            id: t.next_id(),
            course_id,
            student_id,
            status: EnrollmentStatus::Pending,
            requested_at,
            processed_at: None,
            processed_by: None,
            rejection_reason: None,
        };
        t.enrollment_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_enrollment_request(&self, id: i64) -> StoreResult<Option<EnrollmentRequest>> {
        Ok(self.tables.read().await.enrollment_requests.get(&id).cloned())
    }

    async fn find_pending_request(
        &self,
        course_id: i64,
        student_id: i64,
    ) -> StoreResult<Option<EnrollmentRequest>> {
        let t = self.tables.read().await;
        Ok(t.enrollment_requests
            .values()
            .find(|r| r.course_id == course_id && r.student_id == student_id && r.is_pending())
            .cloned())
    }

    async fn list_requests_for_student(
        &self,
        student_id: i64,
    ) -> StoreResult<Vec<EnrollmentRequest>> {
        let t = self.tables.read().await;
        Ok(t.enrollment_requests
            .values()
            .rev()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_requests_for_course(
        &self,
        course_id: i64,
        status: Option<EnrollmentStatus>,
    ) -> StoreResult<Vec<EnrollmentRequest>> {
        let t = self.tables.read().await;
        Ok(t.enrollment_requests
            .values()
            .filter(|r| r.course_id == course_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }

    async fn approve_request(
        &self,
        id: i64,
        teacher_id: i64,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Option<EnrollmentRequest>> {
        let mut t = self.tables.write().await;
        let request = match t.enrollment_requests.get_mut(&id) {
            Some(r) if r.is_pending() => {
                r.status = EnrollmentStatus::Approved;
                r.processed_at = Some(processed_at);
                r.processed_by = Some(teacher_id);
                r.clone()
            }
            _ => return Ok(None),
        };
        t.memberships
            .entry((request.course_id, request.student_id))
            .or_insert(Membership {
                course_id: request.course_id,
                principal_id: request.student_id,
                role: Role::Student,
                joined_at: processed_at,
            });
        Ok(Some(request))
    }

    async fn reject_request(
        &self,
        id: i64,
        teacher_id: i64,
        reason: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Option<EnrollmentRequest>> {
        let mut t = self.tables.write().await;
        Ok(match t.enrollment_requests.get_mut(&id) {
            Some(r) if r.is_pending() => {
                r.status = EnrollmentStatus::Rejected;
                r.processed_at = Some(processed_at);
                r.processed_by = Some(teacher_id);
                r.rejection_reason = reason.map(str::to_string);
                Some(r.clone())
            }
            _ => None,
        })
    }

    async fn delete_pending_request(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if !t.enrollment_requests.get(&id).is_some_and(|r| r.is_pending()) {
            return Ok(false);
        }
        t.enrollment_requests.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl CourseworkStore for MemoryStore {
    async fn create_assignment(
        &self,
        course_id: i64,
        created_by: i64,
        draft: &AssignmentDraft,
    ) -> StoreResult<Assignment> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let assignment = Assignment {
            id: t.next_id(),
            course_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_at: draft.due_at,
            max_points: draft.max_points,
            created_by,
            created_at: now,
            updated_at: now,
        };
        t.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, id: i64) -> StoreResult<Option<Assignment>> {
        Ok(self.tables.read().await.assignments.get(&id).cloned())
    }

    async fn list_assignments(&self, course_id: i64) -> StoreResult<Vec<Assignment>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Assignment> = t
            .assignments
            .values()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect();
        // Undated assignments last, like NULLS LAST.
        rows.sort_by_key(|a| (a.due_at.is_none(), a.due_at, a.id));
        Ok(rows)
    }

    async fn save_assignment(&self, assignment: &Assignment) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.assignments.get_mut(&assignment.id) {
            Some(existing) => {
                *existing = assignment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_assignment(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let removed = t.assignments.remove(&id).is_some();
        if removed {
            t.submissions.retain(|_, s| s.assignment_id != id);
        }
        Ok(removed)
    }

    async fn create_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
        content: &str,
    ) -> StoreResult<Submission> {
        let mut t = self.tables.write().await;
        if t.submissions
            .values()
            .any(|s| s.assignment_id == assignment_id && s.student_id == student_id)
        {
            return Err(StoreError::Conflict("assignment already submitted".into()));
        }
        let submission = Submission {
            id: t.next_id(),
            assignment_id,
            student_id,
            content: content.to_string(),
            submitted_at: Utc::now(),
            grade: None,
            feedback: None,
            graded_at: None,
            graded_by: None,
        };
        t.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: i64) -> StoreResult<Option<Submission>> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn list_submissions(
        &self,
        assignment_id: i64,
        student_id: Option<i64>,
    ) -> StoreResult<Vec<Submission>> {
        let t = self.tables.read().await;
        Ok(t.submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .filter(|s| student_id.is_none_or(|id| s.student_id == id))
            .cloned()
            .collect())
    }

    async fn grade_submission(&self, id: i64, grade: &Grade) -> StoreResult<Option<Submission>> {
        let mut t = self.tables.write().await;
        Ok(t.submissions.get_mut(&id).map(|s| {
            s.grade = Some(grade.points);
            s.feedback = grade.feedback.clone();
            s.graded_at = Some(grade.graded_at);
            s.graded_by = Some(grade.graded_by);
            s.clone()
        }))
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn create_announcement(
        &self,
        course_id: i64,
        author_id: i64,
        title: &str,
        body: &str,
    ) -> StoreResult<Announcement> {
        let mut t = self.tables.write().await;
        let announcement = Announcement {
            id: t.next_id(),
            course_id,
            author_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        t.announcements.insert(announcement.id, announcement.clone());
        Ok(announcement)
    }

    async fn get_announcement(&self, id: i64) -> StoreResult<Option<Announcement>> {
        Ok(self.tables.read().await.announcements.get(&id).cloned())
    }

    async fn list_announcements(&self, course_id: i64) -> StoreResult<Vec<Announcement>> {
        let t = self.tables.read().await;
        Ok(t.announcements
            .values()
            .rev()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        announcement_id: i64,
        author_id: i64,
        body: &str,
    ) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;
        let comment = Comment {
            id: t.next_id(),
            announcement_id,
            author_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        t.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, announcement_id: i64) -> StoreResult<Vec<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments
            .values()
            .filter(|c| c.announcement_id == announcement_id)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(
        &self,
        user_id: i64,
        notification: &NewNotification,
    ) -> StoreResult<Notification> {
        let mut t = self.tables.write().await;
        let row = Notification {
            id: t.next_id(),
            user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            read: false,
            course_id: notification.course_id,
            assignment_id: notification.assignment_id,
            submission_id: notification.submission_id,
            data: notification.data.clone(),
            created_at: Utc::now(),
        };
        t.notifications.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_notifications(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let t = self.tables.read().await;
        Ok(t.notifications
            .values()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_unread(&self, user_id: i64) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t.notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as i64)
    }

    async fn mark_notification_read(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let mut marked = 0;
        for n in t.notifications.values_mut() {
            if n.user_id == user_id && !n.read {
                n.read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn delete_notification(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if !t.notifications.get(&id).is_some_and(|n| n.user_id == user_id) {
            return Ok(false);
        }
        t.notifications.remove(&id);
        Ok(true)
    }
}
