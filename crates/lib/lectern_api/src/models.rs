//! Request and response bodies (camelCase JSON).

use chrono::{DateTime, Utc};
use lectern_core::auth::accounts::AuthSession;
use lectern_core::classroom::InvitationReport;
use lectern_core::models::auth::{Principal, Role, TokenPair};
use lectern_core::models::course::{Course, CourseMember, EnrollmentRequest, EnrollmentStatus};
use lectern_core::models::coursework::{Announcement, Assignment, Comment, Submission};
use lectern_core::models::notification::{Notification, NotificationKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            role: p.role,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_at: pair.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: PrincipalResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            tokens: session.tokens.into(),
            user: session.principal.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            owner_id: c.owner_id,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub principal_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl From<CourseMember> for MemberResponse {
    fn from(m: CourseMember) -> Self {
        Self {
            principal_id: m.principal_id,
            name: m.name,
            email: m.email,
            role: m.role,
            joined_at: m.joined_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationResponse {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

impl From<InvitationReport> for InvitationResponse {
    fn from(r: InvitationReport) -> Self {
        Self {
            sent: r.sent,
            failed: r.failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub course_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessEnrollmentRequest {
    pub action: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequestResponse {
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub status: EnrollmentStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl From<EnrollmentRequest> for EnrollmentRequestResponse {
    fn from(r: EnrollmentRequest) -> Self {
        Self {
            id: r.id,
            course_id: r.course_id,
            student_id: r.student_id,
            status: r.status,
            requested_at: r.requested_at,
            processed_at: r.processed_at,
            processed_by: r.processed_by,
            rejection_reason: r.rejection_reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Coursework
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub max_points: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub max_points: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
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

impl From<Assignment> for AssignmentResponse {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            course_id: a.course_id,
            title: a.title,
            description: a.description,
            due_at: a.due_at,
            max_points: a.max_points,
            created_by: a.created_by,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeRequest {
    pub grade: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
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

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            assignment_id: s.assignment_id,
            student_id: s.student_id,
            content: s.content,
            submitted_at: s.submitted_at,
            grade: s.grade,
            feedback: s.feedback,
            graded_at: s.graded_at,
            graded_by: s.graded_by,
        }
    }
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementResponse {
    pub id: i64,
    pub course_id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Announcement> for AnnouncementResponse {
    fn from(a: Announcement) -> Self {
        Self {
            id: a.id,
            course_id: a.course_id,
            author_id: a.author_id,
            title: a.title,
            body: a.body,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub announcement_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            announcement_id: c.announcement_id,
            author_id: c.author_id,
            body: c.body,
            created_at: c.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
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

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            read: n.read,
            course_id: n.course_id,
            assignment_id: n.assignment_id,
            submission_id: n.submission_id,
            data: n.data,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `connected`, `unavailable` or `in-memory`.
    pub database: String,
}

/// Map a list of domain values into response bodies.
pub fn map_all<T, R: From<T>>(items: Vec<T>) -> Vec<R> {
    items.into_iter().map(R::from).collect()
}
