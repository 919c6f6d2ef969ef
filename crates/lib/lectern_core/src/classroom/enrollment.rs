//! Enrollment requests.
//!
//! `Pending -> Approved | Rejected`, both terminal. Approval and the Student
//! membership it grants are written together by the store.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use super::guard::{AccessGuard, Actor};
use super::{ClassroomError, ClassroomResult};
use crate::models::auth::Role;
use crate::models::course::{Course, EnrollmentDecision, EnrollmentRequest, EnrollmentStatus};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::notifications::NotificationService;
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn Store>,
    guard: AccessGuard,
    notifications: NotificationService,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn Store>, guard: AccessGuard, notifications: NotificationService) -> Self {
        Self {
            store,
            guard,
            notifications,
        }
    }

    /// A student asks to join a course. Every teacher of the course is notified.
    pub async fn create(&self, actor: &Actor, course_id: i64) -> ClassroomResult<EnrollmentRequest> {
        if !actor.is_student() {
            return Err(ClassroomError::Unauthorized(
                "Only students can request enrollment".into(),
            ));
        }
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Course not found".into()))?;
        if self.guard.is_enrolled(course_id, actor.id).await? {
            return Err(ClassroomError::InvalidOperation(
                "You are already enrolled in this course".into(),
            ));
        }
        if self.store.find_pending_request(course_id, actor.id).await?.is_some() {
            return Err(already_pending());
        }

        let request = match self
            .store
            .insert_enrollment_request(course_id, actor.id, Utc::now())
            .await
        {
            Ok(r) => r,
            Err(StoreError::Conflict(_)) => return Err(already_pending()),
            Err(e) => return Err(e.into()),
        };
        info!(request_id = request.id, course_id, student_id = actor.id, "enrollment requested");

        if let Err(e) = self.notify_teachers(&course, &request).await {
            warn!(request_id = request.id, error = %e, "teachers not notified of enrollment request");
        }
        Ok(request)
    }

    /// Approve or reject a pending request. `action` is `approve` or `reject`
    /// in any case; `reason` is only kept for rejections.
    pub async fn process(
        &self,
        actor: &Actor,
        request_id: i64,
        action: &str,
        reason: Option<String>,
    ) -> ClassroomResult<EnrollmentRequest> {
        let decision = EnrollmentDecision::parse(action, reason).ok_or_else(|| {
            ClassroomError::Validation("Action must be 'approve' or 'reject'".into())
        })?;
        let request = self.find(request_id).await?;
        self.guard.require_teacher_of(request.course_id, actor.id).await?;
        if !request.is_pending() {
            return Err(not_pending());
        }

        let now = Utc::now();
        let processed = match &decision {
            EnrollmentDecision::Approve => self.store.approve_request(request_id, actor.id, now).await?,
            EnrollmentDecision::Reject { reason } => {
                self.store
                    .reject_request(request_id, actor.id, reason.as_deref(), now)
                    .await?
            }
        };
        // Someone else processed it between the read and the write.
        let processed = processed.ok_or_else(not_pending)?;
        info!(
            request_id,
            course_id = processed.course_id,
            status = %processed.status,
            teacher_id = actor.id,
            "enrollment request processed"
        );

        if let Err(e) = self.notify_student(&processed, &decision).await {
            warn!(request_id, error = %e, "student not notified of enrollment decision");
        }

        Ok(processed)
    }

    /// A student withdraws their own pending request.
    pub async fn cancel(&self, actor: &Actor, request_id: i64) -> ClassroomResult<()> {
        let request = self.find(request_id).await?;
        if request.student_id != actor.id {
            return Err(ClassroomError::Unauthorized(
                "You can only cancel your own requests".into(),
            ));
        }
        if !request.is_pending() {
            return Err(not_pending());
        }
        if !self.store.delete_pending_request(request_id).await? {
            warn!(request_id, "request processed before it could be cancelled");
            return Err(not_pending());
        }
        info!(request_id, student_id = actor.id, "enrollment request cancelled");
        Ok(())
    }

    /// The caller's own requests, newest first.
    pub async fn list_mine(&self, actor: &Actor) -> ClassroomResult<Vec<EnrollmentRequest>> {
        Ok(self.store.list_requests_for_student(actor.id).await?)
    }

    /// Requests for a course, optionally filtered by status. Teachers only.
    pub async fn list_for_course(
        &self,
        actor: &Actor,
        course_id: i64,
        status: Option<EnrollmentStatus>,
    ) -> ClassroomResult<Vec<EnrollmentRequest>> {
        self.guard.require_teacher_of(course_id, actor.id).await?;
        Ok(self.store.list_requests_for_course(course_id, status).await?)
    }

    async fn notify_teachers(&self, course: &Course, request: &EnrollmentRequest) -> ClassroomResult<()> {
        let student_name = self
            .store
            .find_principal(request.student_id)
            .await?
            .map(|p| p.principal.name)
            .unwrap_or_default();
        let teachers = self.store.list_members(course.id).await?;
        for teacher in teachers.into_iter().filter(|m| m.role == Role::Teacher) {
            let notification = NewNotification::new(
                NotificationKind::EnrollmentRequested,
                "New enrollment request",
                format!("{student_name} asked to join {}", course.name),
            )
            .course(course.id)
            .data(json!({ "requestId": request.id, "studentId": request.student_id }));
            self.notifications.notify(teacher.principal_id, notification).await?;
        }
        Ok(())
    }

    async fn notify_student(
        &self,
        processed: &EnrollmentRequest,
        decision: &EnrollmentDecision,
    ) -> ClassroomResult<()> {
        let course_name = self
            .store
            .get_course(processed.course_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default();
        let notification = match decision {
            EnrollmentDecision::Approve => NewNotification::new(
                NotificationKind::EnrollmentApproved,
                "Enrollment approved",
                format!("You are now enrolled in {course_name}"),
            ),
            EnrollmentDecision::Reject { reason } => NewNotification::new(
                NotificationKind::EnrollmentRejected,
                "Enrollment rejected",
                match reason {
                    Some(r) => format!("Your request to join {course_name} was rejected: {r}"),
                    None => format!("Your request to join {course_name} was rejected"),
                },
            ),
        }
        .course(processed.course_id)
        .data(json!({ "requestId": processed.id }));
        self.notifications.notify(processed.student_id, notification).await?;
        Ok(())
    }

    async fn find(&self, request_id: i64) -> ClassroomResult<EnrollmentRequest> {
        self.store
            .get_enrollment_request(request_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Enrollment request not found".into()))
    }
}

fn already_pending() -> ClassroomError {
    ClassroomError::InvalidOperation("An enrollment request is already pending".into())
}

fn not_pending() -> ClassroomError {
    ClassroomError::InvalidOperation("Enrollment request is no longer pending".into())
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::notifications::Topic;

    async fn setup() -> (Fixture, Actor, Actor, i64) {
        let fx = Fixture::new();
        let teacher = fx.principal("Tom", Role::Teacher).await;
        let student = fx.principal("Sue", Role::Student).await;
        let course = fx.classroom.courses.create(&teacher, "History", None).await.unwrap();
        (fx, teacher, student, course.id)
    }

    #[tokio::test]
    async fn request_notifies_teachers() {
        let (fx, teacher, student, course_id) = setup().await;
        let mut live = fx.hub.subscribe(vec![Topic::User(teacher.id)]);

        let request = fx.classroom.enrollment.create(&student, course_id).await.unwrap();
        assert_eq!(request.status, EnrollmentStatus::Pending);

        let pushed = live.recv().await.unwrap();
        assert_eq!(pushed.kind, NotificationKind::EnrollmentRequested);
        assert_eq!(fx.classroom.notifications.count_unread(teacher.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn saved_request_survives_failed_notification() {
        let fx = Fixture::with_broken_notifications();
        let teacher = fx.principal("Tom", Role::Teacher).await;
        let student = fx.principal("Sue", Role::Student).await;
        let course = fx.classroom.courses.create(&teacher, "History", None).await.unwrap();

        let request = fx.classroom.enrollment.create(&student, course.id).await.unwrap();
        let mine = fx.classroom.enrollment.list_mine(&student).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, request.id);

        let approved = fx
            .classroom
            .enrollment
            .process(&teacher, request.id, "approve", None)
            .await
            .unwrap();
        assert_eq!(approved.status, EnrollmentStatus::Approved);
        assert!(fx.store.get_membership(course.id, student.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn only_one_pending_request_per_course() {
        let (fx, _, student, course_id) = setup().await;
        fx.classroom.enrollment.create(&student, course_id).await.unwrap();
        let err = fx.classroom.enrollment.create(&student, course_id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn request_preconditions() {
        let (fx, teacher, student, course_id) = setup().await;
        let err = fx.classroom.enrollment.create(&teacher, course_id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
        let err = fx.classroom.enrollment.create(&student, 4242).await.unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn approve_grants_membership_once() {
        let (fx, teacher, student, course_id) = setup().await;
        let request = fx.classroom.enrollment.create(&student, course_id).await.unwrap();

        let approved = fx
            .classroom
            .enrollment
            .process(&teacher, request.id, "APPROVE", None)
            .await
            .unwrap();
        assert_eq!(approved.status, EnrollmentStatus::Approved);
        assert_eq!(approved.processed_by, Some(teacher.id));
        assert!(approved.processed_at.is_some());
        assert!(fx.store.get_membership(course_id, student.id).await.unwrap().is_some());

        let again = fx
            .classroom
            .enrollment
            .process(&teacher, request.id, "approve", None)
            .await
            .unwrap_err();
        assert!(matches!(again, ClassroomError::InvalidOperation(_)));

        let enrolled = fx.classroom.enrollment.create(&student, course_id).await.unwrap_err();
        assert!(matches!(enrolled, ClassroomError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn rejection_allows_a_new_request() {
        let (fx, teacher, student, course_id) = setup().await;
        let request = fx.classroom.enrollment.create(&student, course_id).await.unwrap();
        let rejected = fx
            .classroom
            .enrollment
            .process(&teacher, request.id, "reject", Some("Course is full".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, EnrollmentStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Course is full"));
        assert!(fx.store.get_membership(course_id, student.id).await.unwrap().is_none());

        let notes = fx.classroom.notifications.list(student.id, None, None).await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::EnrollmentRejected);

        fx.classroom.enrollment.create(&student, course_id).await.unwrap();
        assert_eq!(fx.classroom.enrollment.list_mine(&student).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn process_checks_action_and_teacher() {
        let (fx, _, student, course_id) = setup().await;
        let other_teacher = fx.principal("Otto", Role::Teacher).await;
        let request = fx.classroom.enrollment.create(&student, course_id).await.unwrap();

        let err = fx
            .classroom
            .enrollment
            .process(&other_teacher, request.id, "approve", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let err = fx
            .classroom
            .enrollment
            .process(&other_teacher, request.id, "defer", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Validation(_)));

        let err = fx
            .classroom
            .enrollment
            .process(&other_teacher, 777, "approve", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_rules() {
        let (fx, teacher, student, course_id) = setup().await;
        let other = fx.principal("Oscar", Role::Student).await;
        let request = fx.classroom.enrollment.create(&student, course_id).await.unwrap();

        let err = fx.classroom.enrollment.cancel(&other, request.id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        fx.classroom.enrollment.cancel(&student, request.id).await.unwrap();
        let err = fx.classroom.enrollment.cancel(&student, request.id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));

        let request = fx.classroom.enrollment.create(&student, course_id).await.unwrap();
        fx.classroom
            .enrollment
            .process(&teacher, request.id, "reject", None)
            .await
            .unwrap();
        let err = fx.classroom.enrollment.cancel(&student, request.id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn course_listing_is_teacher_only_and_filterable() {
        let (fx, teacher, student, course_id) = setup().await;
        fx.classroom.enrollment.create(&student, course_id).await.unwrap();

        let err = fx
            .classroom
            .enrollment
            .list_for_course(&student, course_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let pending = fx
            .classroom
            .enrollment
            .list_for_course(&teacher, course_id, Some(EnrollmentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        let approved = fx
            .classroom
            .enrollment
            .list_for_course(&teacher, course_id, Some(EnrollmentStatus::Approved))
            .await
            .unwrap();
        assert!(approved.is_empty());
    }
}
