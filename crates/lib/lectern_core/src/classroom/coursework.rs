//! Assignments, submissions and grading.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use super::guard::{AccessGuard, Actor};
use super::{ClassroomError, ClassroomResult, required};
use crate::models::auth::Role;
use crate::models::coursework::{Assignment, AssignmentDraft, AssignmentPatch, Grade, Submission};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::notifications::NotificationService;
use crate::store::{Store, StoreError};

fn validate_assignment(title: &str, max_points: i32) -> ClassroomResult<()> {
    required(title, "Title")?;
    if max_points <= 0 {
        return Err(ClassroomError::Validation(
            "Max points must be greater than zero".into(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CourseworkService {
    store: Arc<dyn Store>,
    guard: AccessGuard,
    notifications: NotificationService,
}

impl CourseworkService {
    pub fn new(store: Arc<dyn Store>, guard: AccessGuard, notifications: NotificationService) -> Self {
        Self {
            store,
            guard,
            notifications,
        }
    }

    // -----------------------------------------------------------------------
    // Assignments
    // -----------------------------------------------------------------------

    /// Teacher creates an assignment; the course topic is told about it.
    pub async fn create_assignment(
        &self,
        actor: &Actor,
        course_id: i64,
        mut draft: AssignmentDraft,
    ) -> ClassroomResult<Assignment> {
        if self.store.get_course(course_id).await?.is_none() {
            return Err(ClassroomError::NotFound("Course not found".into()));
        }
        self.guard.require_teacher_of(course_id, actor.id).await?;
        validate_assignment(&draft.title, draft.max_points)?;
        draft.title = draft.title.trim().to_string();

        let assignment = self.store.create_assignment(course_id, actor.id, &draft).await?;
        info!(assignment_id = assignment.id, course_id, "assignment created");

        self.notifications
            .broadcast_to_course(
                course_id,
                NewNotification::new(
                    NotificationKind::AssignmentCreated,
                    "New assignment",
                    assignment.title.clone(),
                )
                .course(course_id)
                .assignment(assignment.id)
                .data(json!({ "dueAt": assignment.due_at, "maxPoints": assignment.max_points })),
            )
            .await;
        Ok(assignment)
    }

    /// Assignments of a course; empty for non-members.
    pub async fn list_assignments(&self, actor: &Actor, course_id: i64) -> ClassroomResult<Vec<Assignment>> {
        if !self.guard.is_enrolled(course_id, actor.id).await? {
            return Ok(Vec::new());
        }
        Ok(self.store.list_assignments(course_id).await?)
    }

    pub async fn get_assignment(&self, actor: &Actor, assignment_id: i64) -> ClassroomResult<Assignment> {
        let assignment = self.find_assignment(assignment_id).await?;
        self.guard.require_enrolled(assignment.course_id, actor.id).await?;
        Ok(assignment)
    }

    pub async fn update_assignment(
        &self,
        actor: &Actor,
        assignment_id: i64,
        patch: AssignmentPatch,
    ) -> ClassroomResult<Assignment> {
        let current = self.find_assignment(assignment_id).await?;
        self.guard.require_teacher_of(current.course_id, actor.id).await?;

        let mut updated = patch.apply(current, Utc::now());
        validate_assignment(&updated.title, updated.max_points)?;
        updated.title = updated.title.trim().to_string();

        if !self.store.save_assignment(&updated).await? {
            return Err(ClassroomError::NotFound("Assignment not found".into()));
        }
        info!(assignment_id, "assignment updated");
        Ok(updated)
    }

    pub async fn delete_assignment(&self, actor: &Actor, assignment_id: i64) -> ClassroomResult<()> {
        let assignment = self.find_assignment(assignment_id).await?;
        self.guard.require_teacher_of(assignment.course_id, actor.id).await?;
        self.store.delete_assignment(assignment_id).await?;
        info!(assignment_id, "assignment deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Submissions
    // -----------------------------------------------------------------------

    /// An enrolled student hands in an assignment. Teachers are notified.
    pub async fn submit(&self, actor: &Actor, assignment_id: i64, content: &str) -> ClassroomResult<Submission> {
        let assignment = self.find_assignment(assignment_id).await?;
        let is_student_member = self
            .guard
            .membership(assignment.course_id, actor.id)
            .await?
            .is_some_and(|m| m.role == Role::Student);
        if !is_student_member {
            return Err(ClassroomError::Unauthorized(
                "Only enrolled students can submit".into(),
            ));
        }
        let content = required(content, "Content")?;

        let submission = match self.store.create_submission(assignment_id, actor.id, content).await {
            Ok(s) => s,
            Err(StoreError::Conflict(_)) => {
                return Err(ClassroomError::InvalidOperation(
                    "You have already submitted this assignment".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        info!(submission_id = submission.id, assignment_id, student_id = actor.id, "submission created");

        if let Err(e) = self.notify_teachers(&assignment, &submission).await {
            warn!(submission_id = submission.id, error = %e, "teachers not notified of submission");
        }
        Ok(submission)
    }

    /// Teachers see every submission, students their own, outsiders nothing.
    pub async fn list_submissions(&self, actor: &Actor, assignment_id: i64) -> ClassroomResult<Vec<Submission>> {
        let Some(assignment) = self.store.get_assignment(assignment_id).await? else {
            return Ok(Vec::new());
        };
        let student_filter = match self.guard.membership(assignment.course_id, actor.id).await? {
            None => return Ok(Vec::new()),
            Some(m) if m.role == Role::Teacher => None,
            Some(_) => Some(actor.id),
        };
        Ok(self.store.list_submissions(assignment_id, student_filter).await?)
    }

    pub async fn get_submission(&self, actor: &Actor, submission_id: i64) -> ClassroomResult<Submission> {
        let submission = self.find_submission(submission_id).await?;
        let assignment = self.find_assignment(submission.assignment_id).await?;
        if !self
            .guard
            .is_owner_or_teacher(submission.student_id, assignment.course_id, actor.id)
            .await?
        {
            return Err(ClassroomError::Unauthorized(
                "You cannot view this submission".into(),
            ));
        }
        Ok(submission)
    }

    /// Grade a submission on `0..=max_points`. The student is notified.
    pub async fn grade(
        &self,
        actor: &Actor,
        submission_id: i64,
        points: i32,
        feedback: Option<String>,
    ) -> ClassroomResult<Submission> {
        let submission = self.find_submission(submission_id).await?;
        let assignment = self.find_assignment(submission.assignment_id).await?;
        self.guard.require_teacher_of(assignment.course_id, actor.id).await?;
        if !(0..=assignment.max_points).contains(&points) {
            return Err(ClassroomError::Validation(format!(
                "Grade must be between 0 and {}",
                assignment.max_points
            )));
        }

        let grade = Grade {
            points,
            feedback: feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()),
            graded_by: actor.id,
            graded_at: Utc::now(),
        };
        let graded = self
            .store
            .grade_submission(submission_id, &grade)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Submission not found".into()))?;
        info!(submission_id, points, teacher_id = actor.id, "submission graded");

        if let Err(e) = self.notify_graded(&assignment, &graded, points).await {
            warn!(submission_id, error = %e, "student not notified of grade");
        }

        Ok(graded)
    }

    async fn notify_teachers(&self, assignment: &Assignment, submission: &Submission) -> ClassroomResult<()> {
        let members = self.store.list_members(assignment.course_id).await?;
        for teacher in members.into_iter().filter(|m| m.role == Role::Teacher) {
            let notification = NewNotification::new(
                NotificationKind::SubmissionCreated,
                "New submission",
                format!("A submission for {} is ready to grade", assignment.title),
            )
            .course(assignment.course_id)
            .assignment(assignment.id)
            .submission(submission.id);
            self.notifications.notify(teacher.principal_id, notification).await?;
        }
        Ok(())
    }

    async fn notify_graded(&self, assignment: &Assignment, graded: &Submission, points: i32) -> ClassroomResult<()> {
        let notification = NewNotification::new(
            NotificationKind::SubmissionGraded,
            "Submission graded",
            format!("{}: {points}/{}", assignment.title, assignment.max_points),
        )
        .course(assignment.course_id)
        .assignment(assignment.id)
        .submission(graded.id)
        .data(json!({ "grade": points, "maxPoints": assignment.max_points }));
        self.notifications.notify(graded.student_id, notification).await?;
        Ok(())
    }

    async fn find_assignment(&self, assignment_id: i64) -> ClassroomResult<Assignment> {
        self.store
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Assignment not found".into()))
    }

    async fn find_submission(&self, submission_id: i64) -> ClassroomResult<Submission> {
        self.store
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Submission not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::notifications::Topic;

    fn draft(title: &str, max_points: i32) -> AssignmentDraft {
        AssignmentDraft {
            title: title.into(),
            max_points,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn assignment_lifecycle_and_broadcast() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let mut course_feed = fx.hub.subscribe(vec![Topic::Course(course_id)]);

        let assignment = fx
            .classroom
            .coursework
            .create_assignment(&teacher, course_id, draft("Lab 1", 10))
            .await
            .unwrap();
        let pushed = course_feed.recv().await.unwrap();
        assert_eq!(pushed.kind, NotificationKind::AssignmentCreated);
        assert_eq!(pushed.assignment_id, Some(assignment.id));

        let listed = fx.classroom.coursework.list_assignments(&student, course_id).await.unwrap();
        assert_eq!(listed.len(), 1);

        let patched = fx
            .classroom
            .coursework
            .update_assignment(
                &teacher,
                assignment.id,
                AssignmentPatch {
                    title: Some("Lab 1 (revised)".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.title, "Lab 1 (revised)");
        assert_eq!(patched.max_points, 10);

        fx.classroom.coursework.delete_assignment(&teacher, assignment.id).await.unwrap();
        let err = fx
            .classroom
            .coursework
            .get_assignment(&student, assignment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_degrades_but_updating_refuses() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let outsider = fx.principal("Olga", Role::Student).await;
        let assignment = fx
            .classroom
            .coursework
            .create_assignment(&teacher, course_id, draft("Essay", 20))
            .await
            .unwrap();

        let listed = fx.classroom.coursework.list_assignments(&outsider, course_id).await.unwrap();
        assert!(listed.is_empty());

        let err = fx
            .classroom
            .coursework
            .update_assignment(&student, assignment.id, AssignmentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let err = fx
            .classroom
            .coursework
            .get_assignment(&outsider, assignment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn create_assignment_checks() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;

        let err = fx
            .classroom
            .coursework
            .create_assignment(&teacher, 31337, draft("x", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));

        let err = fx
            .classroom
            .coursework
            .create_assignment(&student, course_id, draft("x", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let err = fx
            .classroom
            .coursework
            .create_assignment(&teacher, course_id, draft("x", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Validation(_)));
    }

    #[tokio::test]
    async fn submission_and_grade_survive_failed_notification() {
        let fx = Fixture::with_broken_notifications();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let assignment = fx
            .classroom
            .coursework
            .create_assignment(&teacher, course_id, draft("Quiz", 10))
            .await
            .unwrap();

        let submission = fx
            .classroom
            .coursework
            .submit(&student, assignment.id, "42")
            .await
            .unwrap();
        let stored = fx.classroom.coursework.get_submission(&teacher, submission.id).await.unwrap();
        assert_eq!(stored.content, "42");

        let graded = fx
            .classroom
            .coursework
            .grade(&teacher, submission.id, 9, None)
            .await
            .unwrap();
        assert_eq!(graded.grade, Some(9));
    }

    #[tokio::test]
    async fn submit_and_grade() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let assignment = fx
            .classroom
            .coursework
            .create_assignment(&teacher, course_id, draft("Quiz", 10))
            .await
            .unwrap();

        let submission = fx
            .classroom
            .coursework
            .submit(&student, assignment.id, "42")
            .await
            .unwrap();
        let teacher_notes = fx.classroom.notifications.list(teacher.id, None, None).await.unwrap();
        assert!(teacher_notes.iter().any(|n| n.kind == NotificationKind::SubmissionCreated));

        let dup = fx
            .classroom
            .coursework
            .submit(&student, assignment.id, "43")
            .await
            .unwrap_err();
        assert!(matches!(dup, ClassroomError::InvalidOperation(_)));

        let err = fx
            .classroom
            .coursework
            .submit(&teacher, assignment.id, "teacher answer")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let err = fx
            .classroom
            .coursework
            .grade(&teacher, submission.id, 11, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Validation(_)));

        let err = fx
            .classroom
            .coursework
            .grade(&student, submission.id, 10, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let graded = fx
            .classroom
            .coursework
            .grade(&teacher, submission.id, 9, Some("Nice".into()))
            .await
            .unwrap();
        assert_eq!(graded.grade, Some(9));
        assert_eq!(graded.graded_by, Some(teacher.id));

        let student_notes = fx.classroom.notifications.list(student.id, None, None).await.unwrap();
        assert_eq!(student_notes[0].kind, NotificationKind::SubmissionGraded);
        assert_eq!(student_notes[0].submission_id, Some(submission.id));
    }

    #[tokio::test]
    async fn submission_visibility() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let classmate = fx.principal("Cleo", Role::Student).await;
        let outsider = fx.principal("Otis", Role::Student).await;
        let request = fx.classroom.enrollment.create(&classmate, course_id).await.unwrap();
        fx.classroom
            .enrollment
            .process(&teacher, request.id, "approve", None)
            .await
            .unwrap();

        let assignment = fx
            .classroom
            .coursework
            .create_assignment(&teacher, course_id, draft("Poem", 5))
            .await
            .unwrap();
        let mine = fx.classroom.coursework.submit(&student, assignment.id, "roses").await.unwrap();
        fx.classroom.coursework.submit(&classmate, assignment.id, "violets").await.unwrap();

        let as_teacher = fx.classroom.coursework.list_submissions(&teacher, assignment.id).await.unwrap();
        assert_eq!(as_teacher.len(), 2);
        let as_student = fx.classroom.coursework.list_submissions(&student, assignment.id).await.unwrap();
        assert_eq!(as_student.len(), 1);
        assert_eq!(as_student[0].id, mine.id);
        let as_outsider = fx.classroom.coursework.list_submissions(&outsider, assignment.id).await.unwrap();
        assert!(as_outsider.is_empty());

        assert!(fx.classroom.coursework.get_submission(&student, mine.id).await.is_ok());
        assert!(fx.classroom.coursework.get_submission(&teacher, mine.id).await.is_ok());
        let err = fx.classroom.coursework.get_submission(&classmate, mine.id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
    }
}
