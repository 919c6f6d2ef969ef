//! Courses and their membership.

use std::sync::Arc;

use tracing::info;

use super::guard::{AccessGuard, Actor};
use super::{ClassroomError, ClassroomResult, required};
use crate::models::auth::Role;
use crate::models::course::{Course, CourseMember};
use crate::store::Store;

#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn Store>,
    guard: AccessGuard,
}

impl CourseService {
    pub fn new(store: Arc<dyn Store>, guard: AccessGuard) -> Self {
        Self { store, guard }
    }

    /// Create a course; the creator becomes its teacher.
    pub async fn create(&self, actor: &Actor, name: &str, description: Option<&str>) -> ClassroomResult<Course> {
        if !actor.is_teacher() {
            return Err(ClassroomError::Unauthorized(
                "Only teachers can create courses".into(),
            ));
        }
        let name = required(name, "Course name")?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let course = self.store.create_course(actor.id, name, description).await?;
        info!(course_id = course.id, owner_id = actor.id, "course created");
        Ok(course)
    }

    pub async fn get(&self, actor: &Actor, course_id: i64) -> ClassroomResult<Course> {
        let course = self.find(course_id).await?;
        self.guard.require_enrolled(course_id, actor.id).await?;
        Ok(course)
    }

    pub async fn list_mine(&self, actor: &Actor) -> ClassroomResult<Vec<Course>> {
        Ok(self.store.list_courses_for(actor.id).await?)
    }

    /// Members of a course; empty for non-members.
    pub async fn members(&self, actor: &Actor, course_id: i64) -> ClassroomResult<Vec<CourseMember>> {
        if !self.guard.is_enrolled(course_id, actor.id).await? {
            return Ok(Vec::new());
        }
        Ok(self.store.list_members(course_id).await?)
    }

    /// A student leaves a course they are enrolled in.
    pub async fn leave(&self, actor: &Actor, course_id: i64) -> ClassroomResult<()> {
        let is_student_member = self
            .guard
            .membership(course_id, actor.id)
            .await?
            .is_some_and(|m| m.role == Role::Student);
        if !is_student_member {
            return Err(ClassroomError::InvalidOperation(
                "You are not enrolled in this course".into(),
            ));
        }
        self.store.remove_membership(course_id, actor.id).await?;
        info!(course_id, principal_id = actor.id, "left course");
        Ok(())
    }

    /// A teacher removes a student from their course.
    pub async fn remove_member(&self, actor: &Actor, course_id: i64, principal_id: i64) -> ClassroomResult<()> {
        self.find(course_id).await?;
        self.guard.require_teacher_of(course_id, actor.id).await?;

        match self.guard.membership(course_id, principal_id).await? {
            None => Err(ClassroomError::InvalidOperation(
                "That principal is not a member of this course".into(),
            )),
            Some(m) if m.role == Role::Teacher => Err(ClassroomError::InvalidOperation(
                "Teachers cannot be removed from a course".into(),
            )),
            Some(_) => {
                self.store.remove_membership(course_id, principal_id).await?;
                info!(course_id, principal_id, removed_by = actor.id, "member removed");
                Ok(())
            }
        }
    }

    pub(crate) async fn find(&self, course_id: i64) -> ClassroomResult<Course> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Course not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;

    #[tokio::test]
    async fn students_cannot_create_courses() {
        let fx = Fixture::new();
        let student = fx.principal("Sam", Role::Student).await;
        let err = fx.classroom.courses.create(&student, "Art", None).await.unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn creator_becomes_teacher_member() {
        let fx = Fixture::new();
        let teacher = fx.principal("Tess", Role::Teacher).await;
        let course = fx
            .classroom
            .courses
            .create(&teacher, "  Biology ", Some(" "))
            .await
            .unwrap();
        assert_eq!(course.name, "Biology");
        assert_eq!(course.description, None);

        let members = fx.classroom.courses.members(&teacher, course.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Teacher);
        assert_eq!(fx.classroom.courses.list_mine(&teacher).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_distinguishes_missing_from_forbidden() {
        let fx = Fixture::new();
        let (_, _, course_id) = fx.course_with_student().await;
        let outsider = fx.principal("Olive", Role::Student).await;

        let missing = fx.classroom.courses.get(&outsider, 9999).await.unwrap_err();
        assert!(matches!(missing, ClassroomError::NotFound(_)));
        let forbidden = fx.classroom.courses.get(&outsider, course_id).await.unwrap_err();
        assert!(matches!(forbidden, ClassroomError::Unauthorized(_)));
        assert!(fx.classroom.courses.members(&outsider, course_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leave_and_remove() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;

        let err = fx.classroom.courses.leave(&teacher, course_id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::InvalidOperation(_)));

        let err = fx
            .classroom
            .courses
            .remove_member(&student, course_id, teacher.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let err = fx
            .classroom
            .courses
            .remove_member(&teacher, course_id, teacher.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::InvalidOperation(_)));

        fx.classroom.courses.leave(&student, course_id).await.unwrap();
        let err = fx.classroom.courses.leave(&student, course_id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::InvalidOperation(_)));
    }
}
