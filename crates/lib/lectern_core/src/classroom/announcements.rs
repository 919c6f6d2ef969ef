//! Course announcements and their comment threads.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::guard::{AccessGuard, Actor};
use super::{ClassroomError, ClassroomResult, required};
use crate::models::coursework::{Announcement, Comment};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::notifications::NotificationService;
use crate::store::Store;

#[derive(Clone)]
pub struct AnnouncementService {
    store: Arc<dyn Store>,
    guard: AccessGuard,
    notifications: NotificationService,
}

impl AnnouncementService {
    pub fn new(store: Arc<dyn Store>, guard: AccessGuard, notifications: NotificationService) -> Self {
        Self {
            store,
            guard,
            notifications,
        }
    }

    pub async fn post(&self, actor: &Actor, course_id: i64, title: &str, body: &str) -> ClassroomResult<Announcement> {
        if self.store.get_course(course_id).await?.is_none() {
            return Err(ClassroomError::NotFound("Course not found".into()));
        }
        self.guard.require_teacher_of(course_id, actor.id).await?;
        let title = required(title, "Title")?;
        let body = required(body, "Body")?;

        let announcement = self
            .store
            .create_announcement(course_id, actor.id, title, body)
            .await?;
        info!(announcement_id = announcement.id, course_id, "announcement posted");

        self.notifications
            .broadcast_to_course(
                course_id,
                NewNotification::new(NotificationKind::Announcement, title, body)
                    .course(course_id)
                    .data(json!({ "announcementId": announcement.id })),
            )
            .await;
        Ok(announcement)
    }

    pub async fn list_for_course(&self, actor: &Actor, course_id: i64) -> ClassroomResult<Vec<Announcement>> {
        if !self.guard.is_enrolled(course_id, actor.id).await? {
            return Ok(Vec::new());
        }
        Ok(self.store.list_announcements(course_id).await?)
    }

    pub async fn comment(&self, actor: &Actor, announcement_id: i64, body: &str) -> ClassroomResult<Comment> {
        let announcement = self.find(announcement_id).await?;
        self.guard.require_enrolled(announcement.course_id, actor.id).await?;
        let body = required(body, "Comment")?;
        Ok(self.store.create_comment(announcement_id, actor.id, body).await?)
    }

    pub async fn comments(&self, actor: &Actor, announcement_id: i64) -> ClassroomResult<Vec<Comment>> {
        let Some(announcement) = self.store.get_announcement(announcement_id).await? else {
            return Ok(Vec::new());
        };
        if !self.guard.is_enrolled(announcement.course_id, actor.id).await? {
            return Ok(Vec::new());
        }
        Ok(self.store.list_comments(announcement_id).await?)
    }

    /// Authors may delete their own comments; teachers any in their course.
    pub async fn delete_comment(&self, actor: &Actor, comment_id: i64) -> ClassroomResult<()> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Comment not found".into()))?;
        let announcement = self.find(comment.announcement_id).await?;
        if !self
            .guard
            .is_owner_or_teacher(comment.author_id, announcement.course_id, actor.id)
            .await?
        {
            return Err(ClassroomError::Unauthorized(
                "You cannot delete this comment".into(),
            ));
        }
        self.store.delete_comment(comment_id).await?;
        Ok(())
    }

    async fn find(&self, announcement_id: i64) -> ClassroomResult<Announcement> {
        self.store
            .get_announcement(announcement_id)
            .await?
            .ok_or_else(|| ClassroomError::NotFound("Announcement not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::models::auth::Role;
    use crate::notifications::Topic;

    #[tokio::test]
    async fn post_broadcasts_to_course() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let mut feed = fx.hub.subscribe(vec![Topic::Course(course_id)]);

        let post = fx
            .classroom
            .announcements
            .post(&teacher, course_id, "Exam", "Friday at 9")
            .await
            .unwrap();
        let pushed = feed.recv().await.unwrap();
        assert_eq!(pushed.kind, NotificationKind::Announcement);
        assert_eq!(pushed.title, "Exam");

        let err = fx
            .classroom
            .announcements
            .post(&student, course_id, "Party", "Tonight")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));

        let listed = fx.classroom.announcements.list_for_course(&student, course_id).await.unwrap();
        assert_eq!(listed, vec![post]);
    }

    #[tokio::test]
    async fn comment_threads() {
        let fx = Fixture::new();
        let (teacher, student, course_id) = fx.course_with_student().await;
        let outsider = fx.principal("Opal", Role::Student).await;
        let post = fx
            .classroom
            .announcements
            .post(&teacher, course_id, "Welcome", "Say hi")
            .await
            .unwrap();

        let hi = fx.classroom.announcements.comment(&student, post.id, "hi!").await.unwrap();
        let err = fx.classroom.announcements.comment(&outsider, post.id, "hey").await.unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
        let err = fx.classroom.announcements.comment(&student, 5050, "?").await.unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));

        assert_eq!(fx.classroom.announcements.comments(&student, post.id).await.unwrap().len(), 1);
        assert!(fx.classroom.announcements.comments(&outsider, post.id).await.unwrap().is_empty());

        let err = fx.classroom.announcements.delete_comment(&outsider, hi.id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::Unauthorized(_)));
        fx.classroom.announcements.delete_comment(&teacher, hi.id).await.unwrap();
        let err = fx.classroom.announcements.delete_comment(&student, hi.id).await.unwrap_err();
        assert!(matches!(err, ClassroomError::NotFound(_)));
    }
}
