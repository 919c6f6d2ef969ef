//! Notification broadcaster.
//!
//! Persisted notifications belong to one principal and are pushed live on
//! that principal's topic after the row is written. Role- and course-wide
//! broadcasts are ephemeral: pushed, never stored. Push outcome never affects
//! the result of a call.

pub mod live;

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::classroom::{ClassroomError, ClassroomResult};
use crate::models::auth::Role;
use crate::models::notification::{LiveMessage, NewNotification, Notification};
use crate::store::NotificationStore;

pub use live::{LiveHub, Subscription, Topic};

/// Page size when the caller gives none.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    hub: LiveHub,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, hub: LiveHub) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> &LiveHub {
        &self.hub
    }

    /// Persist a notification for `user_id`, then push it on `user:{id}`.
    pub async fn notify(&self, user_id: i64, notification: NewNotification) -> ClassroomResult<Notification> {
        let row = self.store.insert_notification(user_id, &notification).await?;
        let delivered = self
            .hub
            .publish(Topic::User(user_id), &LiveMessage::from(&row))
            .await;
        debug!(user_id, kind = row.kind.as_str(), delivered, "notification stored");
        Ok(row)
    }

    /// Ephemeral push to every connection subscribed to `role:{Role}`.
    pub async fn broadcast_to_role(&self, role: Role, notification: NewNotification) -> usize {
        self.broadcast(Topic::Role(role), notification).await
    }

    /// Ephemeral push to every connection subscribed to `course:{id}`.
    pub async fn broadcast_to_course(&self, course_id: i64, notification: NewNotification) -> usize {
        self.broadcast(Topic::Course(course_id), notification).await
    }

    async fn broadcast(&self, topic: Topic, notification: NewNotification) -> usize {
        let kind = notification.kind;
        let delivered = self
            .hub
            .publish(topic, &LiveMessage::ephemeral(notification, Utc::now()))
            .await;
        debug!(%topic, kind = kind.as_str(), delivered, "broadcast");
        delivered
    }

    /// Newest first. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list(
        &self,
        user_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ClassroomResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        Ok(self
            .store
            .list_notifications(user_id, limit, offset, false)
            .await?)
    }

    pub async fn list_unread(&self, user_id: i64) -> ClassroomResult<Vec<Notification>> {
        Ok(self
            .store
            .list_notifications(user_id, MAX_PAGE_SIZE, 0, true)
            .await?)
    }

    pub async fn count_unread(&self, user_id: i64) -> ClassroomResult<i64> {
        Ok(self.store.count_unread(user_id).await?)
    }

    pub async fn mark_read(&self, id: i64, user_id: i64) -> ClassroomResult<()> {
        if !self.store.mark_notification_read(id, user_id).await? {
            return Err(ClassroomError::NotFound("Notification not found".into()));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> ClassroomResult<u64> {
        Ok(self.store.mark_all_notifications_read(user_id).await?)
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> ClassroomResult<()> {
        if !self.store.delete_notification(id, user_id).await? {
            return Err(ClassroomError::NotFound("Notification not found".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationKind;
    use crate::store::MemoryStore;

    fn service_with(hub: LiveHub) -> NotificationService {
        NotificationService::new(Arc::new(MemoryStore::new()), hub)
    }

    fn graded() -> NewNotification {
        NewNotification::new(NotificationKind::SubmissionGraded, "Graded", "You got 9/10")
    }

    #[tokio::test]
    async fn notify_persists_and_pushes() {
        let hub = LiveHub::new();
        let svc = service_with(hub.clone());
        let mut sub = hub.subscribe(vec![Topic::User(5)]);

        let row = svc.notify(5, graded().submission(3)).await.unwrap();
        let pushed = sub.recv().await.unwrap();
        assert_eq!(pushed.id, Some(row.id));
        assert_eq!(pushed.submission_id, Some(3));
        assert_eq!(svc.count_unread(5).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn push_failure_does_not_affect_persistence() {
        let hub = LiveHub::with_capacity(1);
        let svc = service_with(hub.clone());
        let _stalled = hub.subscribe(vec![Topic::User(5)]);

        svc.notify(5, graded()).await.unwrap();
        svc.notify(5, graded()).await.unwrap();
        assert_eq!(svc.list(5, None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn broadcasts_are_not_persisted() {
        let hub = LiveHub::new();
        let svc = service_with(hub.clone());
        let mut teacher = hub.subscribe(vec![Topic::Role(Role::Teacher)]);

        let delivered = svc
            .broadcast_to_role(
                Role::Teacher,
                NewNotification::new(NotificationKind::Announcement, "Staff", "Meeting at 3"),
            )
            .await;
        assert_eq!(delivered, 1);
        assert!(teacher.recv().await.unwrap().id.is_none());
        assert_eq!(svc.broadcast_to_course(1, graded()).await, 0);
        assert!(svc.list(1, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_principals_rows_are_not_found() {
        let svc = service_with(LiveHub::new());
        let row = svc.notify(1, graded()).await.unwrap();

        assert!(matches!(svc.mark_read(row.id, 2).await, Err(ClassroomError::NotFound(_))));
        assert!(matches!(svc.delete(row.id, 2).await, Err(ClassroomError::NotFound(_))));
        assert_eq!(svc.count_unread(1).await.unwrap(), 1);

        svc.mark_read(row.id, 1).await.unwrap();
        assert!(svc.list_unread(1).await.unwrap().is_empty());
        svc.delete(row.id, 1).await.unwrap();
        assert!(svc.list(1, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paging_and_mark_all() {
        let svc = service_with(LiveHub::new());
        for i in 0..5 {
            svc.notify(1, NewNotification::new(NotificationKind::Announcement, format!("n{i}"), ""))
                .await
                .unwrap();
        }
        let page = svc.list(1, Some(2), Some(1)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "n3");
        assert_eq!(page[1].title, "n2");

        assert_eq!(svc.mark_all_read(1).await.unwrap(), 5);
        assert_eq!(svc.count_unread(1).await.unwrap(), 0);
    }
}
