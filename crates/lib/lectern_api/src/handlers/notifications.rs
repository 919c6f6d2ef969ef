//! Notification inbox and live stream handlers.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Extension, Json};
use futures_util::Stream;
use futures_util::stream;
use lectern_core::notifications::Topic;
use tracing::debug;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    MarkAllReadResponse, MessageResponse, NotificationResponse, PageQuery, UnreadCountResponse,
    map_all,
};

/// `GET /api/notifications?limit=&offset=`: newest first.
pub async fn list_notifications_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<NotificationResponse>>> {
    let notifications = state
        .classroom
        .notifications
        .list(user.actor.id, page.limit, page.offset)
        .await?;
    Ok(Json(map_all(notifications)))
}

/// `GET /api/notifications/unread`
pub async fn list_unread_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<NotificationResponse>>> {
    let notifications = state
        .classroom
        .notifications
        .list_unread(user.actor.id)
        .await?;
    Ok(Json(map_all(notifications)))
}

/// `GET /api/notifications/unread/count`
pub async fn unread_count_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UnreadCountResponse>> {
    let count = state
        .classroom
        .notifications
        .count_unread(user.actor.id)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// `PUT /api/notifications/read-all`
pub async fn mark_all_read_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state
        .classroom
        .notifications
        .mark_all_read(user.actor.id)
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// `PUT /api/notifications/{id}/read`
pub async fn mark_read_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(notification_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state
        .classroom
        .notifications
        .mark_read(notification_id, user.actor.id)
        .await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

/// `DELETE /api/notifications/{id}`
pub async fn delete_notification_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(notification_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state
        .classroom
        .notifications
        .delete(notification_id, user.actor.id)
        .await?;
    Ok(Json(MessageResponse::new("Notification deleted")))
}

/// `GET /api/notifications/stream`: server-sent events.
///
/// The connection joins the caller's own topic, their role topic, and one
/// topic per course they currently belong to. Course membership is resolved
/// once at connect time; clients reconnect to pick up new courses.
pub async fn stream_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let actor = user.actor;
    let courses = state.classroom.courses.list_mine(&actor).await?;

    let mut topics = vec![Topic::User(actor.id), Topic::Role(actor.role)];
    topics.extend(courses.iter().map(|c| Topic::Course(c.id)));
    debug!(principal_id = actor.id, topics = topics.len(), "live stream opened");

    let subscription = state.classroom.notifications.hub().subscribe(topics);
    let events = stream::unfold(subscription, |mut sub| async move {
        let message = sub.recv().await?;
        let event = Event::default()
            .event(message.kind.as_str())
            .json_data(&message)
            .unwrap_or_else(|_| Event::default().event(message.kind.as_str()));
        Some((Ok(event), sub))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
