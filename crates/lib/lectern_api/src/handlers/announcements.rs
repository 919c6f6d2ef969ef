//! Announcement and comment handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AnnouncementResponse, CommentResponse, CreateAnnouncementRequest, CreateCommentRequest,
    MessageResponse, map_all,
};

/// `GET /api/courses/{id}/announcements`: empty for non-members.
pub async fn list_announcements_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
) -> AppResult<Json<Vec<AnnouncementResponse>>> {
    let announcements = state
        .classroom
        .announcements
        .list_for_course(&user.actor, course_id)
        .await?;
    Ok(Json(map_all(announcements)))
}

/// `POST /api/courses/{id}/announcements`
pub async fn post_announcement_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
    Json(body): Json<CreateAnnouncementRequest>,
) -> AppResult<Json<AnnouncementResponse>> {
    let announcement = state
        .classroom
        .announcements
        .post(&user.actor, course_id, &body.title, &body.body)
        .await?;
    Ok(Json(announcement.into()))
}

/// `GET /api/announcements/{id}/comments`
pub async fn list_comments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(announcement_id): Path<i64>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let comments = state
        .classroom
        .announcements
        .comments(&user.actor, announcement_id)
        .await?;
    Ok(Json(map_all(comments)))
}

/// `POST /api/announcements/{id}/comments`
pub async fn create_comment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(announcement_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .classroom
        .announcements
        .comment(&user.actor, announcement_id, &body.body)
        .await?;
    Ok(Json(comment.into()))
}

/// `DELETE /api/comments/{id}`
pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state
        .classroom
        .announcements
        .delete_comment(&user.actor, comment_id)
        .await?;
    Ok(Json(MessageResponse::new("Comment deleted")))
}
