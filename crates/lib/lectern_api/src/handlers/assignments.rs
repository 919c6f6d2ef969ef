//! Assignment handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use lectern_core::models::coursework::{AssignmentDraft, AssignmentPatch};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AssignmentResponse, CreateAssignmentRequest, MessageResponse, UpdateAssignmentRequest, map_all,
};

/// `GET /api/courses/{id}/assignments`: empty for non-members.
pub async fn list_assignments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
) -> AppResult<Json<Vec<AssignmentResponse>>> {
    let assignments = state
        .classroom
        .coursework
        .list_assignments(&user.actor, course_id)
        .await?;
    Ok(Json(map_all(assignments)))
}

/// `POST /api/courses/{id}/assignments`
pub async fn create_assignment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
    Json(body): Json<CreateAssignmentRequest>,
) -> AppResult<Json<AssignmentResponse>> {
    let draft = AssignmentDraft {
        title: body.title,
        description: body.description,
        due_at: body.due_at,
        max_points: body.max_points,
    };
    let assignment = state
        .classroom
        .coursework
        .create_assignment(&user.actor, course_id, draft)
        .await?;
    Ok(Json(assignment.into()))
}

/// `GET /api/assignments/{id}`
pub async fn get_assignment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(assignment_id): Path<i64>,
) -> AppResult<Json<AssignmentResponse>> {
    let assignment = state
        .classroom
        .coursework
        .get_assignment(&user.actor, assignment_id)
        .await?;
    Ok(Json(assignment.into()))
}

/// `PUT /api/assignments/{id}`: partial update.
pub async fn update_assignment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(assignment_id): Path<i64>,
    Json(body): Json<UpdateAssignmentRequest>,
) -> AppResult<Json<AssignmentResponse>> {
    let patch = AssignmentPatch {
        title: body.title,
        description: body.description,
        due_at: body.due_at,
        max_points: body.max_points,
    };
    let assignment = state
        .classroom
        .coursework
        .update_assignment(&user.actor, assignment_id, patch)
        .await?;
    Ok(Json(assignment.into()))
}

/// `DELETE /api/assignments/{id}`
pub async fn delete_assignment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(assignment_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state
        .classroom
        .coursework
        .delete_assignment(&user.actor, assignment_id)
        .await?;
    Ok(Json(MessageResponse::new("Assignment deleted")))
}
