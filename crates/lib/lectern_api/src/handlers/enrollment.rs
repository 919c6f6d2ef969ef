//! Enrollment request handlers.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use lectern_core::models::course::EnrollmentStatus;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CreateEnrollmentRequest, EnrollmentListQuery, EnrollmentRequestResponse, MessageResponse,
    ProcessEnrollmentRequest, map_all,
};

/// `POST /api/enrollment-requests`: a student asks to join a course.
pub async fn create_request_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateEnrollmentRequest>,
) -> AppResult<Json<EnrollmentRequestResponse>> {
    let request = state
        .classroom
        .enrollment
        .create(&user.actor, body.course_id)
        .await?;
    Ok(Json(request.into()))
}

/// `GET /api/enrollment-requests/mine`
pub async fn list_my_requests_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<EnrollmentRequestResponse>>> {
    let requests = state.classroom.enrollment.list_mine(&user.actor).await?;
    Ok(Json(map_all(requests)))
}

/// `GET /api/courses/{id}/enrollment-requests?status=`
pub async fn list_course_requests_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
    Query(query): Query<EnrollmentListQuery>,
) -> AppResult<Json<Vec<EnrollmentRequestResponse>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<EnrollmentStatus>)
        .transpose()
        .map_err(AppError::Validation)?;
    let requests = state
        .classroom
        .enrollment
        .list_for_course(&user.actor, course_id, status)
        .await?;
    Ok(Json(map_all(requests)))
}

/// `PUT /api/enrollment-requests/{id}/process`: approve or reject.
pub async fn process_request_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(request_id): Path<i64>,
    Json(body): Json<ProcessEnrollmentRequest>,
) -> AppResult<Json<EnrollmentRequestResponse>> {
    let request = state
        .classroom
        .enrollment
        .process(&user.actor, request_id, &body.action, body.reason)
        .await?;
    Ok(Json(request.into()))
}

/// `DELETE /api/enrollment-requests/{id}`: a student withdraws a pending request.
pub async fn cancel_request_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(request_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state
        .classroom
        .enrollment
        .cancel(&user.actor, request_id)
        .await?;
    Ok(Json(MessageResponse::new("Enrollment request cancelled")))
}
