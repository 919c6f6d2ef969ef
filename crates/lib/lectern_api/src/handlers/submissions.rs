//! Submission and grading handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{GradeRequest, SubmissionResponse, SubmitRequest, map_all};

/// `GET /api/assignments/{id}/submissions`: all for teachers, own for students.
pub async fn list_submissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(assignment_id): Path<i64>,
) -> AppResult<Json<Vec<SubmissionResponse>>> {
    let submissions = state
        .classroom
        .coursework
        .list_submissions(&user.actor, assignment_id)
        .await?;
    Ok(Json(map_all(submissions)))
}

/// `POST /api/assignments/{id}/submissions`
pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(assignment_id): Path<i64>,
    Json(body): Json<SubmitRequest>,
) -> AppResult<Json<SubmissionResponse>> {
    let submission = state
        .classroom
        .coursework
        .submit(&user.actor, assignment_id, &body.content)
        .await?;
    Ok(Json(submission.into()))
}

/// `GET /api/submissions/{id}`
pub async fn get_submission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(submission_id): Path<i64>,
) -> AppResult<Json<SubmissionResponse>> {
    let submission = state
        .classroom
        .coursework
        .get_submission(&user.actor, submission_id)
        .await?;
    Ok(Json(submission.into()))
}

/// `PUT /api/submissions/{id}/grade`
pub async fn grade_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(submission_id): Path<i64>,
    Json(body): Json<GradeRequest>,
) -> AppResult<Json<SubmissionResponse>> {
    let submission = state
        .classroom
        .coursework
        .grade(&user.actor, submission_id, body.grade, body.feedback)
        .await?;
    Ok(Json(submission.into()))
}
