//! Course, membership and invitation handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CourseResponse, CreateCourseRequest, InvitationResponse, InviteRequest, MemberResponse,
    MessageResponse, map_all,
};

/// `GET /api/courses`: courses the caller belongs to.
pub async fn list_courses_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<CourseResponse>>> {
    let courses = state.classroom.courses.list_mine(&user.actor).await?;
    Ok(Json(map_all(courses)))
}

/// `POST /api/courses`: teachers only.
pub async fn create_course_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateCourseRequest>,
) -> AppResult<Json<CourseResponse>> {
    let course = state
        .classroom
        .courses
        .create(&user.actor, &body.name, body.description.as_deref())
        .await?;
    Ok(Json(course.into()))
}

/// `GET /api/courses/{id}`
pub async fn get_course_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
) -> AppResult<Json<CourseResponse>> {
    let course = state.classroom.courses.get(&user.actor, course_id).await?;
    Ok(Json(course.into()))
}

/// `GET /api/courses/{id}/members`
pub async fn list_members_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    let members = state.classroom.courses.members(&user.actor, course_id).await?;
    Ok(Json(map_all(members)))
}

/// `DELETE /api/courses/{id}/members/me`: a student leaves.
pub async fn leave_course_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state.classroom.courses.leave(&user.actor, course_id).await?;
    Ok(Json(MessageResponse::new("Left course")))
}

/// `DELETE /api/courses/{id}/members/{principal_id}`: a teacher removes a student.
pub async fn remove_member_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((course_id, principal_id)): Path<(i64, i64)>,
) -> AppResult<Json<MessageResponse>> {
    state
        .classroom
        .courses
        .remove_member(&user.actor, course_id, principal_id)
        .await?;
    Ok(Json(MessageResponse::new("Member removed")))
}

/// `POST /api/courses/{id}/invitations`: mail invitations in bulk.
pub async fn invite_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(course_id): Path<i64>,
    Json(body): Json<InviteRequest>,
) -> AppResult<Json<InvitationResponse>> {
    let report = state
        .classroom
        .invitations
        .invite(&user.actor, course_id, &body.emails)
        .await?;
    Ok(Json(report.into()))
}
