//! # lectern_api
//!
//! HTTP API library for Lectern.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use lectern_core::auth::accounts::AccountService;
use lectern_core::auth::tokens::TokenIssuer;
use lectern_core::classroom::Classroom;
use lectern_core::mail::Mailer;
use lectern_core::notifications::{LiveHub, NotificationService};
use lectern_core::store::Store;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{
    announcements, assignments, auth, courses, enrollment, health, notifications, submissions,
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub accounts: AccountService,
    pub classroom: Classroom,
    /// PostgreSQL pool, for health checks. `None` when running in memory.
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Wire the services over `store`.
    pub fn new(config: ApiConfig, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, pool: Option<PgPool>) -> Self {
        let tokens = TokenIssuer::new(store.clone(), config.token_settings());
        let accounts = AccountService::new(store.clone(), tokens);
        let notifications = NotificationService::new(store.clone(), LiveHub::new());
        let classroom = Classroom::new(store, notifications, mailer);
        Self {
            config,
            accounts,
            classroom,
            pool,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `lectern_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    lectern_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::HEALTH, get(health::health_handler))
        .route(routes::AUTH_REGISTER, post(auth::register_handler))
        .route(routes::AUTH_LOGIN, post(auth::login_handler))
        .route(routes::AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::AUTH_LOGOUT, post(auth::logout_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            routes::AUTH_ME,
            get(auth::me_handler).put(auth::update_profile_handler),
        )
        .route(routes::AUTH_PASSWORD, put(auth::change_password_handler))
        // Courses
        .route(
            routes::COURSES,
            get(courses::list_courses_handler).post(courses::create_course_handler),
        )
        .route(routes::COURSE, get(courses::get_course_handler))
        .route(routes::COURSE_MEMBERS, get(courses::list_members_handler))
        .route(routes::COURSE_MEMBERS_ME, delete(courses::leave_course_handler))
        .route(routes::COURSE_MEMBER, delete(courses::remove_member_handler))
        .route(routes::COURSE_INVITATIONS, post(courses::invite_handler))
        // Enrollment
        .route(
            routes::ENROLLMENT_REQUESTS,
            post(enrollment::create_request_handler),
        )
        .route(
            routes::ENROLLMENT_REQUESTS_MINE,
            get(enrollment::list_my_requests_handler),
        )
        .route(
            routes::ENROLLMENT_REQUEST,
            delete(enrollment::cancel_request_handler),
        )
        .route(
            routes::ENROLLMENT_REQUEST_PROCESS,
            put(enrollment::process_request_handler),
        )
        .route(
            routes::COURSE_ENROLLMENT_REQUESTS,
            get(enrollment::list_course_requests_handler),
        )
        // Assignments & submissions
        .route(
            routes::COURSE_ASSIGNMENTS,
            get(assignments::list_assignments_handler).post(assignments::create_assignment_handler),
        )
        .route(
            routes::ASSIGNMENT,
            get(assignments::get_assignment_handler)
                .put(assignments::update_assignment_handler)
                .delete(assignments::delete_assignment_handler),
        )
        .route(
            routes::ASSIGNMENT_SUBMISSIONS,
            get(submissions::list_submissions_handler).post(submissions::submit_handler),
        )
        .route(routes::SUBMISSION, get(submissions::get_submission_handler))
        .route(routes::SUBMISSION_GRADE, put(submissions::grade_handler))
        // Announcements
        .route(
            routes::COURSE_ANNOUNCEMENTS,
            get(announcements::list_announcements_handler)
                .post(announcements::post_announcement_handler),
        )
        .route(
            routes::ANNOUNCEMENT_COMMENTS,
            get(announcements::list_comments_handler).post(announcements::create_comment_handler),
        )
        .route(routes::COMMENT, delete(announcements::delete_comment_handler))
        // Notifications
        .route(
            routes::NOTIFICATIONS,
            get(notifications::list_notifications_handler),
        )
        .route(
            routes::NOTIFICATIONS_UNREAD,
            get(notifications::list_unread_handler),
        )
        .route(
            routes::NOTIFICATIONS_UNREAD_COUNT,
            get(notifications::unread_count_handler),
        )
        .route(
            routes::NOTIFICATIONS_READ_ALL,
            put(notifications::mark_all_read_handler),
        )
        .route(
            routes::NOTIFICATION_READ,
            put(notifications::mark_read_handler),
        )
        .route(
            routes::NOTIFICATION,
            delete(notifications::delete_notification_handler),
        )
        .route(
            routes::NOTIFICATIONS_STREAM,
            get(notifications::stream_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
