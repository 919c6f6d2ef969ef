//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use lectern_core::auth::accounts::RegisterInput;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, MessageResponse,
    PrincipalResponse, RefreshRequest, RegisterRequest, TokenResponse, UpdateProfileRequest,
};

/// `POST /api/auth/register`: create an account and sign in.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state
        .accounts
        .register(RegisterInput {
            name: body.name,
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
            role: body.role,
        })
        .await?;
    Ok(Json(session.into()))
}

/// `POST /api/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.accounts.login(&body.email, &body.password).await?;
    Ok(Json(session.into()))
}

/// `POST /api/auth/refresh`: exchange an access/refresh pair for a new one.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state
        .accounts
        .refresh(&body.access_token, &body.refresh_token)
        .await?;
    Ok(Json(pair.into()))
}

/// `POST /api/auth/logout`: revoke a refresh token if one is given.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> AppResult<Json<MessageResponse>> {
    if let Some(token) = body.refresh_token.as_deref() {
        state.accounts.logout(token).await?;
    }
    Ok(Json(MessageResponse::new("Logged out")))
}

/// `GET /api/auth/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<PrincipalResponse>> {
    let principal = state.accounts.me(user.actor.id).await?;
    Ok(Json(principal.into()))
}

/// `PUT /api/auth/me`: update the display name.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<PrincipalResponse>> {
    let principal = state
        .accounts
        .update_profile(user.actor.id, &body.name)
        .await?;
    Ok(Json(principal.into()))
}

/// `PUT /api/auth/password`: change password; signs out every session.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .accounts
        .change_password(
            user.actor.id,
            &body.current_password,
            &body.new_password,
            &body.confirm_password,
        )
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
