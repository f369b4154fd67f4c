use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::Response,
};

use fundraise_types::api::{
    AuthResponse, CheckEmailRequest, EmailAvailability, LoginRequest, RegisterRequest,
    UpdateProfileRequest, UploadStatus,
};
use fundraise_types::models::UserView;

use crate::error::{ApiError, ApiResult, reply};
use crate::extract::{CurrentUser, Payload, file_field};
use crate::state::AppState;
use crate::views::user_view;

/// POST /users
pub async fn register(
    State(state): State<AppState>,
    Payload(req): Payload<RegisterRequest>,
) -> ApiResult<Response> {
    let user = state.users.register(req).await?;
    let token = state.tokens.issue(user.id)?;

    Ok(reply(
        StatusCode::CREATED,
        "User registered successfully",
        AuthResponse {
            user: user_view(&user),
            token,
        },
    ))
}

/// POST /sessions
pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> ApiResult<Response> {
    let user = state.users.login(req).await?;
    let token = state.tokens.issue(user.id)?;

    Ok(reply(
        StatusCode::OK,
        "Login successful",
        AuthResponse {
            user: user_view(&user),
            token,
        },
    ))
}

/// POST /email-checkers
pub async fn check_email(
    State(state): State<AppState>,
    Payload(req): Payload<CheckEmailRequest>,
) -> ApiResult<Response> {
    let is_available = state.users.is_email_available(&req.email).await?;
    let message = if is_available {
        "Email is available"
    } else {
        "Email is already registered"
    };

    Ok(reply(StatusCode::OK, message, EmailAvailability { is_available }))
}

/// POST /users/avatars, multipart field `avatar`.
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let mut multipart = multipart.map_err(|e| ApiError::Upload(e.body_text()))?;
    let upload = file_field(&mut multipart, "avatar")
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
        .ok_or_else(|| ApiError::Upload("Error on upload avatar".into()))?;

    state.users.upload_avatar(user.id, upload).await?;

    Ok(reply(
        StatusCode::OK,
        "Avatar uploaded successfully",
        UploadStatus { is_uploaded: true },
    ))
}

/// GET /users/me
pub async fn me(CurrentUser(user): CurrentUser) -> Response {
    reply(StatusCode::OK, "Profile fetched successfully", user_view(&user))
}

/// PUT /users/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Payload(req): Payload<UpdateProfileRequest>,
) -> ApiResult<Response> {
    let updated = state.users.update_profile(user.id, req).await?;
    Ok(reply(StatusCode::OK, "Profile updated successfully", user_view(&updated)))
}

/// GET /users
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
) -> ApiResult<Response> {
    let users: Vec<UserView> = state.users.all_users().await?.iter().map(user_view).collect();
    Ok(reply(StatusCode::OK, "List of users", users))
}
