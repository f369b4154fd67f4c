use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use crate::error::reply;
use crate::state::AppState;
use crate::{campaigns, transactions, users};

/// All JSON API routes. Cross-cutting layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/users", post(users::register).get(users::list))
        .route("/sessions", post(users::login))
        .route("/email-checkers", post(users::check_email))
        .route("/users/avatars", post(users::upload_avatar))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/campaigns", get(campaigns::list).post(campaigns::create))
        .route("/campaigns/{id}", get(campaigns::show).put(campaigns::update))
        .route("/campaigns/{id}/images", post(campaigns::upload_image))
        .route("/campaigns/{id}/transactions", get(transactions::for_campaign))
        .route("/transactions", get(transactions::mine).post(transactions::create))
        .route("/transactions/notifications", post(transactions::notification))
        .route("/health", get(health))
        .layer(body_limit)
        .with_state(state)
}

async fn health() -> Response {
    reply(StatusCode::OK, "ok", serde_json::json!({ "status": "up" }))
}
