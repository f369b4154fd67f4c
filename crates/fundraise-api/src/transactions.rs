use axum::{
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::Response,
};

use fundraise_types::api::{CreateTransactionRequest, PaymentNotification};

use crate::error::{ApiResult, reply};
use crate::extract::{CurrentUser, Payload, path_id};
use crate::state::AppState;

/// POST /transactions
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(backer): CurrentUser,
    Payload(req): Payload<CreateTransactionRequest>,
) -> ApiResult<Response> {
    let transaction = state.transactions.create(backer, req).await?;
    Ok(reply(StatusCode::CREATED, "Transaction created successfully", transaction))
}

/// GET /transactions, the caller's own pledges.
pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Response> {
    let transactions = state.transactions.for_user(user.id).await?;
    Ok(reply(StatusCode::OK, "User's transactions", transactions))
}

/// GET /campaigns/{id}/transactions
pub async fn for_campaign(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let transactions = state.transactions.for_campaign(path_id(path)?).await?;
    Ok(reply(StatusCode::OK, "Campaign's transactions", transactions))
}

/// POST /transactions/notifications, called by the payment provider.
pub async fn notification(
    State(state): State<AppState>,
    Payload(req): Payload<PaymentNotification>,
) -> ApiResult<Response> {
    let transaction = state.transactions.process_notification(req).await?;
    Ok(reply(StatusCode::OK, "Payment notification processed", transaction))
}
