use axum::{
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection, rejection::PathRejection},
    http::StatusCode,
    response::Response,
};

use fundraise_types::api::{CampaignQuery, CampaignRequest};

use crate::error::{ApiError, ApiResult, reply};
use crate::extract::{CurrentUser, Payload, file_field, path_id};
use crate::state::AppState;

/// GET /campaigns, optionally `?user_id=`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> ApiResult<Response> {
    let campaigns = state.campaigns.list(query.user_id).await?;
    Ok(reply(StatusCode::OK, "List of campaigns", campaigns))
}

/// POST /campaigns, owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Payload(req): Payload<CampaignRequest>,
) -> ApiResult<Response> {
    let campaign = state.campaigns.create(owner, req).await?;
    Ok(reply(StatusCode::CREATED, "Campaign created successfully", campaign))
}

/// GET /campaigns/{id}
pub async fn show(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let campaign = state.campaigns.get(path_id(path)?).await?;
    Ok(reply(StatusCode::OK, "Campaign detail", campaign))
}

/// PUT /campaigns/{id}
///
/// Any signed-in user may edit; the campaign keeps its stored owner.
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
    Payload(req): Payload<CampaignRequest>,
) -> ApiResult<Response> {
    let campaign = state.campaigns.update(path_id(path)?, req).await?;
    Ok(reply(StatusCode::OK, "Campaign updated successfully", campaign))
}

/// POST /campaigns/{id}/images, multipart field `file`.
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let campaign_id = path_id(path)?;
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = file_field(&mut multipart, "file")
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file attached".into()))?;

    let image = state.campaigns.add_image(campaign_id, upload).await?;
    Ok(reply(StatusCode::CREATED, "Campaign image uploaded successfully", image))
}
