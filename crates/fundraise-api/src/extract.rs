use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request, rejection::PathRejection},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use fundraise_db::models::UserRow;
use fundraise_types::validate::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::storage::Upload;

/// The user behind the request's bearer token.
///
/// Handlers that need a session take this as a parameter; there is no
/// ambient per-request user.
pub struct CurrentUser(pub UserRow);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("Missing bearer token".into()))?;

        let user_id = state.tokens.verify(bearer.token()).map_err(|e| {
            debug!("Rejected session token: {}", e);
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        // A valid token for a user that no longer exists is still no session
        let user = state.users.get_user(user_id).await.map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::Unauthorized("Invalid or expired token".into()),
            other => other,
        })?;

        Ok(CurrentUser(user))
    }
}

/// JSON body that has been deserialized and validated.
///
/// Syntax errors and field-level validation failures both come back as
/// `ApiError::Validation` (422).
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(vec![rejection.body_text()]))?;
        value.validate().map_err(ApiError::Validation)?;
        Ok(Payload(value))
    }
}

/// Numeric path id, rejected in the response envelope rather than as plain text.
pub fn path_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    let Path(id) = path.map_err(|_| ApiError::BadRequest("Invalid id".into()))?;
    Ok(id)
}

/// Pull the file sent under form field `name`. Other fields are skipped.
/// `Ok(None)` when the form has no such field or it is empty.
pub async fn file_field(multipart: &mut Multipart, name: &str) -> ApiResult<Option<Upload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Upload { file_name, bytes }));
    }
    Ok(None)
}
