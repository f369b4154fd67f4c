use std::sync::Arc;

use tracing::info;

use fundraise_db::models::{NewUser, UserRow};
use fundraise_db::{Database, is_constraint_violation};
use fundraise_types::api::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use fundraise_types::validate::normalize_email;

use super::{blocking, discard_upload};
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::storage::{Bucket, Storage, Upload};

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
    storage: Arc<Storage>,
}

impl UserService {
    pub fn new(db: Arc<Database>, storage: Arc<Storage>) -> Self {
        Self { db, storage }
    }

    /// Hash the password and persist a new user. Duplicate emails are a
    /// `Conflict`, whether caught by the pre-check or by the UNIQUE constraint.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<UserRow> {
        let email = normalize_email(&req.email);
        let user = blocking(&self.db, move |db| {
            if db.email_exists(&email)? {
                return Err(email_taken());
            }

            let password_hash = hash_password(&req.password)?;
            db.create_user(&NewUser {
                name: req.name.trim(),
                occupation: req.occupation.trim(),
                email: &email,
                password_hash: &password_hash,
            })
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    email_taken()
                } else {
                    ApiError::Internal(e)
                }
            })
        })
        .await?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Same error for unknown email and wrong password.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<UserRow> {
        let email = normalize_email(&req.email);
        blocking(&self.db, move |db| {
            let user = db.get_user_by_email(&email)?.ok_or_else(invalid_credentials)?;
            if !verify_password(&req.password, &user.password)? {
                return Err(invalid_credentials());
            }
            Ok(user)
        })
        .await
    }

    pub async fn is_email_available(&self, email: &str) -> ApiResult<bool> {
        let email = normalize_email(email);
        blocking(&self.db, move |db| Ok(!db.email_exists(&email)?)).await
    }

    pub async fn get_user(&self, id: i64) -> ApiResult<UserRow> {
        blocking(&self.db, move |db| {
            db.get_user_by_id(id)?
                .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
        })
        .await
    }

    pub async fn all_users(&self) -> ApiResult<Vec<UserRow>> {
        blocking(&self.db, |db| Ok(db.list_users()?)).await
    }

    pub async fn update_profile(&self, id: i64, req: UpdateProfileRequest) -> ApiResult<UserRow> {
        blocking(&self.db, move |db| {
            db.update_user_profile(id, req.name.trim(), req.occupation.trim())?
                .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
        })
        .await
    }

    /// Store the image and point the user's avatar at it. Any failure is an
    /// `Upload` error so the client always gets `is_uploaded: false`.
    pub async fn upload_avatar(&self, user_id: i64, upload: Upload) -> ApiResult<UserRow> {
        let stored = self
            .storage
            .store(Bucket::Avatars, &upload.file_name, &upload.bytes)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store avatar for user {}: {}", user_id, e);
                ApiError::Upload("Error on upload avatar".into())
            })?;

        let path = stored.path.clone();
        let result = blocking(&self.db, move |db| {
            db.update_user_avatar(user_id, &path)?
                .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))
        })
        .await;

        match result {
            Ok(user) => {
                info!("User {} avatar set to {} ({} bytes)", user_id, stored.path, stored.size);
                Ok(user)
            }
            Err(e) => {
                discard_upload(&self.db, &self.storage, &stored).await;
                tracing::error!("Failed to save avatar for user {}: {}", user_id, e);
                Err(ApiError::Upload("Error on upload avatar".into()))
            }
        }
    }
}

fn email_taken() -> ApiError {
    ApiError::Conflict("Email is already registered".into())
}

fn invalid_credentials() -> ApiError {
    ApiError::Auth("Invalid credentials".into())
}
