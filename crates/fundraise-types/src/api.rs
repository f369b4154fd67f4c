use serde::{Deserialize, Serialize};

use crate::models::{TransactionStatus, UserView};
use crate::validate::{FieldErrors, Validate};

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Largest goal or pledge accepted, in the smallest currency unit.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

// -- JWT Claims --

/// Session token claims. `sub` is the user id in decimal form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

// -- Envelope --

#[derive(Debug, Serialize)]
pub struct Meta {
    pub message: String,
    pub code: u16,
    pub status: &'static str,
}

/// Every JSON response body: `{ meta: {message, code, status}, data }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, code: u16, data: T) -> Self {
        Self {
            meta: Meta {
                message: message.into(),
                code,
                status: "success",
            },
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>, code: u16, data: Option<T>) -> Self {
        Self {
            meta: Meta {
                message: message.into(),
                code,
                status: "failed",
            },
            data,
        }
    }
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        FieldErrors::new()
            .required("name", &self.name)
            .required("occupation", &self.occupation)
            .required("email", &self.email)
            .email("email", &self.email)
            .required("password", &self.password)
            .min_len("password", &self.password, MIN_PASSWORD_LENGTH)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        FieldErrors::new()
            .required("email", &self.email)
            .email("email", &self.email)
            .required("password", &self.password)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckEmailRequest {
    pub email: String,
}

impl Validate for CheckEmailRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        FieldErrors::new()
            .required("email", &self.email)
            .email("email", &self.email)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub occupation: String,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        FieldErrors::new()
            .required("name", &self.name)
            .required("occupation", &self.occupation)
            .finish()
    }
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct EmailAvailability {
    pub is_available: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadStatus {
    pub is_uploaded: bool,
}

// -- Campaigns --

/// Body of both campaign create and update; every field is overwritten on update.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CampaignRequest {
    pub name: String,
    pub short_description: String,
    pub description: String,
    /// Comma-separated list, e.g. "sticker, t-shirt".
    pub perks: String,
    pub goal_amount: i64,
}

impl Validate for CampaignRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        FieldErrors::new()
            .required("name", &self.name)
            .required("short_description", &self.short_description)
            .required("description", &self.description)
            .required("perks", &self.perks)
            .positive("goal_amount", self.goal_amount)
            .at_most("goal_amount", self.goal_amount, MAX_AMOUNT)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignQuery {
    pub user_id: Option<i64>,
}

// -- Transactions --

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateTransactionRequest {
    pub campaign_id: i64,
    pub amount: i64,
}

impl Validate for CreateTransactionRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        FieldErrors::new()
            .positive("campaign_id", self.campaign_id)
            .positive("amount", self.amount)
            .at_most("amount", self.amount, MAX_AMOUNT)
            .finish()
    }
}

/// Payment callback body. Only final statuses are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaymentNotification {
    pub code: String,
    pub status: String,
}

impl PaymentNotification {
    /// The requested final status, if `status` names one.
    pub fn final_status(&self) -> Option<TransactionStatus> {
        self.status
            .parse::<TransactionStatus>()
            .ok()
            .filter(TransactionStatus::is_final)
    }
}

impl Validate for PaymentNotification {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = FieldErrors::new();
        errors.required("code", &self.code);
        if self.final_status().is_none() {
            errors.push("status must be one of: paid, failed");
        }
        errors.finish()
    }
}
