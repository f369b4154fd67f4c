use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Users --

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub image_url: Option<String>,
    pub role: String,
}

// -- Campaigns --

#[derive(Debug, Clone, Serialize)]
pub struct OwnerView {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignImageView {
    pub id: i64,
    pub image_url: String,
    pub is_primary: bool,
}

/// Row shown in campaign listings: the primary image only, no owner.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub short_description: String,
    pub image_url: Option<String>,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub backer_count: i64,
}

/// A campaign with its owner and images resolved.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignView {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub short_description: String,
    pub description: String,
    pub perks: Vec<String>,
    pub image_url: Option<String>,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub backer_count: i64,
    pub owner: OwnerView,
    pub images: Vec<CampaignImageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Perks are stored as one comma-separated string.
pub fn split_perks(perks: &str) -> Vec<String> {
    perks
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// -- Transactions --

/// Payment lifecycle. `Pending` is the only non-final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transaction status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "paid" => Ok(TransactionStatus::Paid),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub status: TransactionStatus,
    pub code: String,
    pub payment_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pledge as listed on its campaign page.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignTransactionView {
    pub id: i64,
    pub name: String,
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionCampaignView {
    pub name: String,
    pub image_url: Option<String>,
}

/// A pledge as listed in the backer's own history.
#[derive(Debug, Clone, Serialize)]
pub struct UserTransactionView {
    pub id: i64,
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub campaign: TransactionCampaignView,
}
