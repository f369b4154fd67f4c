//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the fundraise-types API models so the DB layer stays independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use fundraise_types::models::TransactionStatus;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub occupation: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone)]
pub struct CampaignRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub short_description: String,
    pub description: String,
    pub perks: String,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub backer_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Campaign listing row with its primary image joined in.
#[derive(Debug, Clone)]
pub struct CampaignListRow {
    pub campaign: CampaignRow,
    pub primary_image: Option<String>,
}

/// The mutable fields of a campaign, used for both insert and update.
pub struct CampaignFields<'a> {
    pub name: &'a str,
    pub short_description: &'a str,
    pub description: &'a str,
    pub perks: &'a str,
    pub goal_amount: i64,
}

#[derive(Debug, Clone)]
pub struct CampaignImageRow {
    pub id: i64,
    pub campaign_id: i64,
    pub file_name: String,
    pub is_primary: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub status: TransactionStatus,
    pub code: String,
    pub payment_url: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewTransaction<'a> {
    pub campaign_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub code: &'a str,
    pub payment_url: &'a str,
}

/// Transaction joined with its backer's name.
#[derive(Debug, Clone)]
pub struct CampaignTransactionRow {
    pub transaction: TransactionRow,
    pub backer_name: String,
}

/// Transaction joined with its campaign's name and primary image.
#[derive(Debug, Clone)]
pub struct UserTransactionRow {
    pub transaction: TransactionRow,
    pub campaign_name: String,
    pub campaign_image: Option<String>,
}

/// Result of applying a payment notification.
#[derive(Debug)]
pub enum Settlement {
    Applied(TransactionRow),
    AlreadyFinal(TransactionRow),
    /// Crediting the pledge would overflow the campaign totals; nothing changed.
    TotalsOverflow(TransactionRow),
    NotFound,
}

/// Parse a stored timestamp. Defaults written by SQLite are
/// "YYYY-MM-DD HH:MM:SS" without timezone and are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
