use std::sync::Arc;

use tracing::info;

use fundraise_db::Database;
use fundraise_db::models::{NewTransaction, Settlement, UserRow};
use fundraise_types::api::{CreateTransactionRequest, PaymentNotification};
use fundraise_types::models::{CampaignTransactionView, TransactionView, UserTransactionView};

use super::blocking;
use crate::error::{ApiError, ApiResult};
use crate::payments::{PaymentLinks, new_transaction_code};
use crate::views::{campaign_transaction_view, transaction_view, user_transaction_view};

#[derive(Clone)]
pub struct TransactionService {
    db: Arc<Database>,
    payments: Arc<dyn PaymentLinks>,
}

impl TransactionService {
    pub fn new(db: Arc<Database>, payments: Arc<dyn PaymentLinks>) -> Self {
        Self { db, payments }
    }

    /// Record a pending pledge by `backer` and attach its payment URL.
    pub async fn create(&self, backer: UserRow, req: CreateTransactionRequest) -> ApiResult<TransactionView> {
        let payments = self.payments.clone();
        let row = blocking(&self.db, move |db| {
            if db.get_campaign(req.campaign_id)?.is_none() {
                return Err(campaign_not_found(req.campaign_id));
            }

            let code = new_transaction_code();
            let payment_url = payments.payment_url(&code, req.amount, &backer.email)?;
            Ok(db.create_transaction(&NewTransaction {
                campaign_id: req.campaign_id,
                user_id: backer.id,
                amount: req.amount,
                code: &code,
                payment_url: &payment_url,
            })?)
        })
        .await?;

        info!(
            "User {} pledged {} to campaign {} ({})",
            row.user_id, row.amount, row.campaign_id, row.code
        );
        Ok(transaction_view(row))
    }

    pub async fn for_campaign(&self, campaign_id: i64) -> ApiResult<Vec<CampaignTransactionView>> {
        let rows = blocking(&self.db, move |db| {
            if db.get_campaign(campaign_id)?.is_none() {
                return Err(campaign_not_found(campaign_id));
            }
            Ok(db.list_campaign_transactions(campaign_id)?)
        })
        .await?;
        Ok(rows.into_iter().map(campaign_transaction_view).collect())
    }

    pub async fn for_user(&self, user_id: i64) -> ApiResult<Vec<UserTransactionView>> {
        let rows = blocking(&self.db, move |db| Ok(db.list_user_transactions(user_id)?)).await?;
        Ok(rows.into_iter().map(user_transaction_view).collect())
    }

    /// Apply a payment outcome. Only `pending` transactions move; a finalized
    /// one is a `Conflict` and stays as it is.
    pub async fn process_notification(&self, req: PaymentNotification) -> ApiResult<TransactionView> {
        let status = req
            .final_status()
            .ok_or_else(|| ApiError::Validation(vec!["status must be one of: paid, failed".into()]))?;

        let code = req.code.trim().to_string();
        let settlement = blocking(&self.db, {
            let code = code.clone();
            move |db| Ok(db.settle_transaction(&code, status)?)
        })
        .await?;

        match settlement {
            Settlement::Applied(row) => {
                info!("Transaction {} is now {}", row.code, row.status);
                Ok(transaction_view(row))
            }
            Settlement::AlreadyFinal(row) => Err(ApiError::Conflict(format!(
                "Transaction {} is already {}",
                row.code, row.status
            ))),
            Settlement::TotalsOverflow(row) => Err(ApiError::Conflict(format!(
                "Transaction {} cannot be credited to campaign {}",
                row.code, row.campaign_id
            ))),
            Settlement::NotFound => Err(ApiError::NotFound(format!("Transaction {} not found", code))),
        }
    }
}

fn campaign_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Campaign {} not found", id))
}
