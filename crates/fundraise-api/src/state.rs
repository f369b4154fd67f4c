use std::sync::Arc;

use fundraise_db::Database;

use crate::auth::TokenIssuer;
use crate::payments::PaymentLinks;
use crate::services::{CampaignService, TransactionService, UserService};
use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub users: UserService,
    pub campaigns: CampaignService,
    pub transactions: TransactionService,
    pub tokens: TokenIssuer,
    /// Request body cap, applied to JSON and multipart alike.
    pub max_upload_bytes: usize,
}

impl AppStateInner {
    pub fn new(
        db: Database,
        storage: Storage,
        tokens: TokenIssuer,
        payments: Arc<dyn PaymentLinks>,
        max_upload_bytes: usize,
    ) -> AppState {
        let db = Arc::new(db);
        let storage = Arc::new(storage);
        Arc::new(Self {
            users: UserService::new(db.clone(), storage.clone()),
            campaigns: CampaignService::new(db.clone(), storage),
            transactions: TransactionService::new(db, payments),
            tokens,
            max_upload_bytes,
        })
    }
}
