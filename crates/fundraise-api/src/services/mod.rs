//! One service per resource. Services own the business rules and run every
//! database call on the blocking pool.

mod campaigns;
mod transactions;
mod users;

pub use campaigns::CampaignService;
pub use transactions::TransactionService;
pub use users::UserService;

use std::sync::Arc;

use tracing::{debug, error, warn};

use fundraise_db::Database;

use crate::error::{ApiError, ApiResult};
use crate::storage::{Storage, StoredFile};

/// Run blocking DB work off the async runtime.
async fn blocking<F, T>(db: &Arc<Database>, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}

/// Remove a file this request wrote after its row failed to save. Content is
/// deduplicated, so the file stays if any row already points at it.
async fn discard_upload(db: &Arc<Database>, storage: &Storage, stored: &StoredFile) {
    if !stored.created {
        return;
    }

    let path = stored.path.clone();
    match blocking(db, move |db| Ok(db.is_file_referenced(&path)?)).await {
        Ok(false) => {
            if let Err(e) = storage.delete(&stored.path).await {
                warn!("Failed to remove orphaned upload {}: {}", stored.path, e);
            }
        }
        Ok(true) => debug!("Keeping {}, still referenced", stored.path),
        Err(e) => warn!("Keeping {}, reference check failed: {}", stored.path, e),
    }
}
