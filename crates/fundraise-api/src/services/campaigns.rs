use std::sync::Arc;

use tracing::{error, info};

use fundraise_db::Database;
use fundraise_db::models::{CampaignFields, CampaignRow, UserRow};
use fundraise_types::api::CampaignRequest;
use fundraise_types::models::{CampaignImageView, CampaignSummary, CampaignView};

use super::{blocking, discard_upload};
use crate::error::{ApiError, ApiResult};
use crate::storage::{Bucket, Storage, Upload, sanitize_file_name};
use crate::views::{campaign_summary, campaign_view, image_view};

#[derive(Clone)]
pub struct CampaignService {
    db: Arc<Database>,
    storage: Arc<Storage>,
}

impl CampaignService {
    pub fn new(db: Arc<Database>, storage: Arc<Storage>) -> Self {
        Self { db, storage }
    }

    /// Every campaign, or only those owned by `user_id`. Unpaginated.
    pub async fn list(&self, user_id: Option<i64>) -> ApiResult<Vec<CampaignSummary>> {
        let rows = blocking(&self.db, move |db| Ok(db.list_campaigns(user_id)?)).await?;
        Ok(rows.into_iter().map(campaign_summary).collect())
    }

    pub async fn create(&self, owner: UserRow, req: CampaignRequest) -> ApiResult<CampaignView> {
        let view = blocking(&self.db, move |db| {
            let campaign = db.create_campaign(owner.id, &fields(&req))?;
            Ok(campaign_view(campaign, &owner, Vec::new()))
        })
        .await?;

        info!("User {} created campaign {}", view.user_id, view.id);
        Ok(view)
    }

    pub async fn get(&self, id: i64) -> ApiResult<CampaignView> {
        blocking(&self.db, move |db| {
            let campaign = db.get_campaign(id)?.ok_or_else(|| campaign_not_found(id))?;
            resolve(db, campaign)
        })
        .await
    }

    /// Overwrite the mutable fields. The owner is re-read from the stored
    /// campaign; the caller's identity plays no part and ownership never changes.
    pub async fn update(&self, id: i64, req: CampaignRequest) -> ApiResult<CampaignView> {
        blocking(&self.db, move |db| {
            let existing = db.get_campaign(id)?.ok_or_else(|| campaign_not_found(id))?;
            let owner = db
                .get_user_by_id(existing.user_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Owner of campaign {} not found", id)))?;

            let updated = db
                .update_campaign(id, &fields(&req))?
                .ok_or_else(|| campaign_not_found(id))?;
            let images = db.get_campaign_images(id)?;
            Ok(campaign_view(updated, &owner, images))
        })
        .await
    }

    /// Attach a new primary image. Campaign and owner are resolved before
    /// anything touches the disk; an image row that fails to save takes its
    /// freshly written file with it.
    pub async fn add_image(&self, campaign_id: i64, upload: Upload) -> ApiResult<CampaignImageView> {
        let owner = blocking(&self.db, move |db| {
            let campaign = db
                .get_campaign(campaign_id)?
                .ok_or_else(|| ApiError::BadRequest(format!("Campaign {} not found", campaign_id)))?;
            let owner = db.get_user_by_id(campaign.user_id)?.ok_or_else(|| {
                ApiError::BadRequest(format!("Owner of campaign {} not found", campaign_id))
            })?;
            Ok(owner)
        })
        .await?;

        let stored = self
            .storage
            .store(Bucket::Campaigns, &upload.file_name, &upload.bytes)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let path = stored.path.clone();
        let result = blocking(&self.db, move |db| {
            Ok(db.add_campaign_image(campaign_id, &path, true)?)
        })
        .await;

        match result {
            Ok(image) => {
                info!(
                    "Campaign {} (owner {}) got primary image {} ({} bytes) from {}",
                    campaign_id,
                    owner.id,
                    image.file_name,
                    stored.size,
                    sanitize_file_name(&upload.file_name)
                );
                Ok(image_view(image))
            }
            Err(e) => {
                error!("Failed to save image for campaign {}: {}", campaign_id, e);
                discard_upload(&self.db, &self.storage, &stored).await;
                Err(e)
            }
        }
    }
}

fn fields(req: &CampaignRequest) -> CampaignFields<'_> {
    CampaignFields {
        name: req.name.trim(),
        short_description: req.short_description.trim(),
        description: req.description.trim(),
        perks: req.perks.trim(),
        goal_amount: req.goal_amount,
    }
}

/// Load owner and images for a campaign row.
fn resolve(db: &Database, campaign: CampaignRow) -> ApiResult<CampaignView> {
    let owner = db.get_user_by_id(campaign.user_id)?.ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!(
            "Campaign {} references missing user {}",
            campaign.id,
            campaign.user_id
        ))
    })?;
    let images = db.get_campaign_images(campaign.id)?;
    Ok(campaign_view(campaign, &owner, images))
}

fn campaign_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Campaign {} not found", id))
}
