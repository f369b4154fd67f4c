//! Row -> API view conversions.

use chrono::{DateTime, Utc};
use tracing::warn;

use fundraise_db::models::{
    CampaignImageRow, CampaignListRow, CampaignRow, CampaignTransactionRow, TransactionRow,
    UserRow, UserTransactionRow, parse_timestamp,
};
use fundraise_types::models::{
    CampaignImageView, CampaignSummary, CampaignTransactionView, CampaignView, OwnerView,
    TransactionCampaignView, TransactionView, UserTransactionView, UserView, split_perks,
};

fn timestamp(value: &str, what: &str, id: i64) -> DateTime<Utc> {
    parse_timestamp(value).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {} {}", value, what, id);
        DateTime::default()
    })
}

pub fn user_view(row: &UserRow) -> UserView {
    UserView {
        id: row.id,
        name: row.name.clone(),
        occupation: row.occupation.clone(),
        email: row.email.clone(),
        image_url: row.avatar.clone(),
        role: row.role.clone(),
    }
}

pub fn image_view(row: CampaignImageRow) -> CampaignImageView {
    CampaignImageView {
        id: row.id,
        image_url: row.file_name,
        is_primary: row.is_primary,
    }
}

pub fn campaign_summary(row: CampaignListRow) -> CampaignSummary {
    let c = row.campaign;
    CampaignSummary {
        id: c.id,
        user_id: c.user_id,
        name: c.name,
        short_description: c.short_description,
        image_url: row.primary_image,
        goal_amount: c.goal_amount,
        current_amount: c.current_amount,
        backer_count: c.backer_count,
    }
}

pub fn campaign_view(row: CampaignRow, owner: &UserRow, images: Vec<CampaignImageRow>) -> CampaignView {
    let images: Vec<CampaignImageView> = images.into_iter().map(image_view).collect();
    let image_url = images
        .iter()
        .find(|i| i.is_primary)
        .map(|i| i.image_url.clone());

    CampaignView {
        id: row.id,
        user_id: row.user_id,
        perks: split_perks(&row.perks),
        created_at: timestamp(&row.created_at, "campaign", row.id),
        updated_at: timestamp(&row.updated_at, "campaign", row.id),
        name: row.name,
        short_description: row.short_description,
        description: row.description,
        image_url,
        goal_amount: row.goal_amount,
        current_amount: row.current_amount,
        backer_count: row.backer_count,
        owner: OwnerView {
            id: owner.id,
            name: owner.name.clone(),
            image_url: owner.avatar.clone(),
        },
        images,
    }
}

pub fn transaction_view(row: TransactionRow) -> TransactionView {
    TransactionView {
        id: row.id,
        campaign_id: row.campaign_id,
        user_id: row.user_id,
        amount: row.amount,
        status: row.status,
        created_at: timestamp(&row.created_at, "transaction", row.id),
        updated_at: timestamp(&row.updated_at, "transaction", row.id),
        code: row.code,
        payment_url: row.payment_url,
    }
}

pub fn campaign_transaction_view(row: CampaignTransactionRow) -> CampaignTransactionView {
    let t = row.transaction;
    CampaignTransactionView {
        id: t.id,
        name: row.backer_name,
        amount: t.amount,
        status: t.status,
        created_at: timestamp(&t.created_at, "transaction", t.id),
    }
}

pub fn user_transaction_view(row: UserTransactionRow) -> UserTransactionView {
    let t = row.transaction;
    UserTransactionView {
        id: t.id,
        amount: t.amount,
        status: t.status,
        created_at: timestamp(&t.created_at, "transaction", t.id),
        campaign: TransactionCampaignView {
            name: row.campaign_name,
            image_url: row.campaign_image,
        },
    }
}
