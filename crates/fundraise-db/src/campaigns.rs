use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::{CampaignFields, CampaignImageRow, CampaignListRow, CampaignRow};

const CAMPAIGN_COLUMNS: &str = "c.id, c.user_id, c.name, c.short_description, c.description, \
     c.perks, c.goal_amount, c.current_amount, c.backer_count, c.created_at, c.updated_at";

impl Database {
    // -- Campaigns --

    pub fn create_campaign(&self, user_id: i64, fields: &CampaignFields<'_>) -> Result<CampaignRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO campaigns (user_id, name, short_description, description, perks, goal_amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user_id,
                    fields.name,
                    fields.short_description,
                    fields.description,
                    fields.perks,
                    fields.goal_amount,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_campaign(conn, id)?.ok_or_else(|| anyhow!("Campaign {} vanished after insert", id))
        })
    }

    pub fn get_campaign(&self, id: i64) -> Result<Option<CampaignRow>> {
        self.with_conn(|conn| query_campaign(conn, id))
    }

    /// All campaigns, or only those owned by `user_id`, oldest first.
    pub fn list_campaigns(&self, user_id: Option<i64>) -> Result<Vec<CampaignListRow>> {
        self.with_conn(|conn| {
            // LEFT JOIN the primary image so listings need a single query
            let sql = format!(
                "SELECT {}, i.file_name
                 FROM campaigns c
                 LEFT JOIN campaign_images i ON i.campaign_id = c.id AND i.is_primary = 1
                 WHERE ?1 IS NULL OR c.user_id = ?1
                 ORDER BY c.id",
                CAMPAIGN_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(CampaignListRow {
                        campaign: map_campaign_row(row)?,
                        primary_image: row.get(11)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite the mutable fields. Ownership (`user_id`) is never touched.
    /// Returns `None` if the campaign does not exist.
    pub fn update_campaign(&self, id: i64, fields: &CampaignFields<'_>) -> Result<Option<CampaignRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE campaigns
                 SET name = ?1, short_description = ?2, description = ?3, perks = ?4,
                     goal_amount = ?5, updated_at = datetime('now')
                 WHERE id = ?6",
                rusqlite::params![
                    fields.name,
                    fields.short_description,
                    fields.description,
                    fields.perks,
                    fields.goal_amount,
                    id,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_campaign(conn, id)
        })
    }

    // -- Campaign images --

    /// Insert an image row. When `is_primary` is set, every other image of the
    /// campaign loses its primary flag in the same SQL transaction.
    pub fn add_campaign_image(
        &self,
        campaign_id: i64,
        file_name: &str,
        is_primary: bool,
    ) -> Result<CampaignImageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if is_primary {
                tx.execute(
                    "UPDATE campaign_images SET is_primary = 0 WHERE campaign_id = ?1",
                    [campaign_id],
                )?;
            }
            tx.execute(
                "INSERT INTO campaign_images (campaign_id, file_name, is_primary) VALUES (?1, ?2, ?3)",
                rusqlite::params![campaign_id, file_name, is_primary],
            )?;
            let id = tx.last_insert_rowid();
            let row = tx.query_row(
                "SELECT id, campaign_id, file_name, is_primary, created_at
                 FROM campaign_images WHERE id = ?1",
                [id],
                map_image_row,
            )?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Images of a campaign, primary first.
    pub fn get_campaign_images(&self, campaign_id: i64) -> Result<Vec<CampaignImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, campaign_id, file_name, is_primary, created_at
                 FROM campaign_images
                 WHERE campaign_id = ?1
                 ORDER BY is_primary DESC, id",
            )?;
            let rows = stmt
                .query_map([campaign_id], map_image_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Whether any avatar or campaign image row points at `path`.
    pub fn is_file_referenced(&self, path: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let referenced = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE avatar = ?1)
                     OR EXISTS(SELECT 1 FROM campaign_images WHERE file_name = ?1)",
                [path],
                |row| row.get(0),
            )?;
            Ok(referenced)
        })
    }
}

fn query_campaign(conn: &Connection, id: i64) -> Result<Option<CampaignRow>> {
    let sql = format!("SELECT {} FROM campaigns c WHERE c.id = ?1", CAMPAIGN_COLUMNS);
    let row = conn.query_row(&sql, [id], map_campaign_row).optional()?;
    Ok(row)
}

fn map_campaign_row(row: &Row<'_>) -> rusqlite::Result<CampaignRow> {
    Ok(CampaignRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        short_description: row.get(3)?,
        description: row.get(4)?,
        perks: row.get(5)?,
        goal_amount: row.get(6)?,
        current_amount: row.get(7)?,
        backer_count: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_image_row(row: &Row<'_>) -> rusqlite::Result<CampaignImageRow> {
    Ok(CampaignImageRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        file_name: row.get(2)?,
        is_primary: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn fields<'a>(name: &'a str) -> CampaignFields<'a> {
        CampaignFields {
            name,
            short_description: "short",
            description: "long description",
            perks: "sticker, t-shirt",
            goal_amount: 1_000_000,
        }
    }

    fn seed_user(db: &Database, email: &str) -> i64 {
        db.create_user(&NewUser {
            name: "Owner",
            occupation: "Founder",
            email,
            password_hash: "hash",
        })
        .unwrap()
        .id
    }

    #[test]
    fn create_get_and_list() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "a@x.com");
        let bob = seed_user(&db, "b@x.com");

        let help = db.create_campaign(alice, &fields("Help")).unwrap();
        assert_eq!(help.user_id, alice);
        assert_eq!(help.current_amount, 0);
        assert_eq!(help.backer_count, 0);
        db.create_campaign(bob, &fields("Other")).unwrap();

        assert_eq!(db.get_campaign(help.id).unwrap().unwrap().name, "Help");
        assert!(db.get_campaign(999).unwrap().is_none());

        assert_eq!(db.list_campaigns(None).unwrap().len(), 2);
        let mine = db.list_campaigns(Some(alice)).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].campaign.id, help.id);
        assert!(mine[0].primary_image.is_none());
    }

    #[test]
    fn unknown_owner_is_rejected_by_foreign_key() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_campaign(42, &fields("Orphan")).is_err());
    }

    #[test]
    fn update_keeps_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "a@x.com");
        let campaign = db.create_campaign(alice, &fields("Help")).unwrap();

        let mut changes = fields("Help more");
        changes.goal_amount = 5;
        let updated = db.update_campaign(campaign.id, &changes).unwrap().unwrap();

        assert_eq!(updated.name, "Help more");
        assert_eq!(updated.goal_amount, 5);
        assert_eq!(updated.user_id, alice);
        assert!(db.update_campaign(999, &changes).unwrap().is_none());
    }

    #[test]
    fn new_primary_image_clears_previous_primary() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "a@x.com");
        let campaign = db.create_campaign(alice, &fields("Help")).unwrap();

        let first = db.add_campaign_image(campaign.id, "campaigns/one.png", true).unwrap();
        let second = db.add_campaign_image(campaign.id, "campaigns/two.png", true).unwrap();
        db.add_campaign_image(campaign.id, "campaigns/three.png", false).unwrap();

        let images = db.get_campaign_images(campaign.id).unwrap();
        assert_eq!(images.len(), 3);
        let primaries: Vec<_> = images.iter().filter(|i| i.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, second.id);
        assert_ne!(primaries[0].id, first.id);

        let listed = db.list_campaigns(None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].primary_image.as_deref(), Some("campaigns/two.png"));
    }

    #[test]
    fn file_references_cover_avatars_and_images() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "a@x.com");
        let campaign = db.create_campaign(alice, &fields("Help")).unwrap();
        assert!(!db.is_file_referenced("campaigns/one.png").unwrap());

        db.add_campaign_image(campaign.id, "campaigns/one.png", true).unwrap();
        db.update_user_avatar(alice, "avatars/me.png").unwrap();
        assert!(db.is_file_referenced("campaigns/one.png").unwrap());
        assert!(db.is_file_referenced("avatars/me.png").unwrap());
        assert!(!db.is_file_referenced("avatars/other.png").unwrap());
    }
}
