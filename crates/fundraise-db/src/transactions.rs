use anyhow::{Result, anyhow};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::warn;

use fundraise_types::models::TransactionStatus;

use crate::Database;
use crate::models::{
    CampaignTransactionRow, NewTransaction, Settlement, TransactionRow, UserTransactionRow,
};

const TRANSACTION_COLUMNS: &str = "t.id, t.campaign_id, t.user_id, t.amount, t.status, t.code, \
     t.payment_url, t.created_at, t.updated_at";

impl Database {
    pub fn create_transaction(&self, new: &NewTransaction<'_>) -> Result<TransactionRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO transactions (campaign_id, user_id, amount, status, code, payment_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    new.campaign_id,
                    new.user_id,
                    new.amount,
                    TransactionStatus::Pending.as_str(),
                    new.code,
                    new.payment_url,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_transaction(conn, "t.id = ?1", id)?
                .ok_or_else(|| anyhow!("Transaction {} vanished after insert", id))
        })
    }

    /// Pledges to a campaign, newest first, with the backer's name.
    pub fn list_campaign_transactions(&self, campaign_id: i64) -> Result<Vec<CampaignTransactionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, u.name
                 FROM transactions t
                 JOIN users u ON u.id = t.user_id
                 WHERE t.campaign_id = ?1
                 ORDER BY t.created_at DESC, t.id DESC",
                TRANSACTION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([campaign_id], |row| {
                    Ok(CampaignTransactionRow {
                        transaction: map_transaction_row(row)?,
                        backer_name: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// A user's pledges, newest first, with campaign name and primary image.
    pub fn list_user_transactions(&self, user_id: i64) -> Result<Vec<UserTransactionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, c.name, i.file_name
                 FROM transactions t
                 JOIN campaigns c ON c.id = t.campaign_id
                 LEFT JOIN campaign_images i ON i.campaign_id = c.id AND i.is_primary = 1
                 WHERE t.user_id = ?1
                 ORDER BY t.created_at DESC, t.id DESC",
                TRANSACTION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(UserTransactionRow {
                        transaction: map_transaction_row(row)?,
                        campaign_name: row.get(9)?,
                        campaign_image: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Move a pending transaction to a final status. On `Paid` the campaign's
    /// collected amount and backer count are bumped in the same SQL transaction.
    /// Finalized transactions are left untouched.
    pub fn settle_transaction(&self, code: &str, status: TransactionStatus) -> Result<Settlement> {
        if !status.is_final() {
            return Err(anyhow!("Cannot settle transaction {} to {}", code, status));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(current) = query_transaction(&tx, "t.code = ?1", code)? else {
                return Ok(Settlement::NotFound);
            };
            if current.status.is_final() {
                return Ok(Settlement::AlreadyFinal(current));
            }

            tx.execute(
                "UPDATE transactions SET status = ?1, updated_at = datetime('now')
                 WHERE id = ?2 AND status = ?3",
                rusqlite::params![status.as_str(), current.id, TransactionStatus::Pending.as_str()],
            )?;

            if status == TransactionStatus::Paid {
                let (collected, backers): (i64, i64) = tx.query_row(
                    "SELECT current_amount, backer_count FROM campaigns WHERE id = ?1",
                    [current.campaign_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                // SQLite turns an overflowing integer sum into REAL; refuse instead
                let (Some(collected), Some(backers)) =
                    (collected.checked_add(current.amount), backers.checked_add(1))
                else {
                    warn!(
                        "Settling {} would overflow totals of campaign {}",
                        current.code, current.campaign_id
                    );
                    return Ok(Settlement::TotalsOverflow(current));
                };
                tx.execute(
                    "UPDATE campaigns
                     SET current_amount = ?1,
                         backer_count = ?2,
                         updated_at = datetime('now')
                     WHERE id = ?3",
                    rusqlite::params![collected, backers, current.campaign_id],
                )?;
            }

            let updated = query_transaction(&tx, "t.id = ?1", current.id)?
                .ok_or_else(|| anyhow!("Transaction {} vanished during settlement", current.id))?;
            tx.commit()?;
            Ok(Settlement::Applied(updated))
        })
    }
}

fn query_transaction<P: rusqlite::ToSql>(
    conn: &Connection,
    predicate: &str,
    param: P,
) -> Result<Option<TransactionRow>> {
    let sql = format!(
        "SELECT {} FROM transactions t WHERE {}",
        TRANSACTION_COLUMNS, predicate
    );
    let row = conn.query_row(&sql, [param], map_transaction_row).optional()?;
    Ok(row)
}

fn map_transaction_row(row: &Row<'_>) -> rusqlite::Result<TransactionRow> {
    let status: String = row.get(4)?;
    let status = status
        .parse::<TransactionStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(TransactionRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        user_id: row.get(2)?,
        amount: row.get(3)?,
        status,
        code: row.get(5)?,
        payment_url: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
