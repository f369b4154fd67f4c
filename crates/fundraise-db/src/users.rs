use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::{NewUser, UserRow};

const USER_COLUMNS: &str =
    "id, name, occupation, email, password, avatar, role, created_at, updated_at";

impl Database {
    /// Insert a user and return the stored row. A duplicate email surfaces as
    /// a constraint violation (see [`crate::is_constraint_violation`]).
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (name, occupation, email, password) VALUES (?1, ?2, ?3, ?4)",
                (user.name, user.occupation, user.email, user.password_hash),
            )?;
            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?.ok_or_else(|| anyhow!("User {} vanished after insert", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
            let row = conn.query_row(&sql, [email], map_user_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the updated row, or `None` if the user does not exist.
    pub fn update_user_avatar(&self, id: i64, avatar: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET avatar = ?1, updated_at = datetime('now') WHERE id = ?2",
                rusqlite::params![avatar, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user_by_id(conn, id)
        })
    }

    /// Returns the updated row, or `None` if the user does not exist.
    pub fn update_user_profile(
        &self,
        id: i64,
        name: &str,
        occupation: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?1, occupation = ?2, updated_at = datetime('now') WHERE id = ?3",
                rusqlite::params![name, occupation, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user_by_id(conn, id)
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let row = conn.query_row(&sql, [id], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        occupation: row.get(2)?,
        email: row.get(3)?,
        password: row.get(4)?,
        avatar: row.get(5)?,
        role: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
