//! Contact repository

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DbPool, connection, parse_datetime};
use crate::{Error, Result};

/// A stored contact with its phone numbers
#[derive(Debug, Clone)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    /// Phone numbers in insertion order
    pub phone_numbers: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Contact repository
#[derive(Clone)]
pub struct ContactRepo {
    pool: DbPool,
}

impl ContactRepo {
    /// Create a new contact repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a contact
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn add(&self, name: &str, phone_numbers: &[String]) -> Result<ContactRecord> {
        let mut conn = connection(&self.pool)?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO contacts (id, name, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, name, now.to_rfc3339()],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        for (position, number) in phone_numbers.iter().enumerate() {
            #[allow(clippy::cast_possible_wrap)]
            let position = position as i64;
            tx.execute(
                "INSERT INTO phone_numbers (contact_id, position, number) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, position, number],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;

        tracing::debug!(contact_id = %id, name, numbers = phone_numbers.len(), "contact added");

        Ok(ContactRecord {
            id,
            name: name.to_string(),
            phone_numbers: phone_numbers.to_vec(),
            created_at: now,
        })
    }

    /// Find contacts whose name contains `query` (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_name(&self, query: &str) -> Result<Vec<ContactRecord>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        self.query(
            "SELECT id, name, created_at FROM contacts
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name COLLATE NOCASE",
            &[&pattern as &dyn rusqlite::ToSql],
        )
    }

    /// List every contact
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_all(&self) -> Result<Vec<ContactRecord>> {
        self.query(
            "SELECT id, name, created_at FROM contacts ORDER BY name COLLATE NOCASE",
            &[],
        )
    }

    /// Delete a contact and its numbers
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = connection(&self.pool)?;
        conn.execute("DELETE FROM phone_numbers WHERE contact_id = ?1", [id])
            .map_err(|e| Error::Database(e.to_string()))?;
        let removed = conn
            .execute("DELETE FROM contacts WHERE id = ?1", [id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(removed > 0)
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<ContactRecord>> {
        let conn = connection(&self.pool)?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::Database(e.to_string()))?;

        let rows: Vec<(String, String, String)> = stmt
            .query_map(params, |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        let mut numbers_stmt = conn
            .prepare("SELECT number FROM phone_numbers WHERE contact_id = ?1 ORDER BY position")
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut contacts = Vec::with_capacity(rows.len());
        for (id, name, created_at) in rows {
            let phone_numbers = numbers_stmt
                .query_map([&id], |row| row.get::<_, String>(0))
                .map_err(|e| Error::Database(e.to_string()))?
                .filter_map(std::result::Result::ok)
                .collect();

            contacts.push(ContactRecord {
                id,
                name,
                phone_numbers,
                created_at: parse_datetime(&created_at),
            });
        }

        Ok(contacts)
    }
}

/// Escape `LIKE` wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
