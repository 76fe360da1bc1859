//! Calendar and event repository

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use super::{DbPool, connection, parse_datetime};
use crate::{Error, Result};

/// A stored calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRecord {
    pub id: String,
    pub title: String,
    pub is_primary: bool,
    pub allows_modifications: bool,
}

/// A stored event
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub time_zone: String,
    pub created_at: DateTime<Utc>,
}

/// Calendar repository
#[derive(Clone)]
pub struct CalendarRepo {
    pool: DbPool,
}

impl CalendarRepo {
    /// Create a new calendar repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a calendar
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn add_calendar(
        &self,
        title: &str,
        is_primary: bool,
        allows_modifications: bool,
    ) -> Result<CalendarRecord> {
        let conn = connection(&self.pool)?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO calendars (id, title, is_primary, allows_modifications, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                id,
                title,
                is_primary,
                allows_modifications,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        tracing::debug!(calendar_id = %id, title, is_primary, "calendar added");

        Ok(CalendarRecord {
            id,
            title: title.to_string(),
            is_primary,
            allows_modifications,
        })
    }

    /// List calendars in creation order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_calendars(&self) -> Result<Vec<CalendarRecord>> {
        let conn = connection(&self.pool)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, is_primary, allows_modifications
                 FROM calendars ORDER BY created_at, rowid",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let calendars = stmt
            .query_map([], |row| {
                Ok(CalendarRecord {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    is_primary: row.get(2)?,
                    allows_modifications: row.get(3)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(calendars)
    }

    /// Create an event in a calendar
    ///
    /// # Errors
    ///
    /// Returns error if the calendar does not exist or the write fails
    pub fn create_event(
        &self,
        calendar_id: &str,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        time_zone: &str,
    ) -> Result<EventRecord> {
        let conn = connection(&self.pool)?;

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM calendars WHERE id = ?1)",
                [calendar_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        if !exists {
            return Err(Error::NotFound(format!("calendar {calendar_id}")));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO events (id, calendar_id, title, start_at, end_at, time_zone, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id,
                calendar_id,
                title,
                start.to_rfc3339(),
                end.to_rfc3339(),
                time_zone,
                now.to_rfc3339()
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        tracing::debug!(event_id = %id, calendar_id, title, "event created");

        Ok(EventRecord {
            id,
            calendar_id: calendar_id.to_string(),
            title: title.to_string(),
            start,
            end,
            time_zone: time_zone.to_string(),
            created_at: now,
        })
    }

    /// List events, soonest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_events(&self, limit: usize) -> Result<Vec<EventRecord>> {
        let conn = connection(&self.pool)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, calendar_id, title, start_at, end_at, time_zone, created_at
                 FROM events ORDER BY start_at LIMIT ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let limit = limit as i64;

        let events = stmt
            .query_map([limit], |row| {
                let start: String = row.get(3)?;
                let end: String = row.get(4)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    start,
                    end,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .filter_map(|(id, calendar_id, title, start, end, time_zone, created_at)| {
                Some(EventRecord {
                    id,
                    calendar_id,
                    title,
                    start: DateTime::parse_from_rfc3339(&start).ok()?,
                    end: DateTime::parse_from_rfc3339(&end).ok()?,
                    time_zone,
                    created_at: parse_datetime(&created_at),
                })
            })
            .collect();

        Ok(events)
    }
}
