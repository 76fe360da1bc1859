//! Calendar reminders

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

use super::{ActionError, ActionOutcome, PermissionStatus};
use crate::db::CalendarRepo;

/// Length of every reminder event
pub const REMINDER_DURATION: TimeDelta = TimeDelta::hours(1);

/// Naive timestamp layouts accepted for `dateIso`, interpreted as local time
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Offset layouts RFC 3339 does not cover, such as minute precision
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
];

/// A calendar as reported by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    pub id: String,
    pub title: String,
    pub is_primary: bool,
    pub allows_modifications: bool,
}

/// An event to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Zone the event was scheduled from
    pub time_zone: String,
}

/// A calendar store the assistant may write to
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Ask for calendar access
    async fn request_permission(&self) -> PermissionStatus;

    /// Event calendars, in the store's order
    async fn calendars(&self) -> ActionOutcome<Vec<CalendarInfo>>;

    /// Create an event and return its identifier
    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> ActionOutcome<String>;
}

/// Choose the calendar a reminder goes into
///
/// Prefers a primary writable calendar, then the first writable one.
#[must_use]
pub fn select_calendar(calendars: &[CalendarInfo]) -> Option<&CalendarInfo> {
    calendars
        .iter()
        .find(|c| c.is_primary && c.allows_modifications)
        .or_else(|| calendars.iter().find(|c| c.allows_modifications))
}

/// Parse an ISO-8601 start time
///
/// Timestamps with an offset are taken as-is, naive timestamps are local
/// time, and a bare date is midnight UTC.
///
/// # Errors
///
/// `InvalidArgument` if the string is not a recognizable timestamp
pub fn parse_start(date_iso: &str) -> ActionOutcome<DateTime<FixedOffset>> {
    let input = date_iso.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    let zoned = match input.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => input.to_string(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, format) {
            return Ok(dt);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset())
                .ok_or_else(|| {
                    ActionError::invalid_argument(format!(
                        "{date_iso} does not exist in the local timezone"
                    ))
                });
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight).fixed_offset());
        }
    }

    Err(ActionError::invalid_argument(format!(
        "dateIso must be an ISO 8601 timestamp, got {date_iso:?}"
    )))
}

/// Name of the local timezone, falling back to the current UTC offset
#[must_use]
pub fn local_time_zone() -> String {
    std::env::var("TZ")
        .ok()
        .map(|tz| tz.trim_start_matches(':').to_string())
        .filter(|tz| !tz.is_empty())
        .unwrap_or_else(|| Local::now().offset().to_string())
}

/// Create a one-hour reminder event
///
/// # Errors
///
/// `PermissionDenied` without calendar access, `NotFound` when no calendar
/// is writable, `InvalidArgument` for an unparseable `dateIso`
pub async fn set_reminder(
    store: &dyn CalendarStore,
    title: &str,
    date_iso: &str,
) -> ActionOutcome<String> {
    if !store.request_permission().await.is_granted() {
        return Err(ActionError::permission_denied(
            "Calendar permission not granted",
        ));
    }

    let calendars = store.calendars().await?;
    let calendar = select_calendar(&calendars).ok_or_else(|| {
        ActionError::not_found("No writable calendar found on this device")
    })?;

    let start = parse_start(date_iso)?;
    let event = NewEvent {
        title: title.to_string(),
        start,
        end: start + REMINDER_DURATION,
        time_zone: local_time_zone(),
    };

    let event_id = store.create_event(&calendar.id, &event).await?;
    tracing::info!(
        event_id = %event_id,
        calendar = %calendar.title,
        start = %event.start,
        "reminder created"
    );

    let local_start = start.with_timezone(&Local);
    Ok(format!(
        "Reminder for \"{title}\" set in your {} calendar for {}",
        calendar.title,
        local_start.format("%-m/%-d/%Y, %-I:%M:%S %p")
    ))
}

/// Calendar store backed by the local database
#[derive(Clone)]
pub struct LocalCalendar {
    repo: CalendarRepo,
    access: PermissionStatus,
}

impl LocalCalendar {
    #[must_use]
    pub const fn new(repo: CalendarRepo, access: PermissionStatus) -> Self {
        Self { repo, access }
    }
}

#[async_trait]
impl CalendarStore for LocalCalendar {
    async fn request_permission(&self) -> PermissionStatus {
        self.access
    }

    async fn calendars(&self) -> ActionOutcome<Vec<CalendarInfo>> {
        let records = self
            .repo
            .list_calendars()
            .map_err(|e| ActionError::upstream(format!("calendar lookup failed: {e}")))?;

        Ok(records
            .into_iter()
            .map(|r| CalendarInfo {
                id: r.id,
                title: r.title,
                is_primary: r.is_primary,
                allows_modifications: r.allows_modifications,
            })
            .collect())
    }

    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> ActionOutcome<String> {
        self.repo
            .create_event(
                calendar_id,
                &event.title,
                event.start,
                event.end,
                &event.time_zone,
            )
            .map(|record| record.id)
            .map_err(|e| ActionError::upstream(format!("failed to create event: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionErrorKind;
    use crate::db::init_memory;

    fn calendar(id: &str, is_primary: bool, allows_modifications: bool) -> CalendarInfo {
        CalendarInfo {
            id: id.to_string(),
            title: id.to_string(),
            is_primary,
            allows_modifications,
        }
    }

    #[test]
    fn prefers_primary_writable() {
        let calendars = vec![
            calendar("birthdays", false, false),
            calendar("work", false, true),
            calendar("personal", true, true),
        ];
        assert_eq!(select_calendar(&calendars).unwrap().id, "personal");
    }

    #[test]
    fn falls_back_to_first_writable() {
        let calendars = vec![
            calendar("holidays", true, false),
            calendar("work", false, true),
            calendar("family", false, true),
        ];
        assert_eq!(select_calendar(&calendars).unwrap().id, "work");
    }

    #[test]
    fn read_only_calendars_are_not_selected() {
        let calendars = vec![calendar("holidays", true, false)];
        assert!(select_calendar(&calendars).is_none());
    }

    #[test]
    fn parses_offset_timestamp() {
        let start = parse_start("2024-01-01T10:00:00Z").unwrap();
        assert_eq!(start.to_rfc3339(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn parses_minute_precision_with_offset() {
        let utc = parse_start("2024-01-01T10:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-01-01T10:00:00+00:00");

        let paris = parse_start("2024-01-01T10:00+02:00").unwrap();
        assert_eq!(paris.to_rfc3339(), "2024-01-01T10:00:00+02:00");

        let compact = parse_start("2024-01-01T10:00:30-0500").unwrap();
        assert_eq!(compact.to_rfc3339(), "2024-01-01T10:00:30-05:00");
    }

    #[test]
    fn parses_naive_timestamp_as_local() {
        let start = parse_start("2024-06-01T09:30:00").unwrap();
        let local = start.with_timezone(&Local);
        assert_eq!(local.format("%H:%M").to_string(), "09:30");
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_start("tomorrow at ten").unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn local_store_writes_to_selected_calendar() {
        let repo = CalendarRepo::new(init_memory().unwrap());
        repo.add_calendar("Holidays", false, false).unwrap();
        let personal = repo.add_calendar("Personal", true, true).unwrap();
        let store = LocalCalendar::new(repo.clone(), PermissionStatus::Granted);

        let message = set_reminder(&store, "Dentist", "2024-03-05T15:00:00+00:00")
            .await
            .unwrap();
        assert!(message.contains("\"Dentist\""));
        assert!(message.contains("Personal calendar"));

        let events = repo.list_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].calendar_id, personal.id);
        assert_eq!(events[0].end - events[0].start, REMINDER_DURATION);
    }

    #[tokio::test]
    async fn denied_access_is_reported() {
        let repo = CalendarRepo::new(init_memory().unwrap());
        let store = LocalCalendar::new(repo, PermissionStatus::Denied);

        let err = set_reminder(&store, "Dentist", "2024-03-05T15:00:00Z")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn no_writable_calendar_is_not_found() {
        let repo = CalendarRepo::new(init_memory().unwrap());
        repo.add_calendar("Holidays", true, false).unwrap();
        let store = LocalCalendar::new(repo, PermissionStatus::Granted);

        let err = set_reminder(&store, "Dentist", "2024-03-05T15:00:00Z")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::NotFound);
        assert_eq!(err.message, "No writable calendar found on this device");
    }
}
