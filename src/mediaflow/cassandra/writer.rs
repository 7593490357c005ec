use super::error::WriteError;
use super::session::CqlExecutor;
use crate::mediaflow::media::MediaRecord;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use scylla::value::CqlTimestamp;

pub const KEYSPACE: &str = "KAFKA_EXAMPLES";
pub const TABLE: &str = "VIDEOS_BY_TITLE_YEAR";

pub const INSERT_CQL: &str = "INSERT INTO KAFKA_EXAMPLES.VIDEOS_BY_TITLE_YEAR \
     (TITLE, ADDED_YEAR, ADDED_DATE, DESCRIPTION, USER_ID, VIDEO_ID) \
     VALUES (?, ?, ?, ?, ?, ?)";

/// Date layouts accepted for ADDED_DATE besides RFC 3339
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m-%d-%Y"];

/// A record converted to the table's column types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRow {
    pub title: String,
    pub added_year: i32,
    pub added_date: DateTime<Utc>,
    pub description: String,
    pub user_id: i32,
    pub video_id: i32,
}

impl VideoRow {
    pub fn from_record(record: &MediaRecord) -> Result<Self, WriteError> {
        Ok(Self {
            title: record.title.clone(),
            added_year: parse_int("ADDED_YEAR", &record.added_year)?,
            added_date: parse_date("ADDED_DATE", &record.added_date)?,
            description: record.description.clone(),
            user_id: parse_int("USER_ID", &record.userid)?,
            video_id: parse_int("VIDEO_ID", &record.videoid)?,
        })
    }

    /// Bind values in statement column order
    pub fn values(&self) -> (&str, i32, CqlTimestamp, &str, i32, i32) {
        (
            &self.title,
            self.added_year,
            CqlTimestamp(self.added_date.timestamp_millis()),
            &self.description,
            self.user_id,
            self.video_id,
        )
    }
}

fn parse_int(column: &'static str, value: &str) -> Result<i32, WriteError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| WriteError::InvalidValue {
            column,
            value: value.to_string(),
        })
}

fn parse_date(column: &'static str, value: &str) -> Result<DateTime<Utc>, WriteError> {
    let trimmed = value.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| WriteError::InvalidValue {
            column,
            value: value.to_string(),
        })
}

/// Persists one record per call as a single bound INSERT
#[derive(Debug, Default, Clone, Copy)]
pub struct StorageWriter;

impl StorageWriter {
    pub fn new() -> Self {
        Self
    }

    /// Converts and inserts `record`; nothing executes if a value does not convert
    pub async fn write(
        &self,
        record: &MediaRecord,
        session: &dyn CqlExecutor,
    ) -> Result<(), WriteError> {
        let row = VideoRow::from_record(record)?;
        session.execute(INSERT_CQL, &row).await?;

        log::debug!(
            target: "mediaflow::listener",
            "Stored '{}' ({}) in {}.{}",
            row.title,
            row.added_year,
            KEYSPACE,
            TABLE
        );
        Ok(())
    }
}
