//! Run identifiers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a pipeline run, based on UUIDv7.
///
/// UUIDv7 keeps artifact names for successive runs in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generate a new RunId
    ///
    /// # Examples
    ///
    /// ```
    /// use tasksift_domain::RunId;
    ///
    /// let a = RunId::new();
    /// let b = RunId::new();
    /// assert!(a <= b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Parse a RunId from its string form; only UUIDv7 is accepted
    pub fn parse(s: &str) -> Result<Self, String> {
        let uuid = uuid::Uuid::parse_str(s).map_err(|e| format!("Invalid run id: {}", e))?;
        if uuid.get_version_num() != 7 {
            return Err(format!(
                "Invalid run id: expected a version 7 UUID, got version {}",
                uuid.get_version_num()
            ));
        }
        Ok(Self(uuid))
    }

    /// When the run started, from the embedded UUIDv7 timestamp
    pub fn started_at(&self) -> DateTime<Utc> {
        self.0
            .get_timestamp()
            .and_then(|ts| {
                let (secs, nanos) = ts.to_unix();
                DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
            })
            .unwrap_or_default()
    }

    /// UTC calendar date the run started on
    pub fn date(&self) -> NaiveDate {
        self.started_at().date_naive()
    }

    /// First eight hex digits, for log lines and file names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let id = RunId::new();
        assert_eq!(RunId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_short_form() {
        let id = RunId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().replace('-', "").starts_with(&id.short()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RunId::parse("not-a-run").is_err());
        // Version 4
        assert!(RunId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").is_err());
    }

    #[test]
    fn test_start_time_is_stable() {
        let id = RunId::new();
        let parsed = RunId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed.started_at(), id.started_at());
        assert_eq!(id.date(), id.started_at().date_naive());
        assert!((Utc::now() - id.started_at()).num_seconds() < 60);
    }

    #[test]
    fn test_start_time_from_embedded_timestamp() {
        // 2025-05-07T12:00:00.000Z = 1746619200000 ms
        let id = RunId::parse("0196aa9d-f200-7000-8000-000000000000").unwrap();
        assert_eq!(id.date(), NaiveDate::from_ymd_opt(2025, 5, 7).unwrap());
    }
}
