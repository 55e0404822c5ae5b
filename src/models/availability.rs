use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Status of an availability window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AvailabilityStatus {
    Available,
    Busy,
    SlotsAvailable,
    OutOfOffice,
    #[serde(other)]
    Unknown,
}

/// Wall-clock time plus the name of the zone it is expressed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonedDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl ZonedDateTime {
    pub fn new(date_time: NaiveDateTime, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: format_naive(date_time),
            time_zone: time_zone.into(),
        }
    }

    /// Read the wall-clock part, ignoring the zone name
    pub fn naive(&self) -> Option<NaiveDateTime> {
        parse_naive(&self.date_time)
    }
}

/// One status-tagged interval for a staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityItem {
    pub status: AvailabilityStatus,
    pub start_date_time: ZonedDateTime,
    pub end_date_time: ZonedDateTime,
    #[serde(default)]
    pub service_id: Option<String>,
}

impl AvailabilityItem {
    pub fn is_available(&self) -> bool {
        self.status == AvailabilityStatus::Available
    }

    /// `[start, end)` as naive wall-clock times, if both ends parse
    pub fn interval(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.start_date_time.naive()?, self.end_date_time.naive()?))
    }

    /// Whether this item is open and covers `[start, end)` entirely
    pub fn covers(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if !self.is_available() {
            return false;
        }
        match self.interval() {
            Some((item_start, item_end)) => item_start <= start && end <= item_end,
            None => false,
        }
    }
}

/// Availability for a single staff member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    pub staff_id: String,
    #[serde(default)]
    pub availability_items: Vec<AvailabilityItem>,
}

/// Body of a staff availability query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffAvailabilityRequest {
    pub staff_ids: Vec<String>,
    pub start_date_time: ZonedDateTime,
    pub end_date_time: ZonedDateTime,
}

impl StaffAvailabilityRequest {
    /// Query covering the seven days starting at `week_start`
    pub fn for_week(staff_ids: &[String], week_start: NaiveDate, time_zone: &str) -> Self {
        let start = week_start.and_time(chrono::NaiveTime::MIN);
        let end = start
            .checked_add_signed(chrono::Duration::days(7))
            .unwrap_or(NaiveDateTime::MAX);
        Self {
            staff_ids: staff_ids.to_vec(),
            start_date_time: ZonedDateTime::new(start, time_zone),
            end_date_time: ZonedDateTime::new(end, time_zone),
        }
    }
}

/// Format as "2025-06-14T09:00:00"
pub fn format_naive(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse "2025-06-14T09:00:00", with optional fraction and trailing "Z", or
/// without seconds
pub fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
}
