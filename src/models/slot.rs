use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A fixed-length slot on one day, tagged with availability and the staff who
/// could take it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookableSlot {
    /// 12-hour label, e.g. "9:00 AM"
    pub time: String,
    /// Wall-clock start on the slot's date
    pub start: NaiveDateTime,
    pub available: bool,
    pub staff_ids: Vec<String>,
}

impl BookableSlot {
    pub fn new(start: NaiveDateTime, available: bool, staff_ids: Vec<String>) -> Self {
        Self {
            time: format_12h(start),
            start,
            available,
            staff_ids,
        }
    }
}

/// "9:00 AM", "12:30 PM"
pub fn format_12h(dt: NaiveDateTime) -> String {
    dt.format("%-I:%M %p").to_string()
}
