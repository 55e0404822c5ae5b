use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// An open interval within one weekday, e.g. 09:00:00.0000000 - 17:00:00.0000000
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotRange {
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlotRange {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Parse both ends, returning `None` if either is malformed
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((
            parse_time_of_day(&self.start_time)?,
            parse_time_of_day(&self.end_time)?,
        ))
    }
}

/// Open hours for a single weekday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    /// Lowercase weekday name, e.g. "monday"
    pub day: String,
    #[serde(default)]
    pub time_slots: Vec<TimeSlotRange>,
}

impl BusinessHours {
    pub fn new(day: impl Into<String>, time_slots: Vec<TimeSlotRange>) -> Self {
        Self {
            day: day.into(),
            time_slots,
        }
    }
}

/// Find the ranges for a weekday name. The first matching entry wins.
pub fn hours_for_day<'a>(hours: &'a [BusinessHours], weekday: &str) -> Option<&'a [TimeSlotRange]> {
    hours
        .iter()
        .find(|h| h.day.eq_ignore_ascii_case(weekday))
        .map(|h| h.time_slots.as_slice())
        .filter(|ranges| !ranges.is_empty())
}

/// Parse "HH:MM:SS.fffffff", "HH:MM:SS" or "HH:MM"
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralAvailability {
    pub availability_type: String,
    #[serde(default)]
    pub business_hours: Vec<BusinessHours>,
}

/// Booking rules attached to a business or an individual service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingPolicy {
    #[serde(default)]
    pub time_slot_interval: Option<String>,
    #[serde(default)]
    pub minimum_lead_time: Option<String>,
    #[serde(default)]
    pub maximum_advance: Option<String>,
    #[serde(default)]
    pub allow_staff_selection: bool,
    #[serde(default)]
    pub is_meeting_invite_to_customers_enabled: bool,
    #[serde(default)]
    pub general_availability: Option<GeneralAvailability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPageSettings {
    pub business_time_zone: String,
    #[serde(default)]
    pub privacy_policy_web_url: Option<String>,
    #[serde(default)]
    pub terms_and_conditions_web_url: Option<String>,
    #[serde(default)]
    pub is_time_slot_time_zone_set_to_business_time_zone: bool,
}

/// A bookable business as returned by the directory service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub display_name: String,
    pub business_hours: Vec<BusinessHours>,
    #[serde(default)]
    pub scheduling_policy: Option<SchedulingPolicy>,
    pub booking_page_settings: BookingPageSettings,
}

impl Business {
    pub fn time_zone(&self) -> &str {
        &self.booking_page_settings.business_time_zone
    }
}
