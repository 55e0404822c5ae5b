//! Mapping between IANA zone identifiers and the Windows-style zone names the
//! booking provider uses, plus the clock that scheduling decisions are made on.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// IANA identifier to provider zone name
pub const IANA_TO_WINDOWS_ZONE: &[(&str, &str)] = &[
    // US & Canada
    ("America/New_York", "Eastern Standard Time"),
    ("America/Detroit", "Eastern Standard Time"),
    ("America/Kentucky/Louisville", "Eastern Standard Time"),
    ("America/Kentucky/Monticello", "Eastern Standard Time"),
    ("America/Indiana/Indianapolis", "US Eastern Standard Time"),
    ("America/Indiana/Vincennes", "US Eastern Standard Time"),
    ("America/Indiana/Winamac", "US Eastern Standard Time"),
    ("America/Indiana/Marengo", "US Eastern Standard Time"),
    ("America/Indiana/Petersburg", "Eastern Standard Time"),
    ("America/Indiana/Vevay", "US Eastern Standard Time"),
    ("America/Chicago", "Central Standard Time"),
    ("America/Indiana/Tell_City", "Central Standard Time"),
    ("America/Indiana/Knox", "Central Standard Time"),
    ("America/Menominee", "Central Standard Time"),
    ("America/North_Dakota/Center", "Central Standard Time"),
    ("America/North_Dakota/New_Salem", "Central Standard Time"),
    ("America/North_Dakota/Beulah", "Central Standard Time"),
    ("America/Denver", "Mountain Standard Time"),
    ("America/Boise", "Mountain Standard Time"),
    ("America/Phoenix", "US Mountain Standard Time"),
    ("America/Los_Angeles", "Pacific Standard Time"),
    ("America/Anchorage", "Alaskan Standard Time"),
    ("America/Adak", "Hawaiian Standard Time"),
    ("Pacific/Honolulu", "Hawaiian Standard Time"),
    // Europe
    ("Europe/London", "GMT Standard Time"),
    ("Europe/Dublin", "GMT Standard Time"),
    ("Europe/Lisbon", "GMT Standard Time"),
    ("Europe/Berlin", "W. Europe Standard Time"),
    ("Europe/Amsterdam", "W. Europe Standard Time"),
    ("Europe/Brussels", "Romance Standard Time"),
    ("Europe/Paris", "Romance Standard Time"),
    ("Europe/Madrid", "Romance Standard Time"),
    ("Europe/Rome", "W. Europe Standard Time"),
    ("Europe/Vienna", "W. Europe Standard Time"),
    ("Europe/Warsaw", "Central European Standard Time"),
    ("Europe/Prague", "Central Europe Standard Time"),
    ("Europe/Budapest", "Central Europe Standard Time"),
    ("Europe/Bucharest", "GTB Standard Time"),
    ("Europe/Athens", "GTB Standard Time"),
    ("Europe/Istanbul", "Turkey Standard Time"),
    ("Europe/Moscow", "Russian Standard Time"),
    // Asia Pacific
    ("Asia/Shanghai", "China Standard Time"),
    ("Asia/Hong_Kong", "China Standard Time"),
    ("Asia/Macau", "China Standard Time"),
    ("Asia/Taipei", "Taipei Standard Time"),
    ("Asia/Tokyo", "Tokyo Standard Time"),
    ("Asia/Seoul", "Korea Standard Time"),
    ("Asia/Singapore", "Singapore Standard Time"),
    ("Asia/Kuala_Lumpur", "Singapore Standard Time"),
    ("Asia/Jakarta", "SE Asia Standard Time"),
    ("Asia/Bangkok", "SE Asia Standard Time"),
    ("Asia/Ho_Chi_Minh", "SE Asia Standard Time"),
    ("Asia/Manila", "Singapore Standard Time"),
    ("Asia/Kolkata", "India Standard Time"),
    ("Asia/Dubai", "Arabian Standard Time"),
    ("Asia/Riyadh", "Arab Standard Time"),
    // Australia & New Zealand
    ("Australia/Sydney", "AUS Eastern Standard Time"),
    ("Australia/Melbourne", "AUS Eastern Standard Time"),
    ("Australia/Brisbane", "E. Australia Standard Time"),
    ("Australia/Adelaide", "Cen. Australia Standard Time"),
    ("Australia/Darwin", "AUS Central Standard Time"),
    ("Australia/Perth", "W. Australia Standard Time"),
    ("Pacific/Auckland", "New Zealand Standard Time"),
    // South America
    ("America/Sao_Paulo", "E. South America Standard Time"),
    ("America/Argentina/Buenos_Aires", "Argentina Standard Time"),
    ("America/Santiago", "Pacific SA Standard Time"),
    ("America/Bogota", "SA Pacific Standard Time"),
    ("America/Lima", "SA Pacific Standard Time"),
    // Africa
    ("Africa/Cairo", "Egypt Standard Time"),
    ("Africa/Johannesburg", "South Africa Standard Time"),
    ("Africa/Lagos", "W. Central Africa Standard Time"),
    ("Africa/Nairobi", "E. Africa Standard Time"),
];

/// Offset in minutes east of UTC to provider zone name, for zones the table
/// above does not list. Several entries cover daylight-saving offsets.
pub const UTC_OFFSET_TO_WINDOWS_ZONE: &[(i32, &str)] = &[
    (-720, "Hawaiian Standard Time"),
    (-660, "Alaskan Standard Time"),
    (-600, "Pacific Standard Time"),
    (-540, "Pacific Standard Time"),
    (-480, "Mountain Standard Time"),
    (-420, "Mountain Standard Time"),
    (-360, "Central Standard Time"),
    (-300, "Central Standard Time"),
    (-240, "Eastern Standard Time"),
    (-180, "SA Eastern Standard Time"),
    (-120, "Mid-Atlantic Standard Time"),
    (-60, "Azores Standard Time"),
    (0, "GMT Standard Time"),
    (60, "W. Europe Standard Time"),
    (120, "W. Europe Standard Time"),
    (180, "Russian Standard Time"),
    (240, "Arabian Standard Time"),
    (300, "West Asia Standard Time"),
    (330, "India Standard Time"),
    (360, "Central Asia Standard Time"),
    (420, "SE Asia Standard Time"),
    (480, "China Standard Time"),
    (540, "Tokyo Standard Time"),
    (600, "AUS Eastern Standard Time"),
    (660, "Central Pacific Standard Time"),
    (720, "New Zealand Standard Time"),
];

/// The customer's runtime zone as far as we can observe it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerZone {
    pub iana: Option<String>,
    pub utc_offset_minutes: i32,
}

impl CustomerZone {
    pub fn new(iana: Option<&str>, utc_offset_minutes: i32) -> Self {
        Self {
            iana: iana.map(str::to_string),
            utc_offset_minutes,
        }
    }

    /// Read the host zone and its current offset
    pub fn detect() -> Self {
        let iana = match iana_time_zone::get_timezone() {
            Ok(tz) => Some(tz),
            Err(e) => {
                tracing::warn!("Failed to determine local time zone: {}", e);
                None
            }
        };
        let utc_offset_minutes = Local::now().offset().fix().local_minus_utc() / 60;
        Self {
            iana,
            utc_offset_minutes,
        }
    }
}

/// Provider-style zone name for a customer: IANA table, then offset table,
/// then "UTC"
pub fn customer_time_zone(zone: &CustomerZone) -> String {
    let by_name = zone.iana.as_deref().and_then(|iana| {
        IANA_TO_WINDOWS_ZONE
            .iter()
            .find(|(name, _)| *name == iana)
            .map(|(_, windows)| *windows)
    });
    let by_offset = || {
        UTC_OFFSET_TO_WINDOWS_ZONE
            .iter()
            .find(|(offset, _)| *offset == zone.utc_offset_minutes)
            .map(|(_, windows)| *windows)
    };
    by_name.or_else(by_offset).unwrap_or("UTC").to_string()
}

/// Provider-style zone name of the host running this process
pub fn get_customer_time_zone() -> String {
    customer_time_zone(&CustomerZone::detect())
}

/// Convert a provider zone name to an IANA identifier. Valid IANA identifiers
/// pass through; unknown names fall back to "UTC".
pub fn to_iana_time_zone(zone_name: &str) -> String {
    if let Ok(tz) = zone_name.parse::<Tz>() {
        return tz.name().to_string();
    }
    let lookup = zone_name.replace("Daylight Time", "Standard Time");
    if let Some((iana, _)) = IANA_TO_WINDOWS_ZONE
        .iter()
        .find(|(_, windows)| *windows == lookup)
    {
        return iana.to_string();
    }
    if zone_name == "Coordinated Universal Time" {
        return "UTC".to_string();
    }
    tracing::warn!(zone = zone_name, "Unknown time zone, falling back to UTC");
    "UTC".to_string()
}

/// Parsed form of [`to_iana_time_zone`]
pub fn resolve_tz(zone_name: &str) -> Tz {
    to_iana_time_zone(zone_name).parse().unwrap_or(Tz::UTC)
}

/// Whether to tell the customer times are shown in the business zone.
///
/// Plain string comparison of provider zone names: two IANA zones that share a
/// name, or the same offset under different names, are not reconciled.
pub fn should_show_timezone_note(business_zone: &str, customer: &CustomerZone) -> bool {
    customer_time_zone(customer) != business_zone
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneNote {
    pub should_show: bool,
    pub display_name: String,
}

impl std::fmt::Display for TimezoneNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.should_show {
            write!(f, "Times shown in {}", self.display_name)
        } else {
            write!(f, "Times shown in your local time zone ({})", self.display_name)
        }
    }
}

pub fn resolve_customer_timezone_note(business_zone: &str, customer: &CustomerZone) -> TimezoneNote {
    TimezoneNote {
        should_show: should_show_timezone_note(business_zone, customer),
        display_name: business_zone.to_string(),
    }
}

/// The wall clock scheduling decisions are made against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingClock {
    /// Host-local time
    Local,
    /// Current time in a named zone
    Zone(Tz),
    /// A frozen instant, expressed as wall-clock time in `zone`
    Fixed { now: NaiveDateTime, zone: Tz },
}

impl SchedulingClock {
    pub fn now(&self) -> NaiveDateTime {
        match self {
            SchedulingClock::Local => Local::now().naive_local(),
            SchedulingClock::Zone(tz) => Utc::now().with_timezone(tz).naive_local(),
            SchedulingClock::Fixed { now, .. } => *now,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Instant for a wall-clock time on this clock. Times skipped by a DST
    /// transition have no instant; ambiguous ones resolve to the earlier.
    pub fn to_utc(&self, wall: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            SchedulingClock::Local => Local
                .from_local_datetime(&wall)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            SchedulingClock::Zone(tz) | SchedulingClock::Fixed { zone: tz, .. } => tz
                .from_local_datetime(&wall)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_zone_prefers_iana_table() {
        let zone = CustomerZone::new(Some("America/Chicago"), -300);
        assert_eq!(customer_time_zone(&zone), "Central Standard Time");
    }

    #[test]
    fn test_customer_zone_falls_back_to_offset_then_utc() {
        let unmapped = CustomerZone::new(Some("America/Halifax"), -180);
        assert_eq!(customer_time_zone(&unmapped), "SA Eastern Standard Time");

        let unknown = CustomerZone::new(None, 345);
        assert_eq!(customer_time_zone(&unknown), "UTC");
    }

    #[test]
    fn test_to_iana_time_zone() {
        assert_eq!(to_iana_time_zone("America/Denver"), "America/Denver");
        assert_eq!(to_iana_time_zone("Pacific Standard Time"), "America/Los_Angeles");
        assert_eq!(to_iana_time_zone("Eastern Daylight Time"), "America/New_York");
        assert_eq!(to_iana_time_zone("Coordinated Universal Time"), "UTC");
        assert_eq!(to_iana_time_zone("Atlantis Standard Time"), "UTC");
        assert_eq!(resolve_tz("Tokyo Standard Time"), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_timezone_note() {
        let eastern = CustomerZone::new(Some("America/New_York"), -240);
        assert!(!should_show_timezone_note("Eastern Standard Time", &eastern));
        assert!(should_show_timezone_note("Pacific Standard Time", &eastern));

        let toronto_by_offset = CustomerZone::new(Some("America/Toronto"), -240);
        assert!(!should_show_timezone_note("Eastern Standard Time", &toronto_by_offset));

        // Same offset, different label: string comparison still reports a mismatch.
        let indiana = CustomerZone::new(Some("America/Indiana/Indianapolis"), -240);
        assert!(should_show_timezone_note("Eastern Standard Time", &indiana));

        let note = resolve_customer_timezone_note("Pacific Standard Time", &eastern);
        assert!(note.should_show);
        assert_eq!(note.to_string(), "Times shown in Pacific Standard Time");
    }

    #[test]
    fn test_fixed_clock_converts_in_its_zone() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 16)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let clock = SchedulingClock::Fixed {
            now,
            zone: chrono_tz::America::New_York,
        };
        assert_eq!(clock.now(), now);
        assert_eq!(clock.today(), now.date());

        let utc = clock.to_utc(now).unwrap();
        assert_eq!(utc.naive_utc(), now + chrono::Duration::hours(4));
    }
}
