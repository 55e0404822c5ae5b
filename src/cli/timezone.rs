use anyhow::Result;
use serde::Serialize;

use super::OutputFormat;
use crate::timezone::{customer_time_zone, resolve_customer_timezone_note, to_iana_time_zone, CustomerZone};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneResponse {
    pub local_zone: Option<String>,
    pub utc_offset_minutes: i32,
    pub customer_time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_iana: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_note: Option<bool>,
}

impl std::fmt::Display for TimezoneResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Local zone: {} (UTC{:+03}:{:02})",
            self.local_zone.as_deref().unwrap_or("unknown"),
            self.utc_offset_minutes / 60,
            (self.utc_offset_minutes % 60).abs()
        )?;
        write!(f, "Booking zone name: {}", self.customer_time_zone)?;
        if let (Some(zone), Some(iana), Some(show)) =
            (&self.business_zone, &self.business_iana, self.show_note)
        {
            writeln!(f)?;
            writeln!(f, "Business zone: {} ({})", zone, iana)?;
            if show {
                write!(f, "Times are shown in {}", zone)?;
            } else {
                write!(f, "Business and customer share a time zone")?;
            }
        }
        Ok(())
    }
}

pub fn timezone_report(zone: &CustomerZone, business_zone: Option<&str>) -> TimezoneResponse {
    let note = business_zone.map(|bz| resolve_customer_timezone_note(bz, zone));
    TimezoneResponse {
        local_zone: zone.iana.clone(),
        utc_offset_minutes: zone.utc_offset_minutes,
        customer_time_zone: customer_time_zone(zone),
        business_zone: business_zone.map(str::to_string),
        business_iana: business_zone.map(to_iana_time_zone),
        show_note: note.map(|n| n.should_show),
    }
}

/// Show the detected customer zone, and compare it against a business zone
pub fn run_tz(business_zone: Option<&str>, format: OutputFormat) -> Result<()> {
    format.print(&timezone_report(&CustomerZone::detect(), business_zone))
}
