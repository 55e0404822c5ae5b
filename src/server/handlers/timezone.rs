use axum::{extract::Query, Json};
use serde::Deserialize;

use crate::timezone::{resolve_customer_timezone_note, CustomerZone, TimezoneNote};

#[derive(Deserialize)]
pub struct TimezoneNoteQuery {
    pub business_zone: String,
    /// Caller's IANA zone; the server's own zone when absent
    pub customer_zone: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

/// Whether the caller should be told times are in the business zone
pub async fn timezone_note(Query(query): Query<TimezoneNoteQuery>) -> Json<TimezoneNote> {
    let customer = match (query.customer_zone, query.utc_offset_minutes) {
        (None, None) => CustomerZone::detect(),
        (iana, offset) => CustomerZone {
            iana,
            utc_offset_minutes: offset.unwrap_or(0),
        },
    };
    Json(resolve_customer_timezone_note(&query.business_zone, &customer))
}
