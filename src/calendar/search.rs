use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use super::slots::{compute_slots_for_day, is_open_on};
use crate::error::BookingError;
use crate::models::{AvailabilityRecord, BusinessHours, IsoDuration, Service, DEFAULT_MAXIMUM_ADVANCE};

pub const DAYS_PER_WEEK: i64 = 7;

/// Days past today a customer may book this service
pub fn advance_window_days(service: &Service) -> i64 {
    IsoDuration::parse_or(service.maximum_advance(), DEFAULT_MAXIMUM_ADVANCE).whole_days()
}

/// Last bookable date, inclusive. A window too large for the calendar has no limit.
pub fn maximum_advance_date(service: &Service, today: NaiveDate) -> NaiveDate {
    Duration::try_days(advance_window_days(service))
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX)
}

/// Everything the per-day scan needs besides availability
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub business_hours: &'a [BusinessHours],
    pub service: &'a Service,
    /// Wall-clock "now" on the scheduling clock
    pub now: NaiveDateTime,
}

impl SearchContext<'_> {
    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}

/// Loads availability for the 7 days starting at `week_start`
#[async_trait]
pub trait WeekSource {
    async fn fetch_week(&self, week_start: NaiveDate) -> Result<Vec<AvailabilityRecord>, BookingError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub date: NaiveDate,
    pub week_start: NaiveDate,
    /// Availability fetched for `week_start`; `None` when the loaded week matched
    pub fetched: Option<Vec<AvailabilityRecord>>,
}

/// First day of the week with at least one available slot, without any I/O
pub fn find_available_date_in_week(
    week_start: NaiveDate,
    availability: &[AvailabilityRecord],
    ctx: &SearchContext<'_>,
) -> Option<NaiveDate> {
    let today = ctx.today();
    let last_day = maximum_advance_date(ctx.service, today);

    (0..DAYS_PER_WEEK)
        .filter_map(|offset| week_start.checked_add_signed(Duration::days(offset)))
        .filter(|day| *day >= today && *day <= last_day)
        .filter(|day| is_open_on(ctx.business_hours, *day))
        .find(|day| {
            compute_slots_for_day(*day, ctx.service, availability, ctx.business_hours, ctx.now)
                .iter()
                .any(|slot| slot.available)
        })
}

/// Find the nearest bookable date starting from the loaded week.
///
/// The loaded week is scanned with the availability already in hand. After
/// that, weeks are fetched one at a time until a day qualifies or the advance
/// window is used up. A failed fetch aborts the search.
pub async fn find_nearest_available_date<S>(
    ctx: &SearchContext<'_>,
    week_start: NaiveDate,
    availability: &[AvailabilityRecord],
    source: &S,
) -> Result<SearchOutcome, BookingError>
where
    S: WeekSource + Sync + ?Sized,
{
    if let Some(date) = find_available_date_in_week(week_start, availability, ctx) {
        debug!(%date, "Found available date in loaded week");
        return Ok(SearchOutcome {
            date,
            week_start,
            fetched: None,
        });
    }

    let window = advance_window_days(ctx.service);
    let mut current = week_start;
    let mut days_checked = 0;

    while days_checked < window {
        current = match current.checked_add_signed(Duration::days(DAYS_PER_WEEK)) {
            Some(next) => next,
            None => break,
        };
        days_checked += DAYS_PER_WEEK;

        let records = source.fetch_week(current).await?;
        if let Some(date) = find_available_date_in_week(current, &records, ctx) {
            info!(%date, week_start = %current, "Found nearest available date");
            return Ok(SearchOutcome {
                date,
                week_start: current,
                fetched: Some(records),
            });
        }
    }

    info!(window_days = window, "No availability inside booking window");
    Err(BookingError::NoAvailability)
}
