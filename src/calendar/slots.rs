use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

use crate::models::{
    hours_for_day, AvailabilityRecord, BookableSlot, BusinessHours, IsoDuration, Service,
    ZERO_MINUTES,
};

/// Lowercase weekday name used as the business-hours key
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Parse "YYYY-MM-DD" from its components, independent of any zone
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

/// Whether any business-hours range is defined for the weekday of `date`
pub fn is_open_on(business_hours: &[BusinessHours], date: NaiveDate) -> bool {
    hours_for_day(business_hours, weekday_name(date)).is_some()
}

/// Enumerate the bookable slots for one day.
///
/// Slots start at each range's opening time and step by `slot_minutes` while
/// the start is before the range end. A slot that would run past the range end
/// is still listed, with no staff. Ranges are emitted in the order the business
/// hours list them. `now` is the wall-clock time the lead time is measured from.
pub fn bookable_slots(
    availability: &[AvailabilityRecord],
    slot_minutes: i64,
    date: &str,
    business_hours: &[BusinessHours],
    minimum_lead_time: Option<&str>,
    now: NaiveDateTime,
) -> Vec<BookableSlot> {
    let day = match parse_date(date) {
        Some(day) => day,
        None => {
            tracing::warn!(date, "Ignoring malformed slot date");
            return Vec::new();
        }
    };
    if slot_minutes <= 0 {
        return Vec::new();
    }
    let ranges = match hours_for_day(business_hours, weekday_name(day)) {
        Some(ranges) => ranges,
        None => return Vec::new(),
    };

    let lead = IsoDuration::parse_or(minimum_lead_time, ZERO_MINUTES);
    // A lead time past the end of the calendar makes every slot unbookable.
    let earliest_start = now
        .checked_add_signed(lead.as_chrono())
        .unwrap_or(NaiveDateTime::MAX);
    let step = chrono::Duration::try_minutes(slot_minutes).unwrap_or(chrono::Duration::MAX);

    let mut slots = Vec::new();
    for range in ranges {
        let (open, close) = match range.bounds() {
            Some(bounds) => bounds,
            None => {
                tracing::warn!(?range, "Skipping malformed business-hours range");
                continue;
            }
        };
        let range_end = day.and_time(close);
        let mut start = day.and_time(open);

        while start < range_end {
            let end = match start.checked_add_signed(step) {
                Some(end) => end,
                None => {
                    slots.push(BookableSlot::new(start, false, Vec::new()));
                    break;
                }
            };
            let staff_ids = if end <= range_end {
                eligible_staff(availability, start, end)
            } else {
                Vec::new()
            };
            let available = !staff_ids.is_empty() && start >= earliest_start;
            slots.push(BookableSlot::new(start, available, staff_ids));
            start = end;
        }
    }
    slots
}

/// Staff with an open item covering `[start, end)`, in first-seen order
fn eligible_staff(
    availability: &[AvailabilityRecord],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<String> {
    let mut staff_ids: Vec<String> = Vec::new();
    for record in availability {
        if staff_ids.contains(&record.staff_id) {
            continue;
        }
        if record
            .availability_items
            .iter()
            .any(|item| item.covers(start, end))
        {
            staff_ids.push(record.staff_id.clone());
        }
    }
    staff_ids
}

/// Slots for `service` on `date`, using its duration and minimum lead time
pub fn compute_slots_for_day(
    date: NaiveDate,
    service: &Service,
    availability: &[AvailabilityRecord],
    business_hours: &[BusinessHours],
    now: NaiveDateTime,
) -> Vec<BookableSlot> {
    bookable_slots(
        availability,
        service.duration_minutes(),
        &date.format("%Y-%m-%d").to_string(),
        business_hours,
        service.minimum_lead_time(),
        now,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        AvailabilityItem, AvailabilityStatus, TimeSlotRange, ZonedDateTime,
    };

    // 2025-06-16 is a Monday.
    pub(crate) const MONDAY: &str = "2025-06-16";

    pub(crate) fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date}T{time}"), "%Y-%m-%dT%H:%M").unwrap()
    }

    pub(crate) fn item(status: AvailabilityStatus, start: NaiveDateTime, end: NaiveDateTime) -> AvailabilityItem {
        AvailabilityItem {
            status,
            start_date_time: ZonedDateTime::new(start, "Eastern Standard Time"),
            end_date_time: ZonedDateTime::new(end, "Eastern Standard Time"),
            service_id: None,
        }
    }

    pub(crate) fn staff(id: &str, windows: &[(NaiveDateTime, NaiveDateTime)]) -> AvailabilityRecord {
        AvailabilityRecord {
            staff_id: id.to_string(),
            availability_items: windows
                .iter()
                .map(|(s, e)| item(AvailabilityStatus::Available, *s, *e))
                .collect(),
        }
    }

    pub(crate) fn weekday_hours(open: &str, close: &str) -> Vec<BusinessHours> {
        ["monday", "tuesday", "wednesday", "thursday", "friday"]
            .iter()
            .map(|day| BusinessHours::new(*day, vec![TimeSlotRange::new(open, close)]))
            .collect()
    }

    fn sunday_before() -> NaiveDateTime {
        at("2025-06-15", "08:00")
    }

    fn labels(slots: &[BookableSlot]) -> Vec<&str> {
        slots.iter().map(|s| s.time.as_str()).collect()
    }

    #[test]
    fn test_morning_staff_in_full_day() {
        let hours = weekday_hours("09:00:00.0000000", "17:00:00.0000000");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "12:00"))])];

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, None, sunday_before());

        assert_eq!(slots.len(), 16);
        let open: Vec<_> = slots.iter().filter(|s| s.available).collect();
        assert_eq!(open.len(), 6);
        assert_eq!(open.first().unwrap().time, "9:00 AM");
        assert_eq!(open.last().unwrap().time, "11:30 AM");
        assert!(open.iter().all(|s| s.staff_ids == vec!["alice".to_string()]));
        assert!(slots[6..].iter().all(|s| !s.available && s.staff_ids.is_empty()));
        assert_eq!(slots[15].time, "4:30 PM");
    }

    #[test]
    fn test_lead_time_blocks_but_keeps_staff() {
        let hours = weekday_hours("09:00:00", "17:00:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "12:00"))])];
        let now = at(MONDAY, "09:30");

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, Some("PT2H"), now);

        let open: Vec<_> = slots.iter().filter(|s| s.available).map(|s| s.time.as_str()).collect();
        assert_eq!(open, vec!["11:30 AM"]);
        for slot in &slots[..5] {
            assert!(!slot.available, "{} should be inside the lead time", slot.time);
            assert_eq!(slot.staff_ids, vec!["alice".to_string()]);
        }
    }

    #[test]
    fn test_no_availability_lists_every_slot_closed() {
        let hours = weekday_hours("09:00", "12:00");
        let slots = bookable_slots(&[], 30, MONDAY, &hours, None, sunday_before());

        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|s| !s.available && s.staff_ids.is_empty()));
    }

    #[test]
    fn test_closed_weekday_and_bad_input_return_empty() {
        let hours = weekday_hours("09:00", "17:00");
        let availability = vec![staff("alice", &[(at("2025-06-14", "09:00"), at("2025-06-14", "17:00"))])];

        // Saturday has no entry.
        assert!(bookable_slots(&availability, 30, "2025-06-14", &hours, None, sunday_before()).is_empty());
        assert!(bookable_slots(&availability, 30, "06/16/2025", &hours, None, sunday_before()).is_empty());
        assert!(bookable_slots(&availability, 0, MONDAY, &hours, None, sunday_before()).is_empty());

        let mut with_empty_monday = hours.clone();
        with_empty_monday[0].time_slots.clear();
        assert!(bookable_slots(&availability, 30, MONDAY, &with_empty_monday, None, sunday_before()).is_empty());
    }

    #[test]
    fn test_slot_running_past_close_is_unavailable() {
        // 09:15 start with 30 minute steps puts a slot at 16:45.
        let hours = weekday_hours("09:15", "17:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "18:00"))])];

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, None, sunday_before());

        let last = slots.last().unwrap();
        assert_eq!(last.time, "4:45 PM");
        assert!(!last.available);
        assert!(last.staff_ids.is_empty());

        let before_last = &slots[slots.len() - 2];
        assert_eq!(before_last.time, "4:15 PM");
        assert!(before_last.available);
    }

    #[test]
    fn test_partial_staff_coverage_is_not_eligible() {
        let hours = weekday_hours("09:00", "11:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:15"), at(MONDAY, "10:15"))])];

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, None, sunday_before());

        let open: Vec<_> = slots.iter().filter(|s| s.available).map(|s| s.time.as_str()).collect();
        // 09:00 starts before the window, 10:00 ends after it.
        assert_eq!(open, vec!["9:30 AM"]);
    }

    #[test]
    fn test_busy_items_are_ignored_and_staff_deduplicated() {
        let hours = weekday_hours("09:00", "10:00");
        let mut bob = staff("bob", &[]);
        bob.availability_items
            .push(item(AvailabilityStatus::Busy, at(MONDAY, "09:00"), at(MONDAY, "10:00")));
        let availability = vec![
            staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "09:30"))]),
            bob,
            staff("carol", &[(at(MONDAY, "08:00"), at(MONDAY, "12:00"))]),
            staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "10:00"))]),
        ];

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, None, sunday_before());

        assert_eq!(slots[0].staff_ids, vec!["alice".to_string(), "carol".to_string()]);
        assert_eq!(slots[1].staff_ids, vec!["carol".to_string(), "alice".to_string()]);
    }

    #[test]
    fn test_ranges_are_emitted_in_listed_order() {
        let hours = vec![BusinessHours::new(
            "monday",
            vec![
                TimeSlotRange::new("14:00", "15:00"),
                TimeSlotRange::new("09:00", "10:00"),
            ],
        )];

        let slots = bookable_slots(&[], 30, MONDAY, &hours, None, sunday_before());
        assert_eq!(labels(&slots), vec!["2:00 PM", "2:30 PM", "9:00 AM", "9:30 AM"]);
    }

    #[test]
    fn test_unparsable_lead_time_is_ignored() {
        let hours = weekday_hours("09:00", "10:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "10:00"))])];

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, Some("a while"), sunday_before());
        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn test_output_is_stable_for_fixed_now() {
        let hours = weekday_hours("09:00", "17:00");
        let availability = vec![
            staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "12:00"))]),
            staff("bob", &[(at(MONDAY, "13:00"), at(MONDAY, "17:00"))]),
        ];
        let now = at(MONDAY, "10:10");

        let first = bookable_slots(&availability, 30, MONDAY, &hours, Some("PT15M"), now);
        let second = bookable_slots(&availability, 30, MONDAY, &hours, Some("PT15M"), now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_compute_slots_for_day_uses_service_settings() {
        let service: Service = serde_json::from_value(serde_json::json!({
            "id": "svc-1",
            "displayName": "Repair",
            "defaultDuration": "PT1H",
            "staffMemberIds": ["alice"],
            "schedulingPolicy": {"minimumLeadTime": "PT1H", "maximumAdvance": "P30D"}
        }))
        .unwrap();
        let hours = weekday_hours("09:00", "12:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "12:00"))])];
        let day = parse_date(MONDAY).unwrap();

        let slots = compute_slots_for_day(day, &service, &availability, &hours, at(MONDAY, "08:30"));

        assert_eq!(labels(&slots), vec!["9:00 AM", "10:00 AM", "11:00 AM"]);
        assert_eq!(
            slots.iter().map(|s| s.available).collect::<Vec<_>>(),
            vec![false, true, true]
        );
    }

    #[test]
    fn test_huge_lead_time_blocks_every_slot() {
        let hours = weekday_hours("09:00", "10:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "10:00"))])];

        let slots = bookable_slots(&availability, 30, MONDAY, &hours, Some("P300000Y"), sunday_before());

        assert_eq!(labels(&slots), vec!["9:00 AM", "9:30 AM"]);
        assert!(slots.iter().all(|s| !s.available));
        assert!(slots.iter().all(|s| s.staff_ids == vec!["alice".to_string()]));
    }

    #[test]
    fn test_huge_service_duration_lists_one_unstaffed_slot() {
        let service: Service = serde_json::from_value(serde_json::json!({
            "id": "svc-1",
            "displayName": "Sabbatical",
            "defaultDuration": "P300000Y"
        }))
        .unwrap();
        let hours = weekday_hours("09:00", "12:00");
        let availability = vec![staff("alice", &[(at(MONDAY, "09:00"), at(MONDAY, "12:00"))])];
        let day = parse_date(MONDAY).unwrap();

        let slots = compute_slots_for_day(day, &service, &availability, &hours, sunday_before());

        assert_eq!(labels(&slots), vec!["9:00 AM"]);
        assert!(!slots[0].available);
        assert!(slots[0].staff_ids.is_empty());
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(parse_date(MONDAY).unwrap()), "monday");
        assert_eq!(weekday_name(parse_date("2025-06-15").unwrap()), "sunday");
        assert!(is_open_on(&weekday_hours("09:00", "17:00"), parse_date(MONDAY).unwrap()));
    }
}
