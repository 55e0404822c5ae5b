use serde::{Deserialize, Serialize};

/// Unit of a parsed ISO-8601 duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Seconds => "seconds",
            DurationUnit::Minutes => "minutes",
            DurationUnit::Hours => "hours",
            DurationUnit::Days => "days",
        }
    }

    fn seconds(&self) -> i64 {
        match self {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3_600,
            DurationUnit::Days => 86_400,
        }
    }
}

/// A single-unit duration parsed from strings like "PT30M" or "P60D".
///
/// Compound inputs resolve to their coarsest nonzero component: "PT1H30M" is
/// one hour, "P1DT12H" is one day, "PT0H15M" is fifteen minutes. Years count
/// as 365 days, months as 30, weeks as 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

/// Advance window used when a service has no usable `maximumAdvance`
pub const DEFAULT_MAXIMUM_ADVANCE: IsoDuration = IsoDuration::days(60);

/// Literal substituted when a service carries no `defaultDuration`
pub const DEFAULT_SERVICE_DURATION: &str = "PT15M";

/// Result for a duration string that is present but unparsable
pub const ZERO_MINUTES: IsoDuration = IsoDuration::minutes(0);

impl IsoDuration {
    pub const fn new(value: u32, unit: DurationUnit) -> Self {
        Self { value, unit }
    }

    pub const fn minutes(value: u32) -> Self {
        Self::new(value, DurationUnit::Minutes)
    }

    pub const fn days(value: u32) -> Self {
        Self::new(value, DurationUnit::Days)
    }

    /// Parse an ISO-8601 duration, returning `None` for anything unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_uppercase();
        let body = s.strip_prefix('P')?;
        if body.is_empty() {
            return None;
        }

        let (date_part, time_part) = match body.split_once('T') {
            Some((date, time)) => {
                if time.is_empty() {
                    return None;
                }
                (date, Some(time))
            }
            None => (body, None),
        };

        let mut components = Vec::new();
        for (value, designator) in components_of(date_part)? {
            let component = match designator {
                'Y' => IsoDuration::days(value.checked_mul(365)?),
                'M' => IsoDuration::days(value.checked_mul(30)?),
                'W' => IsoDuration::days(value.checked_mul(7)?),
                'D' => IsoDuration::days(value),
                _ => return None,
            };
            components.push(component);
        }
        if let Some(time) = time_part {
            for (value, designator) in components_of(time)? {
                let component = match designator {
                    'H' => IsoDuration::new(value, DurationUnit::Hours),
                    'M' => IsoDuration::minutes(value),
                    'S' => IsoDuration::new(value, DurationUnit::Seconds),
                    _ => return None,
                };
                components.push(component);
            }
        }

        // Designators are ordered coarse to fine, so the first nonzero one wins.
        let first = components.first().copied();
        components.into_iter().find(|c| !c.is_zero()).or(first)
    }

    /// Parse an optional duration string, falling back to `default` when it is
    /// missing or unparsable
    pub fn parse_or(s: Option<&str>, default: IsoDuration) -> Self {
        match s {
            Some(raw) => Self::parse(raw).unwrap_or_else(|| {
                tracing::warn!(duration = raw, fallback = %default, "Unparsable ISO duration");
                default
            }),
            None => default,
        }
    }

    pub fn as_seconds(&self) -> i64 {
        i64::from(self.value) * self.unit.seconds()
    }

    pub fn as_minutes(&self) -> i64 {
        self.as_seconds() / 60
    }

    /// Whole days covered by this duration, rounding down
    pub fn whole_days(&self) -> i64 {
        self.as_seconds() / 86_400
    }

    /// As a chrono duration, saturating at `TimeDelta::MAX` for huge values
    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.as_seconds()).unwrap_or(chrono::Duration::MAX)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }
}

impl std::fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = self.unit.as_str();
        if self.value == 1 {
            write!(f, "1 {}", &unit[..unit.len() - 1])
        } else {
            write!(f, "{} {}", self.value, unit)
        }
    }
}

/// Split "1H30M" into [(1, 'H'), (30, 'M')]
fn components_of(part: &str) -> Option<Vec<(u32, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_ascii_alphabetic() {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        } else {
            return None;
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(IsoDuration::parse("PT30M"), Some(IsoDuration::minutes(30)));
        assert_eq!(IsoDuration::parse("P1D"), Some(IsoDuration::days(1)));
        assert_eq!(
            IsoDuration::parse("PT1H"),
            Some(IsoDuration::new(1, DurationUnit::Hours))
        );
        assert_eq!(
            IsoDuration::parse("PT45S"),
            Some(IsoDuration::new(45, DurationUnit::Seconds))
        );
        assert_eq!(IsoDuration::parse(" pt15m "), Some(IsoDuration::minutes(15)));
    }

    #[test]
    fn test_parse_calendar_approximations() {
        assert_eq!(IsoDuration::parse("P2M"), Some(IsoDuration::days(60)));
        assert_eq!(IsoDuration::parse("P1Y"), Some(IsoDuration::days(365)));
        assert_eq!(IsoDuration::parse("P2W"), Some(IsoDuration::days(14)));
    }

    #[test]
    fn test_compound_takes_coarsest_component() {
        assert_eq!(
            IsoDuration::parse("PT1H30M"),
            Some(IsoDuration::new(1, DurationUnit::Hours))
        );
        assert_eq!(IsoDuration::parse("P1DT12H"), Some(IsoDuration::days(1)));
    }

    #[test]
    fn test_zero_leading_components_are_skipped() {
        assert_eq!(IsoDuration::parse("PT0H15M"), Some(IsoDuration::minutes(15)));
        assert_eq!(IsoDuration::parse("P0DT2H"), Some(IsoDuration::new(2, DurationUnit::Hours)));
        assert_eq!(IsoDuration::parse("PT0H0M"), Some(IsoDuration::new(0, DurationUnit::Hours)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "P", "PT", "30M", "P1X", "PT1.5H", "-P1D", "PTM", "P1DT"] {
            assert_eq!(IsoDuration::parse(raw), None, "{raw:?} should not parse");
        }
    }

    #[test]
    fn test_parse_or_defaults() {
        assert_eq!(
            IsoDuration::parse_or(None, DEFAULT_MAXIMUM_ADVANCE),
            IsoDuration::days(60)
        );
        assert_eq!(
            IsoDuration::parse_or(Some("soon"), DEFAULT_MAXIMUM_ADVANCE),
            IsoDuration::days(60)
        );
        assert_eq!(IsoDuration::parse_or(Some("bogus"), ZERO_MINUTES), ZERO_MINUTES);
        assert_eq!(
            IsoDuration::parse_or(Some("P7D"), DEFAULT_MAXIMUM_ADVANCE),
            IsoDuration::days(7)
        );
    }

    #[test]
    fn test_conversions() {
        let two_hours = IsoDuration::new(2, DurationUnit::Hours);
        assert_eq!(two_hours.as_minutes(), 120);
        assert_eq!(two_hours.as_chrono(), chrono::Duration::hours(2));
        assert_eq!(IsoDuration::new(48, DurationUnit::Hours).whole_days(), 2);
        assert_eq!(IsoDuration::new(90, DurationUnit::Seconds).as_minutes(), 1);
        assert_eq!(IsoDuration::days(u32::MAX).as_chrono(), chrono::Duration::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(IsoDuration::minutes(30).to_string(), "30 minutes");
        assert_eq!(IsoDuration::new(1, DurationUnit::Hours).to_string(), "1 hour");
        assert_eq!(IsoDuration::days(1).to_string(), "1 day");
    }
}
