//! Time zone used to evaluate cron expressions.

use std::fmt;
use std::str::FromStr;

use chrono::FixedOffset;
use chrono_tz::Tz;

/// An IANA zone ("Asia/Kolkata") or a fixed UTC offset ("+05:30").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl ScheduleZone {
    pub fn utc() -> Self {
        ScheduleZone::Named(chrono_tz::UTC)
    }

    /// Parse an IANA name, "UTC", "Z", "+HH:MM", "-HH:MM" or "+HHMM".
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("utc") || value == "Z" {
            return Some(Self::utc());
        }
        if value.starts_with('+') || value.starts_with('-') {
            return parse_fixed_offset(value).map(ScheduleZone::Fixed);
        }
        Tz::from_str(value).ok().map(ScheduleZone::Named)
    }
}

impl Default for ScheduleZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for ScheduleZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleZone::Named(tz) => write!(f, "{}", tz),
            ScheduleZone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

fn parse_fixed_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
