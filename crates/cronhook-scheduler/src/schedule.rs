//! ScheduleClock - resolves a job's cron expression and start date into the
//! next firing instant.
//!
//! Pure computation: no state beyond the configured evaluation zone.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;

use cronhook_protocols::ScheduleZone;

use crate::error::ScheduleError;

/// Which rule produced a firing instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FireRule {
    /// A future start date overrides the cron recurrence for the first firing.
    StartDate,
    /// Next cron occurrence after "now".
    Cron,
}

/// A concrete firing instant and the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedFire {
    pub at: DateTime<Utc>,
    pub rule: FireRule,
}

/// Translates cron expressions into firing instants in one time zone.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleClock {
    zone: ScheduleZone,
}

impl ScheduleClock {
    /// Evaluate schedules in `zone`.
    pub fn new(zone: ScheduleZone) -> Self {
        Self { zone }
    }

    /// Evaluate schedules in UTC.
    pub fn utc() -> Self {
        Self::new(ScheduleZone::utc())
    }

    pub fn zone(&self) -> ScheduleZone {
        self.zone
    }

    /// Parse a 5-field standard or 6/7-field seconds-precision expression.
    ///
    /// 5-field expressions get a `0` seconds field prepended and their
    /// numeric weekdays read the standard way (0 = Sunday). 6/7-field
    /// expressions use the parser's own numbering (1 = Sunday).
    pub fn parse(&self, expression: &str) -> Result<Schedule, ScheduleError> {
        let normalized = normalize(expression)?;
        Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
    }

    /// Check an expression at create/update time.
    pub fn validate(&self, expression: &str, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        self.next_after(&self.parse(expression)?, expression, now)
            .map(|_| ())
    }

    /// Resolve the firing rule for a job.
    ///
    /// A start date strictly after `now` is the firing instant itself; the
    /// cron expression is not consulted for it. Otherwise the next cron
    /// occurrence after `now` is used. The expression is parsed either way
    /// so a malformed schedule is never silently accepted.
    pub fn resolve(
        &self,
        expression: &str,
        start_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedFire, ScheduleError> {
        let schedule = self.parse(expression)?;

        if let Some(start) = start_date.filter(|start| *start > now) {
            return Ok(ResolvedFire {
                at: start,
                rule: FireRule::StartDate,
            });
        }

        let at = self.next_after(&schedule, expression, now)?;
        Ok(ResolvedFire {
            at,
            rule: FireRule::Cron,
        })
    }

    fn next_after(
        &self,
        schedule: &Schedule,
        expression: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ScheduleError> {
        let next = match self.zone {
            ScheduleZone::Named(tz) => schedule
                .after(&now.with_timezone(&tz))
                .next()
                .map(|next| next.with_timezone(&Utc)),
            ScheduleZone::Fixed(offset) => schedule
                .after(&now.with_timezone(&offset))
                .next()
                .map(|next| next.with_timezone(&Utc)),
        };
        next.ok_or_else(|| ScheduleError::NoUpcoming(expression.to_string()))
    }
}

impl Default for ScheduleClock {
    fn default() -> Self {
        Self::utc()
    }
}

fn normalize(expression: &str) -> Result<String, ScheduleError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => {
            let day_of_week = shift_day_of_week(fields[4]);
            Ok(format!(
                "0 {} {} {} {} {}",
                fields[0], fields[1], fields[2], fields[3], day_of_week
            ))
        }
        6 | 7 => Ok(fields.join(" ")),
        count => Err(ScheduleError::FieldCount {
            expression: expression.to_string(),
            count,
        }),
    }
}

/// Map standard cron weekdays (0-7, Sunday = 0 or 7) onto the parser's
/// 1-7 numbering (Sunday = 1). Names and wildcards pass through.
fn shift_day_of_week(field: &str) -> String {
    let shift = |n: u32| if n == 7 { 1 } else { n + 1 };

    field
        .split(',')
        .map(|part| {
            let (base, step) = match part.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (part, None),
            };
            let shifted = match base.split_once('-') {
                Some((start, end)) => match (start.parse::<u32>(), end.parse::<u32>()) {
                    (Ok(start), Ok(7)) if start <= 6 && step.is_none() => {
                        format!("{}-7,1", start + 1)
                    }
                    (Ok(start), Ok(end)) if start <= 7 && end <= 7 => {
                        format!("{}-{}", shift(start), shift(end))
                    }
                    _ => base.to_string(),
                },
                None => match base.parse::<u32>() {
                    Ok(n) if n <= 7 => shift(n).to_string(),
                    _ => base.to_string(),
                },
            };
            match step {
                Some(step) => format!("{}/{}", shifted, step),
                None => shifted,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
