use chrono::{
    DateTime, Datelike, Days, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, Utc,
};

use crate::error::InvalidInput;

/// Source of "now". Only the outermost call site reads the wall clock.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock, optionally pinned to a fixed UTC offset instead of the host zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub offset: Option<FixedOffset>,
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    Today,
    Urgent,
    Soon,
    Normal,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Overdue => "overdue",
            Urgency::Today => "today",
            Urgency::Urgent => "urgent",
            Urgency::Soon => "soon",
            Urgency::Normal => "normal",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn utc() -> FixedOffset {
    Utc.fix()
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 date or timestamp into wall time at `offset`.
///
/// Timestamps carrying an offset are converted; naive timestamps and bare
/// dates are taken as already local (bare dates at midnight).
pub fn parse_date(input: &str, offset: &FixedOffset) -> Result<NaiveDateTime, InvalidInput> {
    let value = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(offset).naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(parsed.with_timezone(offset).naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(InvalidInput::Date(input.to_string()))
}

/// Calendar-day distance from `today` to `due`. Time of day is ignored, so a
/// due date just past midnight tomorrow is one day away even if it is only
/// minutes from now.
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

pub fn urgency_for_days(days_until_due: i64) -> Urgency {
    match days_until_due {
        i64::MIN..=-1 => Urgency::Overdue,
        0 => Urgency::Today,
        1..=3 => Urgency::Urgent,
        4..=7 => Urgency::Soon,
        _ => Urgency::Normal,
    }
}

pub fn due_date_urgency(due_date: &str, now: DateTime<FixedOffset>) -> Result<Urgency, InvalidInput> {
    let due = parse_date(due_date, now.offset())?;
    Ok(urgency_for_days(days_until(due.date(), now.date_naive())))
}

/// First day (Sunday) of the calendar week containing `date`, or `None` when
/// that Sunday falls before the earliest representable date.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
}

pub fn label_for(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        return "Today".to_string();
    }
    if today.succ_opt() == Some(date) {
        return "Tomorrow".to_string();
    }
    if week_start(date).is_some() && week_start(date) == week_start(today) {
        return date.format("%A").to_string();
    }
    date.format("%b %d").to_string()
}

pub fn date_label(date: &str, now: DateTime<FixedOffset>) -> Result<String, InvalidInput> {
    let parsed = parse_date(date, now.offset())?;
    Ok(label_for(parsed.date(), now.date_naive()))
}

/// Long form used in reports, e.g. `Mar 05, 2026`.
pub fn format_date(date: &str, offset: &FixedOffset) -> Result<String, InvalidInput> {
    Ok(parse_date(date, offset)?.format("%b %d, %Y").to_string())
}

pub fn parse_time(time: &str) -> Result<NaiveTime, InvalidInput> {
    let value = time.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| InvalidInput::Time(time.to_string()))
}

/// Renders a bare `HH:mm` wall-clock time on a 12-hour clock: `14:30` → `2:30 PM`.
pub fn format_time(time: &str) -> Result<String, InvalidInput> {
    Ok(parse_time(time)?.format("%-I:%M %p").to_string())
}
