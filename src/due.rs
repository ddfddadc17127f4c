use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Overdue,
    Soon,
    Upcoming,
    Later,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueInfo {
    pub days: i64,
    pub bucket: DueBucket,
}

impl DueInfo {
    pub fn label(&self) -> String {
        match self.days {
            0 => "today".to_string(),
            1 => "1 day".to_string(),
            -1 => "1 day overdue".to_string(),
            days if days < 0 => format!("{} days overdue", -days),
            days => format!("{days} days"),
        }
    }
}

/// Whole calendar days from `today` until the due date, bucketed the way the
/// list colours them.
pub fn due_info(due_date: Option<&str>, today: Date) -> Option<DueInfo> {
    let due = calendar_date(due_date?)?;
    let days = (due - today).whole_days();
    let bucket = if days < 0 {
        DueBucket::Overdue
    } else if days <= 7 {
        DueBucket::Soon
    } else if days <= 30 {
        DueBucket::Upcoming
    } else {
        DueBucket::Later
    };
    Some(DueInfo { days, bucket })
}

/// Calendar date of a stored timestamp, taken in UTC. Plain `YYYY-MM-DD`
/// values are accepted as well.
pub fn calendar_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp.to_offset(UtcOffset::UTC).date());
    }
    parse_day(raw).ok()
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

pub fn parse_day(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

pub fn format_day(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Midnight UTC of `date` as an RFC3339 timestamp, the stored due-date form.
/// Fails for years RFC3339 cannot express (outside 0..=9999).
pub fn day_timestamp(date: Date) -> Result<String, time::error::Format> {
    date.midnight().assume_utc().format(&Rfc3339)
}

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

pub fn now_unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
