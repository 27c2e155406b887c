/*!
 * Lenient parsing of the report timestamps.
 *
 * Timestamps only feed the "last activity" field of a hotspot, so a bad one must never sink a
 * batch. Each parser in [PARSERS] is tried in order and the first success wins. When nothing in a
 * group parses, the current time stands in.
 */
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use log::warn;

/// A strategy for turning a string into a UTC time.
pub type TimestampParser = fn(&str) -> Option<DateTime<Utc>>;

/// The parsers, in the order they are tried.
pub const PARSERS: &[(&str, TimestampParser)] = &[
    ("rfc3339", parse_rfc3339),
    ("numeric offset", parse_numeric_offset),
    ("naive date time", parse_naive_datetime),
    ("rfc2822", parse_rfc2822),
    ("date only", parse_date),
];

/// Naive formats are assumed to be in UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// ISO-8601 with an offset written without a colon, e.g. `+0000`.
fn parse_numeric_offset(s: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"]
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive_datetime(s: &str) -> Option<DateTime<Utc>> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Try every parser in turn.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    PARSERS.iter().find_map(|(_name, parser)| parser(s))
}

/// ISO-8601 in UTC with a trailing `Z`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// The most recent activity in a group of reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastActivity {
    pub time: DateTime<Utc>,
    /// True if no report had a usable timestamp and `time` is the time of the calculation.
    pub fallback: bool,
}

/**
 * Find the latest parseable timestamp.
 *
 * #Arguments
 * * stamps - the raw timestamp of each report, if it had one.
 * * now - supplies the fallback time, only called when nothing parses.
 */
pub fn last_activity<'a, I, F>(stamps: I, now: F) -> LastActivity
where
    I: IntoIterator<Item = Option<&'a str>>,
    F: FnOnce() -> DateTime<Utc>,
{
    let mut latest: Option<DateTime<Utc>> = None;
    let mut unparsed = 0;

    for raw in stamps.into_iter().flatten() {
        match parse_timestamp(raw) {
            Some(time) => latest = latest.max(Some(time)),
            None => unparsed += 1,
        }
    }

    if unparsed > 0 {
        warn!("{} report timestamps could not be parsed", unparsed);
    }

    match latest {
        Some(time) => LastActivity {
            time,
            fallback: false,
        },
        None => LastActivity {
            time: now(),
            fallback: true,
        },
    }
}
