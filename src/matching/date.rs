// src/matching/date.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

// Two-digit years are tried before four-digit ones, since `%Y` also accepts "23".
const DATE_FORMATS: [&str; 16] = [
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d",
    "%m/%d/%y", "%m-%d-%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y",
    "%d %B %Y", "%d %b %Y", "%B %d %Y", "%b %d %Y",
    "%Y %B %d", "%Y %b %d", "%A %B %d %Y", "%a %b %d %Y",
];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Month-and-year only; the day defaults to the 1st.
const MONTH_YEAR_FORMATS: [&str; 2] = ["%d %B %Y", "%d %b %Y"];

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("static ordinal regex"));
static SEPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsept\b").expect("static sept regex"));
static COMPACT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{8}$").expect("static compact regex"));

/// Parses free-form date text and reformats it as `YYYY-MM-DD`.
/// Ambiguous numeric dates are read month first. Returns an empty string
/// on failure.
pub fn normalize_date(date: &str) -> String {
    match parse_date(date) {
        Some(parsed) => parsed.format("%Y-%m-%d").to_string(),
        None => {
            debug!("Date '{}' could not be parsed.", date);
            String::new()
        }
    }
}

pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let trimmed = date.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    if COMPACT_DATE.is_match(trimmed) {
        return NaiveDate::parse_from_str(
            &format!("{}-{}-{}", &trimmed[..4], &trimmed[4..6], &trimmed[6..]),
            "%Y-%m-%d",
        )
        .ok();
    }

    let cleaned = ORDINAL
        .replace_all(trimmed, "$1")
        .replace(',', " ");
    let cleaned = SEPT.replace_all(&cleaned, "sep");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let year_first = cleaned.chars().take_while(|c| c.is_ascii_digit()).count() == 4;
    for format in DATE_FORMATS {
        if format.starts_with("%Y") && !year_first {
            continue;
        }
        match NaiveDate::parse_from_str(&cleaned, format) {
            // `%Y` also takes a short year, so "July 2020" would read as July 20th, year 20.
            Ok(parsed) if format.contains("%Y") && parsed.year() < 1000 => continue,
            Ok(parsed) => return Some(parsed),
            Err(_) => continue,
        }
    }
    let with_day = format!("1 {}", cleaned);
    MONTH_YEAR_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&with_day, format).ok())
}
