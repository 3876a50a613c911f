//! Week-label codec
//!
//! Maps labels like "Wk19 2025" to calendar dates and back. Parsing anchors
//! on the Monday of the ISO week; rendering shifts one day forward first so
//! that Sunday-start business weeks land in the week the business reports
//! them under. The asymmetry between the two directions is intentional and
//! must not be "fixed".

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Parse a week label with an explicit year, e.g. "Wk19 2025" or "2026 wk1".
///
/// Returns the Monday of the ISO week, or `None` for malformed input.
pub fn parse_week_label(label: &str) -> Option<NaiveDate> {
    parse_week_label_with_default_year(label, None)
}

/// Parse a week label, substituting `default_year` when the label carries
/// none (e.g. "Wk19" on a promo sheet).
///
/// Accepted forms, case-insensitive: "Wk19 2025", "Wk 1 2026", "2026 wk1",
/// "2026wk1", and "Wk19" when a default year is supplied.
pub fn parse_week_label_with_default_year(
    label: &str,
    default_year: Option<i32>,
) -> Option<NaiveDate> {
    let trimmed = label.trim();
    let lower = trimmed.to_ascii_lowercase();

    let (week, year) = if let Some(rest) = lower.strip_prefix("wk") {
        // "Wk19 2025" / "Wk 1 2026" / "Wk19"
        let rest = rest.trim_start();
        let (week, rest) = take_digits(rest)?;
        let rest = rest.trim_start();
        match take_year(rest) {
            Some(year) => (week, year),
            // Year-less form only makes sense for real week numbers.
            None if rest.is_empty() && (1..=53).contains(&week) => (week, default_year?),
            None => return None,
        }
    } else {
        // "2026 wk1" / "2026wk1"
        let (year_digits, rest) = take_digits_raw(lower.as_str())?;
        if year_digits.len() != 4 {
            return None;
        }
        let year: i32 = year_digits.parse().ok()?;
        let rest = rest.trim_start();
        let rest = rest.strip_prefix("wk")?;
        let (week, _) = take_digits(rest.trim_start())?;
        (week, year)
    };

    week_to_date(week, year)
}

/// Render a date as its business-week label, "Wk%02d %Y".
///
/// The date is shifted one day forward before taking the ISO week so that
/// Sunday-start weeks report under the ISO week their Monday falls in.
pub fn format_week_label(date: NaiveDate) -> String {
    let adjusted = date + Duration::days(1);
    let iso = adjusted.iso_week();
    format!("Wk{:02} {}", iso.week(), iso.year())
}

/// Monday of the given ISO (week, year); falls back to Jan-1 + (week-1)
/// weeks when the ISO week number is not valid for that year.
fn week_to_date(week: u32, year: i32) -> Option<NaiveDate> {
    if let Some(date) = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon) {
        return Some(date);
    }
    NaiveDate::from_ymd_opt(year, 1, 1).map(|jan1| jan1 + Duration::weeks(i64::from(week) - 1))
}

/// Leading run of digits parsed as a week number, plus the remainder.
fn take_digits(s: &str) -> Option<(u32, &str)> {
    let (digits, rest) = take_digits_raw(s)?;
    digits.parse::<u32>().ok().map(|n| (n, rest))
}

/// Leading run of digits as a string slice, plus the remainder.
fn take_digits_raw(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}

/// Leading token parsed as a four-digit year; trailing text after the year
/// is tolerated, matching the permissive source grammar.
fn take_year(s: &str) -> Option<i32> {
    let (digits, rest) = take_digits_raw(s)?;
    if digits.len() != 4 {
        return None;
    }
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    digits.parse().ok()
}
