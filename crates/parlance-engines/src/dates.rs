// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Date range extraction from natural-language time phrases.
//!
//! Relative phrases are resolved against a reference date supplied by the
//! caller, never against the wall clock, so extraction is deterministic.

use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;
use serde::Serialize;

/// Days covered when a query names no time range.
pub const DEFAULT_RANGE_DAYS: u64 = 7;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("ISO date pattern compiles")
});

static LAST_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:last|past|previous)\s+(\d{1,3})\s+(day|week|month)s?\b")
        .expect("last-N pattern compiles")
});

static SINCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:since|after)\s+\d{4}-\d{2}-\d{2}\b").expect("since pattern compiles")
});

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// The `days` days up to and including `today`, or `None` when the
    /// start would fall before the earliest representable date.
    pub fn last_days(today: NaiveDate, days: u64) -> Option<Self> {
        Some(Self::new(today.checked_sub_days(Days::new(days))?, today))
    }

    /// The range used when a query names none.
    pub fn default_for(today: NaiveDate) -> Option<Self> {
        Self::last_days(today, DEFAULT_RANGE_DAYS)
    }

    /// The range named by `query`, else the default range, else `today`
    /// alone when even the default cannot be represented.
    pub fn resolve(query: &str, today: NaiveDate) -> Self {
        Self::extract(query, today)
            .or_else(|| Self::default_for(today))
            .unwrap_or_else(|| Self::new(today, today))
    }

    /// Resolve the first time phrase in `query` against `today`.
    ///
    /// Recognised, in priority order: explicit ISO dates (`2024-01-31`, a
    /// pair such as `from X to Y`, or `since X`); `last|past|previous N
    /// days|weeks|months`; `today`, `yesterday`; `this|last week`,
    /// `past week`; `this|last month`; `this|last quarter`; `this|last
    /// year` and `year to date`.
    pub fn extract(query: &str, today: NaiveDate) -> Option<Self> {
        Self::explicit(query, today)
            .or_else(|| Self::last_n(query, today))
            .or_else(|| Self::named(query, today))
    }

    fn explicit(query: &str, today: NaiveDate) -> Option<Self> {
        let dates: Vec<NaiveDate> = ISO_DATE
            .captures_iter(query)
            .filter_map(|c| {
                let year = c[1].parse().ok()?;
                let month = c[2].parse().ok()?;
                let day = c[3].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            })
            .collect();
        match dates.as_slice() {
            [] => None,
            [only] => {
                let since = SINCE.is_match(query);
                Some(if since {
                    Self::new(*only, today)
                } else {
                    Self::new(*only, *only)
                })
            }
            [first, second, ..] => Some(Self::new(*first, *second)),
        }
    }

    fn last_n(query: &str, today: NaiveDate) -> Option<Self> {
        let caps = LAST_N.captures(query)?;
        let n: u32 = caps[1].parse().ok()?;
        let n = n.max(1);
        let start = match caps[2].to_ascii_lowercase().as_str() {
            "day" => today.checked_sub_days(Days::new(u64::from(n)))?,
            "week" => today.checked_sub_days(Days::new(u64::from(n) * 7))?,
            _ => today.checked_sub_months(Months::new(n))?,
        };
        Some(Self::new(start, today))
    }

    fn named(query: &str, today: NaiveDate) -> Option<Self> {
        let q = format!(" {} ", crate::text::tokenize(query).join(" "));
        let has = |phrase: &str| q.contains(&format!(" {phrase} "));

        if has("today") {
            return Some(Self::new(today, today));
        }
        if has("yesterday") {
            let y = today.pred_opt()?;
            return Some(Self::new(y, y));
        }

        let monday = || {
            today.checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
        };
        if has("this week") {
            return Some(Self::new(monday()?, today));
        }
        if has("last week") || has("previous week") {
            let monday = monday()?;
            let prev_monday = monday.checked_sub_days(Days::new(7))?;
            return Some(Self::new(prev_monday, monday.pred_opt()?));
        }
        if has("past week") {
            return Self::last_days(today, 7);
        }

        let month_start = today.with_day(1)?;
        if has("this month") {
            return Some(Self::new(month_start, today));
        }
        if has("last month") || has("previous month") {
            let prev_start = month_start.checked_sub_months(Months::new(1))?;
            return Some(Self::new(prev_start, month_start.pred_opt()?));
        }

        let quarter_start =
            NaiveDate::from_ymd_opt(today.year(), today.month0() / 3 * 3 + 1, 1)?;
        if has("this quarter") {
            return Some(Self::new(quarter_start, today));
        }
        if has("last quarter") || has("previous quarter") {
            let prev_start = quarter_start.checked_sub_months(Months::new(3))?;
            return Some(Self::new(prev_start, quarter_start.pred_opt()?));
        }

        let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
        if has("this year") || has("year to date") || has("ytd") {
            return Some(Self::new(year_start, today));
        }
        if has("last year") || has("previous year") {
            let prev_start = NaiveDate::from_ymd_opt(today.year() - 1, 1, 1)?;
            return Some(Self::new(prev_start, year_start.pred_opt()?));
        }
        None
    }

    /// `YYYY-MM-DD` rendering of the start date.
    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD` rendering of the end date.
    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()
    }

    fn range(query: &str) -> Option<(String, String)> {
        DateRange::extract(query, today()).map(|r| (r.start_str(), r.end_str()))
    }

    fn pair(a: &str, b: &str) -> Option<(String, String)> {
        Some((a.to_string(), b.to_string()))
    }

    #[test]
    fn calendar_weeks() {
        assert_eq!(range("last week's voc report"), pair("2024-03-04", "2024-03-10"));
        assert_eq!(range("nps this week"), pair("2024-03-11", "2024-03-13"));
        assert_eq!(range("churn over the past week"), pair("2024-03-06", "2024-03-13"));
    }

    #[test]
    fn single_days() {
        assert_eq!(range("tickets today"), pair("2024-03-13", "2024-03-13"));
        assert_eq!(range("Yesterday's sentiment"), pair("2024-03-12", "2024-03-12"));
    }

    #[test]
    fn last_n_units() {
        assert_eq!(range("last 30 days"), pair("2024-02-12", "2024-03-13"));
        assert_eq!(range("past 2 weeks"), pair("2024-02-28", "2024-03-13"));
        assert_eq!(range("previous 2 months"), pair("2024-01-13", "2024-03-13"));
    }

    #[test]
    fn months_quarters_years() {
        assert_eq!(range("last month"), pair("2024-02-01", "2024-02-29"));
        assert_eq!(range("this month"), pair("2024-03-01", "2024-03-13"));
        assert_eq!(range("last quarter"), pair("2023-10-01", "2023-12-31"));
        assert_eq!(range("this quarter"), pair("2024-01-01", "2024-03-13"));
        assert_eq!(range("last year"), pair("2023-01-01", "2023-12-31"));
        assert_eq!(range("year to date"), pair("2024-01-01", "2024-03-13"));
    }

    #[test]
    fn explicit_dates() {
        assert_eq!(
            range("nps from 2024-01-05 to 2024-02-10"),
            pair("2024-01-05", "2024-02-10")
        );
        assert_eq!(
            range("between 2024-02-10 and 2024-01-05"),
            pair("2024-01-05", "2024-02-10")
        );
        assert_eq!(range("since 2024-03-01"), pair("2024-03-01", "2024-03-13"));
        assert_eq!(range("on 2024-02-29"), pair("2024-02-29", "2024-02-29"));
        assert_eq!(range("on 2024-02-30"), None);
    }

    #[test]
    fn no_phrase_means_none_and_default_is_a_week() {
        assert_eq!(range("voice of customer"), None);
        let d = DateRange::default_for(today()).unwrap();
        assert_eq!((d.start_str(), d.end_str()), ("2024-03-06".into(), "2024-03-13".into()));
    }

    #[test]
    fn last_quarter_in_january_wraps_year() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let r = DateRange::extract("last quarter", jan).unwrap();
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2023, 10, 1).unwrap());
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn patterns_compile() {
        assert!(ISO_DATE.is_match("2024-01-31"));
        assert!(LAST_N.is_match("last 3 weeks"));
        assert!(SINCE.is_match("since 2024-01-31"));
    }

    #[test]
    fn earliest_dates_resolve_to_no_range() {
        let min = NaiveDate::MIN;
        assert_eq!(DateRange::extract("last week's nps", min), None);
        assert_eq!(DateRange::extract("churn over the past week", min), None);
        assert_eq!(DateRange::default_for(min), None);
        assert_eq!(DateRange::last_days(min, 1), None);
        assert_eq!(DateRange::resolve("nps report", min), DateRange::new(min, min));
    }
}
