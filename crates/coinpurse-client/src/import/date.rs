use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

static ISO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T\s].*)?$").unwrap());
static ISO_SLASH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})(?:\s.*)?$").unwrap());
static NUMERIC_SLASH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s.*)?$").unwrap());
static NUMERIC_DASH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})(?:\s.*)?$").unwrap());
static DAY_MONTH_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)?[\s\-]+([A-Za-z]+)\.?,?[\s\-]+(\d{4})$").unwrap()
});
static MONTH_NAME_DAY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)\.?[\s\-]+(\d{1,2})(?:st|nd|rd|th)?,?[\s\-]+(\d{4})$").unwrap()
});

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const FREE_FORM_DATE_FORMATS: [&str; 8] = [
    "%Y%m%d",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%B %d %Y",
    "%d %B %Y",
    "%a %b %d %Y",
    "%A, %B %d, %Y",
    "%b %d, %Y",
];

const FREE_FORM_DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S", "%Y%m%dT%H%M%S"];

/// How date cells are read. `Auto` runs the ordered rule cascade; every other
/// variant accepts exactly one layout.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYearSlash,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYearSlash,
    #[serde(rename = "MM-DD-YYYY")]
    MonthDayYearDash,
    #[serde(rename = "DD-MM-YYYY")]
    DayMonthYearDash,
    #[serde(rename = "YYYY/MM/DD")]
    IsoSlash,
    #[serde(rename = "D MMM YYYY")]
    DayMonthName,
    #[serde(rename = "MMM D YYYY")]
    MonthNameDay,
}

impl DateFormat {
    pub const ALL: [DateFormat; 9] = [
        Self::Auto,
        Self::Iso,
        Self::MonthDayYearSlash,
        Self::DayMonthYearSlash,
        Self::MonthDayYearDash,
        Self::DayMonthYearDash,
        Self::IsoSlash,
        Self::DayMonthName,
        Self::MonthNameDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Iso => "YYYY-MM-DD",
            Self::MonthDayYearSlash => "MM/DD/YYYY",
            Self::DayMonthYearSlash => "DD/MM/YYYY",
            Self::MonthDayYearDash => "MM-DD-YYYY",
            Self::DayMonthYearDash => "DD-MM-YYYY",
            Self::IsoSlash => "YYYY/MM/DD",
            Self::DayMonthName => "D MMM YYYY",
            Self::MonthNameDay => "MMM D YYYY",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| {
                let known = Self::ALL
                    .iter()
                    .map(DateFormat::as_str)
                    .collect::<Vec<&str>>()
                    .join(", ");
                format!("date format must be one of: {known}")
            })
    }
}

/// Which of the two leading numbers of an `N/N/YYYY` value is the month.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NumericOrder {
    MonthFirst,
    DayFirst,
}

/// Tie-break for ambiguous numeric dates: a first number above 12 cannot be a
/// month, so the value is read day-first; anything else is read US month-first.
pub fn ambiguous_numeric_order(first: u32) -> NumericOrder {
    if first > 12 {
        NumericOrder::DayFirst
    } else {
        NumericOrder::MonthFirst
    }
}

type Extractor = fn(&Captures<'_>) -> Option<String>;

struct DateRule {
    pattern: &'static Lazy<Regex>,
    extract: Extractor,
}

static AUTO_RULES: [DateRule; 6] = [
    DateRule {
        pattern: &ISO_PATTERN,
        extract: extract_year_month_day,
    },
    DateRule {
        pattern: &ISO_SLASH_PATTERN,
        extract: extract_year_month_day,
    },
    DateRule {
        pattern: &NUMERIC_SLASH_PATTERN,
        extract: extract_ambiguous_numeric,
    },
    DateRule {
        pattern: &NUMERIC_DASH_PATTERN,
        extract: extract_ambiguous_numeric,
    },
    DateRule {
        pattern: &DAY_MONTH_NAME_PATTERN,
        extract: extract_day_month_name,
    },
    DateRule {
        pattern: &MONTH_NAME_DAY_PATTERN,
        extract: extract_month_name_day,
    },
];

/// Normalizes a date cell to `YYYY-MM-DD`. `None` means the cell is empty or
/// could not be read with `format`.
pub fn coerce_date(raw: &str, format: DateFormat) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    match format {
        DateFormat::Auto => coerce_auto(value),
        DateFormat::Iso => apply(&ISO_PATTERN, value, extract_year_month_day),
        DateFormat::IsoSlash => apply(&ISO_SLASH_PATTERN, value, extract_year_month_day),
        DateFormat::MonthDayYearSlash => {
            apply(&NUMERIC_SLASH_PATTERN, value, extract_month_day_year)
        }
        DateFormat::DayMonthYearSlash => {
            apply(&NUMERIC_SLASH_PATTERN, value, extract_day_month_year)
        }
        DateFormat::MonthDayYearDash => apply(&NUMERIC_DASH_PATTERN, value, extract_month_day_year),
        DateFormat::DayMonthYearDash => apply(&NUMERIC_DASH_PATTERN, value, extract_day_month_year),
        DateFormat::DayMonthName => apply(&DAY_MONTH_NAME_PATTERN, value, extract_day_month_name),
        DateFormat::MonthNameDay => apply(&MONTH_NAME_DAY_PATTERN, value, extract_month_name_day),
    }
}

// The first rule whose pattern matches decides; a range failure there is final.
fn coerce_auto(value: &str) -> Option<String> {
    for rule in &AUTO_RULES {
        if let Some(captures) = rule.pattern.captures(value) {
            return (rule.extract)(&captures);
        }
    }
    parse_free_form(value)
}

fn apply(pattern: &Regex, value: &str, extract: Extractor) -> Option<String> {
    let captures = pattern.captures(value)?;
    extract(&captures)
}

fn extract_year_month_day(captures: &Captures<'_>) -> Option<String> {
    assemble(
        number_at(captures, 1)?,
        number_at(captures, 2)?,
        number_at(captures, 3)?,
    )
}

fn extract_month_day_year(captures: &Captures<'_>) -> Option<String> {
    assemble(
        number_at(captures, 3)?,
        number_at(captures, 1)?,
        number_at(captures, 2)?,
    )
}

fn extract_day_month_year(captures: &Captures<'_>) -> Option<String> {
    assemble(
        number_at(captures, 3)?,
        number_at(captures, 2)?,
        number_at(captures, 1)?,
    )
}

fn extract_ambiguous_numeric(captures: &Captures<'_>) -> Option<String> {
    let first = number_at(captures, 1)?;
    match ambiguous_numeric_order(first) {
        NumericOrder::DayFirst => extract_day_month_year(captures),
        NumericOrder::MonthFirst => extract_month_day_year(captures),
    }
}

fn extract_day_month_name(captures: &Captures<'_>) -> Option<String> {
    let month = month_from_name(captures.get(2)?.as_str())?;
    assemble(number_at(captures, 3)?, month, number_at(captures, 1)?)
}

fn extract_month_name_day(captures: &Captures<'_>) -> Option<String> {
    let month = month_from_name(captures.get(1)?.as_str())?;
    assemble(number_at(captures, 3)?, month, number_at(captures, 2)?)
}

fn number_at(captures: &Captures<'_>, group: usize) -> Option<u32> {
    captures.get(group)?.as_str().parse::<u32>().ok()
}

/// Looks up a month by the first three letters of its name.
pub fn month_from_name(name: &str) -> Option<u32> {
    let prefix = name
        .chars()
        .take(3)
        .collect::<String>()
        .to_ascii_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbreviation| *abbreviation == prefix)
        .map(|index| index as u32 + 1)
}

// Range check only; 2024-02-31 passes.
fn assemble(year: u32, month: u32, day: u32) -> Option<String> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

fn parse_free_form(value: &str) -> Option<String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(format_iso(parsed.date_naive()));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(format_iso(parsed.date_naive()));
    }

    for format in FREE_FORM_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(format_iso(parsed));
        }
    }
    for format in FREE_FORM_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(format_iso(parsed.date()));
        }
    }

    None
}

fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
