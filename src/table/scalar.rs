use crate::config::LoadOptions;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

/// Plain decimal or scientific notation, no thousands separators
static NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("Hardcode regex pattern")
});

/// Digits grouped by commas in threes, with an optional fraction
static GROUPED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("Hardcode regex pattern")
});

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];

/// A single table value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the date this value denotes: a Date value, or text that parses as one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(date) => Some(*date),
            Scalar::Text(text) => parse_date(text),
            _ => None,
        }
    }

    /// Text used when this value labels a group (category, entity).
    pub fn to_label(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Number(number) => write!(f, "{number}"),
            Scalar::Text(text) => write!(f, "{text}"),
            Scalar::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Infers the scalar a textual cell denotes: null literal, number, date, or text.
pub fn infer_scalar(raw: &str, options: &LoadOptions) -> Scalar {
    let text = raw.trim();
    if options.null_literals.iter().any(|literal| literal == text) {
        Scalar::Null
    } else if let Some(number) = parse_number(text) {
        Scalar::Number(number)
    } else if let Some(date) = parse_date(text) {
        Scalar::Date(date)
    } else {
        Scalar::Text(text.to_owned())
    }
}

/// Parses a number, accepting a leading currency symbol and comma thousands separators.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.strip_prefix('+').unwrap_or(text)),
    };
    let unsigned = unsigned.strip_prefix(CURRENCY_SYMBOLS).unwrap_or(unsigned).trim_start();
    let plain = if GROUPED_PATTERN.is_match(unsigned) {
        unsigned.replace(',', "")
    } else {
        unsigned.to_owned()
    };
    if !NUMBER_PATTERN.is_match(&plain) {
        return None;
    }
    format!("{sign}{plain}").parse::<f64>().ok().filter(|number| number.is_finite())
}

/// Parses a calendar date from the accepted date and date-time layouts.
/// A bare `YYYY-MM` denotes the first day of that month.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.len() < 7 {
        return None;
    }
    DATE_FORMATS.iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| DATETIME_FORMATS.iter().find_map(|format| NaiveDateTime::parse_from_str(text, format).ok().map(|datetime| datetime.date())))
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|datetime| datetime.date_naive()))
        .or_else(|| {
            if text.len() == 7 {
                NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").ok()
            } else {
                None
            }
        })
}
