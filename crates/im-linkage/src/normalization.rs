//! Field normalization for person records
//!
//! Cleans free-text fields into the comparable form the scorer expects.
//! Nothing here fails on bad data: unparseable dates and unknown genders
//! degrade to `None` / `u`. Only a missing or repeated identifier is an error.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::error::{LinkageError, Result};
use crate::record::{Gender, NormalizedRecord, RawRecord};

/// Plausible birth years
pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 2100;

lazy_static! {
    // Anything that is not a word character, whitespace, apostrophe or hyphen
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s'-]").unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    // Fallback for dates we can't parse: any 1500-2099 year in the text
    static ref YEAR_FALLBACK: Regex = Regex::new(r"(1[5-9]\d{2}|20\d{2})").unwrap();

    // Partial dates: "1850-03", "1850/3"
    static ref YEAR_MONTH: Regex = Regex::new(r"^(\d{4})[-/.](\d{1,2})$").unwrap();

    // Partial dates: "03/1850", "3-1850"
    static ref MONTH_YEAR: Regex = Regex::new(r"^(\d{1,2})[-/.](\d{4})$").unwrap();
}

/// Layouts tried in order; month-first wins over day-first for ambiguous input
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%Y%m%d",
];

/// Normalize a free-text field
///
/// - Folds to ASCII (NFKD, combining marks dropped)
/// - Converts to lowercase
/// - Replaces punctuation except `'` and `-` with spaces
/// - Collapses whitespace
pub fn normalize_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let folded: String = text.nfkd().filter(|c| c.is_ascii()).collect();
    let lowered = folded.to_lowercase();
    let stripped = PUNCTUATION.replace_all(lowered.trim(), " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Normalize a first name or surname
pub fn normalize_name(name: Option<&str>) -> String {
    normalize_text(name)
}

/// Normalize a postcode: uppercase, no spaces
pub fn normalize_postcode(postcode: Option<&str>) -> String {
    postcode
        .map(|p| p.trim().to_uppercase().replace(' ', ""))
        .unwrap_or_default()
}

/// Map free-text gender onto `m` / `f` / `u`
pub fn normalize_gender(gender: Option<&str>) -> Gender {
    match gender.map(|g| g.trim().to_lowercase()).as_deref() {
        Some("m") | Some("male") => Gender::Male,
        Some("f") | Some("female") => Gender::Female,
        _ => Gender::Unknown,
    }
}

/// Parse a free-text date of birth into (year, month, day)
///
/// Full dates are tried against `DATE_FORMATS`, then year-month partials,
/// then a bare year anywhere in the text. Years outside
/// `MIN_YEAR..=MAX_YEAR` are dropped.
pub fn parse_date_safe(dob: Option<&str>) -> (Option<i32>, Option<u32>, Option<u32>) {
    let Some(dob) = dob.map(str::trim).filter(|d| !d.is_empty()) else {
        return (None, None, None);
    };
    if dob.eq_ignore_ascii_case("nan") {
        return (None, None, None);
    }

    // "1850-03-02 00:00:00" and similar timestamps
    let date_part = dob.split(['T', ' ']).next().unwrap_or(dob);

    for candidate in [dob, date_part] {
        if let Some(date) = parse_full_date(candidate) {
            return (
                bounded_year(date.year()),
                Some(date.month()),
                Some(date.day()),
            );
        }
    }

    if let Some(caps) = YEAR_MONTH.captures(dob) {
        if let (Ok(year), Ok(month)) = (caps[1].parse::<i32>(), caps[2].parse::<u32>()) {
            if (1..=12).contains(&month) {
                return (bounded_year(year), Some(month), None);
            }
        }
    }

    if let Some(caps) = MONTH_YEAR.captures(dob) {
        if let (Ok(month), Ok(year)) = (caps[1].parse::<u32>(), caps[2].parse::<i32>()) {
            if (1..=12).contains(&month) {
                return (bounded_year(year), Some(month), None);
            }
        }
    }

    let year = YEAR_FALLBACK
        .captures(dob)
        .and_then(|caps| caps[1].parse::<i32>().ok());
    (year.and_then(bounded_year), None, None)
}

fn parse_full_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn bounded_year(year: i32) -> Option<i32> {
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}

/// Normalize one raw record
///
/// `row` is the zero-based position in the input, used for error reporting.
pub fn normalize_record(raw: &RawRecord, row: usize) -> Result<NormalizedRecord> {
    let id = raw
        .identifier()
        .ok_or(LinkageError::MissingIdentifier { row })?;

    let (dob_year, dob_month, dob_day) = parse_date_safe(raw.dob.as_deref());

    Ok(NormalizedRecord {
        id: id.to_string(),
        first_name: normalize_name(raw.first_name.as_deref()),
        surname: normalize_name(raw.surname.as_deref()),
        dob_year,
        dob_month,
        dob_day,
        birth_place: normalize_text(raw.birth_place.as_deref()),
        postcode: normalize_postcode(raw.postcode.as_deref()),
        gender: normalize_gender(raw.gender.as_deref()),
        occupation: normalize_text(raw.occupation.as_deref()),
    })
}

/// Normalize a whole batch, enforcing present and unique identifiers
pub fn normalize_batch(raw: &[RawRecord]) -> Result<Vec<NormalizedRecord>> {
    let records = raw
        .iter()
        .enumerate()
        .map(|(row, record)| normalize_record(record, row))
        .collect::<Result<Vec<_>>>()?;

    ensure_unique_ids(&records)?;
    debug!("Normalized {} records", records.len());
    Ok(records)
}

/// Fail on the first identifier that appears twice
pub fn ensure_unique_ids(records: &[NormalizedRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        if record.id.is_empty() {
            return Err(LinkageError::MissingIdentifier { row });
        }
        if !seen.insert(record.id.as_str()) {
            return Err(LinkageError::DuplicateIdentifier(record.id.clone()));
        }
    }
    Ok(())
}
