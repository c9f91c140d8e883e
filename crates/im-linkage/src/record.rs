//! Person record types
//!
//! `RawRecord` mirrors one row of an input table as free text. Every column is
//! optional so a table with missing columns still loads; the normalizer turns
//! it into a `NormalizedRecord`, which is what the rest of the pipeline sees.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unnormalized person record, one row of the input table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    /// Record identifier
    pub unique_id: Option<String>,
    /// Legacy identifier column, used only when `unique_id` is blank
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    /// Free-text date of birth
    pub dob: Option<String>,
    pub birth_place: Option<String>,
    pub postcode: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    /// Ground-truth entity label, only used for evaluation
    pub duplicate_group: Option<String>,
}

impl RawRecord {
    /// Create a record with just an identifier
    pub fn new(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: Some(unique_id.into()),
            ..Default::default()
        }
    }

    /// Trimmed identifier, preferring `unique_id` over `id`
    pub fn identifier(&self) -> Option<&str> {
        present(&self.unique_id).or_else(|| present(&self.id))
    }

    pub fn with_name(mut self, first_name: &str, surname: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self.surname = Some(surname.to_string());
        self
    }

    pub fn with_dob(mut self, dob: &str) -> Self {
        self.dob = Some(dob.to_string());
        self
    }

    pub fn with_birth_place(mut self, birth_place: &str) -> Self {
        self.birth_place = Some(birth_place.to_string());
        self
    }

    pub fn with_postcode(mut self, postcode: &str) -> Self {
        self.postcode = Some(postcode.to_string());
        self
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_occupation(mut self, occupation: &str) -> Self {
        self.occupation = Some(occupation.to_string());
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.duplicate_group = Some(group.to_string());
        self
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Normalized gender code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
    #[default]
    #[serde(rename = "u")]
    Unknown,
}

impl Gender {
    /// Single-letter code (`m`, `f`, `u`)
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
            Gender::Unknown => "u",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Gender::Unknown)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Person record after normalization
///
/// Text fields are lowercased and folded to ASCII, except `postcode` which is
/// uppercase with spaces removed. Absent values are empty strings or `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub dob_year: Option<i32>,
    pub dob_month: Option<u32>,
    pub dob_day: Option<u32>,
    pub birth_place: String,
    pub postcode: String,
    pub gender: Gender,
    pub occupation: String,
}

impl NormalizedRecord {
    /// Create an otherwise empty record
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Birth year rendered for block keys, `-1` when unknown
    pub fn year_key(&self) -> String {
        self.dob_year.unwrap_or(-1).to_string()
    }
}
