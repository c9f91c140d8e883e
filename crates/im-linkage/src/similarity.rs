//! Per-field similarity scoring
//!
//! Every function here is pure, symmetric in its two sides and total: empty
//! or absent input yields the documented minimum instead of an error.

use std::collections::BTreeSet;

use strsim::jaro_winkler;

use crate::phonetic::metaphone;
use crate::record::Gender;

/// Bonus when both surnames share a phonetic code
pub const PHONETIC_BOOST: f64 = 0.1;
/// Bonus when first and surname initials both agree
pub const INITIALS_BOOST: f64 = 0.05;
/// Bonus for each matching month / day of birth
pub const DOB_PART_BOOST: f64 = 0.1;
/// Ceiling for inexact postcode matches
pub const POSTCODE_PARTIAL_CAP: f64 = 0.9;

/// Score two full names
///
/// Takes the better of Jaro-Winkler and token-set ratio over "first last",
/// then adds the phonetic and initials boosts. The result is capped at 1.0 so
/// it weighs like every other feature.
pub fn name_similarity(first1: &str, last1: &str, first2: &str, last2: &str) -> f64 {
    let full1 = format!("{} {}", first1, last1);
    let full2 = format!("{} {}", first2, last2);
    let (full1, full2) = (full1.trim(), full2.trim());

    if full1.is_empty() || full2.is_empty() {
        return 0.0;
    }

    // Fixed argument order keeps the score exactly symmetric
    let (lo, hi) = if full1 <= full2 { (full1, full2) } else { (full2, full1) };
    let base = jaro_winkler(lo, hi).max(token_set_ratio(full1, full2));

    let phonetic = match (metaphone(last1), metaphone(last2)) {
        (Some(code1), Some(code2)) if code1 == code2 => PHONETIC_BOOST,
        _ => 0.0,
    };

    let initials = if initials_match(first1, first2) && initials_match(last1, last2) {
        INITIALS_BOOST
    } else {
        0.0
    };

    (base + phonetic + initials).min(1.0)
}

fn initials_match(a: &str, b: &str) -> bool {
    match (a.chars().next(), b.chars().next()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Score two dates of birth
///
/// Same year scores 1.0 and an off-by-one year 0.5. Matching month and day
/// each add a small bump; the total never exceeds 1.0.
pub fn dob_similarity(
    y1: Option<i32>,
    m1: Option<u32>,
    d1: Option<u32>,
    y2: Option<i32>,
    m2: Option<u32>,
    d2: Option<u32>,
) -> f64 {
    let mut score = match (y1, y2) {
        (Some(a), Some(b)) if a == b => 1.0,
        (Some(a), Some(b)) if (a - b).abs() == 1 => 0.5,
        _ => 0.0,
    };

    if matches!((m1, m2), (Some(a), Some(b)) if a == b) {
        score += DOB_PART_BOOST;
    }
    if matches!((d1, d2), (Some(a), Some(b)) if a == b) {
        score += DOB_PART_BOOST;
    }

    score.min(1.0)
}

/// Score two free-text fields by token-set overlap
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    token_set_ratio(a, b)
}

/// Score two postcodes
///
/// Exact match is the only way to reach 1.0; otherwise the shared leading
/// prefix over the longer length, capped at 0.9.
pub fn postcode_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let common = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count();
    let longest = a.chars().count().max(b.chars().count());

    (common as f64 / longest as f64).min(POSTCODE_PARTIAL_CAP)
}

/// 1.0 only when both genders are known and equal
pub fn gender_similarity(a: Gender, b: Gender) -> f64 {
    if a == b && a.is_known() {
        1.0
    } else {
        0.0
    }
}

/// Token-set ratio in [0, 1]
///
/// Splits both strings into whitespace token sets. If one set contains the
/// other the ratio is 1.0; otherwise it is the best indel similarity among
/// "shared", "shared + rest of a" and "shared + rest of b".
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }

    let shared = shared.join(" ");
    let rest_a = only_a.join(" ");
    let rest_b = only_b.join(" ");

    if shared.is_empty() {
        return indel_ratio(&rest_a, &rest_b);
    }

    let combined_a = format!("{} {}", shared, rest_a);
    let combined_b = format!("{} {}", shared, rest_b);

    indel_ratio(&combined_a, &combined_b)
        .max(indel_ratio(&shared, &combined_a))
        .max(indel_ratio(&shared, &combined_b))
}

/// Normalized indel similarity: 2 * LCS / (len a + len b)
fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_length(&a, &b)) as f64 / total as f64
}

fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &x in a {
        let mut diagonal = 0;
        for (j, &y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
