//! Evaluation of predicted duplicate pairs against ground truth

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::record::RawRecord;
use crate::scoring::ScoredPair;

/// Pair quality metrics; ratios rounded to 3 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Order-independent pair key
pub fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn canonical_set<I, A, B>(pairs: I) -> HashSet<(String, String)>
where
    I: IntoIterator<Item = (A, B)>,
    A: AsRef<str>,
    B: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(a, b)| canonical_pair(a.as_ref(), b.as_ref()))
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Compare predicted duplicate pairs with the true ones
///
/// Both sides are canonicalized, so `(a, b)` and `(b, a)` count once.
pub fn evaluate<P, T, A, B, C, D>(predicted: P, truth: T) -> EvaluationReport
where
    P: IntoIterator<Item = (A, B)>,
    T: IntoIterator<Item = (C, D)>,
    A: AsRef<str>,
    B: AsRef<str>,
    C: AsRef<str>,
    D: AsRef<str>,
{
    let predicted = canonical_set(predicted);
    let truth = canonical_set(truth);

    let tp = truth.intersection(&predicted).count();
    let fp = predicted.difference(&truth).count();
    let fn_ = truth.difference(&predicted).count();

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationReport {
        tp,
        fp,
        fn_,
        precision: round3(precision),
        recall: round3(recall),
        f1: round3(f1),
    }
}

/// Evaluate only the pairs classified as duplicates
pub fn evaluate_scored<T, C, D>(pairs: &[ScoredPair], truth: T) -> EvaluationReport
where
    T: IntoIterator<Item = (C, D)>,
    C: AsRef<str>,
    D: AsRef<str>,
{
    let predicted = pairs
        .iter()
        .filter(|p| p.is_duplicate)
        .map(|p| (p.id1.as_str(), p.id2.as_str()));
    evaluate(predicted, truth)
}

/// All within-group pairs from (identifier, group label) assignments
///
/// Every two identifiers sharing a label form a true pair. Pairs come out
/// canonical and sorted.
pub fn truth_pairs_from_groups<I, A, B>(labels: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (A, B)>,
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (id, group) in labels {
        groups
            .entry(group.as_ref().to_string())
            .or_default()
            .push(id.as_ref().to_string());
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    for members in groups.values() {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if a != b {
                    pairs.push(canonical_pair(a, b));
                }
            }
        }
    }
    pairs.sort();
    pairs.dedup();
    pairs
}

/// Truth pairs from the `duplicate_group` labels of raw records
///
/// Records without an identifier or a label are skipped.
pub fn truth_pairs_from_records(records: &[RawRecord]) -> Vec<(String, String)> {
    let labels = records.iter().filter_map(|r| {
        let id = r.identifier()?;
        let group = r
            .duplicate_group
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((id, group))
    });
    truth_pairs_from_groups(labels)
}
