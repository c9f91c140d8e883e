//! Blocking: cheap keys that decide which records get compared
//!
//! Only records sharing a block key become candidate pairs, turning the full
//! O(n²) cross product into work proportional to block sizes. The price is
//! recall: true duplicates whose blocking fields disagree (a mistyped surname
//! that changes its phonetic code) are never compared.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::phonetic::metaphone;
use crate::record::NormalizedRecord;

/// Block key, opaque outside this module
pub type BlockKey = String;

/// How block keys are derived from a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockingStrategy {
    /// Surname phonetic code + birth year
    #[default]
    SurnameMetaphoneYear,
    /// Postcode prefix + birth year
    PostcodePrefixYear,
    /// First name initial + birth year
    FirstInitialYear,
}

impl BlockingStrategy {
    pub const ALL: [BlockingStrategy; 3] = [
        BlockingStrategy::SurnameMetaphoneYear,
        BlockingStrategy::PostcodePrefixYear,
        BlockingStrategy::FirstInitialYear,
    ];

    /// Configuration name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockingStrategy::SurnameMetaphoneYear => "surname_metaphone_year",
            BlockingStrategy::PostcodePrefixYear => "postcode_prefix_year",
            BlockingStrategy::FirstInitialYear => "first_initial_year",
        }
    }

    /// Parse a strategy name, falling back to the default for unknown names
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == name)
            .unwrap_or_else(|| {
                warn!(
                    "Unknown blocking strategy '{}', using {}",
                    name,
                    Self::default()
                );
                Self::default()
            })
    }

    /// Block key for a single record
    pub fn key(&self, record: &NormalizedRecord, postcode_prefix_len: usize) -> BlockKey {
        let prefix: String = match self {
            BlockingStrategy::SurnameMetaphoneYear => metaphone(&record.surname)
                .unwrap_or_else(|| record.surname.chars().take(1).collect()),
            BlockingStrategy::PostcodePrefixYear => {
                record.postcode.chars().take(postcode_prefix_len).collect()
            }
            BlockingStrategy::FirstInitialYear => record.first_name.chars().take(1).collect(),
        };
        format!("{}|{}", prefix, record.year_key())
    }
}

impl fmt::Display for BlockingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockingStrategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for BlockingStrategy {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<BlockingStrategy> for String {
    fn from(strategy: BlockingStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// Two distinct records that share a block key
///
/// Holds indices into the record batch; `left < right` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidatePair {
    pub left: usize,
    pub right: usize,
}

impl CandidatePair {
    /// Build a pair in canonical order, `None` for a self-pair
    pub fn new(a: usize, b: usize) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { left: a, right: b }),
            std::cmp::Ordering::Greater => Some(Self { left: b, right: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Block key of every record, index-aligned with `records`
pub fn block_keys(
    records: &[NormalizedRecord],
    strategy: BlockingStrategy,
    postcode_prefix_len: usize,
) -> Vec<BlockKey> {
    records
        .iter()
        .map(|record| strategy.key(record, postcode_prefix_len))
        .collect()
}

/// Group record indices by key, keys ascending and members in input order
pub fn group_by_key(keys: &[BlockKey]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, key) in keys.iter().enumerate() {
        groups.entry(key.as_str()).or_default().push(index);
    }
    groups
}

/// All candidate pairs for a batch under one strategy
///
/// Every block of size n contributes its C(n, 2) pairs. Pairs are emitted
/// once each, in block-key order.
pub fn candidate_pairs(
    records: &[NormalizedRecord],
    strategy: BlockingStrategy,
    postcode_prefix_len: usize,
) -> Vec<CandidatePair> {
    let keys = block_keys(records, strategy, postcode_prefix_len);
    let groups = group_by_key(&keys);

    let mut seen: HashSet<CandidatePair> = HashSet::new();
    let mut pairs = Vec::new();
    for members in groups.values().filter(|members| members.len() > 1) {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if let Some(pair) = CandidatePair::new(a, b) {
                    if seen.insert(pair) {
                        pairs.push(pair);
                    }
                }
            }
        }
    }

    debug!(
        "Blocking with {}: {} records, {} blocks, {} candidate pairs",
        strategy,
        records.len(),
        groups.len(),
        pairs.len()
    );
    pairs
}
