//! Pair scoring and classification

use serde::{Deserialize, Serialize};

use crate::config::Weights;
use crate::record::NormalizedRecord;
use crate::similarity::{
    dob_similarity, gender_similarity, name_similarity, postcode_similarity, text_similarity,
};

/// Per-feature similarity scores for one pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub name: f64,
    pub dob: f64,
    pub birthplace: f64,
    pub postcode: f64,
    pub gender: f64,
    pub occupation: f64,
}

impl FeatureVector {
    /// Compute all six features for a record pair
    pub fn compute(r1: &NormalizedRecord, r2: &NormalizedRecord) -> Self {
        Self {
            name: name_similarity(&r1.first_name, &r1.surname, &r2.first_name, &r2.surname),
            dob: dob_similarity(
                r1.dob_year,
                r1.dob_month,
                r1.dob_day,
                r2.dob_year,
                r2.dob_month,
                r2.dob_day,
            ),
            birthplace: text_similarity(&r1.birth_place, &r2.birth_place),
            postcode: postcode_similarity(&r1.postcode, &r2.postcode),
            gender: gender_similarity(r1.gender, r2.gender),
            occupation: text_similarity(&r1.occupation, &r2.occupation),
        }
    }

    /// Weighted sum of the features
    pub fn weighted_sum(&self, weights: &Weights) -> f64 {
        weights.name * self.name
            + weights.dob * self.dob
            + weights.birthplace * self.birthplace
            + weights.postcode * self.postcode
            + weights.gender * self.gender
            + weights.occupation * self.occupation
    }
}

/// Score a record pair: weighted sum plus the features behind it
pub fn score_pair(
    r1: &NormalizedRecord,
    r2: &NormalizedRecord,
    weights: &Weights,
) -> (f64, FeatureVector) {
    let features = FeatureVector::compute(r1, r2);
    (features.weighted_sum(weights), features)
}

/// Duplicate when the score reaches the threshold (inclusive)
pub fn classify(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// A scored candidate pair, one row of the pairs table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    pub id1: String,
    pub id2: String,
    pub score: f64,
    pub features: FeatureVector,
    pub is_duplicate: bool,
}

impl ScoredPair {
    /// Score and classify a record pair
    ///
    /// `id1 <= id2` always, whatever order the records are passed in.
    pub fn new(
        r1: &NormalizedRecord,
        r2: &NormalizedRecord,
        weights: &Weights,
        threshold: f64,
    ) -> Self {
        let (r1, r2) = if r1.id <= r2.id { (r1, r2) } else { (r2, r1) };
        let (score, features) = score_pair(r1, r2, weights);
        Self {
            id1: r1.id.clone(),
            id2: r2.id.clone(),
            score,
            features,
            is_duplicate: classify(score, threshold),
        }
    }

    /// Identifiers as a sorted tuple
    pub fn canonical_ids(&self) -> (&str, &str) {
        if self.id1 <= self.id2 {
            (&self.id1, &self.id2)
        } else {
            (&self.id2, &self.id1)
        }
    }

    /// Flat row for tabular output
    pub fn to_row(&self) -> PairRow {
        PairRow {
            id1: self.id1.clone(),
            id2: self.id2.clone(),
            score: self.score,
            feat_name: self.features.name,
            feat_dob: self.features.dob,
            feat_birthplace: self.features.birthplace,
            feat_postcode: self.features.postcode,
            feat_gender: self.features.gender,
            feat_occupation: self.features.occupation,
            is_duplicate: u8::from(self.is_duplicate),
        }
    }
}

/// Flat pairs-table row: `id1, id2, score, feat_*, is_duplicate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRow {
    pub id1: String,
    pub id2: String,
    pub score: f64,
    pub feat_name: f64,
    pub feat_dob: f64,
    pub feat_birthplace: f64,
    pub feat_postcode: f64,
    pub feat_gender: f64,
    pub feat_occupation: f64,
    /// 1 for a predicted duplicate, 0 otherwise
    pub is_duplicate: u8,
}

impl PairRow {
    pub fn is_duplicate(&self) -> bool {
        self.is_duplicate != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Gender;

    fn person(id: &str, first: &str, surname: &str) -> NormalizedRecord {
        NormalizedRecord {
            id: id.to_string(),
            first_name: first.to_string(),
            surname: surname.to_string(),
            dob_year: Some(1850),
            dob_month: Some(3),
            dob_day: Some(2),
            birth_place: "leeds".to_string(),
            postcode: "LS11AA".to_string(),
            gender: Gender::Male,
            occupation: "weaver".to_string(),
        }
    }

    #[test]
    fn test_identical_records_score_total_weight() {
        let a = person("a", "john", "smith");
        let b = person("b", "john", "smith");
        let weights = Weights::default();
        let (score, features) = score_pair(&a, &b, &weights);

        assert_eq!(features.name, 1.0);
        assert_eq!(features.dob, 1.0);
        assert_eq!(features.gender, 1.0);
        assert!((score - weights.total()).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_ignore_features() {
        let a = person("a", "john", "smith");
        let b = person("b", "john", "smith");
        let weights = Weights {
            name: 1.0,
            ..Weights::zero()
        };
        let (score, _) = score_pair(&a, &b, &weights);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(classify(0.78, 0.78));
        assert!(!classify(0.7799, 0.78));
    }

    #[test]
    fn test_scored_pair_row() {
        let a = person("a", "john", "smith");
        let mut b = person("b", "mary", "jones");
        b.gender = Gender::Female;
        let pair = ScoredPair::new(&a, &b, &Weights::default(), 0.78);
        assert!(!pair.is_duplicate);

        let row = pair.to_row();
        assert_eq!(row.id1, "a");
        assert_eq!(row.feat_gender, 0.0);
        assert_eq!(row.is_duplicate, 0);
        assert!(!row.is_duplicate());
    }

    #[test]
    fn test_canonical_ids() {
        let a = person("z9", "john", "smith");
        let b = person("a1", "john", "smith");
        let pair = ScoredPair::new(&a, &b, &Weights::default(), 0.78);
        assert_eq!(pair.canonical_ids(), ("a1", "z9"));
        assert_eq!((pair.id1.as_str(), pair.id2.as_str()), ("a1", "z9"));

        let swapped = ScoredPair::new(&b, &a, &Weights::default(), 0.78);
        assert_eq!(swapped, pair);
    }
}
