//! im-linkage - Entity resolution for person records
//!
//! Finds pairs of noisy person records that likely describe the same
//! individual and groups them into clusters of distinct entities:
//!
//! - **Normalization**: free-text fields folded into comparable form
//! - **Blocking**: cheap keys so only plausible pairs are compared
//! - **Similarity**: per-field scores (names, dates, places, postcodes, gender)
//! - **Scoring**: weighted combination and threshold classification
//! - **Clustering**: connected components over predicted duplicates
//! - **Evaluation**: precision / recall / F1 against ground truth
//!
//! # Features
//!
//! - `parallel`: score candidate pairs on the rayon thread pool. Output is
//!   identical to the sequential build; run the test suite with and without
//!   `--features parallel` to check both paths.
//!
//! # Example
//!
//! ```
//! use im_linkage::{DetectorConfig, DuplicateDetector, RawRecord};
//!
//! let records = vec![
//!     RawRecord::new("1").with_name("John", "Smith").with_dob("1850-03-02"),
//!     RawRecord::new("2").with_name("Jon", "Smith").with_dob("1850-03-02"),
//! ];
//!
//! let detector = DuplicateDetector::new(DetectorConfig::default()).unwrap();
//! let result = detector.run(&records).unwrap();
//! assert_eq!(result.pairs.len(), 1);
//! assert_eq!(result.record_count(), 2);
//! ```

pub mod blocking;
pub mod cluster;
pub mod config;
pub mod detector;
pub mod error;
pub mod evaluation;
pub mod normalization;
pub mod phonetic;
pub mod record;
pub mod scoring;
pub mod similarity;

pub use blocking::{block_keys, candidate_pairs, BlockKey, BlockingStrategy, CandidatePair};
pub use cluster::{
    build_clusters, cluster_assignments, Cluster, ClusterAssignment, DuplicateGraph, UnionFind,
};
pub use config::{BlockingConfig, DetectorConfig, ThresholdConfig, Weights};
pub use detector::{by_score_desc, DetectionResult, DuplicateDetector};
pub use error::{ConfigError, LinkageError, Result};
pub use evaluation::{
    evaluate, evaluate_scored, truth_pairs_from_groups, truth_pairs_from_records,
    EvaluationReport,
};
pub use normalization::{normalize_batch, normalize_record};
pub use record::{Gender, NormalizedRecord, RawRecord};
pub use scoring::{classify, score_pair, FeatureVector, PairRow, ScoredPair};
