//! Duplicate detection pipeline
//!
//! normalize -> block -> score candidate pairs -> cluster duplicates
//!
//! The detector owns its configuration. Concurrent runs that need different
//! settings build separate detectors rather than sharing a mutable one.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blocking::{candidate_pairs, CandidatePair};
use crate::cluster::{build_clusters, cluster_assignments, Cluster, ClusterAssignment};
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::evaluation::{evaluate_scored, EvaluationReport};
use crate::normalization::{ensure_unique_ids, normalize_batch};
use crate::record::{NormalizedRecord, RawRecord};
use crate::scoring::{PairRow, ScoredPair};

/// Output of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Every scored candidate pair, best score first
    pub pairs: Vec<ScoredPair>,
    /// Clusters covering every input identifier
    pub clusters: Vec<Cluster>,
}

impl DetectionResult {
    /// Pairs classified as duplicates
    pub fn duplicates(&self) -> impl Iterator<Item = &ScoredPair> {
        self.pairs.iter().filter(|p| p.is_duplicate)
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates().count()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn record_count(&self) -> usize {
        self.clusters.iter().map(Cluster::size).sum()
    }

    /// Pairs table rows
    pub fn pair_rows(&self) -> Vec<PairRow> {
        self.pairs.iter().map(ScoredPair::to_row).collect()
    }

    /// Clusters table rows
    pub fn cluster_rows(&self) -> Vec<ClusterAssignment> {
        cluster_assignments(&self.clusters)
    }

    /// Score the duplicate pairs against known true pairs
    pub fn evaluate<T, C, D>(&self, truth: T) -> EvaluationReport
    where
        T: IntoIterator<Item = (C, D)>,
        C: AsRef<str>,
        D: AsRef<str>,
    {
        evaluate_scored(&self.pairs, truth)
    }
}

/// Score descending, then identifiers ascending
///
/// Pairs carry canonical `(id1, id2)`, so this is a total order independent
/// of input position.
pub fn by_score_desc(a: &ScoredPair, b: &ScoredPair) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.id1.cmp(&b.id1))
        .then_with(|| a.id2.cmp(&b.id2))
}

/// Entity resolution over a batch of person records
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    config: DetectorConfig,
}

impl DuplicateDetector {
    /// Create a detector, validating the configuration
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.check()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Candidate pairs for already-normalized records
    pub fn candidate_pairs(&self, records: &[NormalizedRecord]) -> Vec<CandidatePair> {
        candidate_pairs(
            records,
            self.config.blocking.strategy,
            self.config.blocking.postcode_prefix_len,
        )
    }

    /// Score every candidate pair, sorted by score descending
    pub fn predict_pairs(&self, records: &[NormalizedRecord]) -> Result<Vec<ScoredPair>> {
        ensure_unique_ids(records)?;
        let candidates = self.candidate_pairs(records);
        let mut pairs = self.score_candidates(records, &candidates);
        pairs.sort_by(by_score_desc);
        Ok(pairs)
    }

    #[cfg(not(feature = "parallel"))]
    fn score_candidates(
        &self,
        records: &[NormalizedRecord],
        candidates: &[CandidatePair],
    ) -> Vec<ScoredPair> {
        candidates
            .iter()
            .map(|pair| self.score_candidate(records, pair))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn score_candidates(
        &self,
        records: &[NormalizedRecord],
        candidates: &[CandidatePair],
    ) -> Vec<ScoredPair> {
        use rayon::prelude::*;

        candidates
            .par_iter()
            .map(|pair| self.score_candidate(records, pair))
            .collect()
    }

    fn score_candidate(&self, records: &[NormalizedRecord], pair: &CandidatePair) -> ScoredPair {
        ScoredPair::new(
            &records[pair.left],
            &records[pair.right],
            &self.config.weights,
            self.config.pair_score_threshold(),
        )
    }

    /// Run the pipeline on normalized records
    pub fn run_normalized(&self, records: &[NormalizedRecord]) -> Result<DetectionResult> {
        let pairs = self.predict_pairs(records)?;
        debug!(
            "Scored {} candidate pairs, {} above threshold {}",
            pairs.len(),
            pairs.iter().filter(|p| p.is_duplicate).count(),
            self.config.pair_score_threshold()
        );

        let clusters = build_clusters(records.iter().map(|r| r.id.as_str()), &pairs);
        let result = DetectionResult { pairs, clusters };

        info!(
            "Found {} clusters across {} records ({} duplicate pairs)",
            result.cluster_count(),
            records.len(),
            result.duplicate_count()
        );
        Ok(result)
    }

    /// Normalize raw records, then run the pipeline
    pub fn run(&self, raw: &[RawRecord]) -> Result<DetectionResult> {
        let records = normalize_batch(raw)?;
        self.run_normalized(&records)
    }
}
