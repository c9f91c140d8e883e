//! End-to-end pipeline tests
//!
//! Scenario tests for the whole detector plus property-based checks of the
//! clustering and scoring laws.

use std::collections::HashSet;

use im_linkage::{
    build_clusters, by_score_desc, candidate_pairs, evaluate, score_pair,
    truth_pairs_from_records, BlockingStrategy,
    DetectorConfig, DuplicateDetector, FeatureVector, Gender, NormalizedRecord, RawRecord,
    ScoredPair, Weights,
};
use proptest::prelude::*;
use rstest::rstest;

fn detector() -> DuplicateDetector {
    DuplicateDetector::new(DetectorConfig::default()).unwrap()
}

fn historical_batch() -> Vec<RawRecord> {
    vec![
        RawRecord::new("101")
            .with_name("Thomas", "Whitaker")
            .with_dob("1843-07-14")
            .with_birth_place("Halifax, Yorkshire")
            .with_postcode("HX1 2AB")
            .with_gender("Male")
            .with_occupation("wool comber")
            .with_group("g1"),
        RawRecord::new("102")
            .with_name("Tomas", "Whittaker")
            .with_dob("14/07/1843")
            .with_birth_place("Halifax Yorkshire")
            .with_postcode("HX12AB")
            .with_gender("m")
            .with_occupation("wool comber")
            .with_group("g1"),
        RawRecord::new("103")
            .with_name("Eliza", "Brontë")
            .with_dob("1851")
            .with_birth_place("Haworth")
            .with_postcode("BD22 8DR")
            .with_gender("female")
            .with_occupation("governess")
            .with_group("g2"),
        RawRecord::new("104")
            .with_name("Elizabeth", "Bronte")
            .with_dob("1851-02-03")
            .with_birth_place("Haworth")
            .with_postcode("BD22 8DR")
            .with_gender("F")
            .with_occupation("governess")
            .with_group("g2"),
        RawRecord::new("105")
            .with_name("Samuel", "Okafor")
            .with_dob("1870-11-30")
            .with_birth_place("Liverpool")
            .with_postcode("L1 8JQ")
            .with_gender("m")
            .with_occupation("ship's carpenter")
            .with_group("g3"),
    ]
}

// === Scenarios ===

#[test]
fn test_end_to_end_near_identical_names() {
    let records = vec![
        RawRecord::new("a")
            .with_name("William", "Harper")
            .with_dob("1880-05-01")
            .with_birth_place("York")
            .with_postcode("YO1 7HH")
            .with_gender("m")
            .with_occupation("baker"),
        RawRecord::new("b")
            .with_name("Wiliam", "Harper")
            .with_dob("1880-05-01")
            .with_birth_place("York")
            .with_postcode("YO1 7HH")
            .with_gender("m")
            .with_occupation("baker"),
        RawRecord::new("c")
            .with_name("Agnes", "Mcleod")
            .with_dob("1902")
            .with_birth_place("Inverness")
            .with_gender("f"),
    ];

    let result = detector().run(&records).unwrap();

    let pair = result
        .pairs
        .iter()
        .find(|p| p.canonical_ids() == ("a", "b"))
        .expect("a and b share a block key");
    assert!(pair.score >= 0.78, "score {}", pair.score);
    assert_eq!(pair.to_row().is_duplicate, 1);

    let rows = result.cluster_rows();
    let cluster_of = |id: &str| rows.iter().find(|r| r.unique_id == id).unwrap().clone();
    assert_eq!(cluster_of("a").cluster_id, cluster_of("b").cluster_id);
    assert_eq!(cluster_of("a").cluster_size, 2);
    assert_eq!(cluster_of("c").cluster_size, 1);
    assert_ne!(cluster_of("c").cluster_id, cluster_of("a").cluster_id);
}

#[test]
fn test_historical_batch_against_labels() {
    let records = historical_batch();
    let result = detector().run(&records).unwrap();
    let truth = truth_pairs_from_records(&records);

    assert_eq!(truth.len(), 2);
    assert_eq!(result.record_count(), records.len());

    let report = result.evaluate(truth.iter().map(|(a, b)| (a.as_str(), b.as_str())));
    assert_eq!(report.fp, 0, "{:?}", report);
    assert!(report.tp >= 1, "{:?}", report);
}

#[test]
fn test_missing_columns_are_not_errors() {
    let records = vec![RawRecord::new("1"), RawRecord::new("2").with_name("", "")];
    let result = detector().run(&records).unwrap();
    assert_eq!(result.cluster_count(), 2);
}

#[test]
fn test_evaluator_scenario() {
    let report = evaluate([("1", "2"), ("1", "3")], [("1", "2")]);
    assert_eq!((report.tp, report.fp, report.fn_), (1, 1, 0));
    assert_eq!(report.precision, 0.5);
    assert_eq!(report.recall, 1.0);
    assert_eq!(report.f1, 0.667);
}

#[test]
fn test_chained_clustering() {
    let edge = |a: &str, b: &str| ScoredPair {
        id1: a.to_string(),
        id2: b.to_string(),
        score: 0.8,
        features: FeatureVector::default(),
        is_duplicate: true,
    };
    let mut below = edge("A", "C");
    below.is_duplicate = false;

    let clusters = build_clusters(["A", "B", "C"], &[edge("A", "B"), edge("B", "C"), below]);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].size(), 3);
}

#[rstest]
#[case(BlockingStrategy::SurnameMetaphoneYear)]
#[case(BlockingStrategy::PostcodePrefixYear)]
#[case(BlockingStrategy::FirstInitialYear)]
fn test_every_strategy_partitions(#[case] strategy: BlockingStrategy) {
    let config = DetectorConfig::default().with_strategy(strategy);
    let records = historical_batch();
    let result = DuplicateDetector::new(config).unwrap().run(&records).unwrap();

    let rows = result.cluster_rows();
    let ids: HashSet<&str> = rows.iter().map(|r| r.unique_id.as_str()).collect();
    assert_eq!(rows.len(), records.len());
    assert_eq!(ids.len(), records.len());
}

#[test]
fn test_result_independent_of_input_order() {
    let records = historical_batch();
    let mut reversed = records.clone();
    reversed.reverse();

    let forward = detector().run(&records).unwrap();
    let backward = detector().run(&reversed).unwrap();

    assert_eq!(forward.clusters, backward.clusters);
    assert_eq!(forward.pairs, backward.pairs);
    assert!(forward.pairs.iter().all(|p| p.id1 <= p.id2));
}

// === Property-based tests ===

fn arb_record() -> impl Strategy<Value = NormalizedRecord> {
    (
        prop::sample::select(vec!["john", "jon", "mary", "marie", "ann", ""]),
        prop::sample::select(vec!["smith", "smyth", "jones", "brown", "braun", ""]),
        prop::option::of(1850i32..1853),
        prop::option::of(1u32..4),
        prop::option::of(1u32..4),
        prop::sample::select(vec!["leeds", "york", "new york", ""]),
        prop::sample::select(vec!["AB1CD", "AB1EF", "XY9ZZ", ""]),
        prop::sample::select(vec![Gender::Male, Gender::Female, Gender::Unknown]),
        prop::sample::select(vec!["weaver", "coal miner", "miner", ""]),
    )
        .prop_map(
            |(first, surname, year, month, day, place, postcode, gender, occupation)| {
                NormalizedRecord {
                    id: String::new(),
                    first_name: first.to_string(),
                    surname: surname.to_string(),
                    dob_year: year,
                    dob_month: month,
                    dob_day: day,
                    birth_place: place.to_string(),
                    postcode: postcode.to_string(),
                    gender,
                    occupation: occupation.to_string(),
                }
            },
        )
}

fn arb_batch() -> impl Strategy<Value = Vec<NormalizedRecord>> {
    prop::collection::vec(arb_record(), 0..25).prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.id = format!("r{:02}", i);
                r
            })
            .collect()
    })
}

fn arb_strategy() -> impl Strategy<Value = BlockingStrategy> {
    prop::sample::select(BlockingStrategy::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_clusters_partition_identifiers(records in arb_batch(), strategy in arb_strategy()) {
        let config = DetectorConfig::default().with_strategy(strategy);
        let result = DuplicateDetector::new(config).unwrap().run_normalized(&records).unwrap();

        let mut seen = HashSet::new();
        for cluster in &result.clusters {
            for id in &cluster.members {
                prop_assert!(seen.insert(id.clone()), "{} in two clusters", id);
            }
        }
        let expected: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn test_threshold_monotonicity(
        records in arb_batch(),
        t1 in 0.0f64..1.0,
        delta in 0.0f64..0.5,
    ) {
        let t2 = t1 + delta;
        let low = DuplicateDetector::new(DetectorConfig::default().with_threshold(t1)).unwrap();
        let high = DuplicateDetector::new(DetectorConfig::default().with_threshold(t2)).unwrap();

        let at_low: HashSet<(String, String)> = low
            .predict_pairs(&records)
            .unwrap()
            .into_iter()
            .filter(|p| p.is_duplicate)
            .map(|p| (p.id1, p.id2))
            .collect();
        let at_high: HashSet<(String, String)> = high
            .predict_pairs(&records)
            .unwrap()
            .into_iter()
            .filter(|p| p.is_duplicate)
            .map(|p| (p.id1, p.id2))
            .collect();

        prop_assert!(at_high.is_subset(&at_low));
    }

    #[test]
    fn test_score_symmetry(a in arb_record(), b in arb_record()) {
        let weights = Weights::default();
        let (score_ab, features_ab) = score_pair(&a, &b, &weights);
        let (score_ba, features_ba) = score_pair(&b, &a, &weights);
        prop_assert_eq!(score_ab, score_ba);
        prop_assert_eq!(features_ab, features_ba);
    }

    #[test]
    fn test_features_bounded(a in arb_record(), b in arb_record()) {
        let (_, f) = score_pair(&a, &b, &Weights::default());
        for value in [f.name, f.dob, f.birthplace, f.postcode, f.gender, f.occupation] {
            prop_assert!((0.0..=1.0).contains(&value), "feature out of range: {}", value);
        }
    }

    #[test]
    fn test_scoring_deterministic_and_sorted(records in arb_batch()) {
        let detector = detector();
        let first = detector.predict_pairs(&records).unwrap();
        let second = detector.predict_pairs(&records).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_scoring_matches_sequential_reference(
        records in arb_batch(),
        strategy in arb_strategy(),
        threshold in 0.0f64..1.0,
    ) {
        let config = DetectorConfig::default()
            .with_strategy(strategy)
            .with_threshold(threshold);
        let detector = DuplicateDetector::new(config.clone()).unwrap();

        let mut expected: Vec<ScoredPair> =
            candidate_pairs(&records, strategy, config.blocking.postcode_prefix_len)
                .iter()
                .map(|pair| {
                    ScoredPair::new(
                        &records[pair.left],
                        &records[pair.right],
                        &config.weights,
                        threshold,
                    )
                })
                .collect();
        expected.sort_by(by_score_desc);

        prop_assert_eq!(detector.predict_pairs(&records).unwrap(), expected);
    }

    #[test]
    fn test_candidate_pairs_unique(records in arb_batch(), strategy in arb_strategy()) {
        let pairs = candidate_pairs(&records, strategy, 3);
        let unique: HashSet<_> = pairs.iter().collect();
        prop_assert_eq!(unique.len(), pairs.len());
        prop_assert!(pairs.iter().all(|p| p.left < p.right));
    }
}
