//! End-to-end scan over the committed fixture directory: every format is
//! represented once, plus an unrelated file nothing should recognize.

use std::path::PathBuf;

use bigdecimal::BigDecimal;
use taxmed_core::{Category, RosterContext, aggregate, filter_year};
use taxmed_ingest::scan_directory;

fn testdata() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn ctx() -> RosterContext {
    RosterContext::new(vec!["John Smith".to_string(), "Jane Smith".to_string()])
}

fn money(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

#[test]
fn test_scan_parses_every_format() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();

    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
    assert_eq!(report.items.len(), 12);

    let by_source = |prefix: &str| {
        report
            .items
            .iter()
            .filter(|i| i.source.starts_with(prefix))
            .count()
    };
    assert_eq!(by_source("BlueShieldMedical:"), 2);
    assert_eq!(by_source("BlueShieldPharmacy:"), 2);
    assert_eq!(by_source("Caremark:"), 3);
    assert_eq!(by_source("UnitedHealthCare:"), 2);
    assert_eq!(by_source("Medicare:"), 3);
}

#[test]
fn test_unrecognized_file_is_skipped_not_failed() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert!(
        report.skipped[0].ends_with("notes.txt"),
        "skipped: {:?}",
        report.skipped
    );
}

#[test]
fn test_every_person_is_a_roster_entry() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();
    let roster = ctx();

    for item in &report.items {
        assert!(
            roster.people().contains(&item.person),
            "unresolved person {:?} in {}",
            item.person,
            item.source
        );
    }
}

#[test]
fn test_amounts_are_non_negative_when_present() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();

    for item in &report.items {
        if let Some(amount) = &item.patient_amount {
            assert!(*amount >= BigDecimal::from(0), "negative amount in {}", item.source);
        }
    }
}

#[test]
fn test_aggregate_collapses_split_caremark_fill() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();
    let rows = aggregate(report.items);

    // The Caremark fixture splits one fill across two rows: 12.50 + 3.00.
    assert_eq!(rows.len(), 11);
    let metformin = rows
        .iter()
        .find(|r| r.note == "METFORMIN 500MG RX#1234567")
        .unwrap();
    assert_eq!(metformin.patient_amount, Some(money("15.50")));
}

#[test]
fn test_part_d_amount_stays_absent_through_aggregation() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();
    let rows = aggregate(report.items);

    let part_d = rows
        .iter()
        .find(|r| r.source.starts_with("Medicare:") && r.category == Category::Prescription)
        .unwrap();
    assert_eq!(part_d.patient_amount, None);
}

#[test]
fn test_year_filter_bounds_the_run() {
    let report = scan_directory(&testdata(), &ctx()).unwrap();
    let total = report.items.len();

    assert_eq!(filter_year(report.items.clone(), 2023).len(), total);
    assert_eq!(filter_year(report.items, 2022).len(), 0);
}

#[test]
fn test_scan_is_idempotent() {
    let first = scan_directory(&testdata(), &ctx()).unwrap();
    let second = scan_directory(&testdata(), &ctx()).unwrap();
    assert_eq!(first.items, second.items);
}
