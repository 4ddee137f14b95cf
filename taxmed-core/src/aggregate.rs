//! Collapses equivalent line items before reporting.
//!
//! Sources routinely split one logical expense across several rows (per-line
//! Medicare allocations, pharmacy refill adjustments). Items identical on
//! the full identity tuple are one row; only the amount differs and sums.

use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::expense::{Category, ExpenseItem};

type GroupKey = (String, NaiveDate, Category, String, String, String);

/// Group by `(person, service_date, category, provider, note, source)` and
/// sum `patient_amount` within each group. Output order is first-occurrence
/// order of each key.
pub fn aggregate(items: Vec<ExpenseItem>) -> Vec<ExpenseItem> {
    let mut groups: IndexMap<GroupKey, ExpenseItem> = IndexMap::new();

    for item in items {
        let key = (
            item.person.clone(),
            item.service_date,
            item.category,
            item.provider.to_string(),
            item.note.clone(),
            item.source.clone(),
        );

        match groups.entry(key) {
            Entry::Occupied(mut entry) => {
                let merged = entry.get_mut();
                merged.patient_amount =
                    sum_amounts(merged.patient_amount.take(), item.patient_amount);
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }

    groups.into_values().collect()
}

/// Retain only items whose service date falls in the given calendar year.
pub fn filter_year(items: Vec<ExpenseItem>, year: i32) -> Vec<ExpenseItem> {
    items
        .into_iter()
        .filter(|item| item.service_date.year() == year)
        .collect()
}

/// Absent amounts count as zero when summed with a present one; a group
/// that never sees a present amount stays absent.
fn sum_amounts(a: Option<BigDecimal>, b: Option<BigDecimal>) -> Option<BigDecimal> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or_else(BigDecimal::zero) + b.unwrap_or_else(BigDecimal::zero)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::Provider;

    fn money(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn item(note: &str, amount: Option<&str>) -> ExpenseItem {
        ExpenseItem {
            person: "John Smith".to_string(),
            service_date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            category: Category::Prescription,
            provider: Provider::organization_only("CVS PHARMACY"),
            patient_amount: amount.map(money),
            note: note.to_string(),
            source: "Caremark:medical-john-caremark_claims.CSV".to_string(),
        }
    }

    #[test]
    fn test_identical_keys_collapse_and_sum() {
        let rows = aggregate(vec![
            item("METFORMIN RX#111", Some("12.50")),
            item("METFORMIN RX#111", Some("3.00")),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].patient_amount, Some(money("15.50")));
    }

    #[test]
    fn test_differing_note_stays_separate() {
        let rows = aggregate(vec![
            item("METFORMIN RX#111", Some("12.50")),
            item("METFORMIN RX#222", Some("12.50")),
        ]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_absent_amounts_keep_group_without_fabricating_zero() {
        let rows = aggregate(vec![item("METFORMIN RX#111", None), item("METFORMIN RX#111", None)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].patient_amount, None);
    }

    #[test]
    fn test_absent_counts_as_zero_next_to_present() {
        let rows = aggregate(vec![
            item("METFORMIN RX#111", None),
            item("METFORMIN RX#111", Some("4.25")),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].patient_amount, Some(money("4.25")));
    }

    #[test]
    fn test_output_order_is_first_occurrence() {
        let rows = aggregate(vec![
            item("B", Some("1.00")),
            item("A", Some("1.00")),
            item("B", Some("1.00")),
        ]);
        let notes: Vec<&str> = rows.iter().map(|r| r.note.as_str()).collect();
        assert_eq!(notes, ["B", "A"]);
        assert_eq!(rows[0].patient_amount, Some(money("2.00")));
    }

    #[test]
    fn test_filter_year() {
        let mut early = item("A", Some("1.00"));
        early.service_date = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        let kept = item("B", Some("1.00"));

        let rows = filter_year(vec![early, kept], 2023);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].note, "B");
    }
}
