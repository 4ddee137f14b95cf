//! Tabular report sink: one CSV row per aggregated group.

use std::io::Write;

use anyhow::Result;
use taxmed_core::ExpenseItem;

const COLUMNS: [&str; 7] = [
    "person",
    "service_date",
    "category",
    "provider",
    "patient_amount",
    "note",
    "source",
];

/// Write aggregated items as CSV. Absent amounts become empty fields, not
/// zeros; the report preserves what the sources actually said.
pub fn write_report<W: Write>(out: W, items: &[ExpenseItem]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(COLUMNS)?;

    for item in items {
        let amount = item
            .patient_amount
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_default();
        writer.write_record([
            item.person.clone(),
            item.service_date.to_string(),
            item.category.as_str().to_string(),
            item.provider.to_string(),
            amount,
            item.note.clone(),
            item.source.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taxmed_core::{Category, Provider};

    fn item(amount: Option<&str>) -> ExpenseItem {
        ExpenseItem {
            person: "John Smith".to_string(),
            service_date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            category: Category::Prescription,
            provider: Provider::organization_only("CVS PHARMACY"),
            patient_amount: amount.map(|a| a.parse().unwrap()),
            note: "Metformin".to_string(),
            source: "Medicare:medical-john-medicare_claims.txt".to_string(),
        }
    }

    #[test]
    fn test_report_layout() {
        let mut buf = Vec::new();
        write_report(&mut buf, &[item(Some("12.50"))]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "person,service_date,category,provider,patient_amount,note,source"
        );
        assert_eq!(
            lines.next().unwrap(),
            "John Smith,2023-03-01,prescription,CVS PHARMACY,12.50,Metformin,Medicare:medical-john-medicare_claims.txt"
        );
    }

    #[test]
    fn test_absent_amount_is_empty_field() {
        let mut buf = Vec::new();
        write_report(&mut buf, &[item(None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.lines().nth(1).unwrap().contains(",prescription,CVS PHARMACY,,Metformin,"));
    }
}
