//! UnitedHealthCare claims export: plain header-first table.
//!
//! This export carries no patient-name column, so the person comes from the
//! `medical-<person>-` token in the input filename.

use taxmed_core::{Category, ExpenseItem, Provider, RosterContext};

use super::{Table, blank_record, collapse_whitespace, parse_amount, parse_date};
use crate::error::IngestError;
use crate::registry::SourceFormat;
use crate::source::SourceFile;

pub fn parse(src: &SourceFile, ctx: &RosterContext) -> Result<Vec<ExpenseItem>, IngestError> {
    let text = src.read()?;
    parse_text(&text, src, ctx)
}

fn parse_text(
    text: &str,
    src: &SourceFile,
    ctx: &RosterContext,
) -> Result<Vec<ExpenseItem>, IngestError> {
    let file = src.file_name.as_str();

    let hint = src.person_hint.as_deref().ok_or_else(|| {
        IngestError::format(
            file,
            "filename carries no person token (expected medical-<person>-uhc_claims.csv)",
        )
    })?;
    let person = ctx.resolve(hint)?.to_string();

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| IngestError::format(file, format!("unparseable header: {e}")))?
        .clone();
    let table = Table::from_headers(&headers);
    table.require(file, &["Date Visited", "Visited Provider", "Plan Cost-Share"])?;

    let source = src.source_tag(SourceFormat::Uhc.name());
    let mut items = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let row = 2 + i;
        let record = record.map_err(|e| IngestError::format(file, format!("row {row}: {e}")))?;

        if blank_record(&record) {
            continue;
        }

        let raw_date = table.get(&record, "Date Visited");
        let service_date = parse_date(raw_date).ok_or_else(|| {
            IngestError::format(file, format!("row {row}: unparseable visit date {raw_date:?}"))
        })?;

        items.push(ExpenseItem {
            person: person.clone(),
            service_date,
            category: Category::Facility,
            provider: Provider::organization_only(collapse_whitespace(
                table.get(&record, "Visited Provider"),
            )),
            patient_amount: Some(parse_amount(table.get(&record, "Plan Cost-Share"))),
            note: String::new(),
            source: source.clone(),
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::{BigDecimal, Zero};
    use chrono::NaiveDate;

    fn ctx() -> RosterContext {
        RosterContext::new(vec!["John Smith".to_string(), "Jane Smith".to_string()])
    }

    const EXPORT: &str = "\
Claim Number,Date Visited,Visited Provider,Coverage Type,Claim Status,Total Billed,Plan Cost-Share,Plan Paid
C001,06/20/2023,DOWNTOWN  MEDICAL   GROUP,Medical,Processed,$200.00,$30.00,$120.00
C002,07/02/2023,DOWNTOWN MEDICAL GROUP,Medical,Processed,$90.00,,$80.00
";

    #[test]
    fn test_person_comes_from_filename_token() {
        let src = SourceFile::new("medical-john-uhc_claims.csv");
        let items = parse_text(EXPORT, &src, &ctx()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].person, "John Smith");
        assert_eq!(items[0].category, Category::Facility);
        assert_eq!(
            items[0].service_date,
            NaiveDate::from_ymd_opt(2023, 6, 20).unwrap()
        );
        assert_eq!(items[0].source, "UnitedHealthCare:medical-john-uhc_claims.csv");
    }

    #[test]
    fn test_provider_whitespace_collapsed() {
        let src = SourceFile::new("medical-john-uhc_claims.csv");
        let items = parse_text(EXPORT, &src, &ctx()).unwrap();
        assert_eq!(items[0].provider.to_string(), "DOWNTOWN MEDICAL GROUP");
    }

    #[test]
    fn test_blank_cost_share_is_zero_not_error() {
        let src = SourceFile::new("medical-john-uhc_claims.csv");
        let items = parse_text(EXPORT, &src, &ctx()).unwrap();
        assert_eq!(items[1].patient_amount, Some(BigDecimal::zero()));
    }

    #[test]
    fn test_missing_person_token_is_format_error() {
        let src = SourceFile::new("uhc_claims.csv");
        let err = parse_text(EXPORT, &src, &ctx()).unwrap_err();
        assert!(err.to_string().contains("person token"));
    }
}
