//! Caremark prescription-claims export: three preamble lines, then a
//! header-keyed table that ends at a totals row rather than at EOF.

use taxmed_core::{Category, ExpenseItem, Provider, RosterContext};
use tracing::debug;

use super::{Table, parse_amount, parse_date, skip_preamble};
use crate::error::IngestError;
use crate::registry::SourceFormat;
use crate::source::SourceFile;

const PREAMBLE_LINES: usize = 3;

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
    let body = skip_preamble(text, PREAMBLE_LINES);

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| IngestError::format(file, format!("unparseable header: {e}")))?
        .clone();
    let table = Table::from_headers(&headers);
    table.require(
        file,
        &[
            "Member Name",
            "Drug Name",
            "RX #",
            "Last Filled",
            "Pharmacy Name",
            "You Paid",
        ],
    )?;

    let source = src.source_tag(SourceFormat::Caremark.name());
    let mut items = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let row = PREAMBLE_LINES + 2 + i;
        let record = record.map_err(|e| IngestError::format(file, format!("row {row}: {e}")))?;

        // A near-empty row is the export's end-of-data marker; everything
        // after it is footer text.
        let populated = record.iter().filter(|f| !f.trim().is_empty()).count();
        if populated <= 1 {
            debug!(file, row, "end-of-data row reached");
            break;
        }

        let person = ctx.resolve(table.get(&record, "Member Name"))?.to_string();

        let raw_date = table.get(&record, "Last Filled");
        let service_date = parse_date(raw_date).ok_or_else(|| {
            IngestError::format(file, format!("row {row}: unparseable fill date {raw_date:?}"))
        })?;

        items.push(ExpenseItem {
            person,
            service_date,
            category: Category::Prescription,
            provider: Provider::organization_only(table.get(&record, "Pharmacy Name")),
            patient_amount: Some(parse_amount(table.get(&record, "You Paid"))),
            note: format!(
                "{} RX#{}",
                table.get(&record, "Drug Name"),
                table.get(&record, "RX #")
            ),
            source: source.clone(),
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn ctx() -> RosterContext {
        RosterContext::new(vec!["John Smith".to_string(), "Jane Smith".to_string()])
    }

    fn money(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    const EXPORT: &str = "\
CVS Caremark
Prescription Claim History
Printed 01/31/2024
Member Name,Drug Name,RX #,Last Filled,Pharmacy Name,You Paid,Your Plan(s) Paid,Amount Applied To Deductible
SMITH; JON,METFORMIN 500MG,1234567,03/14/2023,CVS PHARMACY #1234,$12.50,$45.00,$0.00
SMITH; JANE,ATORVASTATIN 20MG,7654321,06/02/2023,CVS PHARMACY #1234,$4.00,$22.10,$0.00
Totals
SMITH; JANE,NEVER PARSED,0000000,01/01/2023,CVS PHARMACY #1234,$99.99,$0.00,$0.00
";

    #[test]
    fn test_fuzzy_person_and_dollar_amount() {
        let src = SourceFile::new("medical-jane-caremark_claims.CSV");
        let items = parse_text(EXPORT, &src, &ctx()).unwrap();

        let first = &items[0];
        assert_eq!(first.person, "John Smith");
        assert_eq!(first.category, Category::Prescription);
        assert_eq!(first.patient_amount, Some(money("12.50")));
        assert_eq!(first.note, "METFORMIN 500MG RX#1234567");
        assert_eq!(
            first.service_date,
            NaiveDate::from_ymd_opt(2023, 3, 14).unwrap()
        );
        assert_eq!(first.source, "Caremark:medical-jane-caremark_claims.CSV");
    }

    #[test]
    fn test_single_field_row_terminates_scan() {
        let src = SourceFile::new("medical-jane-caremark_claims.CSV");
        let items = parse_text(EXPORT, &src, &ctx()).unwrap();

        // The "Totals" row stops the scan; the row after it never parses.
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.note.contains("NEVER PARSED")));
    }
}
