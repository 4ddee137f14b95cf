//! BlueShield claim exports.
//!
//! Two delimited tables share the carrier's export shape: four preamble
//! lines, then a header-keyed body. The medical table reports patient
//! responsibility split across three columns; the pharmacy table reports a
//! single amount per fill.

use taxmed_core::{Category, ExpenseItem, Provider, RosterContext};
use tracing::debug;

use super::{Table, blank_record, parse_amount, parse_date, skip_preamble};
use crate::error::IngestError;
use crate::registry::SourceFormat;
use crate::source::SourceFile;

const PREAMBLE_LINES: usize = 4;

/// Sentinel the export writes when no individual doctor is on record.
const DOCTOR_UNAVAILABLE: &str = "Unavailable";

pub fn parse_medical(
    src: &SourceFile,
    ctx: &RosterContext,
) -> Result<Vec<ExpenseItem>, IngestError> {
    let text = src.read()?;
    parse_medical_text(&text, src, ctx)
}

fn parse_medical_text(
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
            "Group ID",
            "Patient",
            "Provider Name",
            "Doctor Name",
            "Specialty",
            "Dates of Service",
            "Patient Responsibility Non-Covered",
            "Patient Responsibility Deductible",
            "Patient Responsibility Copay/Coinsurance",
        ],
    )?;

    let source = src.source_tag(SourceFormat::BlueShieldMedical.name());
    let mut items = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let row = PREAMBLE_LINES + 2 + i;
        let record = record.map_err(|e| IngestError::format(file, format!("row {row}: {e}")))?;

        // Summary/footer rows come through without a Group ID.
        if table.get(&record, "Group ID").is_empty() {
            debug!(file, row, "skipping row without Group ID");
            continue;
        }

        let person = ctx.resolve(table.get(&record, "Patient"))?.to_string();

        let amount = parse_amount(table.get(&record, "Patient Responsibility Non-Covered"))
            + parse_amount(table.get(&record, "Patient Responsibility Deductible"))
            + parse_amount(table.get(&record, "Patient Responsibility Copay/Coinsurance"));

        let raw_date = table.get(&record, "Dates of Service");
        let service_date = parse_date(raw_date).ok_or_else(|| {
            IngestError::format(file, format!("row {row}: unparseable service date {raw_date:?}"))
        })?;

        let doctor = match table.get(&record, "Doctor Name") {
            "" | DOCTOR_UNAVAILABLE => None,
            name => Some(name.to_string()),
        };

        items.push(ExpenseItem {
            person,
            service_date,
            category: Category::Facility,
            provider: Provider::new(table.get(&record, "Provider Name"), doctor),
            patient_amount: Some(amount),
            note: table.get(&record, "Specialty").to_string(),
            source: source.clone(),
        });
    }

    Ok(items)
}

pub fn parse_pharmacy(
    src: &SourceFile,
    ctx: &RosterContext,
) -> Result<Vec<ExpenseItem>, IngestError> {
    let text = src.read()?;
    parse_pharmacy_text(&text, src, ctx)
}

fn parse_pharmacy_text(
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
            "Patient Name",
            "Drug Name",
            "Fill Date",
            "Pharmacy Name",
            "Patient Responsibility",
            "Prescription Number (RX #)",
        ],
    )?;

    let source = src.source_tag(SourceFormat::BlueShieldPharmacy.name());
    let mut items = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let row = PREAMBLE_LINES + 2 + i;
        let record = record.map_err(|e| IngestError::format(file, format!("row {row}: {e}")))?;

        if blank_record(&record) {
            continue;
        }

        let person = ctx.resolve(table.get(&record, "Patient Name"))?.to_string();

        let raw_date = table.get(&record, "Fill Date");
        let service_date = parse_date(raw_date).ok_or_else(|| {
            IngestError::format(file, format!("row {row}: unparseable fill date {raw_date:?}"))
        })?;

        items.push(ExpenseItem {
            person,
            service_date,
            category: Category::Prescription,
            provider: Provider::organization_only(table.get(&record, "Pharmacy Name")),
            patient_amount: Some(parse_amount(table.get(&record, "Patient Responsibility"))),
            note: format!(
                "{} RX#{}",
                table.get(&record, "Drug Name"),
                table.get(&record, "Prescription Number (RX #)")
            ),
            source: source.clone(),
        });
    }

    Ok(items)
}
