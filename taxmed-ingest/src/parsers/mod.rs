//! Format parsers and the small helpers they share.

pub mod blueshield;
pub mod caremark;
pub mod medicare;
pub mod uhc;

use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;

use crate::error::IngestError;

/// Date layouts observed across these billing exports.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d", "%B %d, %Y"];

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Lenient monetary parse: billing exports leave zero-dollar fields blank,
/// so blank or malformed values are zero, never fatal.
pub(crate) fn parse_amount(raw: &str) -> BigDecimal {
    parse_amount_strict(raw).unwrap_or_else(BigDecimal::zero)
}

/// Strict monetary parse: `$` and thousands separators stripped, `None` for
/// anything that is not a decimal.
pub(crate) fn parse_amount_strict(raw: &str) -> Option<BigDecimal> {
    let cleaned = raw.trim().trim_matches('$').replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop the fixed preamble ahead of a format's header row.
pub(crate) fn skip_preamble(text: &str, lines: usize) -> String {
    text.lines().skip(lines).collect::<Vec<_>>().join("\n")
}

pub(crate) fn blank_record(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Header-keyed access into positional CSV records.
pub(crate) struct Table {
    columns: HashMap<String, usize>,
}

impl Table {
    pub fn from_headers(headers: &csv::StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { columns }
    }

    /// Structural check: every named column must exist in the header.
    pub fn require(&self, file: &str, names: &[&str]) -> Result<(), IngestError> {
        for name in names {
            if !self.columns.contains_key(*name) {
                return Err(IngestError::format(
                    file,
                    format!("unparseable header: missing column {name:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Field by column name; absent columns and short rows read as blank.
    pub fn get<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        self.columns
            .get(name)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("")
            .trim()
    }
}
