//! Medicare statement parser.
//!
//! The input is not a table: it is a human-readable dump of `Key: Value`
//! blocks separated by dash rules and `Line number:` / `Claim Number:`
//! header lines, with one logical claim-line split across two physical
//! blocks and claim numbers stated once then implied. Parsing runs in four
//! whole-stream stages:
//!
//! 1. normalize vertical spacing;
//! 2. segment the text into flat field maps at the boundary markers;
//! 3. link segments back into a claim/line hierarchy with a one-segment
//!    lookahead (merge split lines, propagate the current claim number,
//!    drop label-only pseudo headers);
//! 4. assemble claims with their lines and emit canonical items per claim
//!    type.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use taxmed_core::{Category, ExpenseItem, Provider, RosterContext};
use tracing::warn;

use super::{collapse_whitespace, parse_amount_strict, parse_date};
use crate::error::IngestError;
use crate::registry::SourceFormat;
use crate::source::SourceFile;

/// Section separator: a rule of at least this many dashes.
const DASH_RULE_WIDTH: usize = 32;

/// Note used for facility lines that carry no place-of-service block.
const NO_PLACE_OF_SERVICE: &str = "No Place of Service";

type Fields = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    /// Carries a `Claim Type`; becomes one claim record.
    Claim,
    /// Carries a `Line number`; attached to its claim by claim number.
    Line,
    /// Anything else (patient identity, plan info); passes through untagged.
    Info,
}

#[derive(Debug, Clone)]
struct Section {
    kind: SectionKind,
    fields: Fields,
}

#[derive(Debug)]
struct Claim {
    fields: Fields,
    lines: Vec<Fields>,
}

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

    let field_sep = Regex::new(r":\s+")
        .map_err(|e| IngestError::format(file, format!("field separator pattern: {e}")))?;

    let normalized = normalize(text);
    let segments = segment(&normalized, &field_sep);
    let sections = link(segments);
    let claims = assemble(&sections);

    // The patient identity block names the statement's single beneficiary;
    // every emitted item carries the same resolved person.
    let raw_name = sections
        .iter()
        .find_map(|s| match s.kind {
            SectionKind::Info => s.fields.get("Name"),
            _ => None,
        })
        .ok_or_else(|| IngestError::format(file, "no patient identity section with a Name field"))?;
    let person = ctx.resolve(raw_name)?;

    emit(&claims, person, src)
}

/// Stage 1: fold Windows line endings and collapse runs of blank lines; the
/// export's vertical spacing is not consistent between downloads.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_blank = false;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        prev_blank = blank;
    }

    out
}

/// Stage 2: split into flat field maps.
///
/// Dash rules are pure separators and are dropped. `Line number:` lines and
/// a `Claim Number:` line directly under a `Claim Lines for ... Part D`
/// heading are also separators, but each keeps its own one-field segment:
/// stage 3 keys off those fields to tag lines and to seed the claim number
/// for the Part D block that follows.
fn segment(text: &str, field_sep: &Regex) -> Vec<Fields> {
    let mut segments: Vec<Fields> = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut after_part_d_heading = false;

    for line in text.lines() {
        if is_dash_rule(line) {
            flush(&mut block, &mut segments, field_sep);
            after_part_d_heading = false;
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("Line number:")
            || (after_part_d_heading && trimmed.starts_with("Claim Number:"))
        {
            flush(&mut block, &mut segments, field_sep);
            let marker = parse_fields(&[line], field_sep);
            if !marker.is_empty() {
                segments.push(marker);
            }
            after_part_d_heading = false;
            continue;
        }

        after_part_d_heading = is_part_d_heading(line);
        block.push(line);
    }
    flush(&mut block, &mut segments, field_sep);

    segments
}

fn flush(block: &mut Vec<&str>, segments: &mut Vec<Fields>, field_sep: &Regex) {
    if block.is_empty() {
        return;
    }
    let fields = parse_fields(block, field_sep);
    if !fields.is_empty() {
        segments.push(fields);
    }
    block.clear();
}

/// A segment becomes a mapping of only the lines that split into exactly a
/// key and a value on colon-plus-whitespace; currency symbols are shed here
/// so every later read sees bare decimals.
fn parse_fields(lines: &[&str], field_sep: &Regex) -> Fields {
    let mut fields = Fields::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = field_sep.split(line).collect();
        if let [key, value] = parts[..] {
            fields.insert(clean_part(key).to_string(), clean_part(value).to_string());
        }
    }

    fields
}

fn clean_part(part: &str) -> &str {
    part.trim().trim_matches('$').trim()
}

fn is_dash_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= DASH_RULE_WIDTH && trimmed.chars().all(|c| c == '-')
}

fn is_part_d_heading(line: &str) -> bool {
    line.contains("Claim Lines for") && line.trim_end().ends_with("Part D")
}

/// Stage 3: walk the segments with one-ahead lookahead, classifying each by
/// its header field and reuniting the claim/line structure the export
/// flattened:
///
/// - a segment's own `Claim Number` becomes the current claim number,
///   inherited by claims and lines that lack one;
/// - `Claim Lines for Claim Number` headers directly followed by a new
///   claim or line carry no data and are dropped;
/// - a `Line number` segment absorbs the following segment (the export
///   splits each claim-line across two blocks), which is then consumed.
fn link(segments: Vec<Fields>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_claim = String::new();
    let mut consumed_by_merge = false;

    for (i, segment) in segments.iter().enumerate() {
        if consumed_by_merge {
            consumed_by_merge = false;
            continue;
        }
        let next = segments.get(i + 1);

        if let Some(number) = segment.get("Claim Number") {
            current_claim = number.clone();
        }

        if segment.contains_key("Claim Lines for Claim Number")
            && next.is_some_and(|n| {
                n.contains_key("Claim Number") || n.contains_key("Line number")
            })
        {
            continue;
        }

        if segment.contains_key("Line number") {
            let mut fields = segment.clone();
            fields
                .entry("Claim Number".to_string())
                .or_insert_with(|| current_claim.clone());
            if let Some(next) = next {
                for (key, value) in next {
                    fields.insert(key.clone(), value.clone());
                }
                consumed_by_merge = true;
            }
            sections.push(Section {
                kind: SectionKind::Line,
                fields,
            });
        } else if segment.contains_key("Claim Type") {
            let mut fields = segment.clone();
            fields
                .entry("Claim Number".to_string())
                .or_insert_with(|| current_claim.clone());
            sections.push(Section {
                kind: SectionKind::Claim,
                fields,
            });
        } else {
            sections.push(Section {
                kind: SectionKind::Info,
                fields: segment.clone(),
            });
        }
    }

    sections
}

/// Stage 4a: attach to every claim its lines, by claim number, in
/// appearance order. A claim whose lines never materialize keeps an empty
/// list; the export is noisy and partial data beats aborting the file.
fn assemble(sections: &[Section]) -> Vec<Claim> {
    sections
        .iter()
        .filter(|s| s.kind == SectionKind::Claim)
        .map(|claim| {
            let number = claim.fields.get("Claim Number");
            let lines = sections
                .iter()
                .filter(|s| s.kind == SectionKind::Line && s.fields.get("Claim Number") == number)
                .map(|s| s.fields.clone())
                .collect();
            Claim {
                fields: claim.fields.clone(),
                lines,
            }
        })
        .collect()
}

/// Stage 4b: emit canonical items, branching on the exact claim type.
fn emit(
    claims: &[Claim],
    person: &str,
    src: &SourceFile,
) -> Result<Vec<ExpenseItem>, IngestError> {
    let file = src.file_name.as_str();
    let source = src.source_tag(SourceFormat::Medicare.name());
    let mut items = Vec::new();

    for claim in claims {
        let number = field(&claim.fields, "Claim Number");

        match claim.fields.get("Claim Type").map(String::as_str) {
            Some("Part D") => {
                let raw_date = field(&claim.fields, "Claim Service Date");
                let service_date = parse_date(raw_date).ok_or_else(|| {
                    IngestError::format(
                        file,
                        format!("claim {number}: unparseable Part D service date {raw_date:?}"),
                    )
                })?;

                items.push(ExpenseItem {
                    person: person.to_string(),
                    service_date,
                    category: Category::Prescription,
                    provider: Provider::organization_only(field(&claim.fields, "Pharmacy Name")),
                    // Part D statements never report a direct patient amount.
                    patient_amount: None,
                    note: field(&claim.fields, "Drug Name").to_string(),
                    source: source.clone(),
                });
            }

            Some("PartB") | Some("Outpatient") => {
                for line in &claim.lines {
                    let raw_date = match line.get("Date of Service From") {
                        Some(d) if !d.is_empty() => d.as_str(),
                        _ => field(&claim.fields, "Service Start Date"),
                    };
                    let service_date = parse_date(raw_date).ok_or_else(|| {
                        IngestError::format(
                            file,
                            format!("claim {number}: unparseable service date {raw_date:?}"),
                        )
                    })?;

                    items.push(ExpenseItem {
                        person: person.to_string(),
                        service_date,
                        category: Category::Facility,
                        provider: Provider::organization_only(collapse_whitespace(field(
                            &claim.fields,
                            "Provider",
                        ))),
                        patient_amount: Some(allocate_line_amount(&claim.fields, line)),
                        note: line
                            .get("Place of Service/Description")
                            .cloned()
                            .unwrap_or_else(|| NO_PLACE_OF_SERVICE.to_string()),
                        source: source.clone(),
                    });
                }
            }

            Some(other) => {
                // Deliberate filtering, logged apart from tolerated parse
                // noise: only Part D / PartB / Outpatient are observed.
                warn!(
                    file,
                    claim_type = other,
                    claim_number = number,
                    "skipping unrecognized Medicare claim type"
                );
            }

            None => {}
        }
    }

    Ok(items)
}

/// The claim-level patient responsibility, distributed across lines by each
/// line's share of the Medicare-approved amount. Zero when the division is
/// undefined (zero, missing, or malformed operands).
fn allocate_line_amount(claim: &Fields, line: &Fields) -> BigDecimal {
    let billed = claim
        .get("You May be Billed")
        .and_then(|v| parse_amount_strict(v));
    let allowed = line
        .get("Allowed Amount")
        .and_then(|v| parse_amount_strict(v));
    let approved = claim
        .get("Medicare Approved")
        .and_then(|v| parse_amount_strict(v));

    match (billed, allowed, approved) {
        (Some(billed), Some(allowed), Some(approved)) if !approved.is_zero() => {
            billed * allowed / approved
        }
        _ => BigDecimal::zero(),
    }
}

fn field<'a>(fields: &'a Fields, name: &str) -> &'a str {
    fields.get(name).map(String::as_str).unwrap_or("")
}
