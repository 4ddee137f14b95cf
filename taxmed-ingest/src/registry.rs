//! Format registry and directory dispatcher.
//!
//! The set of known formats is closed: each variant pairs a filename
//! recognizer with its parser. A directory scan tries every recognizer
//! against every file, parses eagerly on match, and silently ignores files
//! nothing recognizes; input directories legitimately hold unrelated
//! documents.

use std::fs;
use std::path::{Path, PathBuf};

use taxmed_core::{EmptyRosterError, ExpenseItem, RosterContext};
use tracing::debug;

use crate::error::IngestError;
use crate::parsers::{blueshield, caremark, medicare, uhc};
use crate::source::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    BlueShieldMedical,
    BlueShieldPharmacy,
    Caremark,
    Uhc,
    Medicare,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 5] = [
        SourceFormat::BlueShieldMedical,
        SourceFormat::BlueShieldPharmacy,
        SourceFormat::Caremark,
        SourceFormat::Uhc,
        SourceFormat::Medicare,
    ];

    /// Parser name used in every item's provenance tag.
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::BlueShieldMedical => "BlueShieldMedical",
            SourceFormat::BlueShieldPharmacy => "BlueShieldPharmacy",
            SourceFormat::Caremark => "Caremark",
            SourceFormat::Uhc => "UnitedHealthCare",
            SourceFormat::Medicare => "Medicare",
        }
    }

    /// Fixed filename suffix each source system uses for its exports.
    fn suffix(&self) -> &'static str {
        match self {
            SourceFormat::BlueShieldMedical => "bcbs_med_claims.csv",
            SourceFormat::BlueShieldPharmacy => "bcbs_pharm_claims.csv",
            // Caremark's portal really does export with an uppercase
            // extension.
            SourceFormat::Caremark => "caremark_claims.CSV",
            SourceFormat::Uhc => "uhc_claims.csv",
            SourceFormat::Medicare => "medicare_claims.txt",
        }
    }

    pub fn recognizes(&self, file_name: &str) -> bool {
        file_name.ends_with(self.suffix())
    }

    pub fn parse(
        &self,
        src: &SourceFile,
        ctx: &RosterContext,
    ) -> Result<Vec<ExpenseItem>, IngestError> {
        match self {
            SourceFormat::BlueShieldMedical => blueshield::parse_medical(src, ctx),
            SourceFormat::BlueShieldPharmacy => blueshield::parse_pharmacy(src, ctx),
            SourceFormat::Caremark => caremark::parse(src, ctx),
            SourceFormat::Uhc => uhc::parse(src, ctx),
            SourceFormat::Medicare => medicare::parse(src, ctx),
        }
    }
}

/// A file that matched a format but could not be parsed. The file is
/// excluded from the aggregate; the caller decides how loudly to say so.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub error: IngestError,
}

/// Outcome of one directory scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub items: Vec<ExpenseItem>,
    pub failures: Vec<FileFailure>,
    pub skipped: Vec<PathBuf>,
}

/// Match every file in `dir` against every format and parse on match.
///
/// Files are visited in name order so repeated runs over the same
/// directory produce identically ordered items.
pub fn scan_directory(dir: &Path, ctx: &RosterContext) -> Result<ScanReport, IngestError> {
    if ctx.is_empty() {
        return Err(EmptyRosterError.into());
    }

    let entries =
        fs::read_dir(dir).map_err(|e| IngestError::io(dir.display().to_string(), e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::io(dir.display().to_string(), e))?;
        paths.push(entry.path());
    }
    paths.sort();

    let mut report = ScanReport::default();

    for path in paths {
        if !path.is_file() {
            continue;
        }
        let src = SourceFile::new(&path);

        let mut matched = false;
        for format in SourceFormat::ALL {
            if !format.recognizes(&src.file_name) {
                continue;
            }
            matched = true;
            match format.parse(&src, ctx) {
                Ok(items) => report.items.extend(items),
                Err(error) => report.failures.push(FileFailure {
                    path: path.clone(),
                    format,
                    error,
                }),
            }
        }

        if !matched {
            debug!(file = %path.display(), "no format recognizes file; skipping");
            report.skipped.push(path);
        }
    }

    Ok(report)
}
