//! Error taxonomy for the ingestion pipeline.
//!
//! Structural violations carry the offending file and enough row/section
//! context to locate them; value-level noise (blank amounts, missing
//! optional fields) is absorbed inside the parsers and never reaches here.

use taxmed_core::EmptyRosterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// No roster was configured before parsing began.
    #[error(transparent)]
    EmptyRoster(#[from] EmptyRosterError),

    /// A structural violation the parser cannot tolerate.
    #[error("{file}: {detail}")]
    Format { file: String, detail: String },

    /// The input file could not be read.
    #[error("reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn format(file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Format {
            file: file.into(),
            detail: detail.into(),
        }
    }

    pub fn io(file: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            file: file.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_file_and_detail() {
        let err = IngestError::format("claims.csv", "row 7: unparseable service date \"n/a\"");
        assert_eq!(
            err.to_string(),
            "claims.csv: row 7: unparseable service date \"n/a\""
        );
    }

    #[test]
    fn test_empty_roster_passthrough() {
        let err: IngestError = EmptyRosterError.into();
        assert!(err.to_string().contains("roster is empty"));
    }
}
