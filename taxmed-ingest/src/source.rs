//! Input-file identity.
//!
//! Export files are named `medical-<person>-<filetype>` (e.g.
//! `medical-john-uhc_claims.csv`). The `<person>` token is kept as an
//! optional hint for formats whose tables carry no patient-name column.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::IngestError;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_name: String,
    /// `<person>` token from a `medical-<person>-` stem, when present.
    pub person_hint: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let person_hint = person_hint(&stem);

        Self {
            path,
            file_name,
            person_hint,
        }
    }

    /// Read the whole input once; parsers never reopen it.
    pub fn read(&self) -> Result<String, IngestError> {
        fs::read_to_string(&self.path).map_err(|e| IngestError::io(&self.file_name, e))
    }

    /// Provenance tag carried on every emitted item.
    pub fn source_tag(&self, format_name: &str) -> String {
        format!("{}:{}", format_name, self.file_name)
    }
}

fn person_hint(stem: &str) -> Option<String> {
    let rest = stem.strip_prefix("medical-")?;
    let (person, file_type) = rest.split_once('-')?;
    if person.is_empty() || file_type.is_empty() {
        return None;
    }
    Some(person.to_string())
}
