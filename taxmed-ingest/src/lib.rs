//! taxmed-ingest: multi-format billing-export parsers and the directory
//! dispatcher that routes each input file to the format(s) recognizing it.

pub mod error;
pub mod parsers;
pub mod registry;
pub mod source;

pub use error::IngestError;
pub use registry::{FileFailure, ScanReport, SourceFormat, scan_directory};
pub use source::SourceFile;
