//! Chunk sources: raw uploaded bytes to ordered text chunks.
//!
//! Parsing never fails outward. A file that cannot be parsed contributes
//! zero chunks and a warning in the log; the job carries on with the rest.

mod code;
mod tabular;
mod text;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ParseError;

pub use code::chunk_code;
pub use tabular::{chunk_csv, chunk_spreadsheet};
pub use text::chunk_text;

/// Capability: bytes plus filename to an ordered sequence of chunks.
pub trait ChunkSource: Send + Sync {
    /// Splits one file into chunks. Returns an empty vector on any failure.
    fn chunk(&self, content: &[u8], filename: &str) -> Vec<String>;
}

/// Parser family selected from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Prose and markup, split into blank-line separated elements.
    Text,
    /// Source code, split by top-level definitions.
    Code,
    /// Comma separated values, one chunk per row.
    Csv,
    /// Excel workbooks, one chunk per row of the first sheet.
    Spreadsheet,
    /// Formats with no parser in this build.
    Unsupported,
}

const CODE_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "jsx", "ts", "tsx", "go", "java", "kt", "rb", "php", "c", "h", "cc",
    "cpp", "hpp", "cs", "swift", "scala",
];

const UNSUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "zip", "gz", "tar", "png", "jpg", "jpeg", "gif",
];

impl FileType {
    /// Picks the parser family from the filename's extension.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::Csv,
            "xls" | "xlsx" | "xlsm" | "ods" => Self::Spreadsheet,
            ext if CODE_EXTENSIONS.contains(&ext) => Self::Code,
            ext if UNSUPPORTED_EXTENSIONS.contains(&ext) => Self::Unsupported,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Code => write!(f, "code"),
            Self::Csv => write!(f, "csv"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Dispatches to the built-in parsers by file type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChunkSource;

impl DefaultChunkSource {
    /// Creates the default chunk source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ChunkSource for DefaultChunkSource {
    fn chunk(&self, content: &[u8], filename: &str) -> Vec<String> {
        let file_type = FileType::from_filename(filename);

        let parsed = match file_type {
            FileType::Text => chunk_text(content),
            FileType::Code => chunk_code(content),
            FileType::Csv => chunk_csv(content),
            FileType::Spreadsheet => chunk_spreadsheet(content),
            FileType::Unsupported => Err(ParseError::Unsupported),
        };

        match parsed {
            Ok(chunks) => {
                tracing::debug!(filename, %file_type, chunks = chunks.len(), "Parsed file");
                chunks
            }
            Err(error) => {
                tracing::warn!(filename, %file_type, %error, "Could not parse file, skipping");
                Vec::new()
            }
        }
    }
}
