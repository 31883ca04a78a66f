use std::path::PathBuf;

use thiserror::Error;

use crate::report::Report;

/// Errors produced while reading or parsing a blueprint.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file does not exist.
    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The path points at a directory.
    #[error("file is a directory: {}", .0.display())]
    IsDirectory(PathBuf),

    /// I/O error reading a blueprint or one of its includes.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An include directive eventually includes itself.
    #[error("include cycle detected at {}", .0.display())]
    IncludeCycle(PathBuf),

    /// The source contains nothing but whitespace.
    #[error("blueprint is empty")]
    Empty,

    /// The source was read but carries error annotations.
    #[error("{0}")]
    Invalid(Report),
}

impl ParseError {
    /// The validation report, if this is a semantic error.
    pub fn report(&self) -> Option<&Report> {
        match self {
            ParseError::Invalid(report) => Some(report),
            _ => None,
        }
    }
}
