//! Error type of this crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when an input or output file could not be accessed.
    #[error("could not access `{}`", .path.display())]
    Io {
        /// Path of the file that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// Returned when a YAML document could not be (de)serialized.
    #[error("malformed YAML in `{}`", .path.display())]
    Yaml {
        /// Path of the document.
        path: PathBuf,
        /// The underlying parser error.
        source: serde_yaml::Error,
    },
    /// Returned when a datacard does not have the expected format.
    #[error("datacard line {line}: {message}")]
    Datacard {
        /// One-based line number, `0` if the error is not tied to a single line.
        line: usize,
        /// Description of the problem.
        message: String,
    },
    /// Returned when a fit-result file lacks a requested parameter.
    #[error("parameter list `{list}` has no entry at position {index}")]
    MissingParameter {
        /// Name of the parameter list.
        list: String,
        /// Requested position.
        index: usize,
    },
    /// Returned when a layout is inconsistent.
    #[error("invalid layout: {0}")]
    Layout(String),
    /// Returned when a statistical quantity can not be computed, for instance because an
    /// uncertainty vanishes.
    #[error("{0}")]
    Statistics(String),
    /// Returned when drawing the figure fails.
    #[error("drawing failed: {0}")]
    Plot(String),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn yaml(path: impl Into<PathBuf>) -> impl FnOnce(serde_yaml::Error) -> Self {
        let path = path.into();
        move |source| Self::Yaml { path, source }
    }
}
