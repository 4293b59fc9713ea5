//! Errors raised while parsing cgroup stat files.
//!
//! Parsers report failures as [`std::io::Error`] so they compose with the
//! readers they consume; the structured [`StatParseError`] is attached as the
//! inner error with kind [`std::io::ErrorKind::InvalidData`].

use std::num::ParseIntError;

#[derive(Debug, thiserror::Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid device number at line {line}: '{value}'")]
    InvalidDevice { value: String, line: usize },

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        match err {
            StatParseError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// Extracts the [`StatParseError`] wrapped by a parser's I/O error.
///
/// Panics if the inner error is not a `StatParseError`.
#[cfg(test)]
pub(super) fn extract_stat_parse_error(err: &std::io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}
