//! Single-value files such as `pids.current`, `memory.current`, `pids.max`
//! and `memory.max`.

use std::io::BufRead;

use super::{SingleLineStat, StatParseError};

/// A plain counter or usage value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Current(pub u64);

impl SingleLineStat for Current {
    /// Parses a file holding exactly one unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`std::io::ErrorKind::InvalidData`] if the value is
    /// not a `u64`; an empty file is invalid as well.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        buf.read_line(&mut line)?;
        let line = line.trim();
        let value = line
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidValue {
                value: line.to_owned(),
                line: 1,
                source,
            })?;

        Ok(Current(value))
    }
}

/// A configured limit. `None` stands for `max`, i.e. no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit(pub Option<u64>);

impl Limit {
    /// Returns the limit, using `u64::MAX` for an unlimited resource.
    pub fn or_max(self) -> u64 {
        self.0.unwrap_or(u64::MAX)
    }
}

impl SingleLineStat for Limit {
    /// Parses either `max` or an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`std::io::ErrorKind::InvalidData`] for any
    /// other content.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut line = String::new();
        buf.read_line(&mut line)?;
        let line = line.trim();
        if line == "max" {
            return Ok(Limit(None));
        }

        let value = line
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidValue {
                value: line.to_owned(),
                line: 1,
                source,
            })?;

        Ok(Limit(Some(value)))
    }
}
