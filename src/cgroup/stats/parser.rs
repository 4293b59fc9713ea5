//! Generic parsers for the flat stat files of the cgroup v2 hierarchy.
//!
//! Most controller files are either a list of `key value` lines
//! (`cpu.stat`, `memory.stat`, `memory.events`), lines of `key=value`
//! tokens (`io.stat`), or a single scalar (`pids.current`, `memory.max`).
//! [`KeyValueStat`] covers the first two shapes and [`SingleLineStat`] the
//! last one.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use creo_exporter::cgroup::stats::KeyValueStat;
//!
//! #[derive(Default)]
//! struct MyStat {
//!     foo: u64,
//!     bar: u64,
//! }
//!
//! static HANDLERS: LazyLock<HashMap<&'static str, fn(&mut MyStat, u64)>> = LazyLock::new(|| {
//!     let mut m: HashMap<&'static str, fn(&mut MyStat, u64)> = HashMap::new();
//!     m.insert("foo", |s, v| s.foo = v);
//!     m.insert("bar", |s, v| s.bar = v);
//!     m
//! });
//!
//! impl KeyValueStat for MyStat {
//!     const SPLIT_CHAR: Option<char> = Some('=');
//!     const SKIP_VALUES: usize = 0;
//!     const ALLOW_DUPLICATE_KEYS: bool = false;
//!     const ALLOW_MULTIPLE_KV_PER_LINE: bool = true;
//!
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &HANDLERS
//!     }
//! }
//!
//! let stat = MyStat::from_reader(&mut "foo=1 bar=2\n".as_bytes()).unwrap();
//! assert_eq!((stat.foo, stat.bar), (1, 2));
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// Parses multi-line key/value stat files into a struct.
///
/// Implementors register a handler per known key; unknown keys are skipped.
pub trait KeyValueStat: Default + 'static {
    /// Separator between key and value inside one token, e.g. `Some('=')` for
    /// `rbytes=1024`. With `None` keys and values are separate whitespace
    /// delimited tokens.
    const SPLIT_CHAR: Option<char>;

    /// Number of leading tokens to ignore on every line, e.g. the device
    /// number in `io.stat`.
    const SKIP_VALUES: usize;

    /// Whether a key may appear more than once.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// Whether more than one pair is read from each line.
    const ALLOW_MULTIPLE_KV_PER_LINE: bool;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Reads key/value pairs until the end of `buf`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails and an error of kind
    /// [`std::io::ErrorKind::InvalidData`] wrapping a [`StatParseError`] if a
    /// known key carries a non-numeric value or is duplicated.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let mut seen_keys = HashSet::with_capacity(handlers.len());

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            stat.parse_line(&line, lineno, &mut seen_keys)?;
            line.clear();
        }

        Ok(stat)
    }

    /// Applies the pairs of a single line to `self`.
    fn parse_line(
        &mut self,
        line: &str,
        lineno: usize,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let mut tokens = line.split_whitespace().skip(Self::SKIP_VALUES);
        loop {
            let pair = match Self::SPLIT_CHAR {
                Some(split_char) => match tokens.next() {
                    // malformed tokens are skipped
                    Some(token) => token.split_once(split_char),
                    None => break,
                },
                None => match (tokens.next(), tokens.next()) {
                    (Some(key), Some(value)) => Some((key, value)),
                    _ => break,
                },
            };
            if let Some((key, value)) = pair {
                self.apply(key, value, lineno, seen_keys)?;
            }
            if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                break;
            }
        }

        Ok(())
    }

    fn apply(
        &mut self,
        key: &str,
        value: &str,
        lineno: usize,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let Some((known_key, handler)) = Self::field_handlers().get_key_value(key) else {
            return Ok(());
        };

        let parsed = value
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_owned(),
                value: value.to_owned(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(*known_key) {
            return Err(StatParseError::DuplicateField {
                field: key.to_owned(),
                line: lineno,
            }
            .into());
        }
        handler(self, parsed);

        Ok(())
    }
}

/// Parses stat files consisting of a single line.
pub trait SingleLineStat: Sized {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}
