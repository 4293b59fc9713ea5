//! Parsing of the cgroup v2 `io.stat` file.
//!
//! Every line describes one block device: the `major:minor` device number
//! followed by `key=value` tokens.
//!
//! ```rust
//! use creo_exporter::cgroup::stats::IoStat;
//!
//! let data = "\
//! 8:0 rbytes=1024 wbytes=2048 rios=12 wios=24 dbytes=0 dios=0
//! 254:0 rbytes=1024 wbytes=2048 rios=12 wios=24 dbytes=0 dios=0
//! ";
//! let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
//!
//! assert_eq!(stat.devices.len(), 2);
//! assert_eq!(stat.devices[1].major, 254);
//! assert_eq!(stat.devices[1].wbytes, 2048);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::sync::LazyLock;

use crate::cgroup::metrics::v2;

use super::{KeyValueStat, StatParseError};

/// Counters of a single device line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoDeviceStat {
    pub major: u64,
    pub minor: u64,
    pub rbytes: u64,
    pub wbytes: u64,
    pub rios: u64,
    pub wios: u64,
}

type Setter = fn(&mut IoDeviceStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(4);

    m.insert("rbytes", |s, v| s.rbytes = v);
    m.insert("wbytes", |s, v| s.wbytes = v);
    m.insert("rios", |s, v| s.rios = v);
    m.insert("wios", |s, v| s.wios = v);

    m
});

impl KeyValueStat for IoDeviceStat {
    const SPLIT_CHAR: Option<char> = Some('=');
    const SKIP_VALUES: usize = 1;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = true;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}

/// Parsed contents of `io.stat`, one entry per device in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoStat {
    pub devices: Vec<IoDeviceStat>,
}

impl IoStat {
    /// Parses all device lines. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`std::io::ErrorKind::InvalidData`] if a device
    /// number is not `major:minor` or a counter is not numeric.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = IoStat::default();
        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            if let Some(device) = line.split_whitespace().next() {
                let (major, minor) =
                    parse_device(device).ok_or_else(|| StatParseError::InvalidDevice {
                        value: device.to_owned(),
                        line: lineno,
                    })?;
                let mut entry = IoDeviceStat {
                    major,
                    minor,
                    ..Default::default()
                };
                entry.parse_line(&line, lineno, &mut HashSet::new())?;
                stat.devices.push(entry);
            }
            line.clear();
        }

        Ok(stat)
    }
}

fn parse_device(device: &str) -> Option<(u64, u64)> {
    let (major, minor) = device.split_once(':')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

impl From<IoStat> for v2::IoStat {
    fn from(value: IoStat) -> Self {
        Self {
            usage: value
                .devices
                .into_iter()
                .map(|d| v2::IoEntry {
                    major: d.major,
                    minor: d.minor,
                    rbytes: d.rbytes,
                    wbytes: d.wbytes,
                    rios: d.rios,
                    wios: d.wios,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::error::extract_stat_parse_error;

    #[test]
    fn test_parse_empty_io_stat() {
        let stat = IoStat::from_reader(&mut "".as_bytes()).unwrap();
        assert_eq!(stat, IoStat::default());
    }

    #[test]
    fn test_parse_keeps_devices_apart() {
        let data = "\
8:0 rbytes=1024 wbytes=2048 rios=12 wios=24
254:1 rbytes=1 wbytes=2 rios=3 wios=4
";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(
            stat.devices,
            vec![
                IoDeviceStat {
                    major: 8,
                    minor: 0,
                    rbytes: 1024,
                    wbytes: 2048,
                    rios: 12,
                    wios: 24,
                },
                IoDeviceStat {
                    major: 254,
                    minor: 1,
                    rbytes: 1,
                    wbytes: 2,
                    rios: 3,
                    wios: 4,
                },
            ]
        );
    }

    #[test]
    fn test_parse_invalid_io_value() {
        let data = "8:0 rbytes=abc wbytes=def\n";
        let err = IoStat::from_reader(&mut data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "rbytes");
                assert_eq!(value, "abc");
                assert_eq!(*line, 1);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_parse_invalid_device() {
        let err = IoStat::from_reader(&mut "sda rbytes=1\n".as_bytes()).unwrap_err();
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidDevice { value, line } => {
                assert_eq!(value, "sda");
                assert_eq!(*line, 1);
            }
            _ => panic!("Expected InvalidDevice error"),
        }
    }

    #[test]
    fn test_ignore_unknown_and_malformed_pairs() {
        let data = "8:0 foo=100 rbytes=1024 malformedpair wios=24\n";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.devices[0].rbytes, 1024);
        assert_eq!(stat.devices[0].wios, 24);
        assert_eq!(stat.devices[0].wbytes, 0);
    }

    #[test]
    fn test_skip_blank_lines() {
        let data = "8:0    rbytes=1000    wbytes=2000\n    \n";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.devices.len(), 1);
        assert_eq!(stat.devices[0].wbytes, 2000);
    }
}
