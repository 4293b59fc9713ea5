//! Parsing of the cgroup v2 `cpu.stat` file.
//!
//! The file lists one `key value` pair per line; times are reported in
//! microseconds (`*_usec`) and everything else is a count (`nr_*`).
//!
//! ```rust
//! use creo_exporter::cgroup::stats::{CpuStat, KeyValueStat};
//!
//! let data = "\
//! usage_usec 1000000
//! user_usec 600000
//! system_usec 400000
//! nr_periods 10
//! nr_throttled 2
//! throttled_usec 50000
//! ";
//! let stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(stat.usage_usec, 1_000_000);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::cgroup::metrics::v2;

use super::KeyValueStat;

/// Parsed contents of `cpu.stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuStat {
    /// Total CPU time (user + system).
    pub usage_usec: u64,
    pub user_usec: u64,
    pub system_usec: u64,
    /// Number of elapsed enforcement periods.
    pub nr_periods: u64,
    /// Number of periods in which the group was throttled.
    pub nr_throttled: u64,
    pub throttled_usec: u64,
}

type Setter = fn(&mut CpuStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(6);

    m.insert("usage_usec", |s, v| s.usage_usec = v);
    m.insert("user_usec", |s, v| s.user_usec = v);
    m.insert("system_usec", |s, v| s.system_usec = v);
    m.insert("nr_periods", |s, v| s.nr_periods = v);
    m.insert("nr_throttled", |s, v| s.nr_throttled = v);
    m.insert("throttled_usec", |s, v| s.throttled_usec = v);

    m
});

impl KeyValueStat for CpuStat {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}

impl From<CpuStat> for v2::CpuStat {
    fn from(value: CpuStat) -> Self {
        Self {
            usage_usec: value.usage_usec,
            user_usec: value.user_usec,
            system_usec: value.system_usec,
            nr_periods: value.nr_periods,
            nr_throttled: value.nr_throttled,
            throttled_usec: value.throttled_usec,
        }
    }
}
