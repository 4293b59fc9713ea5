//! Parsing of the cgroup v2 `memory.stat` and `memory.events` files.
//!
//! Both files list one `key value` pair per line. Sizes in `memory.stat` are
//! in bytes, page fault and event counters are cumulative counts.
//!
//! ```rust
//! use creo_exporter::cgroup::stats::{KeyValueStat, MemoryEvents, MemoryStat};
//!
//! let stat = MemoryStat::from_reader(&mut "anon 1000\nfile 2000\n".as_bytes()).unwrap();
//! assert_eq!(stat.anon, 1000);
//!
//! let events = MemoryEvents::from_reader(&mut "oom 1\noom_kill 1\n".as_bytes()).unwrap();
//! assert_eq!(events.oom_kill, 1);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::cgroup::metrics::v2;

use super::KeyValueStat;

/// Parsed contents of `memory.stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryStat {
    /// Anonymous memory.
    pub anon: u64,
    /// Page cache.
    pub file: u64,
    pub kernel_stack: u64,
    pub slab: u64,
    /// Network transmission buffers.
    pub sock: u64,
    pub shmem: u64,
    pub file_mapped: u64,
    pub pgfault: u64,
    pub pgmajfault: u64,
}

type MemorySetter = fn(&mut MemoryStat, u64);

static MEMORY_SETTERS: LazyLock<HashMap<&'static str, MemorySetter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, MemorySetter> = HashMap::with_capacity(9);

    m.insert("anon", |s, v| s.anon = v);
    m.insert("file", |s, v| s.file = v);
    m.insert("kernel_stack", |s, v| s.kernel_stack = v);
    m.insert("slab", |s, v| s.slab = v);
    m.insert("sock", |s, v| s.sock = v);
    m.insert("shmem", |s, v| s.shmem = v);
    m.insert("file_mapped", |s, v| s.file_mapped = v);
    m.insert("pgfault", |s, v| s.pgfault = v);
    m.insert("pgmajfault", |s, v| s.pgmajfault = v);

    m
});

impl KeyValueStat for MemoryStat {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &MEMORY_SETTERS
    }
}

impl MemoryStat {
    /// Builds the payload form; usage and limits come from separate files.
    pub fn into_payload(
        self,
        usage: u64,
        usage_limit: u64,
        swap_usage: u64,
        swap_limit: u64,
    ) -> v2::MemoryStat {
        v2::MemoryStat {
            anon: self.anon,
            file: self.file,
            kernel_stack: self.kernel_stack,
            slab: self.slab,
            sock: self.sock,
            shmem: self.shmem,
            file_mapped: self.file_mapped,
            pgfault: self.pgfault,
            pgmajfault: self.pgmajfault,
            usage,
            usage_limit,
            swap_usage,
            swap_limit,
        }
    }
}

/// Parsed contents of `memory.events`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryEvents {
    pub low: u64,
    pub high: u64,
    pub max: u64,
    pub oom: u64,
    pub oom_kill: u64,
}

type EventSetter = fn(&mut MemoryEvents, u64);

static EVENT_SETTERS: LazyLock<HashMap<&'static str, EventSetter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, EventSetter> = HashMap::with_capacity(5);

    m.insert("low", |s, v| s.low = v);
    m.insert("high", |s, v| s.high = v);
    m.insert("max", |s, v| s.max = v);
    m.insert("oom", |s, v| s.oom = v);
    m.insert("oom_kill", |s, v| s.oom_kill = v);

    m
});

impl KeyValueStat for MemoryEvents {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &EVENT_SETTERS
    }
}

impl From<MemoryEvents> for v2::MemoryEvents {
    fn from(value: MemoryEvents) -> Self {
        Self {
            low: value.low,
            high: value.high,
            max: value.max,
            oom: value.oom,
            oom_kill: value.oom_kill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::StatParseError;
    use crate::cgroup::stats::error::extract_stat_parse_error;

    #[test]
    fn test_parse_empty_memory_stat() {
        let stat = MemoryStat::from_reader(&mut "".as_bytes()).unwrap();
        assert_eq!(stat, MemoryStat::default());
    }

    #[test]
    fn test_parse_complete_memory_stat() {
        let data = "\
anon 1000
file 2000
kernel_stack 300
pagetables 12
slab 400
sock 500
shmem 600
file_mapped 700
pgfault 12345
pgmajfault 67
";
        let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.anon, 1000);
        assert_eq!(stat.file, 2000);
        assert_eq!(stat.kernel_stack, 300);
        assert_eq!(stat.slab, 400);
        assert_eq!(stat.sock, 500);
        assert_eq!(stat.shmem, 600);
        assert_eq!(stat.file_mapped, 700);
        assert_eq!(stat.pgfault, 12345);
        assert_eq!(stat.pgmajfault, 67);
    }

    #[test]
    fn test_parse_invalid_memory_stat() {
        let data = "\
invalid line
anon abc
";
        let err = MemoryStat::from_reader(&mut data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidKeyValue { key, line, .. } => {
                assert_eq!(key, "anon");
                assert_eq!(*line, 2);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_extra_whitespace() {
        let data = "    anon     1000\nfile     2000\n";
        let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.anon, 1000);
        assert_eq!(stat.file, 2000);
    }

    #[test]
    fn test_into_payload() {
        let stat = MemoryStat {
            anon: 1,
            ..Default::default()
        };
        let payload = stat.into_payload(10, u64::MAX, 0, 20);
        assert_eq!(payload.anon, 1);
        assert_eq!(payload.usage, 10);
        assert_eq!(payload.usage_limit, u64::MAX);
        assert_eq!(payload.swap_limit, 20);
    }

    #[test]
    fn test_parse_memory_events() {
        let data = "\
low 0
high 4
max 2
oom 1
oom_kill 1
oom_group_kill 0
";
        let events = MemoryEvents::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(
            events,
            MemoryEvents {
                low: 0,
                high: 4,
                max: 2,
                oom: 1,
                oom_kill: 1,
            }
        );
    }

    #[test]
    fn test_duplicate_memory_event() {
        let err = MemoryEvents::from_reader(&mut "oom 1\noom 2\n".as_bytes()).unwrap_err();
        assert!(matches!(
            extract_stat_parse_error(&err),
            StatParseError::DuplicateField { .. }
        ));
    }
}
