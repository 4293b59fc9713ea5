//! Parsers for the cgroup v2 controller files a container cgroup exposes.
//!
//! | file | type |
//! |---|---|
//! | `cpu.stat` | [`CpuStat`] |
//! | `memory.stat` | [`MemoryStat`] |
//! | `memory.events` | [`MemoryEvents`] |
//! | `io.stat` | [`IoStat`] |
//! | `pids.current`, `memory.current`, `memory.swap.current`, `hugetlb.<size>.current` | [`Current`] |
//! | `pids.max`, `memory.max`, `memory.swap.max`, `hugetlb.<size>.max` | [`Limit`] |
//!
//! Every parser converts into the matching part of the
//! [`crate::cgroup::metrics::v2::Metrics`] payload.

mod cpu;
mod error;
mod io;
mod memory;
mod parser;
mod value;

pub use cpu::CpuStat;
pub use error::StatParseError;
pub use io::{IoDeviceStat, IoStat};
pub use memory::{MemoryEvents, MemoryStat};
pub use parser::{KeyValueStat, SingleLineStat};
pub use value::{Current, Limit};
