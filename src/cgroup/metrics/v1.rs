//! Stats payload of a cgroup v1 container.
//!
//! Only the controllers that have a cgroup v2 counterpart in the metric
//! catalog are modelled; unknown fields are skipped while decoding.

use super::v2;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Metrics {
    #[prost(message, optional, tag = "2")]
    pub pids: Option<PidsStat>,
    #[prost(message, optional, tag = "3")]
    pub cpu: Option<CpuStat>,
    #[prost(message, optional, tag = "4")]
    pub memory: Option<MemoryStat>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PidsStat {
    #[prost(uint64, tag = "1")]
    pub current: u64,
    #[prost(uint64, tag = "2")]
    pub limit: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CpuStat {
    #[prost(message, optional, tag = "1")]
    pub usage: Option<CpuUsage>,
    #[prost(message, optional, tag = "2")]
    pub throttling: Option<Throttle>,
}

/// CPU time in nanoseconds.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CpuUsage {
    #[prost(uint64, tag = "1")]
    pub total: u64,
    #[prost(uint64, tag = "2")]
    pub kernel: u64,
    #[prost(uint64, tag = "3")]
    pub user: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Throttle {
    #[prost(uint64, tag = "1")]
    pub periods: u64,
    #[prost(uint64, tag = "2")]
    pub throttled_periods: u64,
    /// Nanoseconds.
    #[prost(uint64, tag = "3")]
    pub throttled_time: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MemoryStat {
    #[prost(uint64, tag = "1")]
    pub cache: u64,
    #[prost(uint64, tag = "2")]
    pub rss: u64,
    #[prost(uint64, tag = "4")]
    pub mapped_file: u64,
    #[prost(uint64, tag = "9")]
    pub pg_fault: u64,
    #[prost(uint64, tag = "10")]
    pub pg_maj_fault: u64,
    #[prost(message, optional, tag = "33")]
    pub usage: Option<MemoryEntry>,
    #[prost(message, optional, tag = "34")]
    pub swap: Option<MemoryEntry>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MemoryEntry {
    #[prost(uint64, tag = "1")]
    pub limit: u64,
    #[prost(uint64, tag = "2")]
    pub usage: u64,
}

const NANOS_PER_MICRO: u64 = 1_000;

impl From<Metrics> for v2::Metrics {
    /// Maps the v1 controllers onto their unified-hierarchy equivalents.
    fn from(value: Metrics) -> Self {
        let pids = value.pids.map(|pids| v2::PidsStat {
            current: pids.current,
            limit: pids.limit,
        });

        let cpu = value.cpu.map(|cpu| {
            let usage = cpu.usage.unwrap_or_default();
            let throttling = cpu.throttling.unwrap_or_default();
            v2::CpuStat {
                usage_usec: usage.total / NANOS_PER_MICRO,
                user_usec: usage.user / NANOS_PER_MICRO,
                system_usec: usage.kernel / NANOS_PER_MICRO,
                nr_periods: throttling.periods,
                nr_throttled: throttling.throttled_periods,
                throttled_usec: throttling.throttled_time / NANOS_PER_MICRO,
            }
        });

        let memory = value.memory.map(|memory| {
            let usage = memory.usage.unwrap_or_default();
            let swap = memory.swap.unwrap_or_default();
            v2::MemoryStat {
                anon: memory.rss,
                file: memory.cache,
                file_mapped: memory.mapped_file,
                pgfault: memory.pg_fault,
                pgmajfault: memory.pg_maj_fault,
                usage: usage.usage,
                usage_limit: usage.limit,
                swap_usage: swap.usage,
                swap_limit: swap.limit,
                ..Default::default()
            }
        });

        v2::Metrics {
            pids,
            cpu,
            memory,
            ..Default::default()
        }
    }
}
