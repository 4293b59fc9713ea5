//! The fixed table of metric descriptors exported for every task.
//!
//! Each [`Metric`] knows how to pull its values out of a decoded
//! [`v2::Metrics`] payload. A controller that is missing from the payload
//! yields no values for its metrics.

use prometheus::core::Desc;
use prometheus::proto::MetricType;

use crate::cgroup::metrics::v2;

use super::{Namespace, Result};

/// Variable labels every descriptor starts with.
pub const BASE_LABELS: [&str; 2] = ["container_id", "namespace"];

/// Value kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Monotonically non-decreasing, e.g. accumulated CPU time.
    Counter,
    /// Instantaneous, e.g. current usage or a configured limit.
    Gauge,
}

impl ValueKind {
    pub fn metric_type(self) -> MetricType {
        match self {
            ValueKind::Counter => MetricType::COUNTER,
            ValueKind::Gauge => MetricType::GAUGE,
        }
    }
}

/// A single extracted value and the values of the metric's extra labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub value: f64,
    pub labels: Vec<String>,
}

impl Value {
    fn unlabeled(value: u64) -> Self {
        Self {
            value: value as f64,
            labels: Vec::new(),
        }
    }
}

type Extractor = fn(&v2::Metrics) -> Vec<Value>;

/// Static description of one metric family.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub unit: &'static str,
    pub help: &'static str,
    pub kind: ValueKind,
    /// Labels following [`BASE_LABELS`].
    pub labels: &'static [&'static str],
    extract: Extractor,
}

impl Metric {
    /// Builds the descriptor of this metric within `ns`.
    pub fn desc(&self, ns: &Namespace) -> Result<Desc> {
        let variable_labels = BASE_LABELS
            .iter()
            .chain(self.labels)
            .map(|label| label.to_string())
            .collect();
        ns.new_desc(self.name, self.unit, self.help, variable_labels)
    }

    pub fn values(&self, stats: &v2::Metrics) -> Vec<Value> {
        (self.extract)(stats)
    }
}

fn single<T>(group: Option<&T>, field: impl Fn(&T) -> u64) -> Vec<Value> {
    group
        .map(|group| vec![Value::unlabeled(field(group))])
        .unwrap_or_default()
}

fn per_device(stats: &v2::Metrics, field: impl Fn(&v2::IoEntry) -> u64) -> Vec<Value> {
    stats
        .io
        .iter()
        .flat_map(|io| io.usage.iter())
        .map(|entry| Value {
            value: field(entry) as f64,
            labels: vec![entry.major.to_string(), entry.minor.to_string()],
        })
        .collect()
}

fn per_page_size(stats: &v2::Metrics, field: impl Fn(&v2::HugeTlbStat) -> u64) -> Vec<Value> {
    stats
        .hugetlb
        .iter()
        .map(|entry| Value {
            value: field(entry) as f64,
            labels: vec![entry.pagesize.clone()],
        })
        .collect()
}

const DEVICE_LABELS: &[&str] = &["major", "minor"];
const PAGE_LABELS: &[&str] = &["page"];

/// Returns the metric catalog in emission order.
pub fn metrics() -> Vec<Metric> {
    let mut m = Vec::with_capacity(32);
    m.extend(pids());
    m.extend(cpu());
    m.extend(memory());
    m.extend(io());
    m.extend(hugetlb());
    m
}

fn pids() -> [Metric; 2] {
    [
        Metric {
            name: "pids",
            unit: "current",
            help: "The current number of pids",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.pids.as_ref(), |p| p.current),
        },
        Metric {
            name: "pids",
            unit: "limit",
            help: "The limit to the number of pids allowed",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.pids.as_ref(), |p| p.limit),
        },
    ]
}

fn cpu() -> [Metric; 6] {
    [
        Metric {
            name: "cpu_usage",
            unit: "usec",
            help: "Total cpu usage",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.cpu.as_ref(), |c| c.usage_usec),
        },
        Metric {
            name: "cpu_user",
            unit: "usec",
            help: "Current cpu usage in user space",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.cpu.as_ref(), |c| c.user_usec),
        },
        Metric {
            name: "cpu_kernel",
            unit: "usec",
            help: "Current cpu usage in kernel space",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.cpu.as_ref(), |c| c.system_usec),
        },
        Metric {
            name: "cpu_nr_periods",
            unit: "total",
            help: "Number of enforcement periods that have elapsed",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.cpu.as_ref(), |c| c.nr_periods),
        },
        Metric {
            name: "cpu_nr_throttled",
            unit: "total",
            help: "Number of times the group has been throttled",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.cpu.as_ref(), |c| c.nr_throttled),
        },
        Metric {
            name: "cpu_throttled",
            unit: "usec",
            help: "Total time duration for which the group has been throttled",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.cpu.as_ref(), |c| c.throttled_usec),
        },
    ]
}

fn memory() -> [Metric; 15] {
    [
        Metric {
            name: "memory_usage",
            unit: "bytes",
            help: "Current memory usage",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.usage),
        },
        Metric {
            name: "memory_usage_limit",
            unit: "bytes",
            help: "Memory usage limit",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.usage_limit),
        },
        Metric {
            name: "memory_swap_usage",
            unit: "bytes",
            help: "Current swap usage",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.swap_usage),
        },
        Metric {
            name: "memory_swap_limit",
            unit: "bytes",
            help: "Swap usage limit",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.swap_limit),
        },
        Metric {
            name: "memory_anon",
            unit: "bytes",
            help: "Amount of memory used in anonymous mappings",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.anon),
        },
        Metric {
            name: "memory_file",
            unit: "bytes",
            help: "Amount of memory used to cache filesystem data",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.file),
        },
        Metric {
            name: "memory_kernel_stack",
            unit: "bytes",
            help: "Amount of memory allocated to kernel stacks",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.kernel_stack),
        },
        Metric {
            name: "memory_slab",
            unit: "bytes",
            help: "Amount of memory used for storing in-kernel data structures",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.slab),
        },
        Metric {
            name: "memory_sock",
            unit: "bytes",
            help: "Amount of memory used in network transmission buffers",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.sock),
        },
        Metric {
            name: "memory_shmem",
            unit: "bytes",
            help: "Amount of cached filesystem data that is swap-backed",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.shmem),
        },
        Metric {
            name: "memory_file_mapped",
            unit: "bytes",
            help: "Amount of cached filesystem data mapped with mmap",
            kind: ValueKind::Gauge,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.file_mapped),
        },
        Metric {
            name: "memory_pgfault",
            unit: "total",
            help: "Total number of page faults incurred",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.pgfault),
        },
        Metric {
            name: "memory_pgmajfault",
            unit: "total",
            help: "Number of major page faults incurred",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.memory.as_ref(), |m| m.pgmajfault),
        },
        Metric {
            name: "memory_oom",
            unit: "total",
            help: "Number of times the memory limit was reached and allocation failed",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.memory_events.as_ref(), |e| e.oom),
        },
        Metric {
            name: "memory_oom_kill",
            unit: "total",
            help: "Number of processes killed by the OOM killer",
            kind: ValueKind::Counter,
            labels: &[],
            extract: |s| single(s.memory_events.as_ref(), |e| e.oom_kill),
        },
    ]
}

fn io() -> [Metric; 4] {
    [
        Metric {
            name: "io_rbytes",
            unit: "bytes",
            help: "Bytes read from the device",
            kind: ValueKind::Counter,
            labels: DEVICE_LABELS,
            extract: |s| per_device(s, |e| e.rbytes),
        },
        Metric {
            name: "io_wbytes",
            unit: "bytes",
            help: "Bytes written to the device",
            kind: ValueKind::Counter,
            labels: DEVICE_LABELS,
            extract: |s| per_device(s, |e| e.wbytes),
        },
        Metric {
            name: "io_rios",
            unit: "total",
            help: "Number of read operations on the device",
            kind: ValueKind::Counter,
            labels: DEVICE_LABELS,
            extract: |s| per_device(s, |e| e.rios),
        },
        Metric {
            name: "io_wios",
            unit: "total",
            help: "Number of write operations on the device",
            kind: ValueKind::Counter,
            labels: DEVICE_LABELS,
            extract: |s| per_device(s, |e| e.wios),
        },
    ]
}

fn hugetlb() -> [Metric; 2] {
    [
        Metric {
            name: "hugetlb_current",
            unit: "bytes",
            help: "Current hugetlb usage",
            kind: ValueKind::Gauge,
            labels: PAGE_LABELS,
            extract: |s| per_page_size(s, |h| h.current),
        },
        Metric {
            name: "hugetlb_max",
            unit: "bytes",
            help: "Hugetlb usage limit",
            kind: ValueKind::Gauge,
            labels: PAGE_LABELS,
            extract: |s| per_page_size(s, |h| h.max),
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    fn find<'a>(catalog: &'a [Metric], name: &str, unit: &str) -> &'a Metric {
        catalog
            .iter()
            .find(|m| m.name == name && m.unit == unit)
            .unwrap()
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let ns = Namespace::new("container", None, HashMap::new());
        let catalog = metrics();
        let names: HashSet<String> = catalog.iter().map(|m| ns.fq_name(m.name, m.unit)).collect();
        assert_eq!(names.len(), catalog.len());
    }

    #[test]
    fn test_every_metric_builds_a_descriptor() {
        let ns = Namespace::new("container", None, HashMap::new());
        for metric in metrics() {
            let desc = metric.desc(&ns).unwrap();
            assert_eq!(&desc.variable_labels[..2], &["container_id", "namespace"]);
            assert_eq!(desc.variable_labels.len(), 2 + metric.labels.len());
        }
    }

    #[test]
    fn test_counters_and_gauges() {
        let catalog = metrics();
        assert_eq!(find(&catalog, "cpu_usage", "usec").kind, ValueKind::Counter);
        assert_eq!(find(&catalog, "pids", "current").kind, ValueKind::Gauge);
        assert_eq!(find(&catalog, "pids", "limit").kind, ValueKind::Gauge);
        assert_eq!(find(&catalog, "io_rbytes", "bytes").kind, ValueKind::Counter);
        assert_eq!(
            find(&catalog, "memory_usage_limit", "bytes").kind,
            ValueKind::Gauge
        );
    }

    #[test]
    fn test_absent_group_yields_nothing() {
        let stats = v2::Metrics::default();
        for metric in metrics() {
            assert!(metric.values(&stats).is_empty(), "{}", metric.name);
        }
    }

    #[test]
    fn test_extract_pids() {
        let stats = v2::Metrics {
            pids: Some(v2::PidsStat {
                current: 5,
                limit: 100,
            }),
            ..Default::default()
        };
        let catalog = metrics();
        assert_eq!(
            find(&catalog, "pids", "current").values(&stats),
            vec![Value {
                value: 5.0,
                labels: Vec::new()
            }]
        );
        assert_eq!(
            find(&catalog, "pids", "limit").values(&stats)[0].value,
            100.0
        );
    }

    #[test]
    fn test_extract_per_device() {
        let stats = v2::Metrics {
            io: Some(v2::IoStat {
                usage: vec![
                    v2::IoEntry {
                        major: 8,
                        minor: 0,
                        rbytes: 1024,
                        ..Default::default()
                    },
                    v2::IoEntry {
                        major: 254,
                        minor: 1,
                        rbytes: 2048,
                        ..Default::default()
                    },
                ],
            }),
            ..Default::default()
        };
        let catalog = metrics();
        let values = find(&catalog, "io_rbytes", "bytes").values(&stats);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].labels, vec!["8".to_owned(), "0".to_owned()]);
        assert_eq!(values[1].value, 2048.0);
        assert_eq!(values[1].labels, vec!["254".to_owned(), "1".to_owned()]);
    }

    #[test]
    fn test_extract_hugetlb_page_label() {
        let stats = v2::Metrics {
            hugetlb: vec![v2::HugeTlbStat {
                current: 4,
                max: 8,
                pagesize: "2MB".to_owned(),
            }],
            ..Default::default()
        };
        let catalog = metrics();
        let values = find(&catalog, "hugetlb_max", "bytes").values(&stats);
        assert_eq!(values[0].value, 8.0);
        assert_eq!(values[0].labels, vec!["2MB".to_owned()]);
    }
}
