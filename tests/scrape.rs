use std::collections::HashMap;
use std::sync::Arc;

use creo_exporter::cgroup::metrics::{self, v1, v2};
use creo_exporter::metrics::{Collector, Namespace, Task, TaskError};
use prometheus::{Encoder, TextEncoder};
use prost_types::Any;

struct FixedTask {
    id: &'static str,
    namespace: &'static str,
    stats: Option<Any>,
}

impl Task for FixedTask {
    fn id(&self) -> &str {
        self.id
    }

    fn namespace(&self) -> &str {
        self.namespace
    }

    fn stats(&self) -> Result<Any, TaskError> {
        self.stats.clone().ok_or_else(|| "task exited".into())
    }
}

fn scrape(registry: &prometheus::Registry) -> String {
    let mut body = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut body)
        .unwrap();
    String::from_utf8(body).unwrap()
}

#[test]
fn test_scrape_registered_tasks() {
    let collector = Collector::new(Some(Namespace::new("container", None, HashMap::new()))).unwrap();
    let registry = prometheus::Registry::new();
    registry.register(Box::new(collector.clone())).unwrap();

    let healthy = metrics::encode_v2(&v2::Metrics {
        pids: Some(v2::PidsStat {
            current: 5,
            limit: 100,
        }),
        cpu: Some(v2::CpuStat {
            usage_usec: 1_000_000,
            ..Default::default()
        }),
        ..Default::default()
    });
    collector
        .add(
            Arc::new(FixedTask {
                id: "a",
                namespace: "default",
                stats: Some(healthy),
            }),
            &HashMap::new(),
        )
        .unwrap();
    collector
        .add(
            Arc::new(FixedTask {
                id: "b",
                namespace: "default",
                stats: None,
            }),
            &HashMap::new(),
        )
        .unwrap();

    let body = scrape(&registry);
    assert!(body.contains("# TYPE container_pids_current gauge"));
    assert!(body.contains(r#"container_pids_current{container_id="a",namespace="default"} 5"#));
    assert!(body.contains(r#"container_pids_limit{container_id="a",namespace="default"} 100"#));
    assert!(body.contains("# TYPE container_cpu_usage_usec counter"));
    assert!(
        body.contains(r#"container_cpu_usage_usec{container_id="a",namespace="default"} 1000000"#)
    );
    // the failing task is skipped without affecting the healthy one
    assert!(!body.contains(r#"container_id="b""#));
    // no memory stats were reported
    assert!(!body.contains("container_memory_usage_bytes"));

    collector.remove(&FixedTask {
        id: "a",
        namespace: "default",
        stats: None,
    });
    assert!(scrape(&registry).is_empty());
}

#[test]
fn test_scrape_v1_payload_with_task_labels() {
    let collector = Collector::new(Some(Namespace::new("container", None, HashMap::new()))).unwrap();
    let registry = prometheus::Registry::new();
    registry.register(Box::new(collector.clone())).unwrap();

    let legacy = metrics::encode_v1(&v1::Metrics {
        cpu: Some(v1::CpuStat {
            usage: Some(v1::CpuUsage {
                total: 2_000_000_000,
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    });
    let labels = HashMap::from([("host".to_owned(), "node-1".to_owned())]);
    collector
        .add(
            Arc::new(FixedTask {
                id: "legacy",
                namespace: "moby",
                stats: Some(legacy),
            }),
            &labels,
        )
        .unwrap();

    let body = scrape(&registry);
    assert!(body.contains(
        r#"container_cpu_usage_usec{container_id="legacy",host="node-1",namespace="moby"} 2000000"#
    ));
}
