use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use prometheus::core::Desc;
use prometheus::proto::{self, LabelPair, MetricFamily};

use crate::cgroup::metrics as payload;
use crate::cgroup::metrics::v2;

use super::catalog::{self, Metric, Value, ValueKind};
use super::{Namespace, Result, Task, task_key};

/// A registered task and the descriptors its samples are emitted with.
#[derive(Clone)]
struct Registration {
    task: Arc<dyn Task>,
    /// Descriptors carrying the task's extra constant labels, in catalog order.
    /// `None` means the collector's default descriptors are used.
    descs: Option<Arc<[Desc]>>,
}

struct Inner {
    metrics: Vec<Metric>,
    descs: Vec<Desc>,
    ns: Option<Namespace>,
    tasks: RwLock<HashMap<String, Registration>>,
}

/// Exposes the resource usage of a dynamic set of tasks to prometheus.
///
/// Tasks are registered with [`Collector::add`] and dropped with
/// [`Collector::remove`]. The collector implements
/// [`prometheus::core::Collector`]: [`desc`](prometheus::core::Collector::desc)
/// returns the fixed descriptor catalog and
/// [`collect`](prometheus::core::Collector::collect) fetches the stats of every
/// task registered at the time of the call.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

impl Collector {
    /// Creates a collector whose metric names are prefixed by `ns`.
    ///
    /// Passing `None` disables metrics: the collector describes nothing and
    /// [`Collector::add`] ignores every task.
    ///
    /// # Errors
    ///
    /// Returns an error if `ns` cannot produce valid descriptors, e.g. due to
    /// an invalid name or constant label.
    pub fn new(ns: Option<Namespace>) -> Result<Self> {
        let metrics = match ns {
            Some(_) => catalog::metrics(),
            None => Vec::new(),
        };
        let descs = match ns.as_ref() {
            Some(ns) => build_descs(&metrics, ns)?,
            None => Vec::new(),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                metrics,
                descs,
                ns,
                tasks: RwLock::default(),
            }),
        })
    }

    /// Registers a task.
    ///
    /// Non-empty `labels` are attached as constant labels to every sample of
    /// this task. Registering a task whose key is already present is a no-op;
    /// the original registration and its labels are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptors for `labels` cannot be built. The
    /// task is not registered in that case.
    pub fn add(&self, task: Arc<dyn Task>, labels: &HashMap<String, String>) -> Result<()> {
        let Some(ns) = self.inner.ns.as_ref() else {
            return Ok(());
        };

        let key = task_key(task.id(), task.namespace());
        if self.read().contains_key(&key) {
            return Ok(());
        }

        let descs = if labels.is_empty() {
            None
        } else {
            let ns = ns.with_const_labels(labels);
            Some(build_descs(&self.inner.metrics, &ns)?.into())
        };

        if let Entry::Vacant(slot) = self.write().entry(key) {
            log::debug!(
                "registered task: id={}, namespace={}",
                task.id(),
                task.namespace()
            );
            slot.insert(Registration { task, descs });
        }

        Ok(())
    }

    /// Removes a task. Unknown tasks are ignored.
    pub fn remove(&self, task: &dyn Task) {
        let key = task_key(task.id(), task.namespace());
        if self.write().remove(&key).is_some() {
            log::debug!(
                "removed task: id={}, namespace={}",
                task.id(),
                task.namespace()
            );
        }
    }

    /// Returns the number of registered tasks.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns whether a task with the given id and namespace is registered.
    pub fn contains(&self, id: &str, namespace: &str) -> bool {
        self.read().contains_key(&task_key(id, namespace))
    }

    /// Copies the current registrations, holding the read lock only for the copy.
    fn snapshot(&self) -> Vec<Registration> {
        self.read().values().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Registration>> {
        self.inner
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Registration>> {
        self.inner
            .tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("ns", &self.inner.ns)
            .field("metrics", &self.inner.metrics.len())
            .field("tasks", &self.len())
            .finish()
    }
}

impl prometheus::core::Collector for Collector {
    fn desc(&self) -> Vec<&Desc> {
        self.inner.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families: Vec<MetricFamily> = self
            .inner
            .metrics
            .iter()
            .zip(&self.inner.descs)
            .map(|(metric, desc)| new_family(desc, metric.kind))
            .collect();

        for registration in self.snapshot() {
            let task = registration.task.as_ref();
            let Some(stats) = fetch(task) else {
                continue;
            };
            let descs = registration
                .descs
                .as_deref()
                .unwrap_or(self.inner.descs.as_slice());
            let base = [task.id(), task.namespace()];

            for ((metric, desc), family) in self
                .inner
                .metrics
                .iter()
                .zip(descs)
                .zip(families.iter_mut())
            {
                for value in metric.values(&stats) {
                    if let Some(sample) = new_sample(desc, metric.kind, &base, &value) {
                        family.mut_metric().push(sample);
                    }
                }
            }
        }

        families.retain(|family| !family.get_metric().is_empty());
        families
    }
}

fn build_descs(metrics: &[Metric], ns: &Namespace) -> Result<Vec<Desc>> {
    metrics.iter().map(|metric| metric.desc(ns)).collect()
}

/// Fetches and decodes the stats of a task. Failures are logged and yield `None`.
fn fetch(task: &dyn Task) -> Option<v2::Metrics> {
    let any = match task.stats() {
        Ok(any) => any,
        Err(err) => {
            log::error!(
                target: "collector",
                "failed to fetch task stats: id={}, namespace={}, error={}",
                task.id(),
                task.namespace(),
                err
            );
            return None;
        }
    };

    match payload::decode(&any) {
        Ok(payload) => Some(payload.into_v2()),
        Err(err) => {
            log::error!(
                target: "collector",
                "failed to decode task stats: id={}, namespace={}, error={}",
                task.id(),
                task.namespace(),
                err
            );
            None
        }
    }
}

fn new_family(desc: &Desc, kind: ValueKind) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(desc.fq_name.clone());
    family.set_help(desc.help.clone());
    family.set_field_type(kind.metric_type());
    family
}

/// Builds one sample. Label values are matched against the descriptor's
/// variable labels in order: the base values first, then the value's own.
fn new_sample(
    desc: &Desc,
    kind: ValueKind,
    base: &[&str],
    value: &Value,
) -> Option<proto::Metric> {
    if desc.variable_labels.len() != base.len() + value.labels.len() {
        log::warn!(
            target: "collector",
            "label cardinality mismatch for `{}`: expected {}, got {}",
            desc.fq_name,
            desc.variable_labels.len(),
            base.len() + value.labels.len()
        );
        return None;
    }

    let label_values = base
        .iter()
        .copied()
        .chain(value.labels.iter().map(String::as_str));
    let mut pairs = desc.const_label_pairs.clone();
    for (name, label_value) in desc.variable_labels.iter().zip(label_values) {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(label_value.to_owned());
        pairs.push(pair);
    }
    pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut sample = proto::Metric::default();
    sample.set_label(pairs.into());
    match kind {
        ValueKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(value.value);
            sample.set_counter(counter);
        }
        ValueKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(value.value);
            sample.set_gauge(gauge);
        }
    }

    Some(sample)
}
