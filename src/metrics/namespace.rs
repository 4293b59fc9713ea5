use std::collections::HashMap;

use prometheus::core::Desc;

use super::{Error, Result};

/// A metric name prefix together with constant labels attached to every
/// descriptor built from it.
///
/// # Examples
///
/// ```
/// # use std::collections::HashMap;
/// # use creo_exporter::metrics::Namespace;
/// let ns = Namespace::new("container", None, HashMap::new());
/// assert_eq!(ns.fq_name("cpu_usage", "usec"), "container_cpu_usage_usec");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    name: String,
    subsystem: Option<String>,
    labels: HashMap<String, String>,
}

impl Namespace {
    pub fn new(
        name: impl Into<String>,
        subsystem: Option<String>,
        labels: HashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            subsystem,
            labels,
        }
    }

    /// Derives a namespace with the same prefix whose constant labels are
    /// extended by `labels`. Entries in `labels` win over existing ones.
    pub fn with_const_labels(&self, labels: &HashMap<String, String>) -> Self {
        let mut merged = self.labels.clone();
        merged.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            name: self.name.clone(),
            subsystem: self.subsystem.clone(),
            labels: merged,
        }
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    /// Joins namespace, subsystem, metric name and unit with `_`, skipping
    /// empty parts.
    pub fn fq_name(&self, name: &str, unit: &str) -> String {
        [
            self.name.as_str(),
            self.subsystem.as_deref().unwrap_or_default(),
            name,
            unit,
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
    }

    /// Builds a descriptor carrying this namespace's constant labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelConflict`] if a constant label shares its name with
    /// one of `variable_labels`, and [`Error::Descriptor`] if prometheus rejects
    /// the descriptor (invalid metric or label name, empty help).
    pub fn new_desc(
        &self,
        name: &str,
        unit: &str,
        help: &str,
        variable_labels: Vec<String>,
    ) -> Result<Desc> {
        let fq_name = self.fq_name(name, unit);
        if let Some(label) = variable_labels
            .iter()
            .find(|label| self.labels.contains_key(label.as_str()))
        {
            return Err(Error::LabelConflict {
                label: label.clone(),
                metric: fq_name,
            });
        }

        Desc::new(
            fq_name.clone(),
            help.to_owned(),
            variable_labels,
            self.labels.clone(),
        )
        .map_err(|source| Error::Descriptor {
            metric: fq_name,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fq_name_with_subsystem() {
        let ns = Namespace::new("container", Some("cgroup".to_owned()), HashMap::new());
        assert_eq!(ns.fq_name("pids", "current"), "container_cgroup_pids_current");
    }

    #[test]
    fn test_fq_name_without_unit() {
        let ns = Namespace::new("container", None, HashMap::new());
        assert_eq!(ns.fq_name("pids", ""), "container_pids");
    }

    #[test]
    fn test_with_const_labels_merges() {
        let ns = Namespace::new("container", None, labels(&[("host", "a"), ("zone", "x")]));
        let derived = ns.with_const_labels(&labels(&[("zone", "y"), ("team", "db")]));

        assert_eq!(derived.labels(), &labels(&[("host", "a"), ("zone", "y"), ("team", "db")]));
        // the parent stays untouched
        assert_eq!(ns.labels(), &labels(&[("host", "a"), ("zone", "x")]));
    }

    #[test]
    fn test_new_desc_carries_const_labels() {
        let ns = Namespace::new("container", None, labels(&[("team", "db")]));
        let desc = ns
            .new_desc("pids", "current", "help", vec!["container_id".to_owned()])
            .unwrap();

        assert_eq!(desc.fq_name, "container_pids_current");
        assert_eq!(desc.variable_labels, vec!["container_id".to_owned()]);
        assert_eq!(desc.const_label_pairs.len(), 1);
        assert_eq!(desc.const_label_pairs[0].get_name(), "team");
        assert_eq!(desc.const_label_pairs[0].get_value(), "db");
    }

    #[test]
    fn test_new_desc_rejects_conflicting_label() {
        let ns = Namespace::new("container", None, labels(&[("namespace", "other")]));
        let err = ns
            .new_desc("pids", "current", "help", vec!["namespace".to_owned()])
            .unwrap_err();

        match err {
            Error::LabelConflict { label, metric } => {
                assert_eq!(label, "namespace");
                assert_eq!(metric, "container_pids_current");
            }
            _ => panic!("Expected LabelConflict error"),
        }
    }

    #[test]
    fn test_new_desc_rejects_invalid_label_name() {
        let ns = Namespace::new("container", None, labels(&[("not-valid", "x")]));
        let err = ns.new_desc("pids", "current", "help", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Descriptor { .. }));
    }
}
