//! Runtime configuration read from environment variables.
//!
//! | Variable             | Default          |
//! |----------------------|------------------|
//! | `CGROUP_ROOT`        | `/sys/fs/cgroup` |
//! | `LISTEN_ADDR`        | `0.0.0.0:9100`   |
//! | `METRICS_NAMESPACE`  | `container`      |
//! | `METRICS_SUBSYSTEM`  | unset            |
//! | `SCAN_INTERVAL_SECS` | `5`              |
//! | `TASK_LABELS`        | unset            |
//!
//! An empty `METRICS_NAMESPACE` disables all metrics. `TASK_LABELS` is a
//! comma separated list of `key=value` pairs attached to every discovered task.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::metrics::Namespace;
use crate::metrics::catalog::BASE_LABELS;

const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9100";
const DEFAULT_NAMESPACE: &str = "container";
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{var}`: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("malformed label `{0}` in `TASK_LABELS`, expected `key=value`")]
    MalformedLabel(String),
    #[error("invalid `TASK_LABELS`: {0}")]
    InvalidLabels(#[source] crate::metrics::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cgroup_root: PathBuf,
    pub listen_addr: SocketAddr,
    /// `None` if metrics are disabled.
    pub namespace: Option<Namespace>,
    pub scan_interval: Duration,
    pub task_labels: HashMap<String, String>,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a
    /// variable or `None` if it is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cgroup_root = lookup("CGROUP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CGROUP_ROOT));

        let listen_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        let listen_addr = listen_addr
            .parse()
            .map_err(|err: std::net::AddrParseError| Error::InvalidValue {
                var: "LISTEN_ADDR",
                value: listen_addr.clone(),
                reason: err.to_string(),
            })?;

        let name = lookup("METRICS_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
        let subsystem = lookup("METRICS_SUBSYSTEM").filter(|s| !s.is_empty());
        let namespace =
            (!name.is_empty()).then(|| Namespace::new(name, subsystem, HashMap::new()));

        let scan_interval = match lookup("SCAN_INTERVAL_SECS") {
            None => Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            Some(value) => match value.parse::<u64>() {
                Ok(0) => {
                    return Err(Error::InvalidValue {
                        var: "SCAN_INTERVAL_SECS",
                        value,
                        reason: "must be greater than zero".to_owned(),
                    });
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(err) => {
                    return Err(Error::InvalidValue {
                        var: "SCAN_INTERVAL_SECS",
                        value,
                        reason: err.to_string(),
                    });
                }
            },
        };

        let task_labels = match lookup("TASK_LABELS") {
            Some(value) => parse_labels(&value)?,
            None => HashMap::new(),
        };
        validate_labels(&task_labels)?;

        Ok(Self {
            cgroup_root,
            listen_addr,
            namespace,
            scan_interval,
            task_labels,
        })
    }
}

fn parse_labels(src: &str) -> Result<HashMap<String, String>> {
    src.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_owned(), value.trim().to_owned()))
            }
            _ => Err(Error::MalformedLabel(pair.to_owned())),
        })
        .collect()
}

/// Checks that `labels` can be attached to task descriptors: valid label names
/// that do not shadow the per-task labels.
fn validate_labels(labels: &HashMap<String, String>) -> Result<()> {
    if labels.is_empty() {
        return Ok(());
    }
    let variable_labels = BASE_LABELS.iter().map(|label| label.to_string()).collect();
    Namespace::new("task", None, labels.clone())
        .new_desc("labels", "", "Task label validation.", variable_labels)
        .map(drop)
        .map_err(Error::InvalidLabels)
}
