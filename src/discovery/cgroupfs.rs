use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cgroup::CgroupTask;
use crate::container::ContainerID;
use crate::error::ResultOkLogExt;
use crate::metrics::{Collector, Task, task_key};

use super::Error;

/// Keeps the tasks of a [`Collector`] in sync with the container scopes found
/// below a cgroup v2 root.
#[derive(Debug)]
pub struct Scanner {
    root: PathBuf,
    collector: Collector,
    labels: HashMap<String, String>,
    tracked: HashMap<PathBuf, Arc<CgroupTask>>,
}

/// Number of tasks added and removed by a single [`Scanner::scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub added: usize,
    pub removed: usize,
}

impl Scanner {
    /// Creates a scanner registering tasks found below `root` with `collector`.
    ///
    /// `labels` are attached to every registered task.
    pub fn new(
        root: impl Into<PathBuf>,
        collector: Collector,
        labels: HashMap<String, String>,
    ) -> Self {
        Self {
            root: root.into(),
            collector,
            labels,
            tracked: HashMap::new(),
        }
    }

    /// Walks the cgroup tree once, registering new container scopes and
    /// removing those whose directory disappeared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadDir`] if the root cannot be listed. Subdirectories
    /// vanishing during the walk are skipped.
    pub fn scan(&mut self) -> Result<ScanSummary, Error> {
        let mut summary = ScanSummary::default();
        let mut seen = HashSet::with_capacity(self.tracked.len());
        let mut found = Vec::new();

        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(source) if dir == self.root => {
                    return Err(Error::ReadDir { path: dir, source });
                }
                Err(err) => {
                    log::debug!("skipping `{}`: {}", dir.display(), err);
                    continue;
                }
            };

            for entry in entries.map_while(Result::ok) {
                if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                    continue;
                }

                let path = entry.path();
                match parse_scope_name(&entry.file_name()) {
                    None => stack.push(path),
                    Some(_) if self.tracked.contains_key(&path) => {
                        seen.insert(path);
                    }
                    Some((id, namespace)) => found.push((path, id, namespace)),
                }
            }
        }

        // vanished scopes go first so a duplicate scope can take over their task
        self.tracked.retain(|path, task| {
            if seen.contains(path) {
                return true;
            }
            log::debug!("container scope `{}` vanished", path.display());
            self.collector.remove(task.as_ref());
            summary.removed += 1;
            false
        });

        for (path, id, namespace) in found {
            if self.collector.contains(id.as_ref(), namespace) {
                log::debug!(
                    "skipping `{}`: task {} already registered",
                    path.display(),
                    task_key(id.as_ref(), namespace)
                );
                continue;
            }

            let Some(task) = CgroupTask::open(id, namespace, &path).ok_log() else {
                continue;
            };
            let task = Arc::new(task);
            let handle: Arc<dyn Task> = task.clone();
            if self.collector.add(handle, &self.labels).ok_log().is_some() {
                log::debug!("tracking container scope `{}`", path.display());
                self.tracked.insert(path, task);
                summary.added += 1;
            }
        }

        Ok(summary)
    }

    /// Runs [`Scanner::scan`] on the blocking thread pool and hands the
    /// scanner back together with the scan result.
    ///
    /// # Errors
    ///
    /// Returns the [`tokio::task::JoinError`] if the scan panicked; the
    /// scanner is lost in that case.
    pub async fn scan_blocking(
        mut self,
    ) -> Result<(Self, Result<ScanSummary, Error>), tokio::task::JoinError> {
        tokio::task::spawn_blocking(move || {
            let result = self.scan();
            (self, result)
        })
        .await
    }

    /// Rescans the cgroup tree every `period` until the process exits.
    pub async fn run(mut self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let result;
            (self, result) = match self.scan_blocking().await {
                Ok(out) => out,
                Err(err) => {
                    log::error!("cgroup scan panicked: {err}");
                    return;
                }
            };
            match result {
                Ok(summary) if summary != ScanSummary::default() => log::debug!(
                    "cgroup scan added {} and removed {} tasks",
                    summary.added,
                    summary.removed
                ),
                Ok(_) => log::trace!("cgroup scan found no changes"),
                Err(err) => log::error!("{err}"),
            }
        }
    }
}

/// Extracts the container id and runtime namespace from a scope directory
/// name like `docker-<id>.scope`.
fn parse_scope_name(name: &OsStr) -> Option<(ContainerID, &'static str)> {
    const ID_LENGTH_IN_PATH: usize = 64;
    const SUFFIX: &[u8] = b".scope";
    const RUNTIMES: &[(&[u8], &str)] = &[
        (b"cri-containerd-", "k8s.io"),
        (b"docker-", "moby"),
        (b"libpod-", "podman"),
    ];

    let name = name.as_bytes();
    RUNTIMES.iter().find_map(|&(prefix, namespace)| {
        let id = extract_id_from_path_bytes(name, prefix, SUFFIX, ID_LENGTH_IN_PATH)?;
        let id = ContainerID::from_scope_id(id).ok()?;
        Some((id, namespace))
    })
}

/// Returns the part of `path_bytes` between `prefix` and `suffix` if it has
/// exactly `expected_length` bytes.
#[inline]
fn extract_id_from_path_bytes<'a>(
    path_bytes: &'a [u8],
    prefix: &[u8],
    suffix: &[u8],
    expected_length: usize,
) -> Option<&'a [u8]> {
    path_bytes
        .strip_prefix(prefix)?
        .strip_suffix(suffix)
        .filter(|id| id.len() == expected_length)
}
