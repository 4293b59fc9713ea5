use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use prost_types::Any;

use crate::container::ContainerID;
use crate::metrics::{Task, TaskError};

use super::metrics;
use super::reader::{StatReader, StatReaderBuilder};

/// A container task backed by its cgroup v2 directory.
///
/// Every call to [`Task::stats`] reads the controller files and hands the
/// result out as a v2 payload.
#[derive(Debug)]
pub struct CgroupTask {
    id: ContainerID,
    namespace: String,
    path: PathBuf,
    reader: Mutex<StatReader>,
}

impl CgroupTask {
    /// Opens the stat files below `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be listed.
    pub fn open(
        id: ContainerID,
        namespace: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let path = path.into();
        let reader = StatReaderBuilder::for_cgroup(&path)?.build();
        Ok(Self {
            id,
            namespace: namespace.into(),
            path,
            reader: Mutex::new(reader),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Task for CgroupTask {
    fn id(&self) -> &str {
        self.id.as_ref()
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn stats(&self) -> Result<Any, TaskError> {
        let stats = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read()?;
        Ok(metrics::encode_v2(&stats))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::cgroup::metrics::Payload;

    #[test]
    fn test_stats_encodes_v2_payload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pids.current"), "3\n").unwrap();
        fs::write(dir.path().join("pids.max"), "max\n").unwrap();

        let task =
            CgroupTask::open(ContainerID::new("abc").unwrap(), "moby", dir.path()).unwrap();
        assert_eq!(task.id(), "abc");
        assert_eq!(task.namespace(), "moby");
        assert_eq!(task.path(), dir.path());

        let any = task.stats().unwrap();
        assert_eq!(any.type_url, metrics::V2_METRICS_TYPE_URL);
        match metrics::decode(&any).unwrap() {
            Payload::V2(stats) => {
                let pids = stats.pids.unwrap();
                assert_eq!(pids.current, 3);
                assert_eq!(pids.limit, u64::MAX);
            }
            other => panic!("Expected V2 payload, got {other:?}"),
        }
    }

    #[test]
    fn test_stats_surfaces_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pids.current"), "many\n").unwrap();

        let task =
            CgroupTask::open(ContainerID::new("abc").unwrap(), "moby", dir.path()).unwrap();
        assert!(task.stats().is_err());
    }

    #[test]
    fn test_stats_recovers_after_failed_read() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("pids.current");
        fs::write(&current, "many\n").unwrap();

        let task =
            CgroupTask::open(ContainerID::new("abc").unwrap(), "moby", dir.path()).unwrap();
        assert!(task.stats().is_err());

        fs::write(&current, "3\n").unwrap();
        let any = task.stats().unwrap();
        match metrics::decode(&any).unwrap() {
            Payload::V2(stats) => assert_eq!(stats.pids.unwrap().current, 3),
            other => panic!("Expected V2 payload, got {other:?}"),
        }
    }

    #[test]
    fn test_open_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = CgroupTask::open(
            ContainerID::new("abc").unwrap(),
            "moby",
            dir.path().join("gone"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
