//! Discovery of container tasks on the local host.
//!
//! [`Scanner`] walks the cgroup v2 hierarchy, recognises container scopes by
//! the naming conventions of docker, containerd and podman, and keeps a
//! [`crate::metrics::Collector`] in sync with what it finds.
use std::path::PathBuf;

mod cgroupfs;

pub use cgroupfs::{ScanSummary, Scanner};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read cgroup directory `{}`: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
