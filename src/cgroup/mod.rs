//! Resource usage of containers read from the cgroup v2 filesystem.
//!
//! # Key Components
//!
//! - [`metrics`]: The stats payloads handed out by tasks and their decoding.
//! - [`stats`]: Parsers for the individual controller files.
//! - [`StatReader`]: Keeps the controller files of one cgroup open and reads
//!   them into a payload.
//! - [`CgroupTask`]: A [`crate::metrics::Task`] backed by a cgroup directory.
//!
//! # Supported Stats
//!
//! The following files are read, if available:
//!
//! - `pids.current` and `pids.max`
//! - `cpu.stat`
//! - `memory.stat`, `memory.current`, `memory.max`, `memory.swap.current`,
//!   `memory.swap.max` and `memory.events`
//! - `io.stat`
//! - `hugetlb.<pagesize>.current` and `hugetlb.<pagesize>.max`
//!
//! # Platform Requirements
//!
//! - Linux with cgroup v2 support.
//! - Read access to the cgroup root, usually `/sys/fs/cgroup`.
pub mod metrics;
mod reader;
pub mod stats;
mod task;
mod utils;

pub use reader::{StatReader, StatReaderBuilder};
pub use task::CgroupTask;
