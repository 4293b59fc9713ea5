//! Prometheus collector for the resource usage of running container tasks.
//!
//! The lifecycle side registers tasks through [`Collector::add`] and
//! [`Collector::remove`] while prometheus scrapes the same [`Collector`]
//! concurrently. Registration only ever holds the registry lock for a single
//! map operation; a scrape copies the registrations and fetches the stats of
//! every task without holding the lock.
//!
//! # Key Components
//!
//! - [`Task`]: Capability of a task to report its stats as a typed payload.
//! - [`Namespace`]: Metric name prefix and constant labels.
//! - [`catalog`]: The fixed descriptor table.
//! - [`Collector`]: Registry plus scrape pipeline.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use creo_exporter::metrics::{Collector, Namespace};
//!
//! let collector = Collector::new(Some(Namespace::new("container", None, HashMap::new()))).unwrap();
//! let registry = prometheus::Registry::new();
//! registry.register(Box::new(collector.clone())).unwrap();
//! assert!(registry.gather().is_empty());
//! ```
pub mod catalog;
mod collector;
mod error;
mod key;
mod namespace;
mod task;

pub use collector::Collector;
pub use error::{Error, Result};
pub use key::task_key;
pub use namespace::Namespace;
pub use task::{Task, TaskError};
