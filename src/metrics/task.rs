use prost_types::Any;

/// Error returned by [`Task::stats`].
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// A running container task whose resource usage can be queried.
///
/// The payload returned by [`Task::stats`] is a self-describing
/// [`prost_types::Any`]; see [`crate::cgroup::metrics`] for the supported
/// type identifiers.
pub trait Task: Send + Sync {
    /// Identifier of the task, e.g. the container id.
    fn id(&self) -> &str;

    /// Logical namespace the task lives in, e.g. `moby` or `k8s.io`.
    fn namespace(&self) -> &str;

    /// Fetches a snapshot of the current resource usage.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters could not be read, e.g. because the
    /// task already exited.
    fn stats(&self) -> Result<Any, TaskError>;
}
