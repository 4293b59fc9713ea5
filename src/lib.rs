//! Creo Exporter: exposes the resource usage of running containers as
//! prometheus metrics.
//!
//! Container tasks are discovered by scanning the cgroup v2 hierarchy. Their
//! counters are read from the cgroup files on every scrape and served in the
//! prometheus text format.
pub mod api;
pub mod cgroup;
pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod metrics;

/// Runs the Creo Exporter application.
///
/// Reads the configuration from the environment, starts the cgroup scanner
/// and serves the metrics API.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values (see [`config`]).
/// - A metric catalog that prometheus rejects, e.g. because of an invalid
///   metric namespace.
/// - Failure to bind the listen address.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Config: {config:?}");

    let collector = metrics::Collector::new(config.namespace.clone())?;
    let registry = prometheus::Registry::new();
    registry.register(Box::new(collector.clone()))?;

    if config.namespace.is_some() {
        let scanner =
            discovery::Scanner::new(&config.cgroup_root, collector, config.task_labels);
        // the first scan runs before serving so an unreadable root fails fast
        let (scanner, summary) = scanner.scan_blocking().await?;
        let summary = summary?;
        log::info!(
            "Tracking {} containers below `{}`",
            summary.added,
            config.cgroup_root.display()
        );
        tokio::spawn(scanner.run(config.scan_interval));
    } else {
        log::warn!("METRICS_NAMESPACE is empty, metrics are disabled");
    }

    let api = api::APIServer::new(registry);
    api.listen(config.listen_addr).await?;
    Ok(())
}
