/// Entry point for the Creo Exporter.
///
/// Scans the cgroup v2 hierarchy for container scopes and serves their
/// resource usage on `/metrics`.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid environment
/// variables or an unreadable cgroup root).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug LISTEN_ADDR=127.0.0.1:9100 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    creo_exporter::run().await
}
