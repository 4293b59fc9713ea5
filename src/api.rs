use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::ToSocketAddrs;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Gathers `registry` and encodes it in the prometheus text format.
///
/// Returns the content type together with the encoded body.
pub fn render(registry: &Registry) -> Result<(String, Vec<u8>)> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut body = Vec::new();
    encoder.encode(&families, &mut body).map_err(Error::Encode)?;
    Ok((encoder.format_type().to_owned(), body))
}

async fn export_metrics(State(registry): State<Registry>) -> Response {
    // a scrape reads every task's cgroup files
    let rendered = tokio::task::spawn_blocking(move || render(&registry)).await;
    match rendered {
        Ok(Ok((content_type, body))) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Ok(Err(err)) => {
            log::error!("{err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to export metrics").into_response()
        }
        Err(err) => {
            log::error!("metrics scrape panicked: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to export metrics").into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(registry: Registry) -> Self {
        let router = axum::Router::new()
            .route("/metrics", get(export_metrics))
            .route("/healthz", get(healthz))
            .with_state(registry);
        Self { router }
    }

    /// Serves the API on `addr` until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if binding `addr` fails or the server stops with an
    /// I/O error.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("serving metrics on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}
