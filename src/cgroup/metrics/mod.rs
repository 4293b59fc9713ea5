//! Self-describing stats payloads exchanged between tasks and the collector.
//!
//! A task hands out its counters as a [`prost_types::Any`]: the `type_url`
//! names the payload version and `value` carries the protobuf encoded body.
//! [`decode`] recognises the cgroup v1 and v2 payloads; everything else is a
//! [`DecodeError::UnknownType`].
//!
//! # Example
//!
//! ```rust
//! use creo_exporter::cgroup::metrics::{self, Payload, v2};
//!
//! let stats = v2::Metrics {
//!     pids: Some(v2::PidsStat { current: 5, limit: 100 }),
//!     ..Default::default()
//! };
//! let any = metrics::encode_v2(&stats);
//! assert_eq!(any.type_url, metrics::V2_METRICS_TYPE_URL);
//!
//! let decoded = metrics::decode(&any).unwrap();
//! assert!(matches!(decoded, Payload::V2(_)));
//! ```

use prost::Message;
use prost_types::Any;

pub mod v1;
pub mod v2;

pub const V1_METRICS_TYPE_URL: &str = "io.containerd.cgroups.v1.Metrics";
pub const V2_METRICS_TYPE_URL: &str = "io.containerd.cgroups.v2.Metrics";

/// Prefix protobuf tooling puts in front of fully qualified type names.
const GOOGLE_APIS_PREFIX: &str = "type.googleapis.com/";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown stats type `{type_url}`")]
    UnknownType { type_url: String },
    #[error("failed to decode stats type `{type_url}`: {source}")]
    Decode {
        type_url: String,
        #[source]
        source: prost::DecodeError,
    },
}

/// A decoded stats payload, tagged by its version.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    V1(v1::Metrics),
    V2(v2::Metrics),
}

impl Payload {
    /// Normalizes the payload into the cgroup v2 shape used by the metric catalog.
    pub fn into_v2(self) -> v2::Metrics {
        match self {
            Payload::V1(metrics) => metrics.into(),
            Payload::V2(metrics) => metrics,
        }
    }
}

/// Decodes a stats payload by its type identifier.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownType`] for unrecognised identifiers and
/// [`DecodeError::Decode`] if the body is malformed.
pub fn decode(any: &Any) -> Result<Payload, DecodeError> {
    let type_url = any
        .type_url
        .strip_prefix(GOOGLE_APIS_PREFIX)
        .unwrap_or(&any.type_url);

    let payload = match type_url {
        V1_METRICS_TYPE_URL => Payload::V1(
            v1::Metrics::decode(any.value.as_slice()).map_err(|source| DecodeError::Decode {
                type_url: any.type_url.clone(),
                source,
            })?,
        ),
        V2_METRICS_TYPE_URL => Payload::V2(
            v2::Metrics::decode(any.value.as_slice()).map_err(|source| DecodeError::Decode {
                type_url: any.type_url.clone(),
                source,
            })?,
        ),
        _ => {
            return Err(DecodeError::UnknownType {
                type_url: any.type_url.clone(),
            });
        }
    };

    Ok(payload)
}

pub fn encode_v1(metrics: &v1::Metrics) -> Any {
    Any {
        type_url: V1_METRICS_TYPE_URL.to_owned(),
        value: metrics.encode_to_vec(),
    }
}

pub fn encode_v2(metrics: &v2::Metrics) -> Any {
    Any {
        type_url: V2_METRICS_TYPE_URL.to_owned(),
        value: metrics.encode_to_vec(),
    }
}
