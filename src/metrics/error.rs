#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("constant label `{label}` conflicts with a variable label of `{metric}`")]
    LabelConflict { label: String, metric: String },
    #[error("failed to build descriptor for `{metric}`: {source}")]
    Descriptor {
        metric: String,
        #[source]
        source: prometheus::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
