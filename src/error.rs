use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by corpus loading, training, and sampling.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("corpus format error in {path} at line {line}: {message}")]
    CorpusFormat {
        path: String,
        line: usize,
        message: String,
    },

    #[error("invalid parameter {param}: {message}")]
    InvalidParameter { param: &'static str, message: String },

    #[error("unknown sampler combination `{0}`, expected one of lc_ds, lc_cs, mnlp_ds, mnlp_cs")]
    UnknownCombination(String),

    #[error("unknown combination mode `{0}`, expected `series` or `parallel`")]
    UnknownCombinationMode(String),

    #[error("model state error: {0}")]
    ModelState(String),

    #[error("model serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("tagger has not been trained yet")]
    NotFitted,

    #[error("sentence has no predicted labels; run the tagger before sampling")]
    NotPredicted,

    #[error("sentence has no token embeddings; embed before diversity sampling")]
    NotEmbedded,

    #[error("sentence without gold labels where annotated data is required")]
    MissingGoldLabels,

    #[error("empty training set")]
    EmptyTrainingSet,
}
