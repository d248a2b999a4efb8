use mixer::IoError;
use shared::domain::{EngineVariant, Target};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "index {} is out of range for '{}' on the {variant} engine",
        .target.index,
        .target.kind
    )]
    IndexOutOfRange {
        target: Target,
        variant: EngineVariant,
    },
    #[error("error validating {target}: {source}")]
    Engine {
        target: Target,
        #[source]
        source: IoError,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    #[error("engine session is not ready")]
    NotReady,
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: IoError,
    },
    #[error("{path}: engine reported a non-finite value ({value})")]
    InvalidReading { path: String, value: f64 },
}
