use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("engine front-end is not launched")]
    EngineUnavailable,
    #[error("engine unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// The engine has no such parameter, typically an index outside its layout.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("engine transport failure: {0}")]
    Transport(String),
    #[error("session is closed")]
    Closed,
}

impl IoError {
    pub fn is_unknown_parameter(&self) -> bool {
        matches!(self, Self::UnknownParameter(_))
    }
}
