use serde::{Deserialize, Serialize};

use crate::{
    domain::{Target, TargetKind},
    error::ApiError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTargetResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub target_type: TargetKind,
    pub target_index: u32,
}

impl SetTargetResponse {
    pub fn success(target: Target, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            target_type: target.kind,
            target_index: target.index,
        }
    }

    pub fn target(&self) -> Target {
        Target {
            kind: self.target_type,
            index: self.target_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTargetResponse {
    pub status: ResponseStatus,
    pub target_type: TargetKind,
    pub target_index: u32,
    pub target_label: String,
    pub session_ready: bool,
}

impl GetTargetResponse {
    pub fn new(target: Target, target_label: impl Into<String>, session_ready: bool) -> Self {
        Self {
            status: ResponseStatus::Success,
            target_type: target.kind,
            target_index: target.index,
            target_label: target_label.into(),
            session_ready,
        }
    }
}

/// JSON body for every failed control request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_index: Option<u32>,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: err.message,
            requested_type: err.requested_type,
            requested_index: err.requested_index,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
