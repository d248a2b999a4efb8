use std::sync::Arc;

use control::{SharedControlState, TargetRegistry, ValidationError};
use mixer::MixerSession;
use shared::{
    domain::{InvalidKind, ParamField, Target, TargetKind},
    error::ApiError,
    protocol::{GetTargetResponse, SetTargetResponse},
};
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub registry: TargetRegistry,
    pub state: Arc<SharedControlState>,
}

impl ApiContext {
    pub fn new(state: Arc<SharedControlState>) -> Self {
        Self {
            registry: TargetRegistry::new(Arc::clone(&state)),
            state,
        }
    }
}

pub fn set_target_route() -> &'static str {
    "/set_target/:kind/:index"
}

pub fn get_target_route() -> &'static str {
    "/get_target"
}

/// Retargets keys and returns the new target. The index is only checked
/// against the engine while a session is ready.
pub async fn set_target(
    ctx: &ApiContext,
    kind_raw: &str,
    index_raw: &str,
) -> Result<SetTargetResponse, ApiError> {
    info!(kind = kind_raw, index = index_raw, "set target requested");

    let kind: TargetKind = kind_raw.parse().map_err(|err: InvalidKind| {
        error!(%err, "rejected target kind");
        ApiError::validation(err.to_string())
    })?;
    let index = parse_index(kind, index_raw)?;
    let target = Target { kind, index };

    let session = ctx.state.ready_session().await;
    let retarget = ctx
        .registry
        .set(target, session.as_deref())
        .await
        .map_err(|err| {
            error!(%err, "target validation failed");
            validation_error(err).with_request(kind.as_str(), index)
        })?;

    let message = if retarget.deferred {
        format!("Engine not connected. Target set to {target} (will apply on reconnect).")
    } else {
        format!("Target set to {target}")
    };
    Ok(SetTargetResponse::success(retarget.current, message))
}

/// Reports the current target. Never fails: label lookup problems end up in
/// the label itself.
pub async fn get_target(ctx: &ApiContext) -> GetTargetResponse {
    let snapshot = ctx.state.snapshot().await;
    let ready = snapshot.session.is_some();
    let label = match snapshot.session {
        Some(session) => resolve_label(&session, snapshot.target).await,
        None => "Unknown".to_string(),
    };
    info!(current = %snapshot.target, ready, "get target requested");
    GetTargetResponse::new(snapshot.target, label, ready)
}

async fn resolve_label(session: &MixerSession, target: Target) -> String {
    let result = match target.kind {
        TargetKind::Strip => session.read_label(target).await.map(|label| {
            if label.is_empty() {
                "Untitled Strip".to_string()
            } else {
                label
            }
        }),
        TargetKind::Bus => session
            .read_parameter(target, ParamField::Gain)
            .await
            .map(|_| format!("Bus {}", target.index)),
    };
    result.unwrap_or_else(|err| format!("Error: {err}"))
}

fn parse_index(kind: TargetKind, raw: &str) -> Result<u32, ApiError> {
    raw.trim().parse().map_err(|_| {
        let mut err = ApiError::validation(format!(
            "invalid index '{raw}': must be a non-negative integer"
        ));
        err.requested_type = Some(kind.as_str().to_string());
        err
    })
}

fn validation_error(err: ValidationError) -> ApiError {
    match err {
        ValidationError::IndexOutOfRange { .. } => ApiError::validation(err.to_string()),
        ValidationError::Engine { .. } => ApiError::internal(err.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
