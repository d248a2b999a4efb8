use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::{
    controller::{GainResult, MuteResult, ParameterController},
    error::OpError,
    state::SharedControlState,
};

pub const VK_VOLUME_MUTE: u32 = 0xAD;
pub const VK_VOLUME_DOWN: u32 = 0xAE;
pub const VK_VOLUME_UP: u32 = 0xAF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    VolumeUp,
    VolumeDown,
    Mute,
    Other,
}

impl MediaKey {
    pub fn from_raw_code(code: u32) -> Self {
        match code {
            VK_VOLUME_UP => Self::VolumeUp,
            VK_VOLUME_DOWN => Self::VolumeDown,
            VK_VOLUME_MUTE => Self::Mute,
            _ => Self::Other,
        }
    }
}

/// One physical key press as reported by the capture collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyNotification {
    pub key: Option<MediaKey>,
    pub raw_code: Option<u32>,
}

impl KeyNotification {
    pub fn symbolic(key: MediaKey) -> Self {
        Self {
            key: Some(key),
            raw_code: None,
        }
    }

    pub fn raw(code: u32) -> Self {
        Self {
            key: None,
            raw_code: Some(code),
        }
    }

    /// The symbolic key when present, otherwise the raw code. Never both.
    pub fn classify(&self) -> MediaKey {
        match (self.key, self.raw_code) {
            (Some(key), _) => key,
            (None, Some(code)) => MediaKey::from_raw_code(code),
            (None, None) => MediaKey::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled here; the platform should swallow the key.
    Consumed,
    PassThrough,
}

#[derive(Clone)]
pub struct EventRouter {
    state: Arc<SharedControlState>,
    controller: ParameterController,
    gain_step: f64,
}

impl EventRouter {
    pub fn new(state: Arc<SharedControlState>, controller: ParameterController, gain_step: f64) -> Self {
        Self {
            state,
            controller,
            gain_step,
        }
    }

    pub async fn handle(&self, event: KeyNotification) -> Disposition {
        let snapshot = self.state.snapshot().await;
        let Some(session) = snapshot.session else {
            debug!(?event, "engine not ready, passing key through");
            return Disposition::PassThrough;
        };
        let target = snapshot.target;

        match event.classify() {
            MediaKey::VolumeUp => {
                debug!(%target, "volume up");
                log_gain(
                    self.controller
                        .adjust_gain(&session, target, self.gain_step)
                        .await,
                );
            }
            MediaKey::VolumeDown => {
                debug!(%target, "volume down");
                log_gain(
                    self.controller
                        .adjust_gain(&session, target, -self.gain_step)
                        .await,
                );
            }
            MediaKey::Mute => {
                debug!(%target, "mute");
                log_mute(self.controller.toggle_mute(&session, target).await);
            }
            MediaKey::Other => return Disposition::PassThrough,
        }

        debug!(?event, "suppressing key");
        Disposition::Consumed
    }
}

fn log_gain(result: Result<GainResult, OpError>) {
    match result {
        Ok(GainResult::Applied { value }) => debug!(value, "gain verified"),
        Ok(_) => {}
        Err(err) => log_op_error("gain change", err),
    }
}

fn log_mute(result: Result<MuteResult, OpError>) {
    match result {
        Ok(MuteResult::Applied { muted }) => debug!(muted, "mute verified"),
        Ok(_) => {}
        Err(err) => log_op_error("mute toggle", err),
    }
}

fn log_op_error(operation: &str, err: OpError) {
    match err {
        OpError::NotReady => warn!(operation, "engine went away before the change was applied"),
        OpError::Io { .. } => error!(operation, %err, "engine rejected the change"),
        OpError::InvalidReading { .. } => error!(operation, %err, "change skipped"),
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
