use std::time::Duration;

use mixer::{IoError, MixerSession};
use shared::domain::{ParamField, Target, GAIN_MAX_DB, GAIN_MIN_DB};
use tracing::{info, warn};

use crate::error::OpError;

/// Timing of the read-modify-write-verify cycle.
///
/// The engine applies writes a few milliseconds late; the settle delays keep
/// reads from racing its update cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub pre_read_settle: Duration,
    pub verify_settle: Duration,
    pub tolerance_db: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            pre_read_settle: Duration::from_millis(40),
            verify_settle: Duration::from_millis(50),
            tolerance_db: 0.1,
        }
    }
}

impl Tuning {
    /// No settle delays.
    pub fn immediate() -> Self {
        Self {
            pre_read_settle: Duration::ZERO,
            verify_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainResult {
    Applied { value: f64 },
    VerificationMismatch { expected: f64, actual: f64 },
    /// The write went through but the read-back failed.
    VerificationUnavailable { expected: f64 },
}

impl GainResult {
    /// The value that was written.
    pub fn written(&self) -> f64 {
        match *self {
            Self::Applied { value } => value,
            Self::VerificationMismatch { expected, .. }
            | Self::VerificationUnavailable { expected } => expected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteResult {
    Applied { muted: bool },
    VerificationMismatch { expected: bool, actual: bool },
    VerificationUnavailable { expected: bool },
}

impl MuteResult {
    pub fn written(&self) -> bool {
        match *self {
            Self::Applied { muted } => muted,
            Self::VerificationMismatch { expected, .. }
            | Self::VerificationUnavailable { expected } => expected,
        }
    }
}

/// Verified gain and mute changes. Every operation starts from a fresh read
/// because other control surfaces may have moved the parameter; mismatches
/// after the write are reported, never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterController {
    tuning: Tuning,
}

impl ParameterController {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    pub async fn adjust_gain(
        &self,
        session: &MixerSession,
        target: Target,
        delta_db: f64,
    ) -> Result<GainResult, OpError> {
        let path = target.param(ParamField::Gain);
        ensure_ready(session)?;

        settle(self.tuning.pre_read_settle).await;
        let current = session
            .read_parameter(target, ParamField::Gain)
            .await
            .map_err(|source| io_error(&path, source))
            .and_then(|value| finite(&path, value))?;

        let new = next_gain(current, delta_db);
        ensure_ready(session)?;
        session
            .write_parameter(target, ParamField::Gain, new)
            .await
            .map_err(|source| io_error(&path, source))?;
        info!(%path, from = current, to = new, "gain set");

        settle(self.tuning.verify_settle).await;
        let result = match session.read_parameter(target, ParamField::Gain).await {
            Ok(actual) if (actual - new).abs() < self.tuning.tolerance_db => {
                GainResult::Applied { value: new }
            }
            Ok(actual) => {
                warn!(%path, expected = new, actual, "gain verification mismatch");
                GainResult::VerificationMismatch {
                    expected: new,
                    actual,
                }
            }
            Err(err) => {
                warn!(%path, %err, "gain verification read failed");
                GainResult::VerificationUnavailable { expected: new }
            }
        };
        Ok(result)
    }

    pub async fn toggle_mute(
        &self,
        session: &MixerSession,
        target: Target,
    ) -> Result<MuteResult, OpError> {
        let path = target.param(ParamField::Mute);
        ensure_ready(session)?;

        settle(self.tuning.pre_read_settle).await;
        let raw = session
            .read_parameter(target, ParamField::Mute)
            .await
            .map_err(|source| io_error(&path, source))
            .and_then(|value| finite(&path, value))?;

        let muted = !decode_mute(raw);
        ensure_ready(session)?;
        session
            .write_parameter(target, ParamField::Mute, encode_mute(muted))
            .await
            .map_err(|source| io_error(&path, source))?;

        settle(self.tuning.verify_settle).await;
        let result = match session.read_parameter(target, ParamField::Mute).await {
            Ok(raw) if decode_mute(raw) == muted => {
                info!(%path, state = mute_label(muted), "mute set");
                MuteResult::Applied { muted }
            }
            Ok(raw) => {
                let actual = decode_mute(raw);
                warn!(%path, expected = muted, actual, "mute verification mismatch");
                MuteResult::VerificationMismatch {
                    expected: muted,
                    actual,
                }
            }
            Err(err) => {
                warn!(%path, %err, "mute verification read failed");
                MuteResult::VerificationUnavailable { expected: muted }
            }
        };
        Ok(result)
    }
}

/// `current + delta` rounded to one decimal and clamped to the engine's gain
/// range.
pub fn next_gain(current: f64, delta_db: f64) -> f64 {
    let rounded = ((current + delta_db) * 10.0).round() / 10.0;
    rounded.clamp(GAIN_MIN_DB, GAIN_MAX_DB)
}

fn decode_mute(raw: f64) -> bool {
    raw.round() != 0.0
}

fn encode_mute(muted: bool) -> f64 {
    if muted {
        1.0
    } else {
        0.0
    }
}

fn mute_label(muted: bool) -> &'static str {
    if muted {
        "MUTED"
    } else {
        "UNMUTED"
    }
}

fn ensure_ready(session: &MixerSession) -> Result<(), OpError> {
    if session.is_ready() {
        Ok(())
    } else {
        Err(OpError::NotReady)
    }
}

fn io_error(path: &impl ToString, source: IoError) -> OpError {
    OpError::Io {
        path: path.to_string(),
        source,
    }
}

/// Rejects NaN and infinite readings so they never feed a write.
fn finite(path: &impl ToString, value: f64) -> Result<f64, OpError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(OpError::InvalidReading {
            path: path.to_string(),
            value,
        })
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
