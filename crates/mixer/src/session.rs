use std::sync::atomic::{AtomicBool, Ordering};

use shared::domain::{EngineVariant, ParamField, Target};
use tracing::{debug, info, warn};

use crate::{ConnectError, EngineBackend, EngineLink, IoError};

/// A logged-in engine connection.
///
/// `is_ready` never touches the engine; it reports the last observation made
/// by [`MixerSession::refresh_health`] or by a failed I/O call. Once
/// disconnected, a session stays closed.
pub struct MixerSession {
    link: Box<dyn EngineLink>,
    variant: EngineVariant,
    ready: AtomicBool,
    faulted: AtomicBool,
    closed: AtomicBool,
}

impl MixerSession {
    /// Opens a link, logs in and checks the front-end is running. On any
    /// failure after the link was opened, the link is logged out before the
    /// error is returned.
    pub async fn connect(backend: &dyn EngineBackend) -> Result<Self, ConnectError> {
        let variant = backend.variant();
        let link = backend.open().await?;
        if let Err(err) = link.login().await {
            release(link.as_ref()).await;
            return Err(err);
        }

        match link.launched().await {
            Ok(true) => {
                info!(%variant, "engine session established");
                Ok(Self {
                    link,
                    variant,
                    ready: AtomicBool::new(true),
                    faulted: AtomicBool::new(false),
                    closed: AtomicBool::new(false),
                })
            }
            Ok(false) => {
                release(link.as_ref()).await;
                Err(ConnectError::EngineUnavailable)
            }
            Err(err) => {
                release(link.as_ref()).await;
                Err(ConnectError::Unreachable(err.to_string()))
            }
        }
    }

    pub fn variant(&self) -> EngineVariant {
        self.variant
    }

    pub fn is_ready(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && !self.faulted.load(Ordering::Acquire)
            && self.ready.load(Ordering::Acquire)
    }

    /// True once the transport has failed; the session should be dropped.
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Probes the front-end and records the outcome. Faults are folded into
    /// `false`.
    pub async fn refresh_health(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.link.launched().await {
            Ok(launched) => {
                self.ready.store(launched, Ordering::Release);
            }
            Err(err) => {
                warn!(%err, "engine health probe failed");
                self.ready.store(false, Ordering::Release);
                self.faulted.store(true, Ordering::Release);
            }
        }
        self.is_ready()
    }

    /// Logs out. Later calls are no-ops.
    pub async fn disconnect(&self) -> Result<(), IoError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.ready.store(false, Ordering::Release);
        self.link.logout().await
    }

    pub async fn read_parameter(&self, target: Target, field: ParamField) -> Result<f64, IoError> {
        self.ensure_open()?;
        let path = target.param(field);
        let value = self.observe(self.link.get(path).await)?;
        debug!(%path, value, "engine read");
        Ok(value)
    }

    pub async fn write_parameter(
        &self,
        target: Target,
        field: ParamField,
        value: f64,
    ) -> Result<(), IoError> {
        self.ensure_open()?;
        let path = target.param(field);
        self.observe(self.link.set(path, value).await)?;
        debug!(%path, value, "engine write");
        Ok(())
    }

    pub async fn read_label(&self, target: Target) -> Result<String, IoError> {
        self.ensure_open()?;
        self.observe(self.link.label(target).await)
    }

    fn ensure_open(&self) -> Result<(), IoError> {
        if self.is_closed() {
            return Err(IoError::Closed);
        }
        Ok(())
    }

    fn observe<T>(&self, result: Result<T, IoError>) -> Result<T, IoError> {
        if let Err(IoError::Transport(_)) = &result {
            self.faulted.store(true, Ordering::Release);
        }
        result
    }
}

async fn release(link: &dyn EngineLink) {
    if let Err(err) = link.logout().await {
        warn!(%err, "engine logout after failed connect did not complete");
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
