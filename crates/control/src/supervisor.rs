use std::{sync::Arc, time::Duration};

use mixer::{EngineBackend, MixerSession};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

use crate::{capture::KeyCapture, registry::TargetRegistry, state::SharedControlState};

/// An execution context whose death takes the process down.
pub trait Monitored: Send + Sync {
    fn name(&self) -> &str;
    fn is_alive(&self) -> bool;
}

/// A spawned tokio task watched by the supervisor.
pub struct SpawnedContext<T> {
    name: String,
    handle: JoinHandle<T>,
}

impl<T> SpawnedContext<T> {
    pub fn new(name: impl Into<String>, handle: JoinHandle<T>) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

impl<T: Send> Monitored for SpawnedContext<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub tick: Duration,
    /// Reconnect attempts happen on every n-th tick while not ready.
    pub connect_every_ticks: u64,
    /// Key capture is checked on every n-th ready tick.
    pub liveness_every_ticks: u64,
    /// Bound on waiting for key capture to stop at shutdown.
    pub stop_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            connect_every_ticks: 5,
            liveness_every_ticks: 10,
            stop_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    Shutdown,
    ContextDied(String),
}

/// Owns the engine session lifecycle: connects, probes health every tick,
/// reconnects on a fixed cadence, and watches the other execution contexts.
pub struct Supervisor {
    backend: Arc<dyn EngineBackend>,
    state: Arc<SharedControlState>,
    registry: TargetRegistry,
    config: SupervisorConfig,
    api: Option<Box<dyn Monitored>>,
    key_capture: Option<KeyCapture>,
}

impl Supervisor {
    pub fn new(
        backend: Arc<dyn EngineBackend>,
        state: Arc<SharedControlState>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            backend,
            registry: TargetRegistry::new(Arc::clone(&state)),
            state,
            config,
            api: None,
            key_capture: None,
        }
    }

    pub fn monitor_api(mut self, api: impl Monitored + 'static) -> Self {
        self.api = Some(Box::new(api));
        self
    }

    pub fn with_key_capture(mut self, capture: KeyCapture) -> Self {
        self.key_capture = Some(capture);
        self
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SupervisorExit {
        if !self.try_connect().await {
            warn!("initial engine connection failed, will retry");
        }

        let connect_every = self.config.connect_every_ticks.max(1);
        let liveness_every = self.config.liveness_every_ticks.max(1);
        let mut tick: u64 = 0;

        let exit = loop {
            if *shutdown.borrow() {
                break SupervisorExit::Shutdown;
            }
            tick += 1;

            if !self.check_health(tick).await {
                if tick % connect_every == 0 {
                    self.try_connect().await;
                }
                if pause(&mut shutdown, self.config.tick).await {
                    break SupervisorExit::Shutdown;
                }
                continue;
            }

            // Contexts wind down on their own once shutdown is signalled.
            if *shutdown.borrow() {
                break SupervisorExit::Shutdown;
            }
            if let Some(api) = self.api.as_ref().filter(|api| !api.is_alive()) {
                error!(context = api.name(), "execution context stopped, exiting");
                break SupervisorExit::ContextDied(api.name().to_string());
            }
            if tick % liveness_every == 0 {
                if let Some(capture) = self.key_capture.as_ref().filter(|c| !c.is_alive()) {
                    error!(context = capture.name(), "execution context stopped, exiting");
                    break SupervisorExit::ContextDied(capture.name().to_string());
                }
            }

            if pause(&mut shutdown, self.config.tick).await {
                break SupervisorExit::Shutdown;
            }
        };

        self.shutdown().await;
        exit
    }

    /// Probes the current session and publishes its readiness. A faulted
    /// session is logged out and dropped.
    async fn check_health(&self, tick: u64) -> bool {
        let Some(session) = self.state.session().await else {
            return false;
        };

        let ready = !session.is_faulted() && session.refresh_health().await;
        if session.is_faulted() || session.is_closed() {
            error!("engine session failed, resetting connection");
            self.invalidate().await;
            return false;
        }

        self.state.set_ready(ready).await;
        if !ready && tick % 10 == 1 {
            warn!("engine front-end not detected, waiting");
        }
        ready
    }

    async fn invalidate(&self) {
        if let Some(session) = self.state.take_session().await {
            logout(&session).await;
        }
    }

    async fn try_connect(&self) -> bool {
        info!(variant = %self.backend.variant(), "attempting to connect to engine");
        let session = match MixerSession::connect(self.backend.as_ref()).await {
            Ok(session) => Arc::new(session),
            Err(err) => {
                warn!(%err, "could not connect to engine; is it running with its remote API enabled?");
                return false;
            }
        };

        if let Some(previous) = self.state.install_session(Arc::clone(&session)).await {
            logout(&previous).await;
        }

        match self.registry.validate_current(&session).await {
            Ok(target) => info!(%target, "engine connected"),
            Err(err) => warn!(%err, "engine connected but the current target is not usable"),
        }
        true
    }

    async fn shutdown(&mut self) {
        if let Some(capture) = self.key_capture.take() {
            info!("stopping key capture");
            if capture.stop(self.config.stop_timeout).await {
                info!("key capture stopped");
            } else {
                warn!(timeout = ?self.config.stop_timeout, "key capture did not stop in time");
            }
        }

        if let Some(session) = self.state.take_session().await {
            info!("logging out from engine");
            logout(&session).await;
        }
    }
}

async fn logout(session: &MixerSession) {
    match session.disconnect().await {
        Ok(()) => info!("engine logout complete"),
        Err(err) => warn!(%err, "engine logout failed"),
    }
}

/// Sleeps for one tick. Returns true when shutdown was requested.
async fn pause(shutdown: &mut watch::Receiver<bool>, tick: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(tick) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

#[cfg(test)]
#[path = "tests/supervisor_tests.rs"]
mod tests;
