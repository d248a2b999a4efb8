use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use shared::domain::{EngineVariant, ParamPath, Target, TargetKind};

use crate::{ConnectError, EngineBackend, EngineLink, IoError};

/// In-process mixing engine with the channel layout of a stock variant.
///
/// Cloning yields another handle to the same engine, so a test can hold one
/// handle to steer the engine while the control plane talks to it through
/// [`EngineBackend`].
#[derive(Clone)]
pub struct SimulatedEngine {
    variant: EngineVariant,
    state: Arc<Mutex<EngineState>>,
}

#[derive(Default)]
struct EngineState {
    strips: u32,
    buses: u32,
    params: HashMap<ParamPath, f64>,
    labels: HashMap<Target, String>,
    locked: HashSet<ParamPath>,
    reachable: bool,
    launched: bool,
    transport_fault: bool,
    login_refused: bool,
    active_logins: u32,
    total_logins: u32,
    logouts: u32,
    reads: u64,
    writes: u64,
}

impl EngineState {
    fn has_channel(&self, target: Target) -> bool {
        match target.kind {
            TargetKind::Strip => target.index < self.strips,
            TargetKind::Bus => target.index < self.buses,
        }
    }

    fn check_transport(&self) -> Result<(), IoError> {
        if !self.reachable || self.transport_fault {
            return Err(IoError::Transport("engine connection lost".into()));
        }
        Ok(())
    }

    fn check_channel(&self, path: ParamPath) -> Result<(), IoError> {
        if !self.has_channel(path.target) {
            return Err(IoError::UnknownParameter(path.to_string()));
        }
        Ok(())
    }
}

impl SimulatedEngine {
    pub fn new(variant: EngineVariant) -> Self {
        let (strips, buses) = variant.layout();
        Self {
            variant,
            state: Arc::new(Mutex::new(EngineState {
                strips,
                buses,
                reachable: true,
                launched: true,
                ..EngineState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // A panicking test thread must not wedge every other handle.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_launched(&self, launched: bool) {
        self.state().launched = launched;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Makes every call on open links fail at the transport level.
    pub fn set_transport_fault(&self, fault: bool) {
        self.state().transport_fault = fault;
    }

    /// Opens links normally but rejects their login.
    pub fn set_login_refused(&self, refused: bool) {
        self.state().login_refused = refused;
    }

    /// Changes the channel counts, as when the engine is reconfigured.
    pub fn reconfigure(&self, strips: u32, buses: u32) {
        let mut state = self.state();
        state.strips = strips;
        state.buses = buses;
    }

    /// Changes a value the way another control surface would.
    pub fn set_parameter(&self, path: ParamPath, value: f64) {
        self.state().params.insert(path, value);
    }

    pub fn parameter(&self, path: ParamPath) -> f64 {
        self.state().params.get(&path).copied().unwrap_or(0.0)
    }

    /// Writes to a locked parameter are accepted but not applied.
    pub fn lock_parameter(&self, path: ParamPath) {
        self.state().locked.insert(path);
    }

    pub fn set_label(&self, target: Target, label: impl Into<String>) {
        self.state().labels.insert(target, label.into());
    }

    pub fn active_logins(&self) -> u32 {
        self.state().active_logins
    }

    pub fn total_logins(&self) -> u32 {
        self.state().total_logins
    }

    /// Logout calls received, including ones on links that never logged in.
    pub fn logouts(&self) -> u32 {
        self.state().logouts
    }

    pub fn reads(&self) -> u64 {
        self.state().reads
    }

    pub fn writes(&self) -> u64 {
        self.state().writes
    }
}

#[async_trait]
impl EngineBackend for SimulatedEngine {
    fn variant(&self) -> EngineVariant {
        self.variant
    }

    async fn open(&self) -> Result<Box<dyn EngineLink>, ConnectError> {
        if !self.state().reachable {
            return Err(ConnectError::Unreachable(format!(
                "{} engine is not running",
                self.variant
            )));
        }
        Ok(Box::new(SimulatedLink {
            engine: self.clone(),
            logged_in: Mutex::new(false),
        }))
    }
}

struct SimulatedLink {
    engine: SimulatedEngine,
    logged_in: Mutex<bool>,
}

impl SimulatedLink {
    fn logged_in(&self) -> MutexGuard<'_, bool> {
        self.logged_in
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EngineLink for SimulatedLink {
    async fn login(&self) -> Result<(), ConnectError> {
        let mut state = self.engine.state();
        if !state.reachable || state.login_refused {
            return Err(ConnectError::Unreachable("login refused".into()));
        }
        let mut logged_in = self.logged_in();
        if !*logged_in {
            *logged_in = true;
            state.active_logins += 1;
            state.total_logins += 1;
        }
        Ok(())
    }

    async fn logout(&self) -> Result<(), IoError> {
        let mut state = self.engine.state();
        state.logouts += 1;
        let mut logged_in = self.logged_in();
        if *logged_in {
            *logged_in = false;
            state.active_logins = state.active_logins.saturating_sub(1);
        }
        state.check_transport()
    }

    async fn launched(&self) -> Result<bool, IoError> {
        let state = self.engine.state();
        state.check_transport()?;
        Ok(state.launched)
    }

    async fn get(&self, path: ParamPath) -> Result<f64, IoError> {
        let mut state = self.engine.state();
        state.check_transport()?;
        state.check_channel(path)?;
        state.reads += 1;
        Ok(state.params.get(&path).copied().unwrap_or(0.0))
    }

    async fn set(&self, path: ParamPath, value: f64) -> Result<(), IoError> {
        let mut state = self.engine.state();
        state.check_transport()?;
        state.check_channel(path)?;
        state.writes += 1;
        if !state.locked.contains(&path) {
            state.params.insert(path, value);
        }
        Ok(())
    }

    async fn label(&self, target: Target) -> Result<String, IoError> {
        let state = self.engine.state();
        state.check_transport()?;
        if !state.has_channel(target) {
            return Err(IoError::UnknownParameter(format!("{target}.label")));
        }
        Ok(state.labels.get(&target).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "tests/simulated_tests.rs"]
mod tests;
