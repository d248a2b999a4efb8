//! Seam to the external mixing engine.
//!
//! A backend opens [`EngineLink`]s; [`MixerSession`] wraps one link with the
//! connect/health/logout contract the control plane relies on.

use async_trait::async_trait;
use shared::domain::{EngineVariant, ParamPath, Target};

mod error;
mod session;
mod simulated;

pub use error::{ConnectError, IoError};
pub use session::MixerSession;
pub use simulated::SimulatedEngine;

/// One open connection to the engine's remote API.
#[async_trait]
pub trait EngineLink: Send + Sync {
    async fn login(&self) -> Result<(), ConnectError>;
    async fn logout(&self) -> Result<(), IoError>;
    /// Whether the engine's front-end reports itself running.
    async fn launched(&self) -> Result<bool, IoError>;
    async fn get(&self, path: ParamPath) -> Result<f64, IoError>;
    async fn set(&self, path: ParamPath, value: f64) -> Result<(), IoError>;
    /// Engine-supplied channel name. May be empty.
    async fn label(&self, target: Target) -> Result<String, IoError>;
}

#[async_trait]
pub trait EngineBackend: Send + Sync {
    fn variant(&self) -> EngineVariant;
    async fn open(&self) -> Result<Box<dyn EngineLink>, ConnectError>;
}
