//! Control plane between media keys, the HTTP control surface and the engine.

pub mod capture;
pub mod controller;
pub mod error;
pub mod registry;
pub mod router;
pub mod state;
pub mod supervisor;

pub use capture::{KeyCapture, KeySource, LineKeySource};
pub use controller::{GainResult, MuteResult, ParameterController, Tuning};
pub use error::{OpError, ValidationError};
pub use registry::{Retarget, TargetRegistry};
pub use router::{Disposition, EventRouter, KeyNotification, MediaKey};
pub use state::{ControlSnapshot, SharedControlState};
pub use supervisor::{Monitored, SpawnedContext, Supervisor, SupervisorConfig, SupervisorExit};
