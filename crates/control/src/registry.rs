use std::sync::Arc;

use mixer::MixerSession;
use shared::domain::{ParamField, Target, TargetKind};
use tracing::{debug, info};

use crate::{error::ValidationError, state::SharedControlState};

/// Outcome of a successful [`TargetRegistry::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retarget {
    pub previous: Target,
    pub current: Target,
    /// No ready session was available, so the index was not checked.
    pub deferred: bool,
}

#[derive(Clone)]
pub struct TargetRegistry {
    state: Arc<SharedControlState>,
}

impl TargetRegistry {
    pub fn new(state: Arc<SharedControlState>) -> Self {
        Self { state }
    }

    pub async fn get(&self) -> Target {
        self.state.target().await
    }

    /// Makes `target` current. With a ready session the index is proven to
    /// exist first and the current target is left alone on failure; without
    /// one the target is accepted as is.
    pub async fn set(
        &self,
        target: Target,
        session: Option<&MixerSession>,
    ) -> Result<Retarget, ValidationError> {
        let live = session.filter(|session| session.is_ready());
        if let Some(session) = live {
            probe(session, target).await?;
            debug!(%target, "target index verified");
        }

        let previous = self.state.replace_target(target).await;
        let deferred = live.is_none();
        info!(from = %previous, to = %target, deferred, "target changed");
        Ok(Retarget {
            previous,
            current: target,
            deferred,
        })
    }

    /// Re-checks the current target against a (new) session without
    /// changing it.
    pub async fn validate_current(&self, session: &MixerSession) -> Result<Target, ValidationError> {
        let target = self.get().await;
        probe(session, target).await?;
        Ok(target)
    }
}

/// Reads the cheapest field that proves the channel exists: a strip's label,
/// a bus's gain.
async fn probe(session: &MixerSession, target: Target) -> Result<(), ValidationError> {
    let result = match target.kind {
        TargetKind::Strip => session.read_label(target).await.map(|_| ()),
        TargetKind::Bus => session
            .read_parameter(target, ParamField::Gain)
            .await
            .map(|_| ()),
    };

    result.map_err(|source| {
        if source.is_unknown_parameter() {
            ValidationError::IndexOutOfRange {
                target,
                variant: session.variant(),
            }
        } else {
            ValidationError::Engine { target, source }
        }
    })
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
