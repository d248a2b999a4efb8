use std::sync::Arc;

use mixer::MixerSession;
use shared::domain::Target;
use tokio::sync::RwLock;

/// The process-wide control state: the current target and the supervised
/// engine session. Every read and write happens under one lock, so a reader
/// never sees a target from one retarget paired with a kind from another.
pub struct SharedControlState {
    inner: RwLock<ControlInner>,
}

struct ControlInner {
    target: Target,
    session: Option<Arc<MixerSession>>,
    ready: bool,
}

/// Consistent view of `(target, readiness)`. `session` is present only when
/// the session was ready at the moment of the read.
#[derive(Clone)]
pub struct ControlSnapshot {
    pub target: Target,
    pub session: Option<Arc<MixerSession>>,
}

impl ControlSnapshot {
    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }
}

impl SharedControlState {
    pub fn new(initial: Target) -> Self {
        Self {
            inner: RwLock::new(ControlInner {
                target: initial,
                session: None,
                ready: false,
            }),
        }
    }

    pub async fn target(&self) -> Target {
        self.inner.read().await.target
    }

    pub async fn snapshot(&self) -> ControlSnapshot {
        let inner = self.inner.read().await;
        ControlSnapshot {
            target: inner.target,
            session: inner.ready_session(),
        }
    }

    pub async fn ready_session(&self) -> Option<Arc<MixerSession>> {
        self.inner.read().await.ready_session()
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.ready_session().is_some()
    }

    /// Swaps in `new` and returns the target it replaced.
    pub async fn replace_target(&self, new: Target) -> Target {
        let mut inner = self.inner.write().await;
        std::mem::replace(&mut inner.target, new)
    }

    /// Sets `new` only if the current target is still `expected`.
    pub async fn compare_and_set_target(&self, expected: Target, new: Target) -> bool {
        let mut inner = self.inner.write().await;
        if inner.target != expected {
            return false;
        }
        inner.target = new;
        true
    }

    // Session lifecycle below is driven by the supervisor only.

    /// Installs a freshly connected session as ready and returns the one it
    /// replaced, if any.
    pub async fn install_session(&self, session: Arc<MixerSession>) -> Option<Arc<MixerSession>> {
        let mut inner = self.inner.write().await;
        inner.ready = true;
        inner.session.replace(session)
    }

    pub async fn set_ready(&self, ready: bool) {
        self.inner.write().await.ready = ready;
    }

    pub async fn take_session(&self) -> Option<Arc<MixerSession>> {
        let mut inner = self.inner.write().await;
        inner.ready = false;
        inner.session.take()
    }

    /// The current session regardless of readiness.
    pub async fn session(&self) -> Option<Arc<MixerSession>> {
        self.inner.read().await.session.clone()
    }
}

impl ControlInner {
    fn ready_session(&self) -> Option<Arc<MixerSession>> {
        if !self.ready {
            return None;
        }
        self.session
            .as_ref()
            .filter(|session| session.is_ready())
            .cloned()
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
