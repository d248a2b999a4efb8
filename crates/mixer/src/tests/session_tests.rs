use super::*;
use crate::SimulatedEngine;

#[tokio::test]
async fn connect_returns_ready_session_when_front_end_is_running() {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    let session = MixerSession::connect(&engine).await.expect("connect");

    assert!(session.is_ready());
    assert_eq!(session.variant(), EngineVariant::Potato);
    assert_eq!(engine.active_logins(), 1);
}

#[tokio::test]
async fn connect_without_front_end_tears_down_the_link() {
    let engine = SimulatedEngine::new(EngineVariant::Banana);
    engine.set_launched(false);

    let err = MixerSession::connect(&engine)
        .await
        .err()
        .expect("should fail");
    assert_eq!(err, ConnectError::EngineUnavailable);
    assert_eq!(engine.total_logins(), 1);
    assert_eq!(engine.active_logins(), 0);
}

#[tokio::test]
async fn refused_login_still_releases_the_link() {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    engine.set_login_refused(true);

    let err = MixerSession::connect(&engine)
        .await
        .err()
        .expect("should fail");
    assert!(matches!(err, ConnectError::Unreachable(_)));
    assert_eq!(engine.logouts(), 1);
    assert_eq!(engine.total_logins(), 0);
    assert_eq!(engine.active_logins(), 0);
}

#[tokio::test]
async fn connect_to_stopped_engine_is_unreachable() {
    let engine = SimulatedEngine::new(EngineVariant::Basic);
    engine.set_reachable(false);

    let err = MixerSession::connect(&engine)
        .await
        .err()
        .expect("should fail");
    assert!(matches!(err, ConnectError::Unreachable(_)));
    assert_eq!(engine.active_logins(), 0);
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    let session = MixerSession::connect(&engine).await.expect("connect");

    session.disconnect().await.expect("first logout");
    session.disconnect().await.expect("second logout is a no-op");

    assert!(!session.is_ready());
    assert_eq!(engine.active_logins(), 0);
    assert_eq!(
        session
            .read_parameter(Target::strip(0), ParamField::Gain)
            .await,
        Err(IoError::Closed)
    );
}

#[tokio::test]
async fn health_probe_tracks_front_end_and_folds_faults_into_not_ready() {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    let session = MixerSession::connect(&engine).await.expect("connect");

    engine.set_launched(false);
    assert!(!session.refresh_health().await);
    assert!(!session.is_faulted());

    engine.set_launched(true);
    assert!(session.refresh_health().await);

    engine.set_transport_fault(true);
    assert!(!session.refresh_health().await);
    assert!(session.is_faulted());
    assert!(!session.is_ready());
}

#[tokio::test]
async fn unknown_index_is_an_io_error_that_keeps_the_session() {
    let engine = SimulatedEngine::new(EngineVariant::Basic);
    let session = MixerSession::connect(&engine).await.expect("connect");

    let err = session
        .write_parameter(Target::bus(2), ParamField::Gain, 1.0)
        .await
        .expect_err("bus 2 does not exist on basic");
    assert!(err.is_unknown_parameter());
    assert!(session.is_ready());
}

#[tokio::test]
async fn transport_failure_during_io_faults_the_session() {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    let session = MixerSession::connect(&engine).await.expect("connect");

    engine.set_transport_fault(true);
    let err = session
        .read_parameter(Target::strip(1), ParamField::Mute)
        .await
        .expect_err("transport down");
    assert!(matches!(err, IoError::Transport(_)));
    assert!(session.is_faulted());
    assert!(!session.is_ready());
}
