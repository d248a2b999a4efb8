use super::*;
use crate::controller::Tuning;
use mixer::{MixerSession, SimulatedEngine};
use shared::domain::{EngineVariant, ParamField, Target};

async fn router_with_engine(
    target: Target,
    ready: bool,
) -> (SimulatedEngine, Arc<SharedControlState>, EventRouter) {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    let state = Arc::new(SharedControlState::new(target));
    if ready {
        let session = MixerSession::connect(&engine).await.expect("connect");
        state.install_session(Arc::new(session)).await;
    }
    let router = EventRouter::new(
        Arc::clone(&state),
        ParameterController::new(Tuning::immediate()),
        1.0,
    );
    (engine, state, router)
}

#[test]
fn raw_codes_map_to_media_keys() {
    assert_eq!(MediaKey::from_raw_code(0xAF), MediaKey::VolumeUp);
    assert_eq!(MediaKey::from_raw_code(0xAE), MediaKey::VolumeDown);
    assert_eq!(MediaKey::from_raw_code(0xAD), MediaKey::Mute);
    assert_eq!(MediaKey::from_raw_code(0x41), MediaKey::Other);
}

#[test]
fn symbolic_key_takes_precedence_over_raw_code() {
    let event = KeyNotification {
        key: Some(MediaKey::Other),
        raw_code: Some(VK_VOLUME_UP),
    };
    assert_eq!(event.classify(), MediaKey::Other);
    assert_eq!(KeyNotification::default().classify(), MediaKey::Other);
}

#[tokio::test]
async fn not_ready_passes_every_key_through_untouched() {
    let (engine, _state, router) = router_with_engine(Target::strip(5), false).await;

    for event in [
        KeyNotification::symbolic(MediaKey::VolumeUp),
        KeyNotification::symbolic(MediaKey::VolumeDown),
        KeyNotification::symbolic(MediaKey::Mute),
        KeyNotification::raw(VK_VOLUME_UP),
    ] {
        assert_eq!(router.handle(event).await, Disposition::PassThrough);
    }
    assert_eq!(engine.reads() + engine.writes(), 0);
}

#[tokio::test]
async fn front_end_closing_is_treated_as_not_ready() {
    let (engine, state, router) = router_with_engine(Target::strip(5), true).await;
    engine.set_launched(false);
    state.set_ready(false).await;

    let disposition = router
        .handle(KeyNotification::symbolic(MediaKey::Mute))
        .await;
    assert_eq!(disposition, Disposition::PassThrough);
    assert_eq!(engine.writes(), 0);
}

#[tokio::test]
async fn volume_up_raises_gain_of_current_target_and_is_consumed() {
    let (engine, _state, router) = router_with_engine(Target::strip(5), true).await;

    let disposition = router
        .handle(KeyNotification::symbolic(MediaKey::VolumeUp))
        .await;
    assert_eq!(disposition, Disposition::Consumed);
    assert_eq!(engine.parameter(Target::strip(5).param(ParamField::Gain)), 1.0);
}

#[tokio::test]
async fn raw_code_fallback_fires_exactly_once() {
    let (engine, _state, router) = router_with_engine(Target::bus(0), true).await;

    let disposition = router.handle(KeyNotification::raw(VK_VOLUME_DOWN)).await;
    assert_eq!(disposition, Disposition::Consumed);
    assert_eq!(engine.writes(), 1);
    assert_eq!(engine.parameter(Target::bus(0).param(ParamField::Gain)), -1.0);
}

#[tokio::test]
async fn mute_key_toggles_mute() {
    let (engine, _state, router) = router_with_engine(Target::bus(2), true).await;

    router
        .handle(KeyNotification::symbolic(MediaKey::Mute))
        .await;
    assert_eq!(engine.parameter(Target::bus(2).param(ParamField::Mute)), 1.0);
}

#[tokio::test]
async fn unrelated_keys_are_never_consumed() {
    let (engine, _state, router) = router_with_engine(Target::strip(0), true).await;

    assert_eq!(
        router
            .handle(KeyNotification::symbolic(MediaKey::Other))
            .await,
        Disposition::PassThrough
    );
    assert_eq!(
        router.handle(KeyNotification::raw(0x41)).await,
        Disposition::PassThrough
    );
    assert_eq!(engine.reads() + engine.writes(), 0);
}

#[tokio::test]
async fn failed_change_still_consumes_the_key() {
    let (engine, _state, router) = router_with_engine(Target::strip(20), true).await;

    let disposition = router
        .handle(KeyNotification::symbolic(MediaKey::VolumeUp))
        .await;
    assert_eq!(disposition, Disposition::Consumed);
    assert_eq!(engine.writes(), 0);
}

#[tokio::test]
async fn keys_follow_a_retarget() {
    let (engine, state, router) = router_with_engine(Target::strip(0), true).await;

    state.replace_target(Target::bus(7)).await;
    router
        .handle(KeyNotification::symbolic(MediaKey::VolumeUp))
        .await;

    assert_eq!(engine.parameter(Target::strip(0).param(ParamField::Gain)), 0.0);
    assert_eq!(engine.parameter(Target::bus(7).param(ParamField::Gain)), 1.0);
}
