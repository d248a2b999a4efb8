use super::*;
use mixer::SimulatedEngine;
use shared::{domain::EngineVariant, error::ErrorCode};

async fn setup(variant: EngineVariant, initial: Target) -> (ApiContext, SimulatedEngine) {
    let engine = SimulatedEngine::new(variant);
    let state = Arc::new(SharedControlState::new(initial));
    let session = MixerSession::connect(&engine).await.expect("connect");
    state.install_session(Arc::new(session)).await;
    (ApiContext::new(state), engine)
}

fn disconnected(initial: Target) -> ApiContext {
    ApiContext::new(Arc::new(SharedControlState::new(initial)))
}

#[tokio::test]
async fn set_target_accepts_an_existing_channel() {
    let (ctx, _engine) = setup(EngineVariant::Potato, Target::strip(5)).await;

    let response = set_target(&ctx, "Strip", "3").await.expect("set");
    assert_eq!(response.target(), Target::strip(3));
    assert_eq!(response.message, "Target set to strip[3]");
    assert_eq!(ctx.registry.get().await, Target::strip(3));
}

#[tokio::test]
async fn out_of_range_bus_is_a_validation_error_and_keeps_the_target() {
    let (ctx, _engine) = setup(EngineVariant::Basic, Target::strip(1)).await;

    let err = set_target(&ctx, "bus", "2").await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.requested_type.as_deref(), Some("bus"));
    assert_eq!(err.requested_index, Some(2));
    assert!(err.message.contains("out of range"));
    assert_eq!(ctx.registry.get().await, Target::strip(1));
}

#[tokio::test]
async fn invalid_kind_is_rejected_before_touching_state() {
    let (ctx, engine) = setup(EngineVariant::Potato, Target::strip(5)).await;
    let reads = engine.reads();

    let err = set_target(&ctx, "aux", "1").await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.message.contains("invalid kind"));
    assert_eq!(engine.reads(), reads);
    assert_eq!(ctx.registry.get().await, Target::strip(5));
}

#[tokio::test]
async fn negative_or_non_numeric_index_is_rejected() {
    let ctx = disconnected(Target::strip(5));

    for raw in ["-1", "two", ""] {
        let err = set_target(&ctx, "bus", raw).await.expect_err("should fail");
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.requested_type.as_deref(), Some("bus"));
    }
    assert_eq!(ctx.registry.get().await, Target::strip(5));
}

#[tokio::test]
async fn disconnected_set_target_is_deferred() {
    let ctx = disconnected(Target::strip(5));

    let response = set_target(&ctx, "bus", "42").await.expect("set");
    assert_eq!(response.target(), Target::bus(42));
    assert!(response.message.contains("will apply on reconnect"));

    let current = get_target(&ctx).await;
    assert_eq!(current.target_type, TargetKind::Bus);
    assert_eq!(current.target_index, 42);
}

#[tokio::test]
async fn engine_fault_during_validation_is_internal() {
    let (ctx, engine) = setup(EngineVariant::Potato, Target::strip(5)).await;
    engine.set_transport_fault(true);

    let err = set_target(&ctx, "strip", "1").await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Internal);
    assert_eq!(err.requested_index, Some(1));
    assert_eq!(ctx.registry.get().await, Target::strip(5));
}

#[tokio::test]
async fn get_target_reports_unknown_label_when_not_ready() {
    let ctx = disconnected(Target::strip(5));

    let response = get_target(&ctx).await;
    assert!(!response.session_ready);
    assert_eq!(response.target_label, "Unknown");
}

#[tokio::test]
async fn get_target_uses_engine_labels_for_strips() {
    let (ctx, engine) = setup(EngineVariant::Potato, Target::strip(5)).await;
    engine.set_label(Target::strip(5), "Desktop");

    let response = get_target(&ctx).await;
    assert!(response.session_ready);
    assert_eq!(response.target_label, "Desktop");

    engine.set_label(Target::strip(5), "");
    assert_eq!(get_target(&ctx).await.target_label, "Untitled Strip");
}

#[tokio::test]
async fn get_target_names_buses_after_their_index() {
    let (ctx, _engine) = setup(EngineVariant::Banana, Target::bus(3)).await;
    assert_eq!(get_target(&ctx).await.target_label, "Bus 3");
}

#[tokio::test]
async fn get_target_folds_lookup_failures_into_the_label() {
    let (ctx, engine) = setup(EngineVariant::Potato, Target::strip(5)).await;
    engine.reconfigure(3, 2);

    let response = get_target(&ctx).await;
    assert!(response.target_label.starts_with("Error: "));
    assert_eq!(response.target_index, 5);
}
