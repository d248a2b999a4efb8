use super::*;

#[test]
fn kind_parsing_is_case_insensitive() {
    assert_eq!("STRIP".parse::<TargetKind>(), Ok(TargetKind::Strip));
    assert_eq!("Bus".parse::<TargetKind>(), Ok(TargetKind::Bus));
    assert!("input".parse::<TargetKind>().is_err());
}

#[test]
fn param_path_uses_engine_naming() {
    assert_eq!(
        Target::strip(5).param(ParamField::Gain).to_string(),
        "strip[5].gain"
    );
    assert_eq!(Target::bus(0).param(ParamField::Mute).to_string(), "bus[0].mute");
}

#[test]
fn variant_layouts_match_stock_engines() {
    assert_eq!(EngineVariant::Basic.layout(), (3, 2));
    assert_eq!(EngineVariant::Banana.layout(), (5, 5));
    assert_eq!(EngineVariant::Potato.layout(), (8, 8));
    assert_eq!("Potato".parse::<EngineVariant>(), Ok(EngineVariant::Potato));
}

#[test]
fn target_serializes_with_lowercase_kind() {
    let json = serde_json::to_value(Target::bus(2)).expect("json");
    assert_eq!(json, serde_json::json!({ "kind": "bus", "index": 2 }));
}
