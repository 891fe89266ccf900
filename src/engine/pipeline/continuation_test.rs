use crate::engine::errors::PipelineError;
use crate::engine::pipeline::continuation::{DistinctContinuation, GroupByContinuation};

#[test]
fn distinct_continuation_round_trips() {
    let token = DistinctContinuation::new(Some("src-7".into()), Some("map-state".into()))
        .to_token()
        .unwrap();
    let parsed = DistinctContinuation::parse(&token).unwrap();
    assert_eq!(parsed.source_token.as_deref(), Some("src-7"));
    assert_eq!(parsed.distinct_map_token.as_deref(), Some("map-state"));
}

#[test]
fn distinct_continuation_uses_wire_field_names() {
    let token = DistinctContinuation::new(Some("s".into()), None)
        .to_token()
        .unwrap();
    assert!(token.contains("\"sourceToken\""));
    assert!(token.contains("\"distinctMapToken\""));
}

#[test]
fn group_by_continuation_round_trips_with_null_source() {
    let token = GroupByContinuation::new(None, Some("{}".into()))
        .to_token()
        .unwrap();
    assert!(token.contains("\"sourceToken\":null"));
    assert!(token.contains("\"groupingTableToken\""));

    let parsed = GroupByContinuation::parse(&token).unwrap();
    assert_eq!(parsed.source_token, None);
    assert_eq!(parsed.grouping_table_token.as_deref(), Some("{}"));
}

#[test]
fn malformed_tokens_surface_the_offending_input() {
    let err = DistinctContinuation::parse("not json").unwrap_err();
    match err {
        PipelineError::MalformedContinuation { token, .. } => assert_eq!(token, "not json"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = GroupByContinuation::parse("[1,2]").unwrap_err();
    assert!(matches!(err, PipelineError::MalformedContinuation { .. }));
}
