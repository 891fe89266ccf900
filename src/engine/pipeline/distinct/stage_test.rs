use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::engine::pipeline::stage::{
    CursorState, ExecutionEnvironment, PipelineStage, DISALLOW_INLINE_CURSOR,
};
use crate::engine::types::DocValue;
use crate::test_helpers::ScriptedSourceFactory;

use super::{DistinctQueryType, DistinctStage};

async fn client_stage(factory: &ScriptedSourceFactory) -> DistinctStage {
    DistinctStage::create(
        ExecutionEnvironment::Client,
        DistinctQueryType::Unordered,
        None,
        factory.source_factory(),
    )
    .await
    .unwrap()
}

fn docs(values: Vec<serde_json::Value>) -> Vec<DocValue> {
    values.iter().map(DocValue::from_json).collect()
}

#[tokio::test]
async fn suppresses_duplicates_across_pages() {
    // S1: [{a:1},{a:2}] then [{a:1},{a:3}]
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!({"a": 1}), json!({"a": 2})])
        .with_page(vec![json!({"a": 1}), json!({"a": 3})]);
    let mut stage = client_stage(&factory).await;
    let cancel = CancellationToken::new();

    let first = stage.drain(10, &cancel).await.unwrap();
    assert_eq!(first.elements, docs(vec![json!({"a": 1}), json!({"a": 2})]));

    let second = stage.drain(10, &cancel).await.unwrap();
    assert_eq!(second.elements, docs(vec![json!({"a": 3})]));
    assert!(stage.is_done());
}

#[tokio::test]
async fn key_reordered_objects_emit_once() {
    // S2: the same object with reordered keys arrives on two pages.
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!({"a": 1, "b": 2})])
        .with_page(vec![json!({"b": 2, "a": 1})]);
    let mut stage = client_stage(&factory).await;
    let cancel = CancellationToken::new();

    let mut total = 0;
    while !stage.is_done() {
        total += stage.drain(10, &cancel).await.unwrap().elements.len();
    }
    assert_eq!(total, 1);
}

#[tokio::test]
async fn numeric_subtypes_are_both_retained() {
    // S3: integer 1 and double 1.0 are distinct documents.
    let factory = ScriptedSourceFactory::new().with_page(vec![json!(1), json!(1.0)]);
    let mut stage = client_stage(&factory).await;

    let page = stage.drain(10, &CancellationToken::new()).await.unwrap();
    assert_eq!(page.elements.len(), 2);
}

#[tokio::test]
async fn duplicate_only_page_is_empty_but_not_done() {
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!("x")])
        .with_page(vec![json!("x")])
        .with_page(vec![json!("y")]);
    let mut stage = client_stage(&factory).await;
    let cancel = CancellationToken::new();

    stage.drain(10, &cancel).await.unwrap();
    let middle = stage.drain(10, &cancel).await.unwrap();
    assert!(middle.success);
    assert!(middle.elements.is_empty());
    assert!(!stage.is_done());

    let last = stage.drain(10, &cancel).await.unwrap();
    assert_eq!(last.elements, docs(vec![json!("y")]));
}

#[tokio::test]
async fn already_distinct_stream_is_a_no_op() {
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!(1), json!(2)])
        .with_page(vec![json!(3)]);
    let mut stage = client_stage(&factory).await;
    let cancel = CancellationToken::new();

    let mut seen = Vec::new();
    while !stage.is_done() {
        seen.extend(stage.drain(10, &cancel).await.unwrap().elements);
    }
    assert_eq!(seen, docs(vec![json!(1), json!(2), json!(3)]));
}

#[tokio::test]
async fn failure_pages_pass_through_without_state_mutation() {
    // S6: a failure page is returned verbatim and the retry produces the
    // same elements as if the failure never happened.
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!({"a": 1})])
        .with_failure()
        .with_page(vec![json!({"a": 1}), json!({"a": 2})]);
    let mut stage = client_stage(&factory).await;
    let cancel = CancellationToken::new();

    stage.drain(10, &cancel).await.unwrap();

    let failed = stage.drain(10, &cancel).await.unwrap();
    assert!(!failed.success);
    assert!(failed.elements.is_empty());
    assert_eq!(
        failed.metrics.diagnostics,
        vec!["injected partition failure".to_string()]
    );

    let retried = stage.drain(10, &cancel).await.unwrap();
    assert_eq!(retried.elements, docs(vec![json!({"a": 2})]));
}

#[tokio::test]
async fn cancellation_surfaces_as_failure_page() {
    let factory = ScriptedSourceFactory::new().with_page(vec![json!(1)]);
    let mut stage = client_stage(&factory).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let page = stage.drain(10, &cancel).await.unwrap();
    assert!(!page.success);

    // The stage is retryable with a fresh token.
    let page = stage.drain(10, &CancellationToken::new()).await.unwrap();
    assert_eq!(page.elements, docs(vec![json!(1)]));
}

#[tokio::test]
async fn client_resume_matches_uninterrupted_run() {
    // P4: interrupt after the first page, resume from the inline cursor,
    // and compare against the uninterrupted run.
    let pages = [
        vec![json!({"a": 1}), json!({"a": 2})],
        vec![json!({"a": 2}), json!({"a": 3})],
        vec![json!({"a": 1}), json!({"a": 4})],
    ];
    let factory = pages
        .iter()
        .fold(ScriptedSourceFactory::new(), |f, p| f.with_page(p.clone()));
    let cancel = CancellationToken::new();

    let mut uninterrupted = client_stage(&factory).await;
    let mut expected = Vec::new();
    while !uninterrupted.is_done() {
        expected.extend(uninterrupted.drain(10, &cancel).await.unwrap().elements);
    }

    let mut stage = client_stage(&factory).await;
    let first = stage.drain(10, &cancel).await.unwrap();
    let token = first.cursor.expect("client page should carry a cursor");

    let mut resumed = DistinctStage::create(
        ExecutionEnvironment::Client,
        DistinctQueryType::Unordered,
        Some(token),
        factory.source_factory(),
    )
    .await
    .unwrap();

    let mut actual = first.elements;
    while !resumed.is_done() {
        actual.extend(resumed.drain(10, &cancel).await.unwrap().elements);
    }
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn compute_stage_defers_cursors_to_try_get_cursor() {
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!(1)])
        .with_page(vec![json!(2)]);
    let mut stage = DistinctStage::create(
        ExecutionEnvironment::Compute,
        DistinctQueryType::Unordered,
        None,
        factory.source_factory(),
    )
    .await
    .unwrap();

    let page = stage.drain(10, &CancellationToken::new()).await.unwrap();
    assert_eq!(page.cursor, None);
    assert_eq!(
        page.disallow_cursor_reason.as_deref(),
        Some(DISALLOW_INLINE_CURSOR)
    );

    let CursorState::Available(token) = stage.try_get_cursor().unwrap() else {
        panic!("expected a cursor");
    };

    let mut resumed = DistinctStage::create(
        ExecutionEnvironment::Compute,
        DistinctQueryType::Unordered,
        Some(token),
        factory.source_factory(),
    )
    .await
    .unwrap();
    let page = resumed
        .drain(10, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(page.elements, docs(vec![json!(2)]));
    assert!(resumed.is_done());
    assert_eq!(resumed.try_get_cursor().unwrap(), CursorState::Done);
}

#[tokio::test]
async fn cursor_is_unavailable_while_source_cannot_supply_one() {
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!(1)])
        .without_cursors();
    let stage = DistinctStage::create(
        ExecutionEnvironment::Compute,
        DistinctQueryType::Unordered,
        None,
        factory.source_factory(),
    )
    .await
    .unwrap();

    assert_eq!(stage.try_get_cursor().unwrap(), CursorState::Unavailable);
}

#[tokio::test]
async fn ordered_distinct_uses_last_fingerprint_only() {
    let factory = ScriptedSourceFactory::new()
        .with_page(vec![json!(1), json!(1), json!(2)])
        .with_page(vec![json!(2), json!(3), json!(3)]);
    let mut stage = DistinctStage::create(
        ExecutionEnvironment::Client,
        DistinctQueryType::Ordered,
        None,
        factory.source_factory(),
    )
    .await
    .unwrap();
    let cancel = CancellationToken::new();

    let mut seen = Vec::new();
    while !stage.is_done() {
        seen.extend(stage.drain(10, &cancel).await.unwrap().elements);
    }
    assert_eq!(seen, docs(vec![json!(1), json!(2), json!(3)]));
}
