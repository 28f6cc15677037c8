//! Tests for result normalization

use super::*;
use crate::error::Error;
use crate::transport::InMemoryTransport;
use crate::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

fn query(method: &str, params: Value) -> Query {
    Query::new(method, params.as_object().cloned().unwrap_or_default())
}

fn raw(body: Value) -> RawResult {
    RawResult::new(body, Some(query("crm.deal.list", json!({"select": ["ID"]}))))
}

// ============================================================================
// Shape Tests
// ============================================================================

#[test_case(json!([{"result": 1}, {"result": 2}]), "list", 2 ; "array is a list")]
#[test_case(json!({"result": [1, 2], "next": 2}), "single", 1 ; "envelope is single")]
#[test_case(json!({"error": "ACCESS_DENIED"}), "single", 1 ; "error envelope is single")]
#[test_case(json!({"a": {"result": 1}, "b": {"result": 2}, "c": {"result": 3}}), "map", 3 ; "keyed object is a map")]
#[test_case(json!(42), "single", 1 ; "scalar is single")]
fn test_shape_classify(value: Value, kind: &str, len: usize) {
    let shape = Shape::classify(value);
    let actual = match &shape {
        Shape::Single(_) => "single",
        Shape::List(_) => "list",
        Shape::Map(_) => "map",
    };
    assert_eq!(actual, kind);
    assert_eq!(shape.len(), len);
}

#[test]
fn test_shape_map_keeps_key_order() {
    let shape = Shape::classify(json!({"zeta": {"result": 1}, "alpha": {"result": 2}}));
    let keys = match shape.map(|v| v["result"].clone()) {
        Shape::Map(entries) => entries.into_iter().map(|(k, _)| k).collect::<Vec<_>>(),
        other => panic!("Expected map, got {other:?}"),
    };
    assert_eq!(keys, vec!["zeta".to_string(), "alpha".to_string()]);
}

#[test]
fn test_shape_get_and_values() {
    let list = Shape::List(vec![10, 20]);
    assert_eq!(list.get("1"), Some(&20));
    assert_eq!(list.get("x"), None);

    let map = Shape::Map(vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    assert_eq!(map.get("b"), Some(&2));
    assert_eq!(map.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(map.into_values(), vec![1, 2]);

    assert_eq!(Shape::Single(5).into_single(), Some(5));
    assert!(Shape::<i32>::List(vec![]).is_empty());
}

#[test]
fn test_shape_try_map_stops_at_error() {
    let shape = Shape::List(vec![1, 2, 3]);
    let mut seen = Vec::new();
    let result: std::result::Result<Shape<i32>, String> = shape.try_map(|v| {
        seen.push(v);
        if v == 2 {
            Err("boom".to_string())
        } else {
            Ok(v)
        }
    });
    assert_eq!(result, Err("boom".to_string()));
    assert_eq!(seen, vec![1, 2]);
}

// ============================================================================
// ApiResult Tests
// ============================================================================

#[test]
fn test_api_result_from_envelope() {
    let result = ApiResult::from_raw(raw(json!({
        "result": [{"ID": "1"}, {"ID": "2"}],
        "next": 2,
        "total": "5",
        "time": {"duration": 0.1}
    })));

    assert!(result.is_ok());
    assert!(result.has_more());
    assert_eq!(result.next_start(), Some(2));
    assert_eq!(result.total(), Some(5));
    assert_eq!(result.records().len(), 2);
    assert_eq!(result.time(), Some(&json!({"duration": 0.1})));

    let next = result.continuation().unwrap();
    assert_eq!(next.method, "crm.deal.list");
    assert_eq!(next.params["start"], 2);
    assert_eq!(next.params["select"], json!(["ID"]));
}

#[test]
fn test_api_result_error_envelope() {
    let result = ApiResult::from_raw(raw(json!({
        "error": "ACCESS_DENIED",
        "error_description": "Access denied!",
        "status": 403
    })));

    let err = result.error().unwrap();
    assert_eq!(err.code, "ACCESS_DENIED");
    assert_eq!(err.description, "Access denied!");
    assert_eq!(err.status, Some(403));
    assert_eq!(result.data(), &Value::Null);
    assert!(matches!(
        result.into_result(),
        Err(Error::Api { status: Some(403), .. })
    ));
}

#[test]
fn test_api_result_empty_error_is_not_error() {
    let result = ApiResult::from_raw(raw(json!({"result": [], "error": ""})));
    assert!(result.is_ok());
}

#[test_case(json!(null), 0 ; "null is empty")]
#[test_case(json!([1, 2, 3]), 3 ; "array")]
#[test_case(json!({"tasks": [{"id": 1}, {"id": 2}]}), 2 ; "wrapped list")]
#[test_case(json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}], "hasMore": true}), 3 ; "wrapped list with metadata")]
#[test_case(json!({"users": [1], "groups": [2]}), 1 ; "two arrays is one record")]
#[test_case(json!({"ID": "1", "TITLE": "Deal"}), 1 ; "single record")]
#[test_case(json!(true), 1 ; "scalar")]
fn test_api_result_records(data: Value, count: usize) {
    assert_eq!(ApiResult::ok(data).records().len(), count);
}

// ============================================================================
// Normalizer Tests
// ============================================================================

#[test]
fn test_normalize_preserves_each_shape() {
    let normalizer = Normalizer::new(true);

    let single = normalizer
        .normalize(Shape::Single(raw(json!({"result": 1}))))
        .unwrap();
    assert!(single.is_single());
    assert_eq!(single.len(), 1);

    let list = normalizer
        .normalize(Shape::List(vec![
            raw(json!({"result": 1, "next": 1})),
            raw(json!({"result": 2})),
        ]))
        .unwrap();
    assert!(list.is_list());
    assert_eq!(list.len(), 2);
    assert!(list.get("0").unwrap().continuation().is_some());
    assert!(list.get("1").unwrap().continuation().is_none());

    let map = normalizer
        .normalize(Shape::Map(vec![
            ("deals".to_string(), raw(json!({"result": []}))),
            ("leads".to_string(), raw(json!({"result": [], "next": 50}))),
        ]))
        .unwrap();
    assert!(map.is_map());
    assert_eq!(map.len(), 2);
    assert!(map.get("leads").unwrap().has_more());
}

#[test]
fn test_normalize_value_classifies() {
    let normalizer = Normalizer::default();
    let shape = normalizer
        .normalize_value(
            json!({"result": [1], "next": 1}),
            Some(query("user.get", json!({}))),
        )
        .unwrap();
    let result = shape.into_single().unwrap();
    assert_eq!(result.continuation().unwrap().method, "user.get");

    let shape = normalizer
        .normalize_value(json!({"a": {"result": 1}, "b": {"result": 2}}), None)
        .unwrap();
    assert_eq!(shape.get("b").unwrap().data(), &json!(2));
}

#[test]
fn test_throw_mode_on_raises_embedded_error() {
    let normalizer = Normalizer::new(true);
    let err = normalizer
        .normalize(Shape::List(vec![
            raw(json!({"result": 1})),
            raw(json!({"error": "NOT_FOUND", "error_description": "Not found"})),
        ]))
        .unwrap_err();

    assert_eq!(err.api_code(), Some("NOT_FOUND"));
}

#[test]
fn test_throw_mode_off_keeps_error_on_result() {
    let normalizer = Normalizer::new(false);
    let result = normalizer
        .normalize_one(raw(json!({"error": "NOT_FOUND", "error_description": "Not found"})))
        .unwrap();

    assert_eq!(result.error().unwrap().code, "NOT_FOUND");
}

#[test]
fn test_throw_mode_holder_snapshots() {
    let mode = ThrowMode::default();
    assert!(mode.get());

    let before = mode.normalizer();
    mode.set(false);
    let after = mode.normalizer();

    assert!(before.throw_errors());
    assert!(!after.throw_errors());

    // Clones share the flag
    let shared = mode.clone();
    shared.set(true);
    assert!(mode.get());
}

#[test]
fn test_renormalize_is_identity() {
    let normalizer = Normalizer::new(false);
    let once = normalizer
        .normalize_one(raw(json!({
            "result": [{"ID": "1"}],
            "next": 1,
            "total": 3,
            "time": {"start": 1}
        })))
        .unwrap();
    let twice = normalizer.renormalize(once.clone()).unwrap();
    let thrice = normalizer.renormalize(twice.clone()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice, thrice);
    assert_eq!(thrice.continuation(), once.continuation());

    let errored = normalizer
        .normalize_one(raw(json!({"error": "X", "error_description": "y", "status": 400})))
        .unwrap();
    assert_eq!(normalizer.renormalize(errored.clone()).unwrap(), errored);
}

// ============================================================================
// Continuation Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_next_without_more_makes_no_call() {
    let transport = InMemoryTransport::scripted(vec![]);
    let normalizer = Normalizer::default();
    let last = normalizer.normalize_one(raw(json!({"result": [1]}))).unwrap();

    let next = normalizer.fetch_next(&last, &transport).await.unwrap();

    assert!(next.is_none());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_fetch_next_makes_exactly_one_call() {
    let transport = InMemoryTransport::scripted(vec![json!({
        "result": [{"ID": "3"}],
        "total": 3
    })]);
    let normalizer = Normalizer::default();
    let first = normalizer
        .normalize_one(raw(json!({"result": [{"ID": "1"}, {"ID": "2"}], "next": 2, "total": 3})))
        .unwrap();

    let second = normalizer
        .fetch_next(&first, &transport)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(transport.call_count(), 1);
    let call = &transport.calls()[0];
    assert_eq!(call.method, "crm.deal.list");
    assert_eq!(call.params["start"], 2);
    assert_eq!(second.records(), vec![json!({"ID": "3"})]);
    assert!(!second.has_more());

    // The reply is normalized too: its own continuation is terminal
    assert!(normalizer.fetch_next(&second, &transport).await.unwrap().is_none());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_fetch_next_twice_calls_once_per_invocation() {
    let page2 = json!({"result": [{"ID": "2"}], "next": 2});
    let transport = InMemoryTransport::new(move |_, params: &JsonObject| {
        assert_eq!(params["start"], 1);
        Ok(page2.clone())
    });
    let normalizer = Normalizer::default();
    let first = normalizer
        .normalize_one(raw(json!({"result": [{"ID": "1"}], "next": 1})))
        .unwrap();

    let a = normalizer.fetch_next(&first, &transport).await.unwrap().unwrap();
    let b = normalizer.fetch_next(&first, &transport).await.unwrap().unwrap();

    assert_eq!(a, b);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(a.continuation().unwrap().params["start"], 2);
}

#[tokio::test]
async fn test_fetch_next_applies_throw_mode() {
    let transport = InMemoryTransport::scripted(vec![
        json!({"error": "QUERY_LIMIT_EXCEEDED", "error_description": "Too many requests"}),
        json!({"error": "QUERY_LIMIT_EXCEEDED", "error_description": "Too many requests"}),
    ]);
    let first = ApiResult::from_raw(raw(json!({"result": [], "next": 50})));

    let err = Normalizer::new(true)
        .fetch_next(&first, &transport)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let page = Normalizer::new(false)
        .fetch_next(&first, &transport)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.error().unwrap().code, "QUERY_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_fetch_next_without_query_is_error() {
    let transport = InMemoryTransport::scripted(vec![]);
    let orphan = ApiResult::from_raw(RawResult::new(json!({"result": [], "next": 50}), None));

    let err = Normalizer::default()
        .fetch_next(&orphan, &transport)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { .. }));
    assert_eq!(transport.call_count(), 0);
}
