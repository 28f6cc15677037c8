//! Tests for the client module

use super::*;
use crate::auth::AuthConfig;
use crate::transport::InMemoryTransport;
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn params(value: JsonValue) -> JsonObject {
    value.as_object().cloned().unwrap()
}

fn client_with(transport: &Arc<InMemoryTransport>) -> Bx24Client {
    Bx24Client::new(transport.clone())
}

// ============================================================================
// Batch Encoding Tests
// ============================================================================

#[test]
fn test_encode_params_php_style() {
    let encoded = encode_params(&params(json!({
        "filter": {">ID": 5, "STAGE_ID": "WON"},
        "select": ["ID", "TITLE"],
        "start": -1
    })));

    assert_eq!(
        encoded,
        "filter%5B%3EID%5D=5&filter%5BSTAGE_ID%5D=WON&select%5B0%5D=ID&select%5B1%5D=TITLE&start=-1"
    );
}

#[test]
fn test_encode_params_scalars() {
    assert_eq!(
        encode_params(&params(json!({"a": true, "b": false, "c": null, "d": "x y"}))),
        "a=1&b=0&c=&d=x+y"
    );
    assert_eq!(encode_params(&JsonObject::new()), "");
}

#[test]
fn test_batch_command_encode() {
    assert_eq!(
        BatchCommand::new("user.current", JsonObject::new()).encode(),
        "user.current"
    );
    assert_eq!(
        BatchCommand::new("crm.deal.get", params(json!({"id": 7}))).encode(),
        "crm.deal.get?id=7"
    );
}

#[test]
fn test_batch_calls_from_json() {
    let list = BatchCalls::from_json(json!([
        "user.current",
        ["crm.deal.get", {"id": 1}]
    ]))
    .unwrap();
    assert_eq!(
        list,
        BatchCalls::List(vec![
            BatchCommand::new("user.current", JsonObject::new()),
            BatchCommand::new("crm.deal.get", params(json!({"id": 1}))),
        ])
    );

    let map = BatchCalls::from_json(json!({"me": ["user.current"]})).unwrap();
    assert_eq!(map.len(), 1);
    assert!(matches!(map, BatchCalls::Map(_)));
}

#[test_case(json!(42) ; "scalar batch")]
#[test_case(json!([[1, {}]]) ; "numeric method")]
#[test_case(json!([["crm.deal.get", [1]]]) ; "list params")]
#[test_case(json!([["a", {}, {}]]) ; "too many parts")]
fn test_batch_calls_from_json_rejects(value: JsonValue) {
    assert!(BatchCalls::from_json(value).is_err());
}

#[test]
fn test_batch_params() {
    let calls = BatchCalls::Map(vec![(
        "deal".to_string(),
        BatchCommand::new("crm.deal.get", params(json!({"id": 3}))),
    )]);
    let built = batch::batch_params(&calls, true).unwrap();

    assert_eq!(built["halt"], 1);
    assert_eq!(built["cmd"], json!({"deal": "crm.deal.get?id=3"}));
}

#[test]
fn test_batch_params_limit() {
    let calls = BatchCalls::List(vec![
        BatchCommand::new("user.current", JsonObject::new());
        MAX_BATCH_COMMANDS + 1
    ]);
    let err = batch::batch_params(&calls, false).unwrap_err();
    assert!(matches!(
        err,
        Error::BatchTooLarge {
            count: 51,
            limit: 50
        }
    ));
}

// ============================================================================
// Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_init_is_idempotent() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![json!({"result": 1})]));
    let client = client_with(&transport);

    assert!(!client.is_init());
    client.init().await.unwrap();
    client.init().await.unwrap();
    assert!(client.is_init());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_call_method_awaits_readiness() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![json!({"result": {"ID": "1"}})]));
    let client = client_with(&transport);

    let result = client
        .call_method("user.current", JsonObject::new())
        .await
        .unwrap();

    assert!(client.is_init());
    assert_eq!(result.data()["ID"], "1");
    assert_eq!(result.query().unwrap().method, "user.current");
}

#[tokio::test]
async fn test_init_failure_is_retried() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![]));
    let auth = Arc::new(Authenticator::new(AuthConfig::OAuth {
        token_url: "http://127.0.0.1:1/oauth/token/".to_string(),
        client_id: "app".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "refresh".to_string(),
        access_token: None,
        expires_at: None,
    }));
    let client = client_with(&transport).with_authenticator(auth);

    assert!(client.init().await.is_err());
    assert!(!client.is_init());
    assert!(client
        .call_method("user.current", JsonObject::new())
        .await
        .is_err());
    assert_eq!(transport.call_count(), 0);
}

// ============================================================================
// Throw-mode Tests
// ============================================================================

#[tokio::test]
async fn test_throw_mode_toggle() {
    let error = json!({"error": "ERROR_CORE", "error_description": "Failure"});
    let transport = Arc::new(InMemoryTransport::scripted(vec![error.clone(), error]));
    let client = client_with(&transport);

    assert!(client.throw_errors());
    let err = client
        .call_method("crm.deal.add", JsonObject::new())
        .await
        .unwrap_err();
    assert_eq!(err.api_code(), Some("ERROR_CORE"));

    client.set_throw_errors(false);
    let result = client
        .call_method("crm.deal.add", JsonObject::new())
        .await
        .unwrap();
    assert_eq!(result.error().unwrap().code, "ERROR_CORE");
}

#[tokio::test]
async fn test_throw_mode_from_builder() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![]));
    let client = client_with(&transport).with_throw_errors(false);
    assert!(!client.throw_errors());
}

// ============================================================================
// Batch Tests
// ============================================================================

#[tokio::test]
async fn test_call_batch_list() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![json!({
        "result": {
            "result": [{"ID": "7"}, [{"ID": "1"}, {"ID": "2"}]],
            "result_error": [],
            "result_total": {"1": 3},
            "result_next": {"1": 2},
            "result_time": []
        },
        "time": {"duration": 0.2}
    })]));
    let client = client_with(&transport);

    let results = client
        .call_batch(
            BatchCalls::List(vec![
                BatchCommand::new("user.current", JsonObject::new()),
                BatchCommand::new("crm.deal.list", params(json!({"select": ["ID"]}))),
            ]),
            false,
        )
        .await
        .unwrap();

    assert!(results.is_list());
    assert_eq!(results.len(), 2);
    assert_eq!(results.get("0").unwrap().data()["ID"], "7");

    let deals = results.get("1").unwrap();
    assert_eq!(deals.total(), Some(3));
    assert!(deals.has_more());

    let call = &transport.calls()[0];
    assert_eq!(call.method, "batch");
    assert_eq!(call.params["halt"], 0);
    assert_eq!(
        call.params["cmd"],
        json!(["user.current", "crm.deal.list?select%5B0%5D=ID"])
    );
}

#[tokio::test]
async fn test_batch_result_continues_with_its_own_method() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![
        json!({
            "result": {
                "result": {"deals": [{"ID": "1"}]},
                "result_next": {"deals": 1},
                "result_total": {"deals": 2}
            }
        }),
        json!({"result": [{"ID": "2"}], "total": 2}),
    ]));
    let client = client_with(&transport);

    let results = client
        .call_batch(
            BatchCalls::Map(vec![(
                "deals".to_string(),
                BatchCommand::new("crm.deal.list", params(json!({"order": {"ID": "ASC"}}))),
            )]),
            false,
        )
        .await
        .unwrap();
    let page = client
        .fetch_next(results.get("deals").unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page.records(), vec![json!({"ID": "2"})]);
    let call = &transport.calls()[1];
    assert_eq!(call.method, "crm.deal.list");
    assert_eq!(call.params["start"], 1);
    assert_eq!(call.params["order"], json!({"ID": "ASC"}));
}

#[tokio::test]
async fn test_call_batch_map_with_command_error() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![
        json!({
            "result": {
                "result": {"ok": true},
                "result_error": {"bad": {"error": "NOT_FOUND", "error_description": "Not found"}}
            }
        }),
        json!({
            "result": {
                "result": {"ok": true},
                "result_error": {"bad": {"error": "NOT_FOUND", "error_description": "Not found"}}
            }
        }),
    ]));
    let client = client_with(&transport);
    let calls = BatchCalls::Map(vec![
        ("ok".to_string(), BatchCommand::new("app.info", JsonObject::new())),
        (
            "bad".to_string(),
            BatchCommand::new("crm.deal.get", params(json!({"id": 0}))),
        ),
    ]);

    let err = client.call_batch(calls.clone(), true).await.unwrap_err();
    assert_eq!(err.api_code(), Some("NOT_FOUND"));

    client.set_throw_errors(false);
    let results = client.call_batch(calls, true).await.unwrap();
    assert!(results.is_map());
    assert_eq!(results.get("ok").unwrap().data(), &json!(true));
    let bad = results.get("bad").unwrap();
    assert_eq!(bad.error().unwrap().description, "Not found");
    assert_eq!(bad.data(), &JsonValue::Null);
}

#[tokio::test]
async fn test_call_batch_whole_failure() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![json!({
        "error": "expired_token",
        "error_description": "The access token provided has expired.",
        "status": 401
    })]));
    let client = client_with(&transport).with_throw_errors(false);

    let results = client
        .call_batch(
            BatchCalls::List(vec![
                BatchCommand::new("a", JsonObject::new()),
                BatchCommand::new("b", JsonObject::new()),
            ]),
            false,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for result in results.iter() {
        let err = result.error().unwrap();
        assert_eq!(err.code, "expired_token");
        assert_eq!(err.status, Some(401));
    }
}

#[tokio::test]
async fn test_call_batch_too_large_makes_no_call() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![]));
    let client = client_with(&transport);

    let calls = BatchCalls::List(vec![
        BatchCommand::new("user.current", JsonObject::new());
        60
    ]);
    assert!(client.call_batch(calls, false).await.is_err());
    assert_eq!(transport.call_count(), 0);
}

// ============================================================================
// Passthrough Tests
// ============================================================================

#[tokio::test]
async fn test_call_bind_and_unbind() {
    let transport = Arc::new(InMemoryTransport::new(|_, _| Ok(json!({"result": true}))));
    let client = client_with(&transport);

    client
        .call_bind("OnCrmDealAdd", "https://example.com/hook", Some(1))
        .await
        .unwrap();
    client
        .call_unbind("OnCrmDealAdd", "https://example.com/hook", None)
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].method, "event.bind");
    assert_eq!(
        calls[0].params,
        params(json!({"event": "OnCrmDealAdd", "handler": "https://example.com/hook", "auth_type": 1}))
    );
    assert_eq!(calls[1].method, "event.unbind");
    assert!(calls[1].params.get("auth_type").is_none());
}

#[tokio::test]
async fn test_options() {
    let transport = Arc::new(InMemoryTransport::new(|method, _| {
        Ok(match method {
            "user.option.get" | "app.option.get" => json!({"result": "dark"}),
            _ => json!({"result": true}),
        })
    }));
    let client = client_with(&transport);

    client.user_option().set("theme", "dark").await.unwrap();
    let theme = client.app_option().get("theme").await.unwrap();
    assert_eq!(theme.data(), &json!("dark"));
    assert_eq!(client.app_option().scope(), OptionScope::App);

    let calls = transport.calls();
    assert_eq!(calls[0].method, "user.option.set");
    assert_eq!(calls[0].params["options"], json!({"theme": "dark"}));
    assert_eq!(calls[1].method, "app.option.get");
    assert_eq!(calls[1].params["option"], "theme");
}

#[test_case(json!({"result": true}), true ; "bool")]
#[test_case(json!({"result": "Y"}), true ; "yes flag")]
#[test_case(json!({"result": 0}), false ; "zero")]
#[test_case(json!({"result": false}), false ; "false")]
#[tokio::test]
async fn test_is_admin(reply: JsonValue, expected: bool) {
    let transport = Arc::new(InMemoryTransport::scripted(vec![reply]));
    let client = client_with(&transport);

    assert_eq!(client.is_admin().await.unwrap(), expected);
    assert_eq!(transport.calls()[0].method, "user.admin");
}

#[tokio::test]
async fn test_auth_passthrough_without_authenticator() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![]));
    let client = client_with(&transport);

    assert!(client.get_auth().await.is_none());
    assert!(matches!(
        client.refresh_auth().await.unwrap_err(),
        Error::Auth { .. }
    ));
    assert!(client.get_domain().await.is_none());
}

#[tokio::test]
async fn test_get_auth_with_fixed_token() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![]));
    let auth = Arc::new(Authenticator::new(AuthConfig::AccessToken {
        token: "tok".to_string(),
    }));
    let client = client_with(&transport).with_authenticator(auth);

    assert_eq!(client.get_auth().await.unwrap().access_token, "tok");
}

#[tokio::test]
async fn test_get_domain_from_endpoint() {
    let client =
        Bx24Client::from_config(&Bx24Config::new("https://example.bitrix24.ru/rest/1/abc/"))
            .unwrap();
    assert_eq!(
        client.get_domain().await.as_deref(),
        Some("example.bitrix24.ru")
    );
}

// ============================================================================
// Bulk Tests
// ============================================================================

#[tokio::test]
async fn test_client_bulk_fetchers() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![
        json!({"result": [{"ID": "1"}], "next": 1}),
        json!({"result": [{"ID": "2"}]}),
        json!({"result": [{"ID": "1"}, {"ID": "2"}]}),
        json!({"result": []}),
    ]));
    let client = client_with(&transport);

    let by_continuation = client
        .fetch_all_by_continuation("crm.lead.list", JsonObject::new())
        .await
        .unwrap();
    let by_cursor = client
        .fetch_all_by_id_cursor("crm.lead.list", JsonObject::new())
        .await
        .unwrap();

    assert_eq!(by_continuation, by_cursor);
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test]
async fn test_client_pages() {
    let transport = Arc::new(InMemoryTransport::scripted(vec![
        json!({"result": [1], "next": 1}),
        json!({"result": [2]}),
    ]));
    let client = client_with(&transport);

    let pages: Vec<ApiResult> = client
        .pages("crm.lead.list", JsonObject::new())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].data(), &json!([2]));
}
