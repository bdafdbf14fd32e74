#![allow(unused_crate_dependencies)]
#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use waypoint_client::{
    CallArgs, CallSpec, ClientConfig, ClientError, Method, ResponseShape, SelectionPolicy,
    WaypointClient,
};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GET_ITEM: CallSpec = CallSpec::new(Method::Get, "/items/{id}")
    .params(&["id"])
    .returns(ResponseShape::Item);

const LIST_ITEMS: CallSpec =
    CallSpec::new(Method::Get, "/items").returns(ResponseShape::List);

const CREATE_ITEM: CallSpec = CallSpec::new(Method::Post, "/items")
    .params(&["item"])
    .returns(ResponseShape::Item)
    .body_from_single_arg();

const SEARCH: CallSpec = CallSpec::new(Method::Get, "/search")
    .params(&["q"])
    .returns(ResponseShape::List);

const RUN: CallSpec = CallSpec::new(Method::Post, "/run")
    .params(&["code"])
    .returns(ResponseShape::Raw);

const WHOAMI: CallSpec =
    CallSpec::new(Method::Get, "/whoami").returns(ResponseShape::Item);

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    id: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn single_endpoint_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        endpoints: vec![server.uri()],
        health_check_interval_secs: 1,
        probe_timeout_secs: 1,
        max_wait_for_health_secs: 1,
        ..Default::default()
    }
}

async fn mount_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_non_200_carries_status_and_body() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = WaypointClient::new(single_endpoint_config(&server)).expect("client");
    let err = client
        .call_raw(&RUN, CallArgs::new().arg("code", "1+1"))
        .await
        .expect_err("503 must surface as an error");

    match err {
        ClientError::RemoteCall { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected RemoteCall, got {other:?}"),
    }
    client.shutdown().await;
}

#[tokio::test]
async fn test_typed_item_and_list_decoding() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("GET"))
        .and(path("/items/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "seven"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "a"},
            {"id": 2, "name": "b"}
        ])))
        .mount(&server)
        .await;

    let client = WaypointClient::new(single_endpoint_config(&server)).expect("client");

    let item: Item = client
        .call_one(&GET_ITEM, CallArgs::new().arg("id", 7))
        .await
        .expect("item call");
    assert_eq!(item, Item { id: 7, name: "seven".to_string() });

    let items: Vec<Item> = client.call_list(&LIST_ITEMS, CallArgs::new()).await.expect("list call");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, 1);
    assert_eq!(items[1].id, 2);

    client.shutdown().await;
}

#[tokio::test]
async fn test_shape_mismatch_is_decode_error() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "a"})))
        .mount(&server)
        .await;

    let client = WaypointClient::new(single_endpoint_config(&server)).expect("client");
    let err = client
        .call_list::<Item>(&LIST_ITEMS, CallArgs::new())
        .await
        .expect_err("object payload against list shape");
    assert!(matches!(err, ClientError::Decode(_)));
    client.shutdown().await;
}

#[tokio::test]
async fn test_structured_body_and_query_marshalling() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    // Body must be the structured argument's own fields, not nested under
    // an argument key.
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(body_json(json!({"name": "a", "value": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "a"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = WaypointClient::new(single_endpoint_config(&server)).expect("client");

    let created: Item = client
        .call_one(&CREATE_ITEM, CallArgs::new().arg("item", json!({"name": "a", "value": 1})))
        .await
        .expect("create call");
    assert_eq!(created.id, 1);

    let found: Vec<Item> = client
        .call_list(&SEARCH, CallArgs::new().arg("q", "abc"))
        .await
        .expect("search call");
    assert!(found.is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn test_exactly_one_attempt_per_invocation() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WaypointClient::new(single_endpoint_config(&server)).expect("client");
    let err = client
        .call_raw(&RUN, CallArgs::new().arg("code", "x"))
        .await
        .expect_err("500 must surface");
    assert!(matches!(err, ClientError::RemoteCall { status: 500, .. }));

    client.shutdown().await;
    // MockServer verifies expect(1) on drop: no internal retry happened.
}

#[tokio::test]
async fn test_latest_first_sticks_to_the_healthy_endpoint() {
    init_tracing();
    let healthy = MockServer::start().await;
    let dead = MockServer::start().await;
    mount_health(&healthy, 200).await;
    mount_health(&dead, 503).await;
    Mock::given(method("GET"))
        .and(path("/whoami"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "A"})))
        .mount(&healthy)
        .await;
    Mock::given(method("GET"))
        .and(path("/whoami"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "B"})))
        .mount(&dead)
        .await;

    let config = ClientConfig {
        endpoints: vec![healthy.uri(), dead.uri()],
        health_check_interval_secs: 1,
        probe_timeout_secs: 1,
        max_wait_for_health_secs: 5,
        selection_policy: SelectionPolicy::LatestFirst,
        ..Default::default()
    };
    let client = WaypointClient::new(config).expect("client");

    // Wait for the first probe cycle to land.
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.healthy_endpoints().is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("no healthy endpoint appeared");

    for _ in 0..100 {
        let who: WhoAmI = client.call_one(&WHOAMI, CallArgs::new()).await.expect("whoami");
        assert_eq!(who.id, "A");
    }

    let stats = client.probe_stats();
    assert!(stats.values().any(|s| s.successes > 0));
    assert!(stats.values().any(|s| s.failures > 0));

    client.shutdown().await;
}

#[test]
fn test_blocking_entry_points_from_a_plain_thread() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    let (client, server) = rt.block_on(async {
        let server = MockServer::start().await;
        mount_health(&server, 200).await;
        Mock::given(method("GET"))
            .and(path("/items/3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "three"})),
            )
            .mount(&server)
            .await;
        let client = WaypointClient::new(single_endpoint_config(&server)).expect("client");
        (client, server)
    });

    // The runtime stays alive on this thread's stack; the blocking call runs
    // outside of any async context.
    let item: Item = client
        .call_one_blocking(&GET_ITEM, CallArgs::new().arg("id", 3))
        .expect("blocking call");
    assert_eq!(item, Item { id: 3, name: "three".to_string() });

    rt.block_on(async move {
        client.shutdown().await;
        drop(server);
    });
}
