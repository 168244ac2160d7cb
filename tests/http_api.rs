//! HTTP surface of a single node, driven in-process.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use ledger_node::config::NodeConfig;
use ledger_node::model::{ChainSnapshot, ValidationMode, GENESIS_PREVIOUS_HASH};
use ledger_node::routes::{MessageResp, NodesResp, ValidateResp};
use ledger_node::{router, AppState};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

fn node() -> (AppState, Router) {
    let state = AppState::new(&NodeConfig::default()).unwrap();
    let app = router(state.clone());
    (state, app)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send<T: DeserializeOwned>(app: &Router, request: Request<Body>) -> (StatusCode, T) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn fresh_node_serves_genesis() {
    let (_, app) = node();
    let (status, snapshot): (_, ChainSnapshot) = send(&app, get("/get_chain")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot.length, 1);
    assert_eq!(snapshot.chain[0].index, 0);
    assert_eq!(snapshot.chain[0].previous_hash, GENESIS_PREVIOUS_HASH);
}

#[tokio::test]
async fn new_block_ignores_forged_previous_hash() {
    let (state, app) = node();
    let genesis_hash = state.ledger.read().latest().unwrap().hash.clone();

    let forged = json!({
        "index": 9,
        "timestamp": 1_700_000_123.5,
        "data": {"amount": 10, "to": "bob"},
        "previous_hash": "deadbeef",
    });
    let (status, body): (_, MessageResp) = send(&app, post_json("/new_block", forged)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "Block added successfully");

    let (_, snapshot): (_, ChainSnapshot) = send(&app, get("/get_chain")).await;
    assert_eq!(snapshot.length, 2);
    let added = &snapshot.chain[1];
    assert_eq!(added.previous_hash, genesis_hash);
    assert_eq!(added.index, 1);
    assert_eq!(added.data, json!({"amount": 10, "to": "bob"}));
    assert!(added.is_sealed());
}

#[tokio::test]
async fn malformed_block_is_a_client_error() {
    let (state, app) = node();
    let response = app
        .clone()
        .oneshot(post_json("/new_block", json!({"index": 1})))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(state.ledger.read().len(), 1);
}

#[tokio::test]
async fn add_nodes_rejects_empty_or_missing_list() {
    let (state, app) = node();

    let response = app.clone().oneshot(post_json("/add_nodes", json!([]))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let no_body = Request::builder()
        .method(Method::POST)
        .uri("/add_nodes")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(no_body).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let blanks = post_json("/add_nodes", json!(["", "   "]));
    let response = app.clone().oneshot(blanks).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(state.peers.is_empty());
}

#[tokio::test]
async fn add_nodes_reports_all_known_peers() {
    let (_, app) = node();
    let (status, body): (_, NodesResp) =
        send(&app, post_json("/add_nodes", json!(["127.0.0.1:5001", "127.0.0.1:5002"]))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "Nodes added successfully");

    let (_, body): (_, NodesResp) =
        send(&app, post_json("/add_nodes", json!(["127.0.0.1:5002", "127.0.0.1:5003"]))).await;
    assert_eq!(
        body.total_nodes,
        vec!["127.0.0.1:5001", "127.0.0.1:5002", "127.0.0.1:5003"]
    );
}

#[tokio::test]
async fn consensus_without_peers_changes_nothing() {
    let (state, app) = node();
    let (status, body): (_, MessageResp) = send(&app, get("/consensus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.message, "No consensus required");
    assert_eq!(state.ledger.read().len(), 1);
}

#[tokio::test]
async fn validate_reports_local_chain_health() {
    let (_, app) = node();
    app.clone()
        .oneshot(post_json(
            "/new_block",
            json!({"index": 1, "timestamp": 1.0, "data": "x", "previous_hash": ""}),
        ))
        .await
        .unwrap();
    let (status, body): (_, ValidateResp) = send(&app, get("/validate")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.ok);
    assert!(body.errors.is_empty());
}

#[tokio::test]
async fn concurrent_appends_stay_linked() {
    let (state, app) = node();
    let mut handles = Vec::new();
    for i in 0..32u32 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let timestamp = f64::from(i);
            let body = json!({"index": 0, "timestamp": timestamp, "data": i, "previous_hash": "0"});
            app.oneshot(post_json("/new_block", body)).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let ledger = state.ledger.read();
    assert_eq!(ledger.len(), 33);
    assert!(ledger.is_valid(ValidationMode::Strict));
}
