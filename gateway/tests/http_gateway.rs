//! `HttpGateway`, `RemoteSigner` and `HttpPriceSource` against an in-process
//! fake node built with axum.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use feeder_gateway::{
    ChainGateway, GatewayError, HttpGateway, HttpGatewayConfig, HttpPriceSource, PriceSource,
    RemoteSigner,
};
use feeder_types::{AssetPair, FeederAddress, PrevoteMsg, ValidatorAddress, VoteMsg};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeNode {
    /// Status every LCD route answers with, when set.
    fail_status: Option<u16>,
    /// `tx_response.code` for broadcasts.
    broadcast_code: u32,
    /// Delay applied to the latest-block route.
    block_delay: Option<Duration>,
    sign_requests: Vec<Value>,
    broadcasts: Vec<Value>,
}

type Shared = Arc<Mutex<FakeNode>>;

fn forced_failure(node: &Shared) -> Option<Response> {
    let status = node.lock().unwrap().fail_status?;
    Some((StatusCode::from_u16(status).unwrap(), "forced failure").into_response())
}

async fn vote_targets(State(node): State<Shared>) -> Response {
    if let Some(r) = forced_failure(&node) {
        return r;
    }
    Json(json!({"vote_targets": ["ueth:uusd", "ubtc:uusd", "ueth:uusd"]})).into_response()
}

async fn params(State(node): State<Shared>) -> Response {
    if let Some(r) = forced_failure(&node) {
        return r;
    }
    Json(json!({"params": {"vote_period": "10", "vote_threshold": "0.333", "reward_band": "0.02", "slash_window": "3600"}}))
        .into_response()
}

async fn latest_block(State(node): State<Shared>) -> Response {
    if let Some(r) = forced_failure(&node) {
        return r;
    }
    let delay = node.lock().unwrap().block_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Json(json!({"block": {"header": {"height": "4821", "chain_id": "nibiru-localnet-0"}}})).into_response()
}

async fn broadcast(State(node): State<Shared>, Json(body): Json<Value>) -> Response {
    if let Some(r) = forced_failure(&node) {
        return r;
    }
    let mut node = node.lock().unwrap();
    node.broadcasts.push(body);
    let code = node.broadcast_code;
    let raw_log = if code == 0 { "" } else { "invalid prevote" };
    Json(json!({"tx_response": {"code": code, "txhash": "ABCDEF", "raw_log": raw_log, "height": "0"}}))
        .into_response()
}

async fn sign(State(node): State<Shared>, Json(body): Json<Value>) -> Response {
    node.lock().unwrap().sign_requests.push(body);
    Json(json!({"tx_bytes": "c2lnbmVk"})).into_response()
}

async fn prices(Query(query): Query<HashMap<String, String>>) -> Response {
    let pairs = query.get("pairs").cloned().unwrap_or_default();
    let body: Vec<Value> = pairs
        .split(',')
        .filter(|p| !p.is_empty())
        .map(|p| json!({"pair": p, "price": 100.5, "source": "fake", "valid": true}))
        .collect();
    Json(body).into_response()
}

async fn spawn_fake_node() -> (String, Shared) {
    let node: Shared = Arc::new(Mutex::new(FakeNode::default()));
    let app = Router::new()
        .route("/nibiru/oracle/v1/vote_targets", get(vote_targets))
        .route("/nibiru/oracle/v1/params", get(params))
        .route("/cosmos/base/tendermint/v1beta1/blocks/latest", get(latest_block))
        .route("/cosmos/tx/v1beta1/txs", post(broadcast))
        .route("/sign", post(sign))
        .route("/prices", get(prices))
        .with_state(node.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), node)
}

fn gateway(base: &str) -> HttpGateway {
    let mut config = HttpGatewayConfig::new(base);
    config.request_timeout = Duration::from_millis(500);
    let signer = RemoteSigner::new(base, "nibiru-localnet-0", Duration::from_secs(2)).unwrap();
    HttpGateway::new(config, Arc::new(signer)).unwrap()
}

fn prevote_msg() -> PrevoteMsg {
    PrevoteMsg {
        hash: "130f21e4bdea8a95b167ee0ef8146de5c45ebeef".into(),
        feeder: FeederAddress::new("nibi1feeder").unwrap(),
        validator: ValidatorAddress::new("nibivaloper1test").unwrap(),
    }
}

#[tokio::test]
async fn vote_targets_come_back_sorted_and_deduplicated() {
    let (base, _node) = spawn_fake_node().await;
    let targets = gateway(&base).query_vote_targets().await.unwrap();
    let expected: Vec<AssetPair> = vec!["ubtc:uusd".parse().unwrap(), "ueth:uusd".parse().unwrap()];
    assert_eq!(targets, expected);
}

#[tokio::test]
async fn params_and_height_are_parsed() {
    let (base, _node) = spawn_fake_node().await;
    let gw = gateway(&base);
    let params = gw.query_oracle_params().await.unwrap();
    assert_eq!(params.vote_period, 10);
    assert_eq!(params.slash_window, Some(3600));
    assert_eq!(gw.current_height().await.unwrap(), 4821);
}

#[tokio::test]
async fn prevote_is_signed_then_broadcast() {
    let (base, node) = spawn_fake_node().await;
    let result = gateway(&base).broadcast_prevote(&prevote_msg()).await.unwrap();
    assert_eq!(result.tx_hash, "ABCDEF");
    assert_eq!(result.height, None);

    let node = node.lock().unwrap();
    assert_eq!(node.sign_requests.len(), 1);
    let signed = &node.sign_requests[0];
    assert_eq!(signed["chain_id"], "nibiru-localnet-0");
    assert_eq!(signed["msgs"][0]["type"], "oracle/MsgAggregateExchangeRatePrevote");
    assert_eq!(signed["msgs"][0]["value"]["validator"], "nibivaloper1test");

    assert_eq!(node.broadcasts.len(), 1);
    assert_eq!(node.broadcasts[0]["tx_bytes"], "c2lnbmVk");
    assert_eq!(node.broadcasts[0]["mode"], "BROADCAST_MODE_SYNC");
}

#[tokio::test]
async fn nonzero_tx_code_is_a_rejection() {
    let (base, node) = spawn_fake_node().await;
    node.lock().unwrap().broadcast_code = 5;
    let vote = VoteMsg {
        salt: "1234".into(),
        exchange_rates: "(ubtc:uusd,100.000000000000000000)".into(),
        feeder: FeederAddress::new("nibi1feeder").unwrap(),
        validator: ValidatorAddress::new("nibivaloper1test").unwrap(),
    };
    let err = gateway(&base).broadcast_vote(&vote).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Rejected {
            code: 5,
            log: "invalid prevote".into()
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_errors_are_retryable() {
    let (base, node) = spawn_fake_node().await;
    node.lock().unwrap().fail_status = Some(503);
    let err = gateway(&base).query_vote_targets().await.unwrap_err();
    assert!(matches!(err, GatewayError::Unavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn client_errors_are_rejections() {
    let (base, node) = spawn_fake_node().await;
    node.lock().unwrap().fail_status = Some(400);
    let err = gateway(&base).query_oracle_params().await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected { code: 400, .. }));
}

#[tokio::test]
async fn slow_node_times_out() {
    let (base, node) = spawn_fake_node().await;
    node.lock().unwrap().block_delay = Some(Duration::from_secs(3));
    let err = gateway(&base).current_height().await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_node_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = gateway(&format!("http://{addr}")).current_height().await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn closed_gateway_refuses_calls() {
    let (base, _node) = spawn_fake_node().await;
    let gw = gateway(&base);
    gw.close().await;
    let err = gw.current_height().await.unwrap_err();
    assert_eq!(err, GatewayError::Unavailable("gateway closed".into()));
}

#[tokio::test]
async fn price_source_requests_all_pairs() {
    let (base, _node) = spawn_fake_node().await;
    let source = HttpPriceSource::new(&base, Duration::from_secs(2)).unwrap();
    let pairs: Vec<AssetPair> = vec!["ubtc:uusd".parse().unwrap(), "ueth:uusd".parse().unwrap()];
    let prices = source.fetch_prices(&pairs).await.unwrap();
    assert_eq!(prices.len(), 2);
    assert_eq!(prices[0].pair, pairs[0]);
    assert_eq!(prices[1].source_name, "fake");
    assert!(prices.iter().all(|p| p.is_usable()));
}
