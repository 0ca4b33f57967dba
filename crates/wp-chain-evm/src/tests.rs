use super::*;
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use wp_api_types::AccountId;
use wp_chain_client::{
    ChainError, NEW_WAVE_EVENT, SubscriptionEvent, WalletProvider, WaveCallOptions, WaveContract,
};

#[derive(Clone)]
enum MockReply {
    Result(Value),
    Error { code: i64, message: String },
    HttpFailure,
}

#[derive(Clone, Default)]
struct MockNode {
    replies: Arc<Mutex<HashMap<String, VecDeque<MockReply>>>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockNode {
    /// Queues replies for `method`; the last one repeats once the queue drains.
    async fn script(&self, method: &str, replies: Vec<MockReply>) {
        self.replies
            .lock()
            .await
            .insert(method.to_owned(), replies.into_iter().collect());
    }

    async fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

async fn handle_rpc(State(node): State<MockNode>, Json(request): Json<Value>) -> impl IntoResponse {
    let method = request["method"].as_str().unwrap_or_default().to_owned();
    let id = request["id"].clone();
    node.calls
        .lock()
        .await
        .push((method.clone(), request["params"].clone()));

    let reply = {
        let mut replies = node.replies.lock().await;
        match replies.get_mut(&method) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };

    match reply {
        Some(MockReply::Result(result)) => (
            StatusCode::OK,
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })),
        ),
        Some(MockReply::Error { code, message }) => (
            StatusCode::OK,
            Json(json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })),
        ),
        Some(MockReply::HttpFailure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "node unavailable" })),
        ),
        None => (
            StatusCode::OK,
            Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("method {method} not found") }
            })),
        ),
    }
}

async fn spawn_node() -> anyhow::Result<(MockNode, Arc<JsonRpcClient>)> {
    let node = MockNode::default();
    let app = Router::new()
        .route("/", post(handle_rpc))
        .with_state(node.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((node, Arc::new(JsonRpcClient::new(format!("http://{addr}/")))))
}

fn fast_poll() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        max_failures: 2,
    }
}

fn word_hex(value: u64) -> String {
    format!("0x{value:064x}")
}

#[tokio::test]
async fn reads_total_count_through_eth_call() -> anyhow::Result<()> {
    let (node, rpc) = spawn_node().await?;
    node.script("eth_call", vec![MockReply::Result(json!(word_hex(5)))])
        .await;
    let contract = RpcWaveContract::new(rpc, DEFAULT_CONTRACT_ADDRESS, fast_poll());

    assert_eq!(contract.read_total_count().await?, 5);

    let calls = node.calls_to("eth_call").await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0]["to"], json!(DEFAULT_CONTRACT_ADDRESS));
    assert_eq!(
        calls[0][0]["data"],
        json!(abi::encode_hex(abi::encode_total_waves_call()))
    );
    assert_eq!(calls[0][1], json!("latest"));
    Ok(())
}

#[tokio::test]
async fn wallet_rejection_maps_to_user_rejected() -> anyhow::Result<()> {
    let (node, rpc) = spawn_node().await?;
    node.script(
        "eth_requestAccounts",
        vec![MockReply::Error {
            code: 4001,
            message: "User rejected the request.".to_owned(),
        }],
    )
    .await;
    node.script("eth_accounts", vec![MockReply::Result(json!(["0xabc"]))])
        .await;
    let wallet = RpcWalletProvider::new(rpc);

    assert!(matches!(
        wallet.request_accounts().await,
        Err(ChainError::UserRejected(_))
    ));
    assert_eq!(
        wallet.get_authorized_accounts().await?,
        vec![AccountId("0xabc".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn reverted_receipt_fails_the_wave() -> anyhow::Result<()> {
    let (node, rpc) = spawn_node().await?;
    node.script("eth_sendTransaction", vec![MockReply::Result(json!("0xfeed"))])
        .await;
    node.script(
        "eth_getTransactionReceipt",
        vec![
            MockReply::Result(Value::Null),
            MockReply::Result(json!({ "status": "0x0", "blockNumber": "0x2a" })),
        ],
    )
    .await;
    let wallet = RpcWalletProvider::new(Arc::clone(&rpc));
    let contract = RpcWaveContract::new(rpc, DEFAULT_CONTRACT_ADDRESS, fast_poll());

    let pending = contract
        .submit_append(
            &wallet,
            &AccountId("0xabc".to_owned()),
            "hello",
            &WaveCallOptions {
                execution_limit: Some(300_000),
            },
        )
        .await?;
    assert_eq!(pending.tx_hash(), "0xfeed");
    assert!(matches!(
        pending.await_confirmation().await,
        Err(ChainError::Reverted(_))
    ));

    let sent = node.calls_to("eth_sendTransaction").await;
    assert_eq!(sent[0][0]["gas"], json!("0x493e0"));
    assert_eq!(sent[0][0]["from"], json!("0xabc"));
    assert_eq!(
        sent[0][0]["data"],
        json!(abi::encode_hex(abi::encode_wave_call("hello")))
    );
    Ok(())
}

#[tokio::test]
async fn successful_receipt_confirms() -> anyhow::Result<()> {
    let (node, rpc) = spawn_node().await?;
    node.script("eth_sendTransaction", vec![MockReply::Result(json!("0xbeef"))])
        .await;
    node.script(
        "eth_getTransactionReceipt",
        vec![MockReply::Result(json!({ "status": "0x1", "blockNumber": "0x10" }))],
    )
    .await;
    let wallet = RpcWalletProvider::new(Arc::clone(&rpc));
    let contract = RpcWaveContract::new(rpc, DEFAULT_CONTRACT_ADDRESS, fast_poll());

    let pending = contract
        .submit_append(
            &wallet,
            &AccountId("0xabc".to_owned()),
            "hi",
            &WaveCallOptions::default(),
        )
        .await?;
    let confirmation = pending.await_confirmation().await?;

    assert_eq!(confirmation.block_number, Some(16));
    let sent = node.calls_to("eth_sendTransaction").await;
    assert!(sent[0][0].get("gas").is_none());
    Ok(())
}

#[tokio::test]
async fn log_poller_delivers_new_waves() -> anyhow::Result<()> {
    let (node, rpc) = spawn_node().await?;
    node.script(
        "eth_blockNumber",
        vec![MockReply::Result(json!("0x10")), MockReply::Result(json!("0x11"))],
    )
    .await;

    let event = abi::NewWave {
        from: Address::with_last_byte(0x01),
        timestamp: U256::from(1000),
        message: "hi".to_owned(),
    };
    node.script(
        "eth_getLogs",
        vec![
            MockReply::Result(json!([{
                "topics": [
                    abi::new_wave_topic(),
                    abi::encode_hex(event.from.into_word()),
                ],
                "data": abi::encode_hex(event.encode_data()),
            }])),
            MockReply::Result(json!([])),
        ],
    )
    .await;

    let contract = RpcWaveContract::new(rpc, DEFAULT_CONTRACT_ADDRESS, fast_poll());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = contract
        .subscribe(NEW_WAVE_EVENT, Arc::new(move |event: SubscriptionEvent| {
            let _ = tx.send(event);
        }))
        .await?;

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await?;
    match event {
        Some(SubscriptionEvent::NewWave(record)) => {
            assert_eq!(record.message, "hi");
            assert_eq!(record.timestamp.to_unix_seconds(), Some(1000));
            assert_eq!(record.from.0, "0x0000000000000000000000000000000000000001");
        }
        other => panic!("unexpected subscription event: {other:?}"),
    }

    let logs = node.calls_to("eth_getLogs").await;
    assert_eq!(logs[0][0]["fromBlock"], json!("0x11"));
    subscription.cancel();
    Ok(())
}

#[tokio::test]
async fn repeated_poll_failures_report_lost_subscription() -> anyhow::Result<()> {
    let (node, rpc) = spawn_node().await?;
    node.script(
        "eth_blockNumber",
        vec![MockReply::Result(json!("0x1")), MockReply::HttpFailure],
    )
    .await;

    let contract = RpcWaveContract::new(rpc, DEFAULT_CONTRACT_ADDRESS, fast_poll());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = contract
        .subscribe(NEW_WAVE_EVENT, Arc::new(move |event: SubscriptionEvent| {
            let _ = tx.send(event);
        }))
        .await?;

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await?;
    assert!(matches!(event, Some(SubscriptionEvent::Lost { .. })));
    Ok(())
}
