use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wp_api_types::AccountId;
use wp_chain_client::{
    ChainError, ChainResult, Confirmation, NEW_WAVE_EVENT, PendingTransaction, RawWaveRecord,
    Subscription, SubscriptionEvent, SubscriptionHandle, TransactionRequest, WalletProvider,
    WaveCallOptions, WaveContract, WaveHandler,
};

use crate::abi;
use crate::rpc::JsonRpcClient;

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    /// Consecutive transport failures tolerated before giving up.
    pub max_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2_000),
            max_failures: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogResponse {
    topics: Vec<String>,
    data: String,
    #[serde(default)]
    removed: bool,
}

fn is_transient(err: &ChainError) -> bool {
    matches!(err, ChainError::Network(_) | ChainError::InvalidResponse(_))
}

/// The deployed wave portal contract, read through a node endpoint.
pub struct RpcWaveContract {
    node: Arc<JsonRpcClient>,
    address: String,
    poll: PollSettings,
}

impl RpcWaveContract {
    pub fn new(node: Arc<JsonRpcClient>, address: impl Into<String>, poll: PollSettings) -> Self {
        Self {
            node,
            address: address.into(),
            poll,
        }
    }

    async fn call(&self, data: Vec<u8>) -> ChainResult<Vec<u8>> {
        let result: String = self
            .node
            .request(
                "eth_call",
                json!([{ "to": self.address, "data": abi::encode_hex(&data) }, "latest"]),
            )
            .await?;
        abi::decode_hex(&result)
    }
}

#[async_trait]
impl WaveContract for RpcWaveContract {
    fn address(&self) -> &str {
        &self.address
    }

    async fn read_total_count(&self) -> ChainResult<u64> {
        let data = self.call(abi::encode_total_waves_call()).await?;
        abi::decode_total_waves(&data)
    }

    async fn read_all_events(&self) -> ChainResult<Vec<RawWaveRecord>> {
        let data = self.call(abi::encode_all_waves_call()).await?;
        abi::decode_all_waves(&data)
    }

    async fn submit_append(
        &self,
        wallet: &dyn WalletProvider,
        from: &AccountId,
        message: &str,
        options: &WaveCallOptions,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        let tx_hash = wallet
            .send_transaction(TransactionRequest {
                from: from.clone(),
                to: self.address.clone(),
                data: abi::encode_wave_call(message),
                execution_limit: options.execution_limit,
            })
            .await?;

        Ok(Box::new(RpcPendingTransaction {
            node: Arc::clone(&self.node),
            tx_hash,
            poll: self.poll.clone(),
        }))
    }

    async fn subscribe(&self, event_name: &str, handler: WaveHandler) -> ChainResult<Subscription> {
        if event_name != NEW_WAVE_EVENT {
            return Err(ChainError::InvalidResponse(format!(
                "unsupported event {event_name}"
            )));
        }

        let head: String = self.node.request("eth_blockNumber", json!([])).await?;
        let from_block = abi::parse_quantity(&head)?.saturating_add(1);

        let poller = LogPoller {
            node: Arc::clone(&self.node),
            address: self.address.clone(),
            topic: abi::new_wave_topic(),
            poll: self.poll.clone(),
        };
        let task = tokio::spawn(poller.run(from_block, handler));
        info!("polling {} logs on {} from block {}", event_name, self.address, from_block);

        Ok(Subscription::new(Box::new(TaskSubscription { task })))
    }
}

struct TaskSubscription {
    task: JoinHandle<()>,
}

impl SubscriptionHandle for TaskSubscription {
    fn cancel(&self) {
        self.task.abort();
    }
}

struct LogPoller {
    node: Arc<JsonRpcClient>,
    address: String,
    topic: String,
    poll: PollSettings,
}

impl LogPoller {
    async fn run(self, mut next_block: u64, handler: WaveHandler) {
        let mut failures = 0_u32;
        loop {
            tokio::time::sleep(self.poll.interval).await;
            match self.poll_once(next_block).await {
                Ok(Some((records, latest))) => {
                    failures = 0;
                    for record in records {
                        handler(SubscriptionEvent::NewWave(record));
                    }
                    next_block = latest.saturating_add(1);
                }
                Ok(None) => failures = 0,
                Err(err) => {
                    failures += 1;
                    warn!(
                        "wave log poll failed ({}/{}): {}",
                        failures, self.poll.max_failures, err
                    );
                    if failures >= self.poll.max_failures {
                        handler(SubscriptionEvent::Lost {
                            reason: err.to_string(),
                        });
                        return;
                    }
                }
            }
        }
    }

    /// `None` when no new block has been produced since the last poll.
    async fn poll_once(&self, next_block: u64) -> ChainResult<Option<(Vec<RawWaveRecord>, u64)>> {
        let head: String = self.node.request("eth_blockNumber", json!([])).await?;
        let latest = abi::parse_quantity(&head)?;
        if latest < next_block {
            return Ok(None);
        }

        let logs: Vec<LogResponse> = self
            .node
            .request(
                "eth_getLogs",
                json!([{
                    "address": self.address,
                    "topics": [self.topic],
                    "fromBlock": abi::encode_quantity(next_block),
                    "toBlock": abi::encode_quantity(latest),
                }]),
            )
            .await?;

        let mut records = Vec::with_capacity(logs.len());
        for log in logs.into_iter().filter(|log| !log.removed) {
            match abi::decode_hex(&log.data)
                .and_then(|data| abi::decode_new_wave_log(&log.topics, &data))
            {
                Ok(record) => records.push(record),
                Err(err) => warn!("skipping undecodable NewWave log: {}", err),
            }
        }
        debug!("blocks {}..={} carried {} waves", next_block, latest, records.len());
        Ok(Some((records, latest)))
    }
}

struct RpcPendingTransaction {
    node: Arc<JsonRpcClient>,
    tx_hash: String,
    poll: PollSettings,
}

#[async_trait]
impl PendingTransaction for RpcPendingTransaction {
    fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    async fn await_confirmation(&self) -> ChainResult<Confirmation> {
        let mut failures = 0_u32;
        loop {
            match self
                .node
                .request::<Option<ReceiptResponse>>(
                    "eth_getTransactionReceipt",
                    json!([self.tx_hash]),
                )
                .await
            {
                Ok(Some(receipt)) => return self.settle(receipt),
                Ok(None) => failures = 0,
                Err(err) if is_transient(&err) => {
                    failures += 1;
                    warn!(
                        "receipt poll for {} failed ({}/{}): {}",
                        self.tx_hash, failures, self.poll.max_failures, err
                    );
                    if failures >= self.poll.max_failures {
                        return Err(err);
                    }
                }
                Err(err) => return Err(err),
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }
}

impl RpcPendingTransaction {
    fn settle(&self, receipt: ReceiptResponse) -> ChainResult<Confirmation> {
        let block_number = receipt
            .block_number
            .as_deref()
            .map(abi::parse_quantity)
            .transpose()?;

        match receipt.status.as_deref() {
            Some("0x0") => Err(ChainError::Reverted(format!(
                "transaction {} reverted",
                self.tx_hash
            ))),
            _ => Ok(Confirmation {
                tx_hash: self.tx_hash.clone(),
                block_number,
            }),
        }
    }
}
