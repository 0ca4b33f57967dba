use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use wp_api_types::AccountId;
use wp_chain_client::{ChainResult, TransactionRequest, WalletProvider};

use crate::abi::{encode_hex, encode_quantity};
use crate::rpc::JsonRpcClient;

#[derive(Debug, Serialize)]
struct SendTransactionParams {
    from: String,
    to: String,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<String>,
}

/// Wallet reached through an EIP-1193 style JSON-RPC endpoint.
pub struct RpcWalletProvider {
    rpc: Arc<JsonRpcClient>,
}

impl RpcWalletProvider {
    pub fn new(rpc: Arc<JsonRpcClient>) -> Self {
        Self { rpc }
    }

    async fn accounts(&self, method: &str) -> ChainResult<Vec<AccountId>> {
        let accounts: Vec<String> = self.rpc.request(method, json!([])).await?;
        Ok(accounts.into_iter().map(AccountId).collect())
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn get_authorized_accounts(&self) -> ChainResult<Vec<AccountId>> {
        self.accounts("eth_accounts").await
    }

    async fn request_accounts(&self) -> ChainResult<Vec<AccountId>> {
        self.accounts("eth_requestAccounts").await
    }

    async fn send_transaction(&self, request: TransactionRequest) -> ChainResult<String> {
        let params = SendTransactionParams {
            from: request.from.0,
            to: request.to,
            data: encode_hex(&request.data),
            gas: request.execution_limit.map(encode_quantity),
        };
        let tx_hash: String = self
            .rpc
            .request("eth_sendTransaction", json!([params]))
            .await?;
        info!("wallet broadcast transaction {}", tx_hash);
        Ok(tx_hash)
    }
}
