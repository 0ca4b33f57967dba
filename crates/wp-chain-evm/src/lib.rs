//! Wave portal collaborators backed by Ethereum JSON-RPC.
//!
//! Reads, receipts and logs go to a node endpoint; account access and
//! signing go to a separate wallet endpoint speaking the EIP-1193 methods.

pub mod abi;
mod contract;
mod rpc;
mod wallet;

pub use contract::{PollSettings, RpcWaveContract};
pub use rpc::{JsonRpcClient, RpcErrorObject, classify_rpc_error};
pub use wallet::RpcWalletProvider;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xF0849c244CF1737c57A3155d7DfEc50F13398aF5";
pub const DEFAULT_NODE_URL: &str = "http://localhost:8545";

#[cfg(test)]
mod tests;
