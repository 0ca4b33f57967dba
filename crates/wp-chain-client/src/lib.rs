use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use wp_api_types::{AccountId, FailureReason};

pub const NEW_WAVE_EVENT: &str = "NewWave";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("no wallet provider available")]
    ProviderMissing,
    #[error("request rejected by the user: {0}")]
    UserRejected(String),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("subscription lost: {0}")]
    SubscriptionLost(String),
}

impl ChainError {
    /// Reason recorded on a failed transaction.
    ///
    /// Only `UserRejected` and `Reverted` have a reason of their own. Every
    /// other kind, including `ProviderMissing` and `SubscriptionLost`, is
    /// reported as `NetworkError`; callers that need to tell those apart
    /// must match on the error itself.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::UserRejected(_) => FailureReason::UserRejected,
            Self::Reverted(_) => FailureReason::Reverted,
            Self::ProviderMissing
            | Self::Network(_)
            | Self::InvalidResponse(_)
            | Self::SubscriptionLost(_) => FailureReason::NetworkError,
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Uninterpreted 256-bit big-endian timestamp word as the contract reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTimestamp(pub [u8; 32]);

impl RawTimestamp {
    pub fn from_u64(seconds: u64) -> Self {
        let mut word = [0_u8; 32];
        word[24..].copy_from_slice(&seconds.to_be_bytes());
        Self(word)
    }

    /// `None` when the value does not fit in unix seconds.
    pub fn to_unix_seconds(&self) -> Option<u64> {
        if self.0[..24].iter().any(|byte| *byte != 0) {
            return None;
        }
        let mut tail = [0_u8; 8];
        tail.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(tail))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWaveRecord {
    pub from: AccountId,
    pub timestamp: RawTimestamp,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveCallOptions {
    pub execution_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: AccountId,
    pub to: String,
    pub data: Vec<u8>,
    pub execution_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorized for this origin; never prompts.
    async fn get_authorized_accounts(&self) -> ChainResult<Vec<AccountId>>;
    /// Prompts the user to authorize accounts.
    async fn request_accounts(&self) -> ChainResult<Vec<AccountId>>;
    /// Signs and broadcasts, returning the transaction hash.
    async fn send_transaction(&self, request: TransactionRequest) -> ChainResult<String>;
}

#[async_trait]
pub trait PendingTransaction: Send + Sync {
    fn tx_hash(&self) -> &str;
    async fn await_confirmation(&self) -> ChainResult<Confirmation>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    NewWave(RawWaveRecord),
    Lost { reason: String },
}

pub type WaveHandler = Arc<dyn Fn(SubscriptionEvent) + Send + Sync>;

pub trait SubscriptionHandle: Send + Sync {
    /// Stops delivery. Calling it more than once is harmless.
    fn cancel(&self);
}

/// Owns a registered handler and cancels it when dropped.
pub struct Subscription {
    handle: Box<dyn SubscriptionHandle>,
}

impl Subscription {
    pub fn new(handle: Box<dyn SubscriptionHandle>) -> Self {
        Self { handle }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[async_trait]
pub trait WaveContract: Send + Sync {
    fn address(&self) -> &str;
    async fn read_total_count(&self) -> ChainResult<u64>;
    async fn read_all_events(&self) -> ChainResult<Vec<RawWaveRecord>>;
    async fn submit_append(
        &self,
        wallet: &dyn WalletProvider,
        from: &AccountId,
        message: &str,
        options: &WaveCallOptions,
    ) -> ChainResult<Box<dyn PendingTransaction>>;
    async fn subscribe(&self, event_name: &str, handler: WaveHandler) -> ChainResult<Subscription>;
}
