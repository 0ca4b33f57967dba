//! In-memory collaborators for exercising the portal without a chain.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use wp_api_types::AccountId;
use wp_chain_client::{
    ChainError, ChainResult, Confirmation, PendingTransaction, RawTimestamp, RawWaveRecord,
    Subscription, SubscriptionEvent, SubscriptionHandle, TransactionRequest, WalletProvider,
    WaveCallOptions, WaveContract, WaveHandler,
};

pub const FAKE_CONTRACT_ADDRESS: &str = "0x00000000000000000000000000000000000000aa";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn accounts(raw: &[&str]) -> Vec<AccountId> {
    raw.iter().map(|account| AccountId((*account).to_owned())).collect()
}

pub fn raw_wave(from: &str, timestamp: u64, message: &str) -> RawWaveRecord {
    RawWaveRecord {
        from: AccountId(from.to_owned()),
        timestamp: RawTimestamp::from_u64(timestamp),
        message: message.to_owned(),
    }
}

#[derive(Default)]
struct WalletInner {
    authorized: Vec<AccountId>,
    granted: Vec<AccountId>,
    reject_requests: bool,
    fail_with: Option<ChainError>,
    request_calls: usize,
    sent: Vec<TransactionRequest>,
}

#[derive(Default)]
pub struct FakeWallet {
    inner: Mutex<WalletInner>,
}

impl FakeWallet {
    /// Accounts already authorized; `request_accounts` grants the same ones.
    pub fn with_authorized(authorized: &[&str]) -> Self {
        let wallet = Self::default();
        {
            let mut inner = lock(&wallet.inner);
            inner.authorized = accounts(authorized);
            inner.granted = accounts(authorized);
        }
        wallet
    }

    pub fn granting(self, granted: &[&str]) -> Self {
        lock(&self.inner).granted = accounts(granted);
        self
    }

    pub fn rejecting_requests(self) -> Self {
        lock(&self.inner).reject_requests = true;
        self
    }

    pub fn failing_with(self, err: ChainError) -> Self {
        lock(&self.inner).fail_with = Some(err);
        self
    }

    /// Changes the authorized accounts after construction, as a user
    /// revoking or granting access in the wallet would.
    pub fn set_authorized(&self, authorized: &[&str]) {
        lock(&self.inner).authorized = accounts(authorized);
    }

    pub fn fail_with(&self, err: ChainError) {
        lock(&self.inner).fail_with = Some(err);
    }

    pub fn request_calls(&self) -> usize {
        lock(&self.inner).request_calls
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        lock(&self.inner).sent.clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn get_authorized_accounts(&self) -> ChainResult<Vec<AccountId>> {
        let inner = lock(&self.inner);
        if let Some(err) = &inner.fail_with {
            return Err(err.clone());
        }
        Ok(inner.authorized.clone())
    }

    async fn request_accounts(&self) -> ChainResult<Vec<AccountId>> {
        let mut inner = lock(&self.inner);
        inner.request_calls += 1;
        if let Some(err) = &inner.fail_with {
            return Err(err.clone());
        }
        if inner.reject_requests {
            return Err(ChainError::UserRejected("user rejected the request".to_owned()));
        }
        Ok(inner.granted.clone())
    }

    async fn send_transaction(&self, request: TransactionRequest) -> ChainResult<String> {
        let mut inner = lock(&self.inner);
        if let Some(err) = &inner.fail_with {
            return Err(err.clone());
        }
        inner.sent.push(request);
        Ok(format!("0xtx{}", inner.sent.len()))
    }
}

/// Holds confirmations back until `open` is called.
pub struct ConfirmationGate(watch::Sender<bool>);

impl ConfirmationGate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Default)]
struct ContractInner {
    total_count: u64,
    history: Vec<RawWaveRecord>,
    history_error: Option<ChainError>,
    count_error: Option<ChainError>,
    submission_error: Option<ChainError>,
    confirmation_error: Option<ChainError>,
    subscribe_error: Option<ChainError>,
    submitted: Vec<String>,
    last_options: Option<WaveCallOptions>,
    count_reads: usize,
    history_reads: usize,
    subscribe_calls: usize,
    gate: Option<watch::Receiver<bool>>,
}

type Handlers = Arc<Mutex<HashMap<u64, WaveHandler>>>;

#[derive(Default)]
pub struct FakeContract {
    inner: Mutex<ContractInner>,
    handlers: Handlers,
    next_handler: AtomicU64,
}

impl FakeContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total_count(&self, count: u64) {
        lock(&self.inner).total_count = count;
    }

    pub fn set_history(&self, history: Vec<RawWaveRecord>) {
        lock(&self.inner).history = history;
    }

    pub fn fail_history_with(&self, err: ChainError) {
        lock(&self.inner).history_error = Some(err);
    }

    pub fn fail_count_reads_with(&self, err: ChainError) {
        lock(&self.inner).count_error = Some(err);
    }

    pub fn fail_submission_with(&self, err: ChainError) {
        lock(&self.inner).submission_error = Some(err);
    }

    pub fn fail_confirmation_with(&self, err: ChainError) {
        lock(&self.inner).confirmation_error = Some(err);
    }

    pub fn fail_subscribe_with(&self, err: ChainError) {
        lock(&self.inner).subscribe_error = Some(err);
    }

    pub fn hold_confirmations(&self) -> ConfirmationGate {
        let (sender, receiver) = watch::channel(false);
        lock(&self.inner).gate = Some(receiver);
        ConfirmationGate(sender)
    }

    pub fn submitted_messages(&self) -> Vec<String> {
        lock(&self.inner).submitted.clone()
    }

    pub fn last_options(&self) -> Option<WaveCallOptions> {
        lock(&self.inner).last_options.clone()
    }

    pub fn count_reads(&self) -> usize {
        lock(&self.inner).count_reads
    }

    pub fn history_reads(&self) -> usize {
        lock(&self.inner).history_reads
    }

    pub fn subscribe_calls(&self) -> usize {
        lock(&self.inner).subscribe_calls
    }

    pub fn active_handlers(&self) -> usize {
        lock(&self.handlers).len()
    }

    /// Delivers a `NewWave` notification to every registered handler.
    pub fn emit(&self, record: RawWaveRecord) {
        for handler in self.current_handlers() {
            handler(SubscriptionEvent::NewWave(record.clone()));
        }
    }

    /// Reports the feed as dropped and forgets every handler.
    pub fn lose_subscription(&self, reason: &str) {
        for handler in self.current_handlers() {
            handler(SubscriptionEvent::Lost {
                reason: reason.to_owned(),
            });
        }
        lock(&self.handlers).clear();
    }

    fn current_handlers(&self) -> Vec<WaveHandler> {
        lock(&self.handlers).values().cloned().collect()
    }
}

struct FakeSubscriptionHandle {
    id: u64,
    handlers: Handlers,
}

impl SubscriptionHandle for FakeSubscriptionHandle {
    fn cancel(&self) {
        lock(&self.handlers).remove(&self.id);
    }
}

struct FakePendingTransaction {
    tx_hash: String,
    outcome: Option<ChainError>,
    gate: Option<watch::Receiver<bool>>,
}

#[async_trait]
impl PendingTransaction for FakePendingTransaction {
    fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    async fn await_confirmation(&self) -> ChainResult<Confirmation> {
        if let Some(gate) = &self.gate {
            let mut gate = gate.clone();
            gate.wait_for(|open| *open)
                .await
                .map_err(|_| ChainError::Network("confirmation gate dropped".to_owned()))?;
        }
        match &self.outcome {
            Some(err) => Err(err.clone()),
            None => Ok(Confirmation {
                tx_hash: self.tx_hash.clone(),
                block_number: Some(1),
            }),
        }
    }
}

#[async_trait]
impl WaveContract for FakeContract {
    fn address(&self) -> &str {
        FAKE_CONTRACT_ADDRESS
    }

    async fn read_total_count(&self) -> ChainResult<u64> {
        let mut inner = lock(&self.inner);
        inner.count_reads += 1;
        match &inner.count_error {
            Some(err) => Err(err.clone()),
            None => Ok(inner.total_count),
        }
    }

    async fn read_all_events(&self) -> ChainResult<Vec<RawWaveRecord>> {
        let mut inner = lock(&self.inner);
        inner.history_reads += 1;
        match &inner.history_error {
            Some(err) => Err(err.clone()),
            None => Ok(inner.history.clone()),
        }
    }

    async fn submit_append(
        &self,
        wallet: &dyn WalletProvider,
        from: &AccountId,
        message: &str,
        options: &WaveCallOptions,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        let (outcome, gate) = {
            let mut inner = lock(&self.inner);
            inner.submitted.push(message.to_owned());
            inner.last_options = Some(options.clone());
            if let Some(err) = &inner.submission_error {
                return Err(err.clone());
            }
            (inner.confirmation_error.clone(), inner.gate.clone())
        };

        let tx_hash = wallet
            .send_transaction(TransactionRequest {
                from: from.clone(),
                to: FAKE_CONTRACT_ADDRESS.to_owned(),
                data: message.as_bytes().to_vec(),
                execution_limit: options.execution_limit,
            })
            .await?;

        Ok(Box::new(FakePendingTransaction {
            tx_hash,
            outcome,
            gate,
        }))
    }

    async fn subscribe(&self, _event_name: &str, handler: WaveHandler) -> ChainResult<Subscription> {
        {
            let mut inner = lock(&self.inner);
            inner.subscribe_calls += 1;
            if let Some(err) = &inner.subscribe_error {
                return Err(err.clone());
            }
        }
        let id = self.next_handler.fetch_add(1, Ordering::SeqCst);
        lock(&self.handlers).insert(id, handler);
        Ok(Subscription::new(Box::new(FakeSubscriptionHandle {
            id,
            handlers: Arc::clone(&self.handlers),
        })))
    }
}
