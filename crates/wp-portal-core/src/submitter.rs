use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use wp_api_types::{ConnectionState, TransactionState};
use wp_chain_client::{ChainError, WalletProvider, WaveCallOptions, WaveContract};

use crate::count::TotalCount;

/// Reasons a wave is refused before anything is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("wallet is not connected")]
    NotConnected,
    #[error("a wave is already pending")]
    AlreadyPending,
    #[error("no wallet provider available")]
    ProviderMissing,
}

pub struct TransactionSubmitter {
    provider: Option<Arc<dyn WalletProvider>>,
    contract: Arc<dyn WaveContract>,
    total_count: Arc<TotalCount>,
    options: WaveCallOptions,
    state: Mutex<TransactionState>,
}

impl TransactionSubmitter {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        contract: Arc<dyn WaveContract>,
        total_count: Arc<TotalCount>,
        options: WaveCallOptions,
    ) -> Self {
        Self {
            provider,
            contract,
            total_count,
            options,
            state: Mutex::new(TransactionState::Idle),
        }
    }

    pub async fn state(&self) -> TransactionState {
        self.state.lock().await.clone()
    }

    /// Sends one wave and waits for it to settle.
    ///
    /// Collaborator failures end in `Failed`; only precondition violations
    /// return `Err`, and those never reach the network. When the count's
    /// session ends while waiting (the wallet disconnected), the outcome is
    /// returned but not published: the count is left alone and the state goes
    /// back to `Idle`.
    pub async fn submit_wave(
        &self,
        connection: &ConnectionState,
        message: &str,
    ) -> Result<TransactionState, SubmitRejected> {
        let Some(account) = connection.account() else {
            return Err(SubmitRejected::NotConnected);
        };
        let Some(provider) = &self.provider else {
            return Err(SubmitRejected::ProviderMissing);
        };

        let session = {
            let mut state = self.state.lock().await;
            if state.is_pending() {
                warn!("wave rejected: another wave is still pending");
                return Err(SubmitRejected::AlreadyPending);
            }
            *state = TransactionState::Pending {
                submitted_at_epoch_ms: epoch_ms(),
            };
            self.total_count.session()
        };

        info!("submitting wave from {}", account);
        let outcome = match self
            .contract
            .submit_append(provider.as_ref(), account, message, &self.options)
            .await
        {
            Ok(pending) => {
                info!("wave broadcast as {}; waiting for confirmation", pending.tx_hash());
                pending.await_confirmation().await
            }
            Err(err) => Err(err),
        };

        let next = match outcome {
            Ok(confirmation) => {
                info!("wave {} confirmed", confirmation.tx_hash);
                let count = self.refresh_count_for(session).await;
                TransactionState::Confirmed {
                    count: count.unwrap_or_else(|| self.total_count.get()),
                }
            }
            Err(err) => {
                warn!("wave failed: {}", err);
                failed(&err)
            }
        };

        let mut state = self.state.lock().await;
        if self.total_count.session() == session {
            *state = next.clone();
        } else {
            info!("wave settled after the wallet disconnected; not publishing it");
            *state = TransactionState::Idle;
        }
        Ok(next)
    }

    /// Reads the contract count, keeping the last known value on failure.
    pub async fn refresh_count(&self) -> u64 {
        let session = self.total_count.session();
        self.refresh_count_for(session)
            .await
            .unwrap_or_else(|| self.total_count.get())
    }

    /// `None` when `session` ended before the read came back.
    async fn refresh_count_for(&self, session: u64) -> Option<u64> {
        match self.contract.read_total_count().await {
            Ok(count) => self.total_count.observe(session, count),
            Err(err) => {
                warn!("failed to refresh total wave count: {}", err);
                (self.total_count.session() == session).then(|| self.total_count.get())
            }
        }
    }
}

fn failed(err: &ChainError) -> TransactionState {
    TransactionState::Failed {
        reason: err.failure_reason(),
        detail: err.to_string(),
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
