//! Wave portal engine: wallet connection, wave submission and the synced
//! wave log, projected into a render-ready view.

pub mod connection;
pub mod count;
pub mod submitter;
pub mod sync;
pub mod view;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use std::sync::Arc;
use tracing::{info, warn};
use wp_api_types::{ConnectionState, PortalView, TransactionState};
use wp_chain_client::{WalletProvider, WaveCallOptions, WaveContract};
use wp_wave_log::WaveLog;

pub use connection::{ConnectError, ConnectionManager};
pub use count::TotalCount;
pub use submitter::{SubmitRejected, TransactionSubmitter};
pub use sync::EventLogSynchronizer;

/// Execution limit the portal attaches to every wave unless configured otherwise.
pub const DEFAULT_EXECUTION_LIMIT: u64 = 300_000;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub execution_limit: Option<u64>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            execution_limit: Some(DEFAULT_EXECUTION_LIMIT),
        }
    }
}

pub struct WavePortal {
    connection: ConnectionManager,
    submitter: TransactionSubmitter,
    synchronizer: EventLogSynchronizer,
    total_count: Arc<TotalCount>,
}

impl WavePortal {
    /// `provider` is `None` when no wallet is available at all.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        contract: Arc<dyn WaveContract>,
        config: PortalConfig,
    ) -> Self {
        let total_count = Arc::new(TotalCount::default());
        let log = Arc::new(WaveLog::new());
        Self {
            connection: ConnectionManager::new(provider.clone()),
            submitter: TransactionSubmitter::new(
                provider,
                Arc::clone(&contract),
                Arc::clone(&total_count),
                WaveCallOptions {
                    execution_limit: config.execution_limit,
                },
            ),
            synchronizer: EventLogSynchronizer::new(contract, log),
            total_count,
        }
    }

    pub fn synchronizer(&self) -> &EventLogSynchronizer {
        &self.synchronizer
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.connection.state().await
    }

    pub async fn transaction_state(&self) -> TransactionState {
        self.submitter.state().await
    }

    pub fn total_count(&self) -> u64 {
        self.total_count.get()
    }

    /// Silent connection check. When it lands on `Connected` the live
    /// subscription is (re)established, history is fetched and the count is
    /// refreshed before this returns. Otherwise the session is closed as if
    /// the user had disconnected.
    pub async fn connect(&self) -> ConnectionState {
        let state = self.connection.check_existing_connection().await;
        if state.is_connected() {
            self.on_connected().await;
        } else {
            self.end_session().await;
        }
        state
    }

    /// Prompting connection. Same post-conditions as [`WavePortal::connect`]
    /// on success.
    pub async fn request_connect(&self) -> Result<ConnectionState, ConnectError> {
        let state = self.connection.request_connection().await?;
        self.on_connected().await;
        Ok(state)
    }

    pub async fn disconnect(&self) -> ConnectionState {
        self.end_session().await;
        self.connection.disconnect().await
    }

    pub async fn submit(&self, message: &str) -> Result<TransactionState, SubmitRejected> {
        let connection = self.connection.state().await;
        self.submitter.submit_wave(&connection, message).await
    }

    pub async fn view(&self) -> PortalView {
        let connection = self.connection.state().await;
        let notice = self.connection.notice().await;
        let transaction = self.submitter.state().await;
        view::project(
            &connection,
            notice,
            &transaction,
            self.total_count.get(),
            self.synchronizer.log().snapshot(),
        )
    }

    /// Releases the live handler. An in-flight confirmation wait is left to
    /// finish on its own.
    pub async fn teardown(&self) {
        info!("tearing down wave portal");
        self.synchronizer.unsubscribe().await;
    }

    async fn end_session(&self) {
        self.synchronizer.unsubscribe().await;
        self.total_count.reset();
    }

    async fn on_connected(&self) {
        if let Err(err) = self.synchronizer.subscribe().await {
            warn!("failed to subscribe to live waves: {}", err);
        }
        if let Err(err) = self.synchronizer.fetch_history().await {
            warn!("failed to fetch wave history: {}", err);
        }
        let count = self.submitter.refresh_count().await;
        info!("total wave count is {}", count);
    }
}
