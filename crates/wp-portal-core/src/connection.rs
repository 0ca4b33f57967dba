use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use wp_api_types::{AccountId, ConnectionNotice, ConnectionState};
use wp_chain_client::{ChainError, WalletProvider};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("no wallet provider available")]
    ProviderMissing,
    #[error("connection request rejected: {0}")]
    UserRejected(String),
    #[error("network error while connecting: {0}")]
    Network(String),
}

impl ConnectError {
    pub fn notice(&self) -> ConnectionNotice {
        match self {
            Self::ProviderMissing => ConnectionNotice::ProviderMissing,
            Self::UserRejected(_) => ConnectionNotice::UserRejected,
            Self::Network(_) => ConnectionNotice::NetworkError,
        }
    }
}

impl From<ChainError> for ConnectError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::ProviderMissing => Self::ProviderMissing,
            ChainError::UserRejected(detail) => Self::UserRejected(detail),
            other => Self::Network(other.to_string()),
        }
    }
}

#[derive(Default)]
struct ConnectionSlot {
    state: ConnectionState,
    notice: Option<ConnectionNotice>,
}

/// Tracks which wallet account, if any, the portal is acting for.
pub struct ConnectionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    slot: RwLock<ConnectionSlot>,
}

impl ConnectionManager {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            slot: RwLock::new(ConnectionSlot::default()),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    pub async fn state(&self) -> ConnectionState {
        self.slot.read().await.state.clone()
    }

    pub async fn notice(&self) -> Option<ConnectionNotice> {
        self.slot.read().await.notice
    }

    /// Adopts an already-authorized account without prompting. Anything but
    /// an authorized account leaves the manager `Disconnected`, including a
    /// previously connected one; failures are recorded as a notice.
    pub async fn check_existing_connection(&self) -> ConnectionState {
        let Some(provider) = &self.provider else {
            warn!("no wallet provider detected; install a wallet extension to connect");
            return self
                .record_disconnected(Some(ConnectionNotice::ProviderMissing))
                .await;
        };

        match provider.get_authorized_accounts().await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => self.record_connected(account).await,
                None => {
                    info!("no authorized account found");
                    self.record_disconnected(None).await
                }
            },
            Err(err) => {
                warn!("failed to read authorized accounts: {}", err);
                self.record_disconnected(Some(ConnectError::from(err).notice()))
                    .await
            }
        }
    }

    pub async fn request_connection(&self) -> Result<ConnectionState, ConnectError> {
        let Some(provider) = &self.provider else {
            warn!("connection requested without a wallet provider");
            self.record_notice(ConnectionNotice::ProviderMissing).await;
            return Err(ConnectError::ProviderMissing);
        };

        let result = provider
            .request_accounts()
            .await
            .map_err(ConnectError::from)
            .and_then(|accounts| {
                accounts.into_iter().next().ok_or_else(|| {
                    ConnectError::UserRejected("wallet returned no accounts".to_owned())
                })
            });

        match result {
            Ok(account) => Ok(self.record_connected(account).await),
            Err(err) => {
                warn!("wallet connection request failed: {}", err);
                self.record_notice(err.notice()).await;
                Err(err)
            }
        }
    }

    pub async fn disconnect(&self) -> ConnectionState {
        let mut slot = self.slot.write().await;
        if let ConnectionState::Connected { account } = &slot.state {
            info!("disconnecting wallet account {}", account);
        }
        slot.state = ConnectionState::Disconnected;
        slot.notice = None;
        slot.state.clone()
    }

    async fn record_connected(&self, account: AccountId) -> ConnectionState {
        info!("connected wallet account {}", account);
        let mut slot = self.slot.write().await;
        slot.state = ConnectionState::Connected { account };
        slot.notice = None;
        slot.state.clone()
    }

    async fn record_disconnected(&self, notice: Option<ConnectionNotice>) -> ConnectionState {
        let mut slot = self.slot.write().await;
        if let ConnectionState::Connected { account } = &slot.state {
            info!("wallet account {} is no longer authorized", account);
        }
        slot.state = ConnectionState::Disconnected;
        slot.notice = notice;
        slot.state.clone()
    }

    /// A failed prompt leaves any existing connection in place.
    async fn record_notice(&self, notice: ConnectionNotice) {
        self.slot.write().await.notice = Some(notice);
    }
}
