use serde::{Deserialize, Serialize};

pub const STATUS_WAVING: &str = "Waving...";
pub const STATUS_WAVED: &str = "Hi, You just waved at me. Thanks!";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the wave log. Two entries are the same wave when all three
/// fields match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WaveEvent {
    pub address: String,
    pub timestamp: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected { account: AccountId },
}

impl ConnectionState {
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            Self::Connected { account } => Some(account),
            Self::Disconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    UserRejected,
    Reverted,
    NetworkError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransactionState {
    #[default]
    Idle,
    Pending {
        submitted_at_epoch_ms: u64,
    },
    Confirmed {
        count: u64,
    },
    Failed {
        reason: FailureReason,
        detail: String,
    },
}

impl TransactionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Conditions raised while connecting that the view surfaces instead of
/// failing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionNotice {
    ProviderMissing,
    UserRejected,
    NetworkError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewConnection {
    Connected { account: String },
    ConnectInvitation { prompt: String },
}

/// Render payload handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortalView {
    pub connection: ViewConnection,
    pub status: String,
    pub total_count: u64,
    pub waves: Vec<WaveEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveSubmitRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveSubmitResponse {
    pub transaction: TransactionState,
    pub view: PortalView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub connection: ConnectionState,
    pub view: PortalView,
}
