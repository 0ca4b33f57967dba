use wp_api_types::{
    ConnectionNotice, ConnectionState, FailureReason, PortalView, STATUS_WAVED, STATUS_WAVING,
    TransactionState, ViewConnection, WaveEvent,
};

pub const PROMPT_CONNECT: &str = "Connect your Ethereum wallet and wave at me!";
pub const PROMPT_INSTALL_WALLET: &str = "Get MetaMask! A wallet extension is required to wave.";

fn failure_message(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::UserRejected => "You cancelled the wave in your wallet.",
        FailureReason::Reverted => "The contract rejected your wave.",
        FailureReason::NetworkError => "Network error while waving. Please try again.",
    }
}

fn notice_message(notice: ConnectionNotice) -> &'static str {
    match notice {
        ConnectionNotice::ProviderMissing => "",
        ConnectionNotice::UserRejected => "Wallet connection was declined.",
        ConnectionNotice::NetworkError => "Could not reach your wallet. Please try again.",
    }
}

pub fn status_line(transaction: &TransactionState, notice: Option<ConnectionNotice>) -> String {
    let status = match transaction {
        TransactionState::Pending { .. } => STATUS_WAVING,
        TransactionState::Confirmed { .. } => STATUS_WAVED,
        TransactionState::Failed { reason, .. } => failure_message(*reason),
        TransactionState::Idle => notice.map(notice_message).unwrap_or_default(),
    };
    status.to_owned()
}

/// Derives the render payload. `waves` must already be in display order.
pub fn project(
    connection: &ConnectionState,
    notice: Option<ConnectionNotice>,
    transaction: &TransactionState,
    total_count: u64,
    waves: Vec<WaveEvent>,
) -> PortalView {
    let connection = match connection {
        ConnectionState::Connected { account } => ViewConnection::Connected {
            account: account.0.clone(),
        },
        ConnectionState::Disconnected => {
            let prompt = if notice == Some(ConnectionNotice::ProviderMissing) {
                PROMPT_INSTALL_WALLET
            } else {
                PROMPT_CONNECT
            };
            ViewConnection::ConnectInvitation {
                prompt: prompt.to_owned(),
            }
        }
    };

    PortalView {
        connection,
        status: status_line(transaction, notice),
        total_count,
        waves,
    }
}
