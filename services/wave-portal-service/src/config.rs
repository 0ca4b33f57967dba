use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use wp_chain_evm::{DEFAULT_CONTRACT_ADDRESS, DEFAULT_NODE_URL, PollSettings};
use wp_portal_core::DEFAULT_EXECUTION_LIMIT;

#[derive(Debug, Clone)]
pub(crate) struct ServiceConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) node_url: String,
    /// `None` means no wallet provider is available.
    pub(crate) wallet_url: Option<String>,
    pub(crate) contract_address: String,
    pub(crate) execution_limit: Option<u64>,
    pub(crate) poll: PollSettings,
}

impl ServiceConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = read("WAVE_PORTAL_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
            .parse()
            .context("WAVE_PORTAL_BIND_ADDR must be a socket address")?;

        let execution_limit = match read("WAVE_PORTAL_EXECUTION_LIMIT") {
            None => Some(DEFAULT_EXECUTION_LIMIT),
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => Some(
                value
                    .parse()
                    .context("WAVE_PORTAL_EXECUTION_LIMIT must be an integer or `none`")?,
            ),
        };

        let defaults = PollSettings::default();
        let interval = match read("WAVE_PORTAL_POLL_INTERVAL_MS") {
            Some(value) => Duration::from_millis(
                value
                    .parse()
                    .context("WAVE_PORTAL_POLL_INTERVAL_MS must be an integer")?,
            ),
            None => defaults.interval,
        };
        let max_failures = match read("WAVE_PORTAL_MAX_POLL_FAILURES") {
            Some(value) => value
                .parse()
                .context("WAVE_PORTAL_MAX_POLL_FAILURES must be an integer")?,
            None => defaults.max_failures,
        };

        Ok(Self {
            bind_addr,
            node_url: read("WAVE_PORTAL_NODE_URL").unwrap_or_else(|| DEFAULT_NODE_URL.to_owned()),
            wallet_url: read("WAVE_PORTAL_WALLET_URL"),
            contract_address: read("WAVE_PORTAL_CONTRACT_ADDRESS")
                .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_owned()),
            execution_limit,
            poll: PollSettings {
                interval,
                max_failures,
            },
        })
    }
}
