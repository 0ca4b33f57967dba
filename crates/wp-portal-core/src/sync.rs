use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wp_api_types::WaveEvent;
use wp_chain_client::{
    ChainResult, NEW_WAVE_EVENT, RawWaveRecord, Subscription, SubscriptionEvent, WaveContract,
    WaveHandler,
};
use wp_wave_log::WaveLog;

/// Converts a contract record, skipping timestamps outside unix seconds.
pub fn wave_from_record(record: RawWaveRecord) -> Option<WaveEvent> {
    let Some(timestamp) = record.timestamp.to_unix_seconds() else {
        warn!(
            "skipping wave from {} with out-of-range timestamp",
            record.from
        );
        return None;
    };
    Some(WaveEvent {
        address: record.from.0,
        timestamp,
        message: record.message,
    })
}

/// Keeps the local wave log in step with the contract from both the bulk
/// history read and the live `NewWave` feed.
pub struct EventLogSynchronizer {
    contract: Arc<dyn WaveContract>,
    log: Arc<WaveLog>,
    subscription: Mutex<Option<Subscription>>,
    live: Arc<AtomicBool>,
}

impl EventLogSynchronizer {
    pub fn new(contract: Arc<dyn WaveContract>, log: Arc<WaveLog>) -> Self {
        Self {
            contract,
            log,
            subscription: Mutex::new(None),
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn log(&self) -> &Arc<WaveLog> {
        &self.log
    }

    /// `false` once the feed reports itself lost, even before `unsubscribe`.
    pub fn is_subscribed(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub async fn fetch_history(&self) -> ChainResult<Vec<WaveEvent>> {
        let records = self.contract.read_all_events().await?;
        let history: Vec<WaveEvent> = records.into_iter().filter_map(wave_from_record).collect();
        let history = wp_wave_log::reconcile(&history, &[]);
        let total = self.log.apply_history(&history);
        info!(
            "loaded {} waves from history; log now holds {}",
            history.len(),
            total
        );
        Ok(history)
    }

    /// Registers the live handler, replacing any previous one.
    pub async fn subscribe(&self) -> ChainResult<()> {
        let mut slot = self.subscription.lock().await;
        if let Some(previous) = slot.take() {
            debug!("replacing existing wave subscription");
            previous.cancel();
        }
        self.live.store(false, Ordering::SeqCst);

        let log = Arc::clone(&self.log);
        let live = Arc::clone(&self.live);
        let handler: WaveHandler = Arc::new(move |event: SubscriptionEvent| match event {
            SubscriptionEvent::NewWave(record) => {
                if let Some(wave) = wave_from_record(record) {
                    if !log.append_unique(wave) {
                        debug!("live wave already in log");
                    }
                }
            }
            SubscriptionEvent::Lost { reason } => {
                live.store(false, Ordering::SeqCst);
                warn!("wave subscription lost: {}; will resubscribe on next connect", reason);
            }
        });

        let subscription = self.contract.subscribe(NEW_WAVE_EVENT, handler).await?;
        *slot = Some(subscription);
        self.live.store(true, Ordering::SeqCst);
        info!("subscribed to {} events on {}", NEW_WAVE_EVENT, self.contract.address());
        Ok(())
    }

    /// Drops the live handler. Does nothing when none is registered.
    pub async fn unsubscribe(&self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.cancel();
            info!("unsubscribed from {} events", NEW_WAVE_EVENT);
        }
    }
}
