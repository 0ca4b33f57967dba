use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use wp_api_types::WaveEvent;

/// Merges a historical snapshot with live entries into one sequence sorted by
/// timestamp with no structurally identical entries.
///
/// Equal timestamps keep their order of appearance, history first. Exact
/// identity is the only key available: two real waves from the same address
/// with the same message in the same second collapse into one.
pub fn reconcile(history: &[WaveEvent], live: &[WaveEvent]) -> Vec<WaveEvent> {
    let mut seen = HashSet::with_capacity(history.len() + live.len());
    let mut merged: Vec<WaveEvent> = history
        .iter()
        .chain(live)
        .filter(|event| seen.insert(*event))
        .cloned()
        .collect();
    merged.sort_by_key(|event| event.timestamp);
    merged
}

#[derive(Default)]
struct Entries {
    ordered: Vec<WaveEvent>,
    index: HashSet<WaveEvent>,
}

impl Entries {
    fn from_sorted(ordered: Vec<WaveEvent>) -> Self {
        let index = ordered.iter().cloned().collect();
        Self { ordered, index }
    }
}

/// In-memory wave log shared between the history fetch and the live
/// subscription handler.
#[derive(Default)]
pub struct WaveLog {
    entries: RwLock<Entries>,
}

impl WaveLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a historical snapshot. Entries already in the log are kept so
    /// live waves that landed while the snapshot was in flight survive.
    pub fn apply_history(&self, history: &[WaveEvent]) -> usize {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let merged = reconcile(history, &guard.ordered);
        *guard = Entries::from_sorted(merged);
        guard.ordered.len()
    }

    /// Returns `false` when an identical entry is already present.
    pub fn append_unique(&self, event: WaveEvent) -> bool {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if guard.index.contains(&event) {
            return false;
        }
        let position = guard
            .ordered
            .partition_point(|existing| existing.timestamp <= event.timestamp);
        guard.index.insert(event.clone());
        guard.ordered.insert(position, event);
        true
    }

    pub fn snapshot(&self) -> Vec<WaveEvent> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.ordered.clone()
    }

    pub fn len(&self) -> usize {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(address: &str, timestamp: u64, message: &str) -> WaveEvent {
        WaveEvent {
            address: address.to_owned(),
            timestamp,
            message: message.to_owned(),
        }
    }

    #[test]
    fn reconcile_collapses_overlap_between_history_and_live() {
        let history = vec![wave("0x1", 1000, "hi"), wave("0x2", 1001, "yo")];
        let live = vec![wave("0x2", 1001, "yo"), wave("0x3", 1002, "new")];

        let merged = reconcile(&history, &live);

        assert_eq!(
            merged,
            vec![wave("0x1", 1000, "hi"), wave("0x2", 1001, "yo"), wave("0x3", 1002, "new")]
        );
    }

    #[test]
    fn reconcile_sorts_by_timestamp_and_keeps_tie_order() {
        let history = vec![wave("0xb", 20, "second"), wave("0xa", 10, "first")];
        let live = vec![wave("0xc", 10, "tie-after"), wave("0xd", 5, "earliest")];

        let merged = reconcile(&history, &live);

        assert_eq!(
            merged,
            vec![
                wave("0xd", 5, "earliest"),
                wave("0xa", 10, "first"),
                wave("0xc", 10, "tie-after"),
                wave("0xb", 20, "second"),
            ]
        );
    }

    #[test]
    fn reconcile_is_idempotent() {
        let history = vec![wave("0x1", 3, "c"), wave("0x1", 1, "a"), wave("0x1", 1, "a")];
        let once = reconcile(&history, &[]);
        let twice = reconcile(&once, &once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn append_unique_rejects_identical_entry() {
        let log = WaveLog::new();
        log.apply_history(&[wave("0x1", 1000, "hi")]);

        assert!(!log.append_unique(wave("0x1", 1000, "hi")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn append_unique_inserts_after_equal_timestamps() {
        let log = WaveLog::new();
        assert!(log.append_unique(wave("0x1", 10, "a")));
        assert!(log.append_unique(wave("0x2", 30, "c")));
        assert!(log.append_unique(wave("0x3", 10, "b")));
        assert!(log.append_unique(wave("0x4", 1, "z")));

        let messages: Vec<_> = log.snapshot().into_iter().map(|w| w.message).collect();
        assert_eq!(messages, vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn history_and_live_commute() {
        let snapshot = vec![wave("0x1", 1, "a"), wave("0x2", 2, "b")];
        let pushed = wave("0x2", 2, "b");
        let late = wave("0x3", 3, "c");

        let live_first = WaveLog::new();
        live_first.append_unique(pushed.clone());
        live_first.append_unique(late.clone());
        live_first.apply_history(&snapshot);

        let history_first = WaveLog::new();
        history_first.apply_history(&snapshot);
        history_first.append_unique(pushed);
        history_first.append_unique(late);

        assert_eq!(live_first.snapshot(), history_first.snapshot());
        assert_eq!(live_first.len(), 3);
    }

    #[test]
    fn empty_log_reports_empty() {
        let log = WaveLog::new();
        assert!(log.is_empty());
        assert_eq!(log.apply_history(&[]), 0);
    }
}
