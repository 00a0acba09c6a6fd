//! Append-only history of completed sync mappings.

use crate::CompletedSync;

/// Completed mappings in completion order
#[derive(Debug, Clone, Default)]
pub struct SyncHistory {
    entries: Vec<CompletedSync>,
}

impl SyncHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sync: CompletedSync) {
        self.entries.push(sync);
    }

    /// Most recent mapping whose soft sync time is not after `seconds`
    ///
    /// A message is only placed with a sync the client had already observed
    /// when it stamped the message.
    pub fn resolve(&self, seconds: f64) -> Option<&CompletedSync> {
        self.entries
            .iter()
            .rev()
            .find(|sync| sync.soft_seconds <= seconds)
    }

    pub fn latest(&self) -> Option<&CompletedSync> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletedSync> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(points: &[(u64, f64)]) -> SyncHistory {
        let mut history = SyncHistory::new();
        for &(local, soft) in points {
            history.push(CompletedSync::pair(local, soft, 1000.0));
        }
        history
    }

    #[test]
    fn test_empty_history_resolves_nothing() {
        let history = SyncHistory::new();
        assert!(history.resolve(10.0).is_none());
        assert!(history.latest().is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_picks_latest_applicable_entry() {
        let history = history_of(&[(100, 1.0), (900, 5.0)]);
        let sync = history.resolve(4.0).unwrap();
        assert_eq!(sync.soft_seconds, 1.0);

        let sync = history.resolve(5.0).unwrap();
        assert_eq!(sync.soft_seconds, 5.0);
    }

    #[test]
    fn test_message_before_first_sync() {
        let history = history_of(&[(100, 1.0)]);
        assert!(history.resolve(0.5).is_none());
    }

    #[test]
    fn test_latest_follows_completion_order() {
        let history = history_of(&[(100, 1.0), (900, 5.0), (1300, 3.0)]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest().unwrap().soft_seconds, 3.0);
        // Scan is in completion order, not soft-time order
        assert_eq!(history.resolve(6.0).unwrap().soft_seconds, 3.0);
    }
}
