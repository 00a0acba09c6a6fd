//! Sync line/state filter.

use contracts::{SessionSettings, SyncStateFilter};

/// Selects which TTL transitions count as sync pulses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncFilter {
    /// 0-based sync line
    pub line: u8,
    /// Accepted edge
    pub state: SyncStateFilter,
}

impl SyncFilter {
    pub fn new(line: u8, state: SyncStateFilter) -> Self {
        Self { line, state }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.sync_line, settings.sync_state)
    }

    /// Whether a transition on `line` to `state` is a sync pulse
    pub fn accepts(&self, line: u8, state: bool) -> bool {
        line == self.line && self.state.accepts(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_accepts_both_edges() {
        let filter = SyncFilter::new(2, SyncStateFilter::Any);
        assert!(filter.accepts(2, true));
        assert!(filter.accepts(2, false));
        assert!(!filter.accepts(3, true));
    }

    #[test]
    fn test_high_rejects_falling_edge() {
        let filter = SyncFilter::new(0, SyncStateFilter::High);
        assert!(filter.accepts(0, true));
        assert!(!filter.accepts(0, false));
    }

    #[test]
    fn test_low_rejects_rising_edge() {
        let filter = SyncFilter::new(0, SyncStateFilter::Low);
        assert!(!filter.accepts(0, true));
        assert!(filter.accepts(0, false));
    }

    #[test]
    fn test_from_settings() {
        let settings = SessionSettings {
            sync_line: 4,
            sync_state: SyncStateFilter::High,
            ..Default::default()
        };
        assert_eq!(
            SyncFilter::from_settings(&settings),
            SyncFilter::new(4, SyncStateFilter::High)
        );
    }
}
