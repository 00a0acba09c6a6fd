//! Main sync engine implementation.

use contracts::{LocalPulse, SoftEvent};
use tracing::instrument;

use crate::{CompletedSync, EstimateState, SyncError, SyncEstimate, SyncFilter, SyncHistory};

/// Clock alignment engine
///
/// Owns the working estimate and the history, so every mutation goes through
/// `&mut self` on the dispatching thread.
#[derive(Debug)]
pub struct SyncEngine {
    /// Sync line/state selection
    filter: SyncFilter,
    /// Pairing in progress
    estimate: SyncEstimate,
    /// Completed pairings
    history: SyncHistory,
    /// Local pulses rejected by the filter
    ignored_pulses: u64,
}

impl SyncEngine {
    pub fn new(filter: SyncFilter) -> Self {
        Self {
            filter,
            estimate: SyncEstimate::new(),
            history: SyncHistory::new(),
            ignored_pulses: 0,
        }
    }

    /// Deliver a detected local pulse
    ///
    /// Pulses on other lines or with a rejected edge are ignored.
    #[instrument(
        level = "trace",
        name = "sync_engine_local_pulse",
        skip(self, pulse),
        fields(line = pulse.line, state = pulse.state, sample = pulse.sample_number)
    )]
    pub fn on_local_pulse(&mut self, pulse: &LocalPulse, sample_rate: f64) -> Option<CompletedSync> {
        if !self.filter.accepts(pulse.line, pulse.state) {
            self.ignored_pulses += 1;
            return None;
        }

        metrics::counter!("sync_observations_total", "side" => "local").increment(1);
        let completed = self.estimate.record_local(pulse.sample_number, sample_rate);
        self.commit(completed)
    }

    /// Whether a soft event is the client-side twin of a sync pulse
    pub fn is_sync_twin(&self, event: &SoftEvent) -> bool {
        event
            .ttl_line()
            .is_some_and(|(line, state)| self.filter.accepts(line, state))
    }

    /// Deliver the soft timestamp of a sync pulse
    #[instrument(level = "trace", name = "sync_engine_soft_sync", skip(self))]
    pub fn on_soft_sync(&mut self, seconds: f64, sample_rate: f64) -> Option<CompletedSync> {
        metrics::counter!("sync_observations_total", "side" => "soft").increment(1);
        let completed = self.estimate.record_soft(seconds, sample_rate);
        self.commit(completed)
    }

    /// Local sample number for a soft timestamp
    ///
    /// # Errors
    /// `Unsynchronized` when no completed sync precedes `seconds`,
    /// `OutOfRange` when the mapped sample number does not fit an i64.
    pub fn resolve(&self, seconds: f64, sample_rate: f64) -> Result<i64, SyncError> {
        let sync = self
            .history
            .resolve(seconds)
            .ok_or(SyncError::Unsynchronized {
                client_seconds: seconds,
            })?;
        sync.map(seconds, sample_rate)
            .ok_or(SyncError::OutOfRange {
                client_seconds: seconds,
            })
    }

    pub fn working_state(&self) -> EstimateState {
        self.estimate.state()
    }

    pub fn history(&self) -> &SyncHistory {
        &self.history
    }

    /// Local pulses the filter rejected so far
    pub fn ignored_pulses(&self) -> u64 {
        self.ignored_pulses
    }

    fn commit(&mut self, completed: Option<CompletedSync>) -> Option<CompletedSync> {
        let sync = completed?;
        self.history.push(sync);

        tracing::info!(
            local_sample = sync.local_sample_number,
            soft_seconds = sync.soft_seconds,
            soft_sample_zero = sync.soft_sample_zero,
            history_len = self.history.len(),
            "Sync estimate completed"
        );
        metrics::counter!("sync_completed_total").increment(1);
        metrics::gauge!("sync_soft_sample_zero").set(sync.soft_sample_zero as f64);

        Some(sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SyncStateFilter;

    const RATE: f64 = 30000.0;

    fn engine() -> SyncEngine {
        SyncEngine::new(SyncFilter::new(0, SyncStateFilter::Any))
    }

    fn pulse(line: u8, state: bool, sample_number: u64) -> LocalPulse {
        LocalPulse {
            line,
            state,
            sample_number,
        }
    }

    #[test]
    fn test_local_then_soft() {
        let mut engine = engine();
        assert!(engine.on_local_pulse(&pulse(0, true, 3000), RATE).is_none());
        assert_eq!(
            engine.working_state(),
            EstimateState::HasLocal { sample_number: 3000 }
        );

        let sync = engine.on_soft_sync(0.2, RATE).unwrap();
        assert_eq!(sync.soft_sample_zero, -3000);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.working_state(), EstimateState::Empty);
        assert_eq!(engine.resolve(0.3, RATE), Ok(6000));
    }

    #[test]
    fn test_soft_then_local() {
        let mut engine = engine();
        assert!(engine.on_soft_sync(0.2, RATE).is_none());
        let sync = engine.on_local_pulse(&pulse(0, true, 3000), RATE).unwrap();
        assert_eq!(sync.soft_sample_zero, -3000);
    }

    #[test]
    fn test_pulse_on_other_line_ignored() {
        let mut engine = engine();
        assert!(engine.on_local_pulse(&pulse(1, true, 3000), RATE).is_none());
        assert_eq!(engine.working_state(), EstimateState::Empty);
        assert_eq!(engine.ignored_pulses(), 1);
    }

    #[test]
    fn test_pulse_with_rejected_edge_ignored() {
        let mut engine = SyncEngine::new(SyncFilter::new(0, SyncStateFilter::High));
        assert!(engine.on_local_pulse(&pulse(0, false, 3000), RATE).is_none());
        assert_eq!(engine.working_state(), EstimateState::Empty);
    }

    #[test]
    fn test_is_sync_twin() {
        let engine = SyncEngine::new(SyncFilter::new(2, SyncStateFilter::High));
        assert!(engine.is_sync_twin(&SoftEvent::ttl(0.1, 2, true)));
        assert!(!engine.is_sync_twin(&SoftEvent::ttl(0.1, 2, false)));
        assert!(!engine.is_sync_twin(&SoftEvent::ttl(0.1, 5, true)));
        assert!(!engine.is_sync_twin(&SoftEvent::text(0.1, "sync")));
    }

    #[test]
    fn test_resolve_without_history() {
        let engine = engine();
        assert_eq!(
            engine.resolve(1.0, RATE),
            Err(SyncError::Unsynchronized {
                client_seconds: 1.0
            })
        );
    }

    #[test]
    fn test_resolve_uses_sync_observed_by_client() {
        let mut engine = engine();
        engine.on_local_pulse(&pulse(0, true, 30000), RATE);
        engine.on_soft_sync(1.0, RATE);
        engine.on_local_pulse(&pulse(0, true, 150300), RATE);
        engine.on_soft_sync(5.0, RATE);

        // Drifted by 300 samples at the second sync
        assert_eq!(engine.resolve(4.0, RATE), Ok(120000));
        assert_eq!(engine.resolve(6.0, RATE), Ok(180300));
    }

    #[test]
    fn test_absurd_sync_time_does_not_overflow() {
        let mut engine = engine();
        engine.on_local_pulse(&pulse(0, true, 3000), RATE);
        let sync = engine.on_soft_sync(-1e300, RATE).unwrap();
        assert_eq!(sync.soft_sample_zero, i64::MAX);

        assert_eq!(
            engine.resolve(1.0, RATE),
            Err(SyncError::OutOfRange {
                client_seconds: 1.0
            })
        );
    }
}
