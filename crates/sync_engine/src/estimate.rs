//! Two-slot working estimate and the completed mapping it produces.

/// Working estimate state
///
/// Each slot holds at most one value. The estimate completes as soon as both
/// sides have been observed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EstimateState {
    /// Nothing observed yet
    #[default]
    Empty,
    /// Local pulse seen, waiting for its soft twin
    HasLocal { sample_number: u64 },
    /// Soft sync message seen, waiting for the local pulse
    HasSoft { seconds: f64 },
}

/// A paired local/soft observation defining `soft seconds -> local sample`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedSync {
    /// Local sample number of the sync pulse
    pub local_sample_number: u64,
    /// Soft timestamp of the same pulse (seconds)
    pub soft_seconds: f64,
    /// Sample rate in effect when the pairing completed
    pub sample_rate: f64,
    /// Local sample number corresponding to soft time zero
    pub soft_sample_zero: i64,
}

impl CompletedSync {
    /// Build a mapping from one local and one soft observation
    ///
    /// `soft_sample_zero` saturates at the i64 bounds for absurd soft times.
    pub fn pair(local_sample_number: u64, soft_seconds: f64, sample_rate: f64) -> Self {
        let zero = local_sample_number as f64 - soft_seconds * sample_rate;
        Self {
            local_sample_number,
            soft_seconds,
            sample_rate,
            soft_sample_zero: zero.round() as i64,
        }
    }

    /// Map a soft timestamp to a local sample number
    ///
    /// Rounded once, relative to the sync point, so `soft_seconds` maps back
    /// to `local_sample_number` exactly. The rate is supplied by the caller so
    /// a block running at a different rate still lands on its own sample grid.
    /// Returns `None` if the result does not fit an i64.
    pub fn map(&self, seconds: f64, sample_rate: f64) -> Option<i64> {
        let offset = ((seconds - self.soft_seconds) * sample_rate).round();
        if !offset.is_finite() || offset.abs() >= I64_LIMIT {
            return None;
        }
        i64::try_from(self.local_sample_number)
            .ok()?
            .checked_add(offset as i64)
    }
}

/// 2^63, first f64 outside the i64 range
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Working sync estimate (two-slot latch)
#[derive(Debug, Clone, Default)]
pub struct SyncEstimate {
    state: EstimateState,
}

impl SyncEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> EstimateState {
        self.state
    }

    /// Record the local side of a sync pulse
    ///
    /// Returns the completed mapping if the soft side was already present.
    /// An earlier local value is replaced.
    pub fn record_local(&mut self, sample_number: u64, sample_rate: f64) -> Option<CompletedSync> {
        match self.state {
            EstimateState::HasSoft { seconds } => {
                self.state = EstimateState::Empty;
                Some(CompletedSync::pair(sample_number, seconds, sample_rate))
            }
            EstimateState::Empty | EstimateState::HasLocal { .. } => {
                self.state = EstimateState::HasLocal { sample_number };
                None
            }
        }
    }

    /// Record the soft side of a sync pulse
    ///
    /// Returns the completed mapping if the local side was already present.
    /// An earlier soft value is replaced.
    pub fn record_soft(&mut self, seconds: f64, sample_rate: f64) -> Option<CompletedSync> {
        match self.state {
            EstimateState::HasLocal { sample_number } => {
                self.state = EstimateState::Empty;
                Some(CompletedSync::pair(sample_number, seconds, sample_rate))
            }
            EstimateState::Empty | EstimateState::HasSoft { .. } => {
                self.state = EstimateState::HasSoft { seconds };
                None
            }
        }
    }
}
