//! Simulated acquisition host
//!
//! Produces consecutive processing blocks of one stream and the local sync
//! pulses that fall inside each block.

use contracts::{LocalPulse, TickBlock};

/// Sample clock with an optional periodic sync line
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    sample_rate: f64,
    block_size: u64,
    sync_line: u8,
    /// Samples between sync pulses (None = no pulses)
    pulse_period: Option<u64>,
    next_sample: u64,
    next_pulse: u64,
    pulse_state: bool,
}

impl SimulatedHost {
    /// `pulse_interval_secs <= 0` disables local pulses
    pub fn new(sample_rate: f64, block_size: u64, sync_line: u8, pulse_interval_secs: f64) -> Self {
        let pulse_period = (pulse_interval_secs > 0.0)
            .then(|| (pulse_interval_secs * sample_rate).round() as u64)
            .filter(|&period| period > 0);

        Self {
            sample_rate,
            block_size,
            sync_line,
            pulse_period,
            next_sample: 0,
            next_pulse: pulse_period.unwrap_or(0),
            pulse_state: false,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Wall-clock length of one block
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate)
    }

    /// Advance by one block
    pub fn next_block(&mut self) -> (TickBlock, Vec<LocalPulse>) {
        let block = TickBlock {
            sample_rate: self.sample_rate,
            first_sample: self.next_sample,
            sample_count: self.block_size,
        };

        let mut pulses = Vec::new();
        if let Some(period) = self.pulse_period {
            while block.contains(self.next_pulse) {
                // Alternate edges like a square-wave sync output
                self.pulse_state = !self.pulse_state;
                pulses.push(LocalPulse {
                    line: self.sync_line,
                    state: self.pulse_state,
                    sample_number: self.next_pulse,
                });
                self.next_pulse += period;
            }
        }

        self.next_sample = block.end_sample();
        (block, pulses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_contiguous() {
        let mut host = SimulatedHost::new(30000.0, 1024, 0, 0.0);
        let (first, pulses) = host.next_block();
        let (second, _) = host.next_block();

        assert_eq!(first.first_sample, 0);
        assert_eq!(second.first_sample, 1024);
        assert!(pulses.is_empty());
    }

    #[test]
    fn test_pulses_land_in_their_block() {
        // One pulse every 1500 samples
        let mut host = SimulatedHost::new(30000.0, 1024, 2, 0.05);

        let (_, pulses) = host.next_block();
        assert!(pulses.is_empty());

        let (block, pulses) = host.next_block();
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].sample_number, 1500);
        assert_eq!(pulses[0].line, 2);
        assert!(pulses[0].state);
        assert!(block.contains(1500));

        let (_, pulses) = host.next_block();
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].sample_number, 3000);
        assert!(!pulses[0].state);
    }

    #[test]
    fn test_short_period_yields_several_pulses_per_block() {
        let mut host = SimulatedHost::new(1000.0, 100, 0, 0.02);
        let (_, pulses) = host.next_block();
        let samples: Vec<u64> = pulses.iter().map(|p| p.sample_number).collect();
        assert_eq!(samples, vec![20, 40, 60, 80]);
    }

    #[test]
    fn test_block_duration() {
        let host = SimulatedHost::new(1000.0, 250, 0, 0.0);
        assert_eq!(host.block_duration(), std::time::Duration::from_millis(250));
    }
}
