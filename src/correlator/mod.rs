//! Temporal correlators: chain detector events into regular trains and
//! estimate interval, standard deviation, and confidence.

pub mod bcd_correlator;
pub mod marker_correlator;
pub mod tick_correlator;

pub use bcd_correlator::BcdCorrelator;
pub use marker_correlator::MarkerCorrelator;
pub use tick_correlator::TickCorrelator;

use crate::config::CorrelatorConfig;
use std::collections::VecDeque;

/// A snapshot of chain state published after each update, suitable for
/// the `CORR` telemetry channel.
#[derive(Debug, Clone, Copy)]
pub struct ChainSnapshot {
    pub length: usize,
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub confidence: f64,
    pub last_leading_ms: f64,
    pub missed_predecessor: bool,
}

/// Generic chain tracker shared by the tick, marker, and BCD correlators.
/// Thresholds are runtime values rather than const generics since they
/// are tunable via the control plane between frames.
pub struct ChainTracker {
    cfg: CorrelatorConfig,
    intervals: VecDeque<f64>,
    last_leading_ms: Option<f64>,
    length: usize,
}

impl ChainTracker {
    pub fn new(cfg: CorrelatorConfig) -> Self {
        Self {
            intervals: VecDeque::with_capacity(cfg.chain_capacity),
            cfg,
            last_leading_ms: None,
            length: 0,
        }
    }

    pub fn set_config(&mut self, cfg: CorrelatorConfig) {
        self.cfg = cfg;
    }

    pub fn chain_length(&self) -> usize {
        self.length
    }

    /// Feed one new event's leading-edge timestamp. Returns the updated
    /// chain snapshot.
    pub fn ingest(&mut self, leading_ms: f64) -> ChainSnapshot {
        let expected = self.cfg.expected_interval_ms;
        let tolerance = self.cfg.tolerance_ms;

        let missed_predecessor = match self.last_leading_ms {
            None => {
                self.length = 1;
                false
            }
            Some(prev) => {
                let interval = leading_ms - prev;
                if (interval - expected).abs() <= tolerance {
                    self.push_interval(interval);
                    self.length += 1;
                    false
                } else if interval.abs() < 2.0 * expected {
                    self.push_interval(interval);
                    self.length += 1;
                    true
                } else {
                    self.intervals.clear();
                    self.length = 1;
                    false
                }
            }
        };

        self.last_leading_ms = Some(leading_ms);

        ChainSnapshot {
            length: self.length,
            mean_ms: self.mean(),
            stddev_ms: self.stddev(),
            confidence: self.confidence(),
            last_leading_ms: leading_ms,
            missed_predecessor,
        }
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
        self.last_leading_ms = None;
        self.length = 0;
    }

    fn push_interval(&mut self, interval: f64) {
        if self.intervals.len() == self.cfg.chain_capacity {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval);
    }

    fn mean(&self) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }
        self.intervals.iter().sum::<f64>() / self.intervals.len() as f64
    }

    fn stddev(&self) -> f64 {
        if self.intervals.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .intervals
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.intervals.len() as f64;
        var.sqrt()
    }

    /// `clamp(length / target_length, 0, 1) * exp(-sigma^2 / tolerance^2)`.
    fn confidence(&self) -> f64 {
        let length_term = (self.length as f64 / self.cfg.target_length as f64).clamp(0.0, 1.0);
        let sigma = self.stddev();
        let tol = self.cfg.tolerance_ms;
        let decay_term = (-(sigma * sigma) / (tol * tol)).exp();
        length_term * decay_term
    }
}
