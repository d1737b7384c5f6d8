//! Correlates marker events into a 60 s chain, with a cross-check audit
//! counter fed by the tick detector's long-pulse flag.

use super::{ChainSnapshot, ChainTracker};
use crate::config::CorrelatorConfig;
use crate::event::{DetectorEvent, EventPayload};

pub struct MarkerCorrelator {
    chain: ChainTracker,
    /// Incremented whenever the tick detector reports a long pulse
    /// (ACTIVE >= 600 ms). Purely a cross-check; never drives a marker
    /// declaration on its own.
    marker_audit: u64,
}

impl MarkerCorrelator {
    pub fn new() -> Self {
        Self::with_config(CorrelatorConfig::marker())
    }

    pub fn with_config(cfg: CorrelatorConfig) -> Self {
        Self {
            chain: ChainTracker::new(cfg),
            marker_audit: 0,
        }
    }

    pub fn ingest(&mut self, event: &DetectorEvent) -> ChainSnapshot {
        debug_assert!(matches!(event.payload, EventPayload::Marker { .. }));
        self.chain.ingest(event.leading_ms)
    }

    /// Record a tick detector's long-pulse cross-check. Does not itself
    /// update the chain.
    pub fn audit_long_pulse(&mut self, event: &DetectorEvent) {
        if let EventPayload::Tick { long_pulse: true } = event.payload {
            self.marker_audit += 1;
        }
    }

    pub fn marker_audit_count(&self) -> u64 {
        self.marker_audit
    }

    pub fn reset(&mut self) {
        self.chain.reset();
    }

    pub fn chain_length(&self) -> usize {
        self.chain.chain_length()
    }
}

impl Default for MarkerCorrelator {
    fn default() -> Self {
        Self::new()
    }
}
