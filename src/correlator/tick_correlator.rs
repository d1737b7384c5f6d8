//! Correlates tick events into a 1000 ms chain.

use super::{ChainSnapshot, ChainTracker};
use crate::config::CorrelatorConfig;
use crate::event::{DetectorEvent, EventPayload};

/// CHAIN-quality threshold per the data model: confidence >= 0.8 with
/// chain length >= 5.
pub const CHAIN_QUALITY_CONFIDENCE: f64 = 0.8;
pub const CHAIN_QUALITY_MIN_LENGTH: usize = 5;

pub struct TickCorrelator {
    chain: ChainTracker,
    /// Count of rejected (out-of-band, not just missed-predecessor)
    /// intervals, surfaced as the transient counter.
    transient_count: u64,
}

impl TickCorrelator {
    pub fn new() -> Self {
        Self::with_config(CorrelatorConfig::tick())
    }

    pub fn with_config(cfg: CorrelatorConfig) -> Self {
        Self {
            chain: ChainTracker::new(cfg),
            transient_count: 0,
        }
    }

    /// Feed a confirmed tick event. Events of other payload kinds are
    /// ignored defensively but should never be routed here.
    pub fn ingest(&mut self, event: &DetectorEvent) -> ChainSnapshot {
        debug_assert!(matches!(event.payload, EventPayload::Tick { .. }));
        let before_len = self.chain.chain_length();
        let snapshot = self.chain.ingest(event.leading_ms);
        if snapshot.length == 1 && before_len > 1 {
            // chain was reset: the previous train's run is over.
            self.transient_count += 1;
        }
        snapshot
    }

    pub fn reset(&mut self) {
        self.chain.reset();
    }

    pub fn chain_length(&self) -> usize {
        self.chain.chain_length()
    }

    pub fn transient_count(&self) -> u64 {
        self.transient_count
    }

    pub fn is_chain_quality(&self, snapshot: &ChainSnapshot) -> bool {
        snapshot.confidence >= CHAIN_QUALITY_CONFIDENCE && snapshot.length >= CHAIN_QUALITY_MIN_LENGTH
    }
}

impl Default for TickCorrelator {
    fn default() -> Self {
        Self::new()
    }
}
