//! Sync state machine and the Epoch/Gate it publishes.
//!
//! The Epoch is the only cross-component shared mutable state in the
//! core. It is written solely by [`SyncStateMachine`] and read by any
//! detector that chooses to gate its output; readers may observe an
//! in-flight update on either side of a change, so the cell pairs a
//! lock-free source tag (read every frame without blocking) with a short
//! mutex-guarded critical section around the full two-field snapshot.

use crate::config::GateConfig;
use crate::event::DetectorEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Where the current epoch estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochSource {
    None,
    Marker,
    Chain,
}

impl EpochSource {
    fn as_u8(self) -> u8 {
        match self {
            EpochSource::None => 0,
            EpochSource::Marker => 1,
            EpochSource::Chain => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => EpochSource::Marker,
            2 => EpochSource::Chain,
            _ => EpochSource::None,
        }
    }
}

/// The inferred stream-time of a WWV second boundary.
#[derive(Debug, Clone, Copy)]
pub struct Epoch {
    pub t0_ms: f64,
    pub source: EpochSource,
    pub confidence: f64,
}

impl Epoch {
    pub fn none() -> Self {
        Self {
            t0_ms: 0.0,
            source: EpochSource::None,
            confidence: 0.0,
        }
    }
}

/// Shared, single-producer/multi-consumer epoch cell.
pub struct EpochCell {
    source_tag: AtomicU8,
    inner: Mutex<Epoch>,
}

impl EpochCell {
    pub fn new() -> Self {
        Self {
            source_tag: AtomicU8::new(EpochSource::None.as_u8()),
            inner: Mutex::new(Epoch::none()),
        }
    }

    /// Lock-free fast path: which source currently backs the epoch,
    /// without taking the snapshot lock.
    pub fn source_hint(&self) -> EpochSource {
        EpochSource::from_u8(self.source_tag.load(Ordering::Relaxed))
    }

    /// Full (t0_ms, source, confidence) snapshot.
    pub fn snapshot(&self) -> Epoch {
        *self.inner.lock().expect("epoch mutex poisoned")
    }

    fn publish(&self, epoch: Epoch) {
        self.source_tag.store(epoch.source.as_u8(), Ordering::Relaxed);
        *self.inner.lock().expect("epoch mutex poisoned") = epoch;
    }
}

impl Default for EpochCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure gate predicate: does `event_leading_ms` fall within the
/// configured acceptance window around the nearest inferred second
/// boundary?
pub fn gate_accept(event_leading_ms: f64, epoch: &Epoch, window: GateConfig) -> bool {
    if epoch.source == EpochSource::None {
        return true;
    }
    let offset = (event_leading_ms - epoch.t0_ms).rem_euclid(1000.0);
    offset >= window.open_ms && offset <= window.close_ms
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Searching,
    Acquiring,
    Locked,
}

/// Emitted on every state transition.
#[derive(Debug, Clone, Copy)]
pub struct SyncEvent {
    pub state: SyncState,
    pub interval_s: f64,
    pub delta_ms: f64,
    pub last_tick_dur_ms: f64,
    pub last_marker_dur_ms: f64,
}

const FAST_SLOW_DISAGREEMENT_WARN_MS: f64 = 50.0;

/// Number of recent chain-quality tick leading edges kept for the CHAIN
/// epoch's least-squares fit to the 1000 ms grid.
const CHAIN_FIT_WINDOW: usize = 20;

pub struct SyncStateMachine {
    state: SyncState,
    epoch: EpochCell,
    confirmed_markers: u32,
    last_marker_leading_ms: Option<f64>,
    last_marker_interval_s: f64,
    last_marker_delta_ms: f64,
    last_tick_dur_ms: f64,
    last_marker_dur_ms: f64,
    consecutive_missed_ticks: u32,
    consecutive_rejected_ticks: u32,
    silence_ms: f64,
    last_disagreement_ms: Option<f64>,
    /// Raw leading edges backing the CHAIN epoch fit, oldest first.
    chain_fit_edges: VecDeque<f64>,
}

impl SyncStateMachine {
    pub fn new() -> Self {
        Self {
            state: SyncState::Searching,
            epoch: EpochCell::new(),
            confirmed_markers: 0,
            last_marker_leading_ms: None,
            last_marker_interval_s: 0.0,
            last_marker_delta_ms: 0.0,
            last_tick_dur_ms: 0.0,
            last_marker_dur_ms: 0.0,
            consecutive_missed_ticks: 0,
            consecutive_rejected_ticks: 0,
            silence_ms: 0.0,
            last_disagreement_ms: None,
            chain_fit_edges: VecDeque::with_capacity(CHAIN_FIT_WINDOW),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch.snapshot()
    }

    pub fn epoch_cell(&self) -> &EpochCell {
        &self.epoch
    }

    /// A tick correlator update. `chain_len`/`chain_stddev_ms` drive the
    /// CHAIN-source epoch promotion once the chain is long and tight
    /// enough.
    pub fn on_tick_chain_update(
        &mut self,
        tick_event: &DetectorEvent,
        chain_len: usize,
        chain_stddev_ms: f64,
    ) -> Option<SyncEvent> {
        self.silence_ms = 0.0;
        self.consecutive_missed_ticks = 0;
        self.consecutive_rejected_ticks = 0;
        self.last_tick_dur_ms = tick_event.duration_ms;

        let mut transitioned = None;

        if self.state == SyncState::Searching && chain_len >= 3 {
            self.state = SyncState::Acquiring;
            transitioned = Some(self.emit());
        }

        if chain_len >= 5 && chain_stddev_ms < 10.0 {
            let current = self.epoch.snapshot();
            if current.source != EpochSource::Chain || tick_event.leading_ms > current.t0_ms {
                if self.chain_fit_edges.len() == CHAIN_FIT_WINDOW {
                    self.chain_fit_edges.pop_front();
                }
                self.chain_fit_edges.push_back(tick_event.leading_ms);

                let fitted_t0_ms = self.fit_chain_epoch_ms();
                self.last_disagreement_ms = self.check_disagreement(fitted_t0_ms);
                self.epoch.publish(Epoch {
                    t0_ms: fitted_t0_ms,
                    source: EpochSource::Chain,
                    confidence: 0.95,
                });
            }
        }

        transitioned
    }

    /// Least-squares fit of the recent CHAIN leading edges to the nominal
    /// 1000 ms grid, predicted at the most recent edge. Smooths per-tick
    /// jitter that a raw newest-edge assignment would carry straight into
    /// the published epoch.
    fn fit_chain_epoch_ms(&self) -> f64 {
        let edges = &self.chain_fit_edges;
        let last = *edges.back().expect("called only after a push");
        if edges.len() < 2 {
            return last;
        }

        let t0 = edges[0];
        let n = edges.len() as f64;
        let (mut sum_k, mut sum_t, mut sum_kk, mut sum_kt) = (0.0, 0.0, 0.0, 0.0);
        for &t in edges.iter() {
            let k = ((t - t0) / 1000.0).round();
            sum_k += k;
            sum_t += t;
            sum_kk += k * k;
            sum_kt += k * t;
        }

        let denom = n * sum_kk - sum_k * sum_k;
        if denom.abs() < 1e-9 {
            return last;
        }
        let slope = (n * sum_kt - sum_k * sum_t) / denom;
        let intercept = (sum_t - slope * sum_k) / n;
        let k_last = ((last - t0) / 1000.0).round();
        intercept + slope * k_last
    }

    /// Offset (ms) between the CHAIN and MARKER epoch estimates observed
    /// on the most recent chain-quality update, if the disagreement
    /// exceeded the warn threshold. `None` once consumed or if no
    /// MARKER epoch was active to compare against.
    pub fn take_disagreement_ms(&mut self) -> Option<f64> {
        self.last_disagreement_ms.take()
    }

    /// A marker correlator update.
    pub fn on_marker(
        &mut self,
        marker_event: &DetectorEvent,
        chain_confidence: f64,
    ) -> Option<SyncEvent> {
        self.silence_ms = 0.0;
        self.last_marker_dur_ms = marker_event.duration_ms;
        self.confirmed_markers += 1;

        if let Some(prev) = self.last_marker_leading_ms {
            let interval_s = (marker_event.leading_ms - prev) / 1000.0;
            self.last_marker_interval_s = interval_s;
            self.last_marker_delta_ms = (interval_s * 1000.0 - 60_000.0).abs();
        }
        self.last_marker_leading_ms = Some(marker_event.leading_ms);

        let mut transitioned = None;

        // MARKER may only establish/upgrade the epoch while no CHAIN
        // source is active; CHAIN is never overwritten by a MARKER.
        let current = self.epoch.snapshot();
        if current.source != EpochSource::Chain {
            self.epoch.publish(Epoch {
                t0_ms: marker_event.leading_ms,
                source: EpochSource::Marker,
                confidence: 0.7,
            });
        }

        if self.state == SyncState::Searching {
            self.state = SyncState::Acquiring;
            transitioned = Some(self.emit());
        } else if self.state == SyncState::Acquiring
            && self.confirmed_markers >= 2
            && self.last_marker_delta_ms <= 2_000.0
            && chain_confidence >= 0.8
        {
            self.state = SyncState::Locked;
            transitioned = Some(self.emit());
        }

        transitioned
    }

    /// Called once per expected tick second that the schedule clock says
    /// should have fired (never for seconds 29/59, which the caller
    /// filters before calling this).
    pub fn on_missed_expected_tick(&mut self) -> Option<SyncEvent> {
        self.consecutive_missed_ticks += 1;
        if self.state == SyncState::Locked && self.consecutive_missed_ticks >= 3 {
            self.state = SyncState::Acquiring;
            return Some(self.emit());
        }
        None
    }

    /// Called when the tick detector rejects a pulse (out-of-duration).
    pub fn on_rejected_tick(&mut self) -> Option<SyncEvent> {
        self.consecutive_rejected_ticks += 1;
        if self.state == SyncState::Acquiring && self.consecutive_rejected_ticks >= 3 {
            self.state = SyncState::Searching;
            self.epoch.publish(Epoch::none());
            self.chain_fit_edges.clear();
            return Some(self.emit());
        }
        None
    }

    /// Advance the silence timer by `elapsed_ms` with no detection of any
    /// kind in that span.
    pub fn advance_silence(&mut self, elapsed_ms: f64) -> Option<SyncEvent> {
        self.silence_ms += elapsed_ms;
        match self.state {
            SyncState::Acquiring if self.silence_ms > 5_000.0 => {
                self.state = SyncState::Searching;
                self.epoch.publish(Epoch::none());
                self.chain_fit_edges.clear();
                Some(self.emit())
            }
            SyncState::Locked if self.silence_ms > 5_000.0 => {
                self.state = SyncState::Acquiring;
                Some(self.emit())
            }
            _ => None,
        }
    }

    /// Reset to SEARCHING with epoch source downgraded to NONE, per the
    /// upstream-reset and lost-signal policies.
    pub fn reset(&mut self) {
        self.state = SyncState::Searching;
        self.epoch.publish(Epoch::none());
        self.confirmed_markers = 0;
        self.last_marker_leading_ms = None;
        self.consecutive_missed_ticks = 0;
        self.consecutive_rejected_ticks = 0;
        self.silence_ms = 0.0;
        self.last_disagreement_ms = None;
        self.chain_fit_edges.clear();
    }

    /// Compare a CHAIN-derived leading edge against the most recent
    /// MARKER epoch, if any. Returns the disagreement in ms when it
    /// exceeds the warn threshold; the pipeline turns this into a
    /// `QualityWarning`. Sync itself never changes state over this.
    fn check_disagreement(&self, tick_leading_ms: f64) -> Option<f64> {
        let current = self.epoch.snapshot();
        if current.source == EpochSource::Marker {
            let delta = (tick_leading_ms - current.t0_ms).abs() % 1000.0;
            let delta = delta.min(1000.0 - delta);
            if delta > FAST_SLOW_DISAGREEMENT_WARN_MS {
                return Some(delta);
            }
        }
        None
    }

    fn emit(&self) -> SyncEvent {
        SyncEvent {
            state: self.state,
            interval_s: self.last_marker_interval_s,
            delta_ms: self.last_marker_delta_ms,
            last_tick_dur_ms: self.last_tick_dur_ms,
            last_marker_dur_ms: self.last_marker_dur_ms,
        }
    }
}

impl Default for SyncStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
