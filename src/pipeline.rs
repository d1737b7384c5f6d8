//! Single-threaded orchestration of the full sample pipeline: normalize
//! -> decimate -> detectors -> correlators -> sync -> gate feedback.
//!
//! The sample path never allocates and never blocks; the only
//! suspension points are the upstream frame read (outside this module)
//! and the outbound event-bus publish, which is itself non-blocking.

use crate::bus::{BusMessage, EventBus};
use crate::config::{GateConfig, Station, SystemConfig};
use crate::control::Command;
use crate::correlator::{BcdCorrelator, MarkerCorrelator, TickCorrelator};
use crate::decimator::Decimator;
use crate::detectors::{BcdFreqDetector, BcdTimeDetector, MarkerDetector, PulseDetector, TickDetector, ToneTracker};
use crate::errors::{Result, WwvError};
use crate::frame::ContinuousFrame;
use crate::logging::SignalLogger;
use crate::sample::Sample;
use crate::schedule::{self, ExpectedEvent};
use crate::sync::{gate_accept, SyncState, SyncStateMachine};

/// Background tones tracked alongside the carrier; each gets its own
/// [`ToneTracker`] instance. The carrier itself is tracked separately
/// at a nominal frequency supplied by the caller (receiver tuning, not
/// fixed at compile time).
const BACKGROUND_TONES_HZ: [f64; 6] = [440.0, 500.0, 600.0, 1000.0, 1200.0, 1500.0];

pub struct Pipeline {
    decimator: Decimator,
    tick: TickDetector,
    marker: MarkerDetector,
    bcd_time: BcdTimeDetector,
    bcd_freq: BcdFreqDetector,
    carrier: ToneTracker,
    background_tones: Vec<ToneTracker>,

    tick_correlator: TickCorrelator,
    marker_correlator: MarkerCorrelator,
    bcd_correlator: BcdCorrelator,

    sync: SyncStateMachine,
    station: Station,
    system: SystemConfig,

    bus: EventBus,
    logger: SignalLogger,

    detector_samples_seen: u64,
    tick_count: u64,
    marker_count: u64,
    last_schedule_second: Option<u8>,
    tick_confirmed_this_second: bool,
}

impl Pipeline {
    pub fn new(station: Station) -> Self {
        Self::with_carrier_hz(station, 0.0)
    }

    /// `carrier_hz` is the receiver's tuned carrier frequency, baseband-
    /// shifted to 0 Hz by the front end in normal operation; pass 0.0
    /// when the carrier tracker is unused.
    pub fn with_carrier_hz(station: Station, carrier_hz: f64) -> Self {
        let system = SystemConfig::default();
        Self {
            decimator: Decimator::new(),
            tick: TickDetector::new(station),
            marker: MarkerDetector::new(station),
            bcd_time: BcdTimeDetector::new(),
            bcd_freq: BcdFreqDetector::new(),
            carrier: ToneTracker::new(carrier_hz),
            background_tones: BACKGROUND_TONES_HZ.iter().map(|&hz| ToneTracker::new(hz)).collect(),
            tick_correlator: TickCorrelator::new(),
            marker_correlator: MarkerCorrelator::new(),
            bcd_correlator: BcdCorrelator::new(),
            sync: SyncStateMachine::new(),
            station,
            system,
            bus: EventBus::new(),
            logger: SignalLogger::default(),
            detector_samples_seen: 0,
            tick_count: 0,
            marker_count: 0,
            last_schedule_second: None,
            tick_confirmed_this_second: false,
        }
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn logger(&self) -> &SignalLogger {
        &self.logger
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn marker_count(&self) -> u64 {
        self.marker_count
    }

    /// Current position in the broadcast minute, derived from elapsed
    /// detector-rate samples. This is a free-running clock used to feed
    /// the schedule lookup and the BCD second counters; it is not the
    /// same thing as the epoch, which may still be unset while SEARCHING.
    fn stream_second_of_minute(&self) -> u8 {
        let t_ms = self.detector_samples_seen as f64 / self.system.detector_rate_hz * 1_000.0;
        ((t_ms / 1_000.0) as u64 % 60) as u8
    }

    /// Ingest one inbound binary I/Q frame. A `reset` frame clears all
    /// pipeline state and downgrades the epoch before any samples in the
    /// frame are processed, per the upstream-discontinuity contract.
    pub fn process_frame(&mut self, frame: &ContinuousFrame) -> Result<()> {
        if frame.reset {
            self.reset();
        }
        self.process_chunk(&frame.samples)
    }

    /// Run a chunk of 2 Msps input through decimation and then through
    /// every detector/correlator/sync step, one detector-rate sample at
    /// a time.
    pub fn process_chunk(&mut self, input: &[Sample]) -> Result<()> {
        let mut detector_out = Vec::with_capacity(input.len() / 40 + 8);
        let mut display_out = Vec::with_capacity(input.len() / 167 + 8);
        self.decimator.process_chunk(input, &mut detector_out, &mut display_out)?;

        for &sample in &detector_out {
            self.process_detector_sample(sample)?;
        }
        Ok(())
    }

    fn process_detector_sample(&mut self, sample: Sample) -> Result<()> {
        self.detector_samples_seen += 1;
        let gate_window = match self.sync.state() {
            SyncState::Locked => GateConfig::locked(),
            _ => GateConfig::acquiring(),
        };
        let epoch = self.sync.epoch();

        if let Some(event) = self.tick.process_sample(sample) {
            if matches!(event.payload, crate::event::EventPayload::Tick { long_pulse: true }) {
                // A long-pulse cross-check, not a confirmed second tick: it
                // never feeds the gate, the tick chain, or `tick_count`.
                self.marker_correlator.audit_long_pulse(&event);
                self.bus.publish(BusMessage::Tick(event));
            } else if gate_accept(event.leading_ms, &epoch, gate_window) {
                self.tick_count += 1;
                self.tick_confirmed_this_second = true;
                let snap = self.tick_correlator.ingest(&event);
                self.sync.on_tick_chain_update(&event, snap.length, snap.stddev_ms);
                if let Some(delta_ms) = self.sync.take_disagreement_ms() {
                    let warning = WwvError::QualityWarning { delta_ms };
                    self.logger.warn("SYNC", &warning);
                }
                self.bus.publish(BusMessage::Tick(event));
                self.bus.publish(BusMessage::Correlation {
                    channel: "CORR",
                    snapshot: snap,
                });
            } else {
                self.sync.on_rejected_tick();
            }
        }

        if let Some(event) = self.marker.process_sample(sample) {
            if gate_accept(event.leading_ms, &epoch, gate_window) {
                self.marker_count += 1;
                let snap = self.marker_correlator.ingest(&event);
                self.sync.on_marker(&event, snap.confidence);
                self.bus.publish(BusMessage::Marker(event));
                self.bus.publish(BusMessage::Correlation {
                    channel: "CORR",
                    snapshot: snap,
                });
            }
        }

        let second = self.stream_second_of_minute();
        self.bcd_time.set_second_in_minute(second);
        self.bcd_freq.set_second_in_minute(second);

        if let Some(event) = self.bcd_time.process_sample(sample) {
            if self.bcd_correlator.ingest(&event).is_some() {
                self.logger.info("BCD", "decoded a full minute frame");
            }
            self.bus.publish(BusMessage::BcdSymbol(event));
        }
        if let Some(event) = self.bcd_freq.process_sample(sample) {
            self.bus.publish(BusMessage::BcdSymbol(event));
        }

        if let Some(event) = self.carrier.process_sample(sample) {
            self.bus.publish(BusMessage::Tone(event));
        }
        for tracker in &mut self.background_tones {
            if let Some(event) = tracker.process_sample(sample) {
                self.bus.publish(BusMessage::Tone(event));
            }
        }

        self.check_schedule(second);

        if let Some(sync_event) = self.sync.advance_silence(1_000.0 / self.system.detector_rate_hz) {
            self.bus.publish(BusMessage::Sync(sync_event));
        }

        Ok(())
    }

    /// Compares the schedule clock against what was actually confirmed
    /// in the second that just elapsed, reporting a missed tick to the
    /// sync machine. Silent seconds (29, 59) are never counted as missed.
    fn check_schedule(&mut self, second: u8) {
        if self.last_schedule_second == Some(second) {
            return;
        }
        if let Some(prev_second) = self.last_schedule_second {
            let expected = schedule::expected(0, prev_second, self.station);
            if matches!(expected, ExpectedEvent::Tick) && !self.tick_confirmed_this_second {
                if let Some(sync_event) = self.sync.on_missed_expected_tick() {
                    self.bus.publish(BusMessage::Sync(sync_event));
                }
            }
        }
        self.last_schedule_second = Some(second);
        self.tick_confirmed_this_second = false;
    }

    /// Reset all pipeline state: decimator, every detector back to
    /// WARMUP, correlator chains invalidated, epoch source downgraded to
    /// NONE. Used on an upstream discontinuity flag.
    pub fn reset(&mut self) {
        self.decimator.reset();
        self.tick.reset();
        self.marker.reset();
        self.bcd_time.reset();
        self.bcd_freq.reset();
        self.carrier.reset();
        for tracker in &mut self.background_tones {
            tracker.reset();
        }
        self.tick_correlator.reset();
        self.marker_correlator.reset();
        self.bcd_correlator.reset();
        self.sync.reset();
        self.detector_samples_seen = 0;
        self.last_schedule_second = None;
        self.tick_confirmed_this_second = false;
        self.logger.warn("SYNC", "pipeline reset on upstream discontinuity");
    }

    pub fn set_tick_enabled(&mut self, enabled: bool) {
        self.tick.set_enabled(enabled);
    }

    /// Apply a parsed control-plane command between frames. Each tuning
    /// command mutates the owning detector's state machine immediately, so
    /// it takes effect starting with the next frame processed.
    pub fn apply_control_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetTickThreshold(v) => {
                self.tick.set_threshold_multiplier(v);
                self.logger.info("CONTROL", format!("tick threshold -> {v}"));
            }
            Command::SetTickAdaptDown(v) => {
                self.tick.set_alpha_down(v);
                self.logger.info("CONTROL", format!("tick alpha_down -> {v}"));
            }
            Command::SetTickAdaptUp(v) => {
                self.tick.set_alpha_up(v);
                self.logger.info("CONTROL", format!("tick alpha_up -> {v}"));
            }
            Command::SetMarkerThreshold(v) => {
                self.marker.set_threshold_multiplier(v);
                self.logger.info("CONTROL", format!("marker threshold -> {v}"));
            }
            Command::SetBcdThreshold(v) => {
                self.bcd_time.set_threshold_multiplier(v);
                self.bcd_freq.set_threshold_multiplier(v);
                self.logger.info("CONTROL", format!("bcd threshold -> {v}"));
            }
            Command::SetMinPulseMs(v) => {
                self.tick.set_min_pulse_ms(v);
                self.logger.info("CONTROL", format!("min pulse width -> {v}ms"));
            }
            Command::SetMaxPulseMs(v) => {
                self.tick.set_max_pulse_ms(v);
                self.logger.info("CONTROL", format!("max pulse width -> {v}ms"));
            }
            Command::EnableTelem(channel) => {
                self.logger.info("CONTROL", format!("telemetry enabled for {channel}"));
            }
        }
    }

    /// Count of BCD symbols correlated so far, surfaced for telemetry.
    pub fn bcd_symbol_count(&self) -> u64 {
        self.bcd_correlator.update_count()
    }

    /// Count of rejected (out-of-band) tick intervals, surfaced for
    /// telemetry and for tests exercising the multipath-rejection path.
    pub fn tick_transient_count(&self) -> u64 {
        self.tick_correlator.transient_count()
    }

    /// Count of long-pulse cross-checks recorded by the marker audit.
    pub fn marker_audit_count(&self) -> u64 {
        self.marker_correlator.marker_audit_count()
    }
}
