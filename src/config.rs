//! Configuration types for the synchronization core.
use serde::{Deserialize, Serialize};

/// Which station the core is configured to track. Controls tick/marker
/// tone frequency selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Station {
    #[default]
    Wwv,
    Wwvh,
}

impl Station {
    pub fn tick_hz(self) -> f64 {
        match self {
            Station::Wwv => 1000.0,
            Station::Wwvh => 1200.0,
        }
    }

    /// Minute markers (except the hour marker) use the same tone as ticks.
    pub fn minute_marker_hz(self) -> f64 {
        self.tick_hz()
    }

    /// The hour marker (minute 0) always uses 1500 Hz regardless of station.
    pub fn hour_marker_hz(self) -> f64 {
        1500.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    pub station: Station,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            station: Station::default(),
        }
    }
}

/// Sample-rate topology of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub input_rate_hz: f64,
    pub stage1_rate_hz: f64,
    pub detector_rate_hz: f64,
    pub display_rate_hz: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            input_rate_hz: 2_000_000.0,
            stage1_rate_hz: 250_000.0,
            detector_rate_hz: 50_000.0,
            display_rate_hz: 12_000.0,
        }
    }
}

/// Shared adaptive-threshold and pulse-state-machine tuning, one instance
/// per detector kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub fft_size: usize,
    pub threshold_multiplier: f64,
    pub alpha_up: f64,
    pub alpha_down: f64,
    pub min_pulse_ms: f64,
    pub max_pulse_ms: f64,
    pub cooldown_ms: f64,
    pub warmup_ms: f64,
    pub power_ring_capacity: usize,
}

impl DetectorConfig {
    /// Tick detector: 50 kHz, FFT 256 (~5.12 ms frame period), 1.0-10.0 ms
    /// pulses, 500 ms cooldown, 1 s warmup.
    pub fn tick() -> Self {
        Self {
            fft_size: 256,
            threshold_multiplier: 3.0,
            alpha_up: 0.01,
            alpha_down: 0.95,
            min_pulse_ms: 1.0,
            max_pulse_ms: 10.0,
            cooldown_ms: 500.0,
            warmup_ms: 1_000.0,
            power_ring_capacity: 64,
        }
    }

    /// Marker detector: 50 kHz, ~20 ms frame period, 750-850 ms pulses,
    /// 3x baseline threshold, 10 s warmup.
    pub fn marker() -> Self {
        Self {
            fft_size: 1024,
            threshold_multiplier: 3.0,
            alpha_up: 0.01,
            alpha_down: 0.9,
            min_pulse_ms: 750.0,
            max_pulse_ms: 850.0,
            cooldown_ms: 2_000.0,
            warmup_ms: 10_000.0,
            power_ring_capacity: 64,
        }
    }

    /// BCD detectors: ~10 ms frame period, 150-850 ms pulses (covers
    /// ZERO/ONE/POSITION_MARKER with tolerance).
    pub fn bcd() -> Self {
        Self {
            fft_size: 512,
            threshold_multiplier: 2.5,
            alpha_up: 0.01,
            alpha_down: 0.9,
            min_pulse_ms: 150.0,
            max_pulse_ms: 850.0,
            cooldown_ms: 100.0,
            warmup_ms: 2_000.0,
            power_ring_capacity: 48,
        }
    }

    /// Carrier / background tone trackers: ~1 s reporting period.
    pub fn tone() -> Self {
        Self {
            fft_size: 4096,
            threshold_multiplier: 2.0,
            alpha_up: 0.05,
            alpha_down: 0.5,
            min_pulse_ms: 0.0,
            max_pulse_ms: f64::INFINITY,
            cooldown_ms: 0.0,
            warmup_ms: 500.0,
            power_ring_capacity: 32,
        }
    }
}

/// The gate's acceptance window around the nearest second boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GateConfig {
    pub open_ms: f64,
    pub close_ms: f64,
}

impl GateConfig {
    /// Default window while ACQUIRING: the full WWV protected zone.
    pub fn acquiring() -> Self {
        Self {
            open_ms: 0.0,
            close_ms: 100.0,
        }
    }

    /// Tightened window once LOCKED.
    pub fn locked() -> Self {
        Self {
            open_ms: 0.0,
            close_ms: 40.0,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::acquiring()
    }
}

/// Correlator chain tuning, shared by tick/marker/BCD correlators via
/// different constructed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatorConfig {
    pub expected_interval_ms: f64,
    pub tolerance_ms: f64,
    pub chain_capacity: usize,
    pub target_length: usize,
}

impl CorrelatorConfig {
    pub fn tick() -> Self {
        Self {
            expected_interval_ms: 1000.0,
            tolerance_ms: 50.0,
            chain_capacity: 15,
            target_length: 10,
        }
    }

    pub fn marker() -> Self {
        Self {
            expected_interval_ms: 60_000.0,
            tolerance_ms: 500.0,
            chain_capacity: 15,
            target_length: 2,
        }
    }

    pub fn bcd() -> Self {
        Self {
            expected_interval_ms: 1000.0,
            tolerance_ms: 50.0,
            chain_capacity: 60,
            target_length: 60,
        }
    }
}
