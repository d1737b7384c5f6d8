//! Discrete detection events produced by the pulse detectors.

use serde::{Deserialize, Serialize};

/// Fields common to every detection, regardless of which detector fired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorEvent {
    /// Pulse start, corrected for measured filter group delay. Authoritative
    /// timestamp for correlation and gating.
    pub leading_ms: f64,
    /// Pulse end as observed by the state machine.
    pub trailing_ms: f64,
    /// `trailing_ms - leading_ms`, before group-delay correction.
    pub duration_ms: f64,
    /// Peak energy observed during the ACTIVE state (linear).
    pub peak_energy: f64,
    /// Adaptive baseline at the moment of firing.
    pub baseline: f64,
    /// `baseline * threshold_multiplier` at the moment of firing.
    pub threshold: f64,
    pub payload: EventPayload,
}

impl DetectorEvent {
    /// `leading <= trailing` and `peak >= threshold`, per the data model.
    pub fn is_well_formed(&self) -> bool {
        self.leading_ms <= self.trailing_ms && self.peak_energy >= self.threshold
    }
}

/// Detector-specific payload carried by an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum EventPayload {
    /// Ordinary second tick. `long_pulse` is set when the ACTIVE state
    /// persisted beyond the marker-audit threshold (>= 600 ms); this is a
    /// cross-check signal only, never a primary marker declaration.
    Tick { long_pulse: bool },
    /// Minute or hour marker. `tone_hz` distinguishes the 1000/1200 Hz
    /// minute marker from the 1500 Hz hour marker.
    Marker { tone_hz: f64 },
    /// One BCD subcarrier pulse, classified by width.
    BcdSymbol {
        second_in_minute: u8,
        symbol: BcdSymbol,
    },
    /// A periodic carrier/tone-tracker report.
    Tone {
        measured_hz: f64,
        offset_hz: f64,
        offset_ppm: f64,
        snr_db: f64,
    },
}

/// Classification of a 100 Hz BCD subcarrier pulse by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BcdSymbol {
    Zero,
    One,
    PositionMarker,
}

impl BcdSymbol {
    /// Classify a measured pulse width (ms) against the three nominal
    /// widths (200/500/800 ms) with +/-50 ms tolerance. Returns `None` if
    /// the width falls in no tolerance band.
    pub fn classify(pulse_ms: f64) -> Option<Self> {
        const TOLERANCE_MS: f64 = 50.0;
        let bands = [
            (200.0, BcdSymbol::Zero),
            (500.0, BcdSymbol::One),
            (800.0, BcdSymbol::PositionMarker),
        ];
        bands
            .into_iter()
            .find(|(nominal, _)| (pulse_ms - nominal).abs() <= TOLERANCE_MS)
            .map(|(_, sym)| sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_nominal_widths() {
        assert_eq!(BcdSymbol::classify(200.0), Some(BcdSymbol::Zero));
        assert_eq!(BcdSymbol::classify(500.0), Some(BcdSymbol::One));
        assert_eq!(BcdSymbol::classify(800.0), Some(BcdSymbol::PositionMarker));
    }

    #[test]
    fn tolerance_bounds_are_inclusive() {
        assert_eq!(BcdSymbol::classify(250.0), Some(BcdSymbol::Zero));
        assert_eq!(BcdSymbol::classify(251.0), None);
    }

    #[test]
    fn well_formed_requires_leading_before_trailing_and_peak_over_threshold() {
        let good = DetectorEvent {
            leading_ms: 10.0,
            trailing_ms: 15.0,
            duration_ms: 5.0,
            peak_energy: 2.0,
            baseline: 0.5,
            threshold: 1.5,
            payload: EventPayload::Tick { long_pulse: false },
        };
        assert!(good.is_well_formed());

        let bad = DetectorEvent {
            peak_energy: 1.0,
            ..good
        };
        assert!(!bad.is_well_formed());
    }
}
