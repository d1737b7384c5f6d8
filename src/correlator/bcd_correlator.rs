//! Assembles BCD subcarrier symbols into 60-symbol minute frames and
//! decodes minute/hour/day-of-year/year once a frame completes with
//! consistent position markers.

use crate::config::CorrelatorConfig;
use crate::event::{BcdSymbol, DetectorEvent, EventPayload};

const FRAME_LEN: usize = 60;

/// Seconds, within a 60-symbol frame, expected to carry a POSITION_MARKER
/// pulse rather than a data bit (P0..P6).
const POSITION_MARKER_SECONDS: [usize; 7] = [0, 9, 19, 29, 39, 49, 59];

/// `(second, bcd weight)` groups. Seconds not listed (and not a position
/// marker second) are unused guard bits and always decode as zero.
const MINUTE_BITS: &[(usize, u32)] = &[
    (1, 1), (2, 2), (3, 4), (4, 8),
    (6, 10), (7, 20), (8, 40),
];
const HOUR_BITS: &[(usize, u32)] = &[
    (10, 1), (11, 2), (12, 4), (13, 8),
    (15, 10), (16, 20),
];
const DAY_BITS: &[(usize, u32)] = &[
    (20, 1), (21, 2), (22, 4), (23, 8),
    (25, 10), (26, 20), (27, 40), (28, 80),
    (30, 100), (31, 200),
];
const YEAR_BITS: &[(usize, u32)] = &[
    (40, 1), (41, 2), (42, 4), (43, 8),
    (45, 10), (46, 20), (47, 40), (48, 80),
];

/// Fully decoded time-of-year, valid once a frame with at most one
/// inconsistent position marker has been assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub minute: u32,
    pub hour: u32,
    pub day_of_year: u32,
    pub year: u32,
    /// Set when exactly one position marker was missing or misplaced;
    /// the decode is still published but flagged lower-confidence.
    pub partial_position_markers: bool,
}

pub struct BcdCorrelator {
    /// One slot per second-in-minute; `None` until a symbol for that
    /// second has been observed in the current frame.
    frame: [Option<BcdSymbol>; FRAME_LEN],
    filled: usize,
    /// Count of frame-quality BCD symbol correlation updates, for the
    /// `CORR` telemetry channel.
    update_count: u64,
}

impl BcdCorrelator {
    pub fn new() -> Self {
        Self::with_config(CorrelatorConfig::bcd())
    }

    pub fn with_config(_cfg: CorrelatorConfig) -> Self {
        Self {
            frame: [None; FRAME_LEN],
            filled: 0,
            update_count: 0,
        }
    }

    /// Feed one BCD symbol event. Returns `Some(decoded)` once the second
    /// wraps back to 0 (a full pass through the frame) provided at most
    /// one position marker was inconsistent.
    pub fn ingest(&mut self, event: &DetectorEvent) -> Option<DecodedFrame> {
        let (second, symbol) = match event.payload {
            EventPayload::BcdSymbol {
                second_in_minute,
                symbol,
            } => (second_in_minute as usize, symbol),
            _ => return None,
        };
        if second >= FRAME_LEN {
            return None;
        }

        self.update_count += 1;
        if self.frame[second].is_none() {
            self.filled += 1;
        }
        self.frame[second] = Some(symbol);

        if second == FRAME_LEN - 1 && self.filled >= FRAME_LEN - 1 {
            let decoded = self.decode();
            self.frame = [None; FRAME_LEN];
            self.filled = 0;
            decoded
        } else {
            None
        }
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn reset(&mut self) {
        self.frame = [None; FRAME_LEN];
        self.filled = 0;
    }

    fn decode(&self) -> Option<DecodedFrame> {
        let mut inconsistent = 0usize;
        for &sec in &POSITION_MARKER_SECONDS {
            match self.frame[sec] {
                Some(BcdSymbol::PositionMarker) => {}
                _ => inconsistent += 1,
            }
        }
        if inconsistent >= 2 {
            return None;
        }

        Some(DecodedFrame {
            minute: self.decode_group(MINUTE_BITS),
            hour: self.decode_group(HOUR_BITS),
            day_of_year: self.decode_group(DAY_BITS),
            year: self.decode_group(YEAR_BITS),
            partial_position_markers: inconsistent == 1,
        })
    }

    fn decode_group(&self, bits: &[(usize, u32)]) -> u32 {
        bits.iter()
            .map(|&(sec, weight)| match self.frame[sec] {
                Some(BcdSymbol::One) => weight,
                _ => 0,
            })
            .sum()
    }
}

impl Default for BcdCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol_event(second: u8, symbol: BcdSymbol) -> DetectorEvent {
        DetectorEvent {
            leading_ms: second as f64 * 1000.0,
            trailing_ms: second as f64 * 1000.0 + 500.0,
            duration_ms: 500.0,
            peak_energy: 1.0,
            baseline: 0.1,
            threshold: 0.3,
            payload: EventPayload::BcdSymbol {
                second_in_minute: second,
                symbol,
            },
        }
    }

    fn feed_clean_frame(corr: &mut BcdCorrelator, minute: u32) -> Option<DecodedFrame> {
        let mut result = None;
        for sec in 0..FRAME_LEN {
            let symbol = if POSITION_MARKER_SECONDS.contains(&sec) {
                BcdSymbol::PositionMarker
            } else if let Some(&(_, weight)) = MINUTE_BITS.iter().find(|&&(s, _)| s == sec) {
                if minute & weight != 0 {
                    BcdSymbol::One
                } else {
                    BcdSymbol::Zero
                }
            } else {
                BcdSymbol::Zero
            };
            result = corr.ingest(&symbol_event(sec as u8, symbol));
        }
        result
    }

    #[test]
    fn decodes_minute_from_a_clean_frame() {
        let mut corr = BcdCorrelator::new();
        let decoded = feed_clean_frame(&mut corr, 37).expect("frame should decode");
        assert_eq!(decoded.minute, 37);
        assert!(!decoded.partial_position_markers);
    }

    #[test]
    fn tolerates_exactly_one_missing_position_marker() {
        let mut corr = BcdCorrelator::new();
        for sec in 0..FRAME_LEN {
            if sec == 9 {
                continue; // one position marker missing
            }
            let symbol = if POSITION_MARKER_SECONDS.contains(&sec) {
                BcdSymbol::PositionMarker
            } else {
                BcdSymbol::Zero
            };
            corr.ingest(&symbol_event(sec as u8, symbol));
        }
        let decoded = corr.ingest(&symbol_event(59, BcdSymbol::PositionMarker));
        assert!(decoded.is_some());
        assert!(decoded.unwrap().partial_position_markers);
    }

    #[test]
    fn rejects_frame_with_two_inconsistent_position_markers() {
        let mut corr = BcdCorrelator::new();
        for sec in 0..FRAME_LEN {
            if sec == 9 || sec == 19 {
                corr.ingest(&symbol_event(sec as u8, BcdSymbol::Zero));
                continue;
            }
            let symbol = if POSITION_MARKER_SECONDS.contains(&sec) {
                BcdSymbol::PositionMarker
            } else {
                BcdSymbol::Zero
            };
            corr.ingest(&symbol_event(sec as u8, symbol));
        }
        let decoded = corr.ingest(&symbol_event(59, BcdSymbol::PositionMarker));
        assert!(decoded.is_none());
    }
}
