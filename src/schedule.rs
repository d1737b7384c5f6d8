//! WWV/WWVH schedule clock: a pure function of (minute, second) to the
//! event expected at that position in the broadcast.

use crate::config::Station;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedEvent {
    Tick,
    MarkerMinute,
    MarkerHour,
    /// The transmitter suppresses the tick at seconds 29 and 59; the
    /// schedule is not authoritative for missed-tick counting there.
    Silence29,
    Silence59,
}

/// Seconds at which the tick is transmitter-suppressed.
pub const SILENT_SECONDS: [u8; 2] = [29, 59];

/// Pure lookup: what event is expected at `(minute_of_hour, second_of_minute)`.
///
/// `station` is accepted (rather than dropped from the signature) because
/// callers reach this function already holding a `Station` and the
/// schedule shape is, by spec, identical for WWV and WWVH — only the
/// accompanying tone frequency differs, via [`expected_marker_hz`].
pub fn expected(minute_of_hour: u8, second_of_minute: u8, _station: Station) -> ExpectedEvent {
    match second_of_minute {
        29 => ExpectedEvent::Silence29,
        59 => ExpectedEvent::Silence59,
        0 if minute_of_hour == 0 => ExpectedEvent::MarkerHour,
        0 => ExpectedEvent::MarkerMinute,
        _ => ExpectedEvent::Tick,
    }
}

/// Whether `second_of_minute` is a schedule-known silent second.
pub fn is_silent_second(second_of_minute: u8) -> bool {
    SILENT_SECONDS.contains(&second_of_minute)
}

/// The tone frequency that should accompany the marker at this position,
/// if any.
pub fn expected_marker_hz(expected: ExpectedEvent, station: Station) -> Option<f64> {
    match expected {
        ExpectedEvent::MarkerMinute => Some(station.minute_marker_hz()),
        ExpectedEvent::MarkerHour => Some(station.hour_marker_hz()),
        _ => None,
    }
}
