//! Outbound telemetry: one CSV line per event, four-character channel tag.

use chrono::{DateTime, Utc};

/// One record per outbound telemetry channel. Field order in
/// [`TelemetryRecord::to_csv_line`] matches the published schema exactly.
#[derive(Debug, Clone)]
pub enum TelemetryRecord {
    Tick {
        wallclock: DateTime<Utc>,
        t_ms: f64,
        tick_num: u64,
        leading_ms: f64,
        duration_ms: f64,
        peak: f64,
        baseline: f64,
        threshold: f64,
    },
    Marker {
        wallclock: DateTime<Utc>,
        t_ms: f64,
        marker_num: u64,
        sec: u8,
        expected: bool,
        accum_energy: f64,
        duration_ms: f64,
        since_last_sec: f64,
        baseline: f64,
        threshold: f64,
    },
    Sync {
        wallclock: DateTime<Utc>,
        t_ms: f64,
        marker_count: u32,
        state: &'static str,
        interval_s: f64,
        delta_ms: f64,
        tick_dur_ms: f64,
        marker_dur_ms: f64,
    },
    Correlation {
        wallclock: DateTime<Utc>,
        t_ms: f64,
        chain_len: usize,
        mean_ms: f64,
        stddev_ms: f64,
        confidence: f64,
        epoch_offset_ms: f64,
    },
    BcdSymbol {
        wallclock: DateTime<Utc>,
        t_ms: f64,
        sec_in_min: u8,
        symbol: char,
        pulse_ms: f64,
        confidence: f64,
    },
    Tone {
        wallclock: DateTime<Utc>,
        t_ms: f64,
        channel: &'static str,
        measured_hz: f64,
        offset_hz: f64,
        offset_ppm: f64,
        snr_db: f64,
    },
}

impl TelemetryRecord {
    /// The four-character channel tag this record is published under.
    pub fn channel_tag(&self) -> &'static str {
        match self {
            TelemetryRecord::Tick { .. } => "TICK",
            TelemetryRecord::Marker { .. } => "MARK",
            TelemetryRecord::Sync { .. } => "SYNC",
            TelemetryRecord::Correlation { .. } => "CORR",
            TelemetryRecord::BcdSymbol { .. } => "BCDS",
            TelemetryRecord::Tone { channel, .. } => channel,
        }
    }

    /// Render as a channel-tag-prefixed CSV line, field order matching
    /// the published schema.
    pub fn to_csv_line(&self) -> String {
        let tag = self.channel_tag();
        match self {
            TelemetryRecord::Tick {
                wallclock,
                t_ms,
                tick_num,
                leading_ms,
                duration_ms,
                peak,
                baseline,
                threshold,
            } => format!(
                "{tag},{},{t_ms},{tick_num},{leading_ms},{duration_ms},{peak},{baseline},{threshold}",
                wallclock.to_rfc3339()
            ),
            TelemetryRecord::Marker {
                wallclock,
                t_ms,
                marker_num,
                sec,
                expected,
                accum_energy,
                duration_ms,
                since_last_sec,
                baseline,
                threshold,
            } => format!(
                "{tag},{},{t_ms},{marker_num},{sec},{expected},{accum_energy},{duration_ms},{since_last_sec},{baseline},{threshold}",
                wallclock.to_rfc3339()
            ),
            TelemetryRecord::Sync {
                wallclock,
                t_ms,
                marker_count,
                state,
                interval_s,
                delta_ms,
                tick_dur_ms,
                marker_dur_ms,
            } => format!(
                "{tag},{},{t_ms},{marker_count},{state},{interval_s},{delta_ms},{tick_dur_ms},{marker_dur_ms}",
                wallclock.to_rfc3339()
            ),
            TelemetryRecord::Correlation {
                wallclock,
                t_ms,
                chain_len,
                mean_ms,
                stddev_ms,
                confidence,
                epoch_offset_ms,
            } => format!(
                "{tag},{},{t_ms},{chain_len},{mean_ms},{stddev_ms},{confidence},{epoch_offset_ms}",
                wallclock.to_rfc3339()
            ),
            TelemetryRecord::BcdSymbol {
                wallclock,
                t_ms,
                sec_in_min,
                symbol,
                pulse_ms,
                confidence,
            } => format!(
                "{tag},{},{t_ms},{sec_in_min},{symbol},{pulse_ms},{confidence}",
                wallclock.to_rfc3339()
            ),
            TelemetryRecord::Tone {
                wallclock,
                t_ms,
                measured_hz,
                offset_hz,
                offset_ppm,
                snr_db,
                ..
            } => format!(
                "{tag},{},{t_ms},{measured_hz},{offset_hz},{offset_ppm},{snr_db}",
                wallclock.to_rfc3339()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_record_has_tick_prefix_and_eight_fields() {
        let rec = TelemetryRecord::Tick {
            wallclock: Utc::now(),
            t_ms: 1234.5,
            tick_num: 7,
            leading_ms: 1230.1,
            duration_ms: 5.0,
            peak: 2.0,
            baseline: 0.5,
            threshold: 1.5,
        };
        let line = rec.to_csv_line();
        assert!(line.starts_with("TICK,"));
        assert_eq!(line.split(',').count(), 9);
    }

    #[test]
    fn tone_record_uses_its_own_channel_tag() {
        let rec = TelemetryRecord::Tone {
            wallclock: Utc::now(),
            t_ms: 1.0,
            channel: "T500",
            measured_hz: 500.1,
            offset_hz: 0.1,
            offset_ppm: 200.0,
            snr_db: 20.0,
        };
        assert_eq!(rec.channel_tag(), "T500");
        assert!(rec.to_csv_line().starts_with("T500,"));
    }
}
