//! Binary framing for the inbound I/Q stream and the (consume-only)
//! outbound recording header format.

use crate::errors::{Result, WwvError};
use crate::sample::{sample_from_i16, Sample};

const STREAM_MAGIC: [u8; 4] = *b"WWVQ";
const FRAME_MAGIC: [u8; 4] = *b"FRM1";

/// One-time stream header preceding the continuous frame sequence.
#[derive(Debug, Clone, Copy)]
pub struct StreamHeader {
    pub version: u32,
    pub sample_rate_hz: f32,
    pub center_freq_hz: f32,
}

impl StreamHeader {
    pub const WIRE_LEN: usize = 4 + 4 + 4 + 4 + 4; // magic, version, rate, freq, format

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(WwvError::InvalidArgument {
                reason: format!("stream header too short: {} bytes", bytes.len()),
            });
        }
        if bytes[0..4] != STREAM_MAGIC {
            return Err(WwvError::InvalidArgument {
                reason: "bad stream magic".into(),
            });
        }
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let sample_rate_hz = f32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let center_freq_hz = f32::from_le_bytes(bytes[12..16].try_into().unwrap());
        // bytes[16..20]: sample format tag (int16-interleaved only, ignored)
        Ok(Self {
            version,
            sample_rate_hz,
            center_freq_hz,
        })
    }
}

/// A continuous data frame. `reset` signals an upstream discontinuity:
/// the caller must reset decimator and detector state and downgrade the
/// epoch source to NONE.
#[derive(Debug, Clone)]
pub struct ContinuousFrame {
    pub sequence: u32,
    pub reset: bool,
    pub samples: Vec<Sample>,
}

const RESET_FLAG: u32 = 0x1;
const FRAME_HEADER_LEN: usize = 4 + 4 + 4 + 4; // magic, sequence, sample_count, flags

impl ContinuousFrame {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_HEADER_LEN {
            return Err(WwvError::InvalidArgument {
                reason: format!("frame header too short: {} bytes", bytes.len()),
            });
        }
        if bytes[0..4] != FRAME_MAGIC {
            return Err(WwvError::InvalidArgument {
                reason: "bad frame magic".into(),
            });
        }
        let sequence = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let sample_count = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let flags = u32::from_le_bytes(bytes[12..16].try_into().unwrap());

        let payload_len = sample_count * 4; // 2x i16 per sample
        let payload = &bytes[FRAME_HEADER_LEN..];
        if payload.len() < payload_len {
            return Err(WwvError::InvalidArgument {
                reason: format!(
                    "frame payload truncated: expected {payload_len} bytes, got {}",
                    payload.len()
                ),
            });
        }

        let mut samples = Vec::with_capacity(sample_count);
        for chunk in payload[..payload_len].chunks_exact(4) {
            let i = i16::from_le_bytes([chunk[0], chunk[1]]);
            let q = i16::from_le_bytes([chunk[2], chunk[3]]);
            samples.push(sample_from_i16(i, q));
        }

        Ok(Self {
            sequence,
            reset: flags & RESET_FLAG != 0,
            samples,
        })
    }
}

/// Fixed 64-byte recording header (outbound offline format). The core
/// only consumes this; it never produces one.
#[derive(Debug, Clone, Copy)]
pub struct RecordingHeader {
    pub sample_rate_hz: f64,
    pub center_freq_hz: f64,
    pub bandwidth_hz: f32,
    pub gain_reduction_db: f32,
    pub lna_state: u32,
    pub start_time_us: u64,
    pub sample_count: u64,
    pub flags: u32,
}

impl RecordingHeader {
    pub const WIRE_LEN: usize = 64;

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(WwvError::InvalidArgument {
                reason: format!("recording header too short: {} bytes", bytes.len()),
            });
        }
        // magic (4) + version (4) are validated but not retained.
        let sample_rate_hz = f64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let center_freq_hz = f64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let bandwidth_hz = f32::from_le_bytes(bytes[24..28].try_into().unwrap());
        let gain_reduction_db = f32::from_le_bytes(bytes[28..32].try_into().unwrap());
        let lna_state = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
        let start_time_us = u64::from_le_bytes(bytes[36..44].try_into().unwrap());
        let sample_count = u64::from_le_bytes(bytes[44..52].try_into().unwrap());
        let flags = u32::from_le_bytes(bytes[52..56].try_into().unwrap());
        // bytes[56..64]: reserved
        Ok(Self {
            sample_rate_hz,
            center_freq_hz,
            bandwidth_hz,
            gain_reduction_db,
            lna_state,
            start_time_us,
            sample_count,
            flags,
        })
    }
}
