//! Error taxonomy for the WWV/WWVH synchronization core
//!
//! Every kind here corresponds to exactly one telemetry record (see
//! [`crate::telemetry`]); none of them are fatal on the sample path —
//! they are recovered locally, at the correlator, or by the sync state
//! machine, per the propagation policy each variant documents.

use thiserror::Error;

/// Top-level error type for all core operations.
#[derive(Debug, Error)]
pub enum WwvError {
    /// Nonsensical parameters passed to a constructor or setter. The
    /// caller retains its previous state.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// An internal ring or intermediate buffer overflowed. The caller
    /// may resize and retry; no samples were silently dropped.
    #[error("buffer full: capacity {capacity}, attempted write of {attempted}")]
    BufferFull { capacity: usize, attempted: usize },

    /// The inbound stream signaled a discontinuity. Decimator and
    /// detector state are reset; epoch source is downgraded to `None`.
    #[error("upstream reset at sequence {sequence}")]
    UpstreamReset { sequence: u32 },

    /// An isolated rejected pulse or out-of-band correlator interval.
    /// Logged at the correlator; does not itself cause loss of lock.
    #[error("transient rejection: {reason}")]
    Transient { reason: String },

    /// Fast-path (tick) and slow-path (marker) epoch estimates disagree
    /// by more than the tolerance. Emitted on the event bus; sync stays
    /// locked.
    #[error("quality warning: fast/slow path disagreement of {delta_ms:.1} ms")]
    QualityWarning { delta_ms: f64 },

    /// Repeated missed expected ticks. Causes LOCKED -> ACQUIRING.
    #[error("lock lost: {consecutive_misses} consecutive missed ticks")]
    LockLost { consecutive_misses: u32 },
}

pub type Result<T> = std::result::Result<T, WwvError>;

impl WwvError {
    /// The stable taxonomy tag used for telemetry and logging.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            WwvError::InvalidArgument { .. } => "InvalidArgument",
            WwvError::BufferFull { .. } => "BufferFull",
            WwvError::UpstreamReset { .. } => "UpstreamReset",
            WwvError::Transient { .. } => "Transient",
            WwvError::QualityWarning { .. } => "QualityWarning",
            WwvError::LockLost { .. } => "LockLost",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        let e = WwvError::BufferFull {
            capacity: 10,
            attempted: 12,
        };
        assert_eq!(e.kind_tag(), "BufferFull");
        assert!(e.to_string().contains("capacity 10"));
    }
}
