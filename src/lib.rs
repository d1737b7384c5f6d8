//! WWV/WWVH synchronization core
//!
//! A real-time DSP pipeline that decimates a 2 Msps complex-baseband
//! I/Q stream down to a 50 kHz detector path and a 12 kHz display path,
//! runs a bank of pulse detectors over the detector path, correlates
//! their output into tick/marker/BCD chains, and drives a sync state
//! machine that publishes an inferred second-boundary epoch back to the
//! gating logic.

pub mod bus;
pub mod config;
pub mod control;
pub mod correlator;
pub mod decimator;
pub mod detectors;
pub mod errors;
pub mod event;
pub mod frame;
pub mod logging;
pub mod pipeline;
pub mod primitives;
pub mod sample;
pub mod schedule;
pub mod sync;
pub mod telemetry;

pub use config::{CorrelatorConfig, DetectorConfig, GateConfig, Station, StationConfig, SystemConfig};
pub use errors::{Result, WwvError};
pub use event::{BcdSymbol, DetectorEvent, EventPayload};
pub use pipeline::Pipeline;
pub use sample::{sample_from_i16, Sample};
pub use sync::{Epoch, EpochSource, SyncEvent, SyncState};
