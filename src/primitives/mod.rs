//! Numerical primitives shared by every detector and the decimator
//!
//! This module provides the leaf-level building blocks of the DSP core:
//! a bandpass biquad, a DC blocker, a complex oscillator for mixing, and
//! a sliding power ring used by every detector's adaptive threshold.
//!
//! These types are deliberately small and stateful. Each `process`/`tick`/
//! `push` call does no allocation and advances exactly one sample of state,
//! so they are safe to call from the real-time sample path.

pub mod biquad;
pub mod dc_blocker;
pub mod oscillator;
pub mod power_ring;
pub mod spectral;

pub use biquad::Biquad;
pub use dc_blocker::DcBlocker;
pub use oscillator::ComplexOscillator;
pub use power_ring::SlidingPowerRing;
pub use spectral::BinEnergyEstimator;
