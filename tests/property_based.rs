use approx::assert_relative_eq;
use proptest::prelude::*;
use wwv_sync_core::config::{CorrelatorConfig, GateConfig, Station};
use wwv_sync_core::event::BcdSymbol;
use wwv_sync_core::schedule::{self, ExpectedEvent};
use wwv_sync_core::sync::{gate_accept, Epoch, EpochSource};

proptest! {
    /// With no epoch established, the gate must accept every event
    /// regardless of its leading edge or the configured window.
    #[test]
    fn gate_accepts_everything_before_an_epoch_exists(leading_ms in -1.0e6f64..1.0e6) {
        let epoch = Epoch::none();
        prop_assert!(gate_accept(leading_ms, &epoch, GateConfig::locked()));
        prop_assert!(gate_accept(leading_ms, &epoch, GateConfig::acquiring()));
    }

    /// Once a CHAIN epoch is set, acceptance must depend only on
    /// `(leading_ms - t0_ms) mod 1000` falling in the window, matching a
    /// hand-rolled modulo computed without `rem_euclid`.
    #[test]
    fn gate_acceptance_matches_hand_rolled_modulo(
        leading_ms in 0.0f64..1.0e5,
        t0_ms in 0.0f64..1.0e5,
    ) {
        let epoch = Epoch {
            t0_ms,
            source: EpochSource::Chain,
            confidence: 0.95,
        };
        let window = GateConfig::locked();
        let accepted = gate_accept(leading_ms, &epoch, window);

        let raw = (leading_ms - t0_ms) % 1000.0;
        let hand_rolled = if raw < 0.0 { raw + 1000.0 } else { raw };
        assert_relative_eq!(hand_rolled, hand_rolled.rem_euclid(1000.0), epsilon = 1e-9);
        let expect_accept = hand_rolled >= window.open_ms && hand_rolled <= window.close_ms;
        prop_assert_eq!(accepted, expect_accept);
    }

    /// The schedule clock is silent at 29 and 59 regardless of minute or
    /// station, and expects a tick everywhere else except second 0.
    #[test]
    fn schedule_silent_seconds_are_exactly_29_and_59(
        minute in 0u8..60,
        second in 0u8..60,
    ) {
        let event = schedule::expected(minute, second, Station::Wwv);
        let is_silent = matches!(event, ExpectedEvent::Silence29 | ExpectedEvent::Silence59);
        prop_assert_eq!(is_silent, second == 29 || second == 59);
        prop_assert_eq!(schedule::is_silent_second(second), second == 29 || second == 59);
    }

    /// A pulse width classifies as at most one of ZERO/ONE/POSITION_MARKER,
    /// and never as a symbol whose nominal width it falls more than 50 ms
    /// from.
    #[test]
    fn bcd_symbol_classification_respects_tolerance(pulse_ms in 0.0f64..1000.0) {
        if let Some(symbol) = BcdSymbol::classify(pulse_ms) {
            let nominal = match symbol {
                BcdSymbol::Zero => 200.0,
                BcdSymbol::One => 500.0,
                BcdSymbol::PositionMarker => 800.0,
            };
            prop_assert!((pulse_ms - nominal).abs() <= 50.0);
        }
    }

    /// Chain confidence is always clamped to `[0, 1]` no matter how
    /// irregular the fed intervals are.
    #[test]
    fn chain_confidence_always_in_unit_range(
        intervals in prop::collection::vec(500.0f64..1500.0, 1..30),
    ) {
        use wwv_sync_core::correlator::ChainTracker;
        let mut chain = ChainTracker::new(CorrelatorConfig::tick());
        let mut leading_ms = 0.0;
        let mut last_snapshot = None;
        for interval in intervals {
            leading_ms += interval;
            last_snapshot = Some(chain.ingest(leading_ms));
        }
        let snap = last_snapshot.unwrap();
        prop_assert!(snap.confidence >= 0.0 && snap.confidence <= 1.0);
    }
}
