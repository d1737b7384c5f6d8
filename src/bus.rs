//! Event bus: a single multi-producer, single-broadcast sink with
//! per-subscriber bounded channels.
//!
//! Publication never blocks the sample path. On a full subscriber
//! channel the bus drops the oldest queued message for that subscriber
//! (not the new one) and increments that subscriber's drop counter,
//! which is itself readable from the bus for observability.

use crate::correlator::ChainSnapshot;
use crate::event::DetectorEvent;
use crate::sync::SyncEvent;
use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One of the six published event families (see the telemetry channel
/// table this maps onto).
#[derive(Debug, Clone)]
pub enum BusMessage {
    Tick(DetectorEvent),
    Marker(DetectorEvent),
    BcdSymbol(DetectorEvent),
    Tone(DetectorEvent),
    Correlation { channel: &'static str, snapshot: ChainSnapshot },
    Sync(SyncEvent),
}

struct Subscription {
    tx: Sender<BusMessage>,
    rx: Receiver<BusMessage>,
    dropped: Arc<AtomicU64>,
}

/// A handle returned from [`EventBus::subscribe`]. Consumers drain it
/// with [`Subscriber::try_recv`]; the bus itself never blocks waiting for
/// a slow subscriber.
pub struct Subscriber {
    rx: Receiver<BusMessage>,
    dropped: Arc<AtomicU64>,
}

impl Subscriber {
    pub fn try_recv(&self) -> Option<BusMessage> {
        self.rx.try_recv().ok()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Register a new subscriber with a bounded inbox of `capacity`
    /// messages.
    pub fn subscribe(&mut self, capacity: usize) -> Subscriber {
        let (tx, rx) = bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        self.subscriptions.push(Subscription {
            tx,
            rx: rx.clone(),
            dropped: dropped.clone(),
        });
        Subscriber { rx, dropped }
    }

    /// Publish to every subscriber. Never blocks: a full channel has its
    /// oldest entry evicted to make room, never the reverse.
    pub fn publish(&self, message: BusMessage) {
        for sub in &self.subscriptions {
            let mut to_send = message.clone();
            loop {
                match sub.tx.try_send(to_send) {
                    Ok(()) => break,
                    Err(TrySendError::Full(returned)) => {
                        to_send = returned;
                        match sub.rx.try_recv() {
                            Ok(_) => {
                                sub.dropped.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                                sub.dropped.fetch_add(1, Ordering::Relaxed);
                                break;
                            }
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    fn tick_message() -> BusMessage {
        BusMessage::Tick(DetectorEvent {
            leading_ms: 0.0,
            trailing_ms: 5.0,
            duration_ms: 5.0,
            peak_energy: 1.0,
            baseline: 0.1,
            threshold: 0.3,
            payload: EventPayload::Tick { long_pulse: false },
        })
    }

    #[test]
    fn subscriber_receives_published_messages() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(4);
        bus.publish(tick_message());
        assert!(matches!(sub.try_recv(), Some(BusMessage::Tick(_))));
    }

    #[test]
    fn overflow_drops_oldest_and_counts_it() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(2);
        for _ in 0..5 {
            bus.publish(tick_message());
        }
        assert!(sub.dropped_count() >= 3);
        // Channel still holds exactly its capacity, not blocked/broken.
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn never_blocks_with_no_subscribers() {
        let bus = EventBus::new();
        bus.publish(tick_message());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
