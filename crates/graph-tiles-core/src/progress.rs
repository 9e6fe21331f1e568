//! Progress events and the broadcast channel that carries them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Pipeline phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The force simulation is ticking.
    Simulating,
    /// Tiles are being cut and stored.
    Tiling,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Simulating => write!(f, "simulating"),
            Phase::Tiling => write!(f, "tiling"),
        }
    }
}

/// Immutable snapshot of pipeline progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current: u64,
    pub max: u64,
    /// Zoom level, set for [`Phase::Tiling`] events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u32>,
}

impl ProgressEvent {
    pub fn simulating(current: u64, max: u64) -> Self {
        Self {
            phase: Phase::Simulating,
            current,
            max,
            zoom: None,
        }
    }

    pub fn tiling(current: u64, max: u64, zoom: u32) -> Self {
        Self {
            phase: Phase::Tiling,
            current,
            max,
            zoom: Some(zoom),
        }
    }

    /// Completed fraction in `[0, 1]`; an empty range counts as done.
    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            1.0
        } else {
            (self.current as f64 / self.max as f64).min(1.0)
        }
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.zoom {
            Some(zoom) => write!(f, "{} z{} {}/{}", self.phase, zoom, self.current, self.max),
            None => write!(f, "{} {}/{}", self.phase, self.current, self.max),
        }
    }
}

/// Fan-out channel for [`ProgressEvent`]s.
///
/// Publishing never blocks: events are pushed into a bounded ring buffer and
/// dropped when nobody is subscribed. A subscriber that falls more than
/// `capacity` events behind sees `RecvError::Lagged` and skips ahead.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressChannel {
    /// Default ring buffer size.
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new consumer. Only events published afterwards are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, returning how many subscribers it reached.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!(%event, "no progress subscribers");
                0
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let channel = ProgressChannel::default();
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.publish(ProgressEvent::simulating(1, 10)), 0);
    }

    #[test]
    fn dropped_receivers_stop_counting() {
        let channel = ProgressChannel::new(4);
        let a = channel.subscribe();
        let _b = channel.clone().subscribe();
        assert_eq!(channel.subscriber_count(), 2);
        assert_eq!(channel.publish(ProgressEvent::simulating(0, 1)), 2);

        drop(a);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let channel = ProgressChannel::new(8);
        let mut rx = channel.subscribe();
        channel.publish(ProgressEvent::simulating(0, 2));
        channel.publish(ProgressEvent::simulating(1, 2));
        channel.publish(ProgressEvent::tiling(1, 4, 1));

        assert_eq!(rx.try_recv().unwrap(), ProgressEvent::simulating(0, 2));
        assert_eq!(rx.try_recv().unwrap(), ProgressEvent::simulating(1, 2));
        let tile = rx.try_recv().unwrap();
        assert_eq!(tile.phase, Phase::Tiling);
        assert_eq!(tile.zoom, Some(1));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn slow_subscriber_lags_instead_of_blocking() {
        let channel = ProgressChannel::new(2);
        let mut rx = channel.subscribe();
        for i in 0..5 {
            channel.publish(ProgressEvent::simulating(i, 5));
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(_))));
        assert_eq!(rx.try_recv().unwrap().current, 3);
    }

    #[test]
    fn fraction_and_display() {
        let event = ProgressEvent::tiling(2, 8, 3);
        assert!((event.fraction() - 0.25).abs() < 1e-12);
        assert_eq!(event.to_string(), "tiling z3 2/8");
        assert_eq!(ProgressEvent::simulating(0, 0).fraction(), 1.0);
    }

    #[test]
    fn serializes_phase_in_snake_case() {
        let json = serde_json::to_string(&ProgressEvent::simulating(1, 2)).unwrap();
        assert_eq!(json, r#"{"phase":"simulating","current":1,"max":2}"#);
    }
}
