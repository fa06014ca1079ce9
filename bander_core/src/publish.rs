//! Best-effort fan-out of machine snapshots.
//!
//! Every subscriber gets a bounded channel. A full channel drops that
//! snapshot for that subscriber only; a dropped receiver is pruned.
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel as xch;

use crate::state::MachineState;

#[derive(Clone, Default)]
pub struct SnapshotHub {
    subscribers: Arc<Mutex<Vec<xch::Sender<MachineState>>>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber that buffers at most `depth` snapshots.
    pub fn subscribe(&self, depth: usize) -> xch::Receiver<MachineState> {
        let (tx, rx) = xch::bounded(depth.max(1));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Offer `snapshot` to every subscriber without blocking.
    /// Returns how many accepted it.
    pub fn publish(&self, snapshot: &MachineState) -> usize {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        subs.retain(|tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(xch::TrySendError::Full(_)) => {
                tracing::trace!("snapshot subscriber lagging; dropped one");
                true
            }
            Err(xch::TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_subscriber_does_not_block_others() {
        let hub = SnapshotHub::new();
        let slow = hub.subscribe(1);
        let fast = hub.subscribe(8);
        let s = MachineState::default();
        assert_eq!(hub.publish(&s), 2);
        assert_eq!(hub.publish(&s), 1);
        assert_eq!(slow.len(), 1);
        assert_eq!(fast.len(), 2);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let hub = SnapshotHub::new();
        let rx = hub.subscribe(1);
        drop(rx);
        assert_eq!(hub.publish(&MachineState::default()), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
