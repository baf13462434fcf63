use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::{PollScope, SlotView};

/// One applied poll result: the entire authoritative slot collection for a
/// scope at a point in time.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    /// Issue-order sequence number of the request that produced this.
    pub seq: u64,
    pub scope: PollScope,
    pub polled_at_ms: i64,
    pub slots: Vec<SlotView>,
}

#[derive(Default)]
struct BoardInner {
    applied_seq: u64,
    snapshot: Option<SlotSnapshot>,
}

/// Latest authoritative slot snapshot.
///
/// Single writer (the poller), any number of readers. Every application is
/// a wholesale replacement; responses that were superseded while in flight
/// are rejected by sequence number, so completion order cannot resurrect a
/// stale scope.
#[derive(Clone, Default)]
pub struct SlotBoard {
    inner: Arc<RwLock<BoardInner>>,
}

impl SlotBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a poll result. Returns false when a newer request already
    /// landed; the caller drops the stale snapshot.
    pub async fn apply(&self, snapshot: SlotSnapshot) -> bool {
        let mut g = self.inner.write().await;
        if snapshot.seq < g.applied_seq {
            return false;
        }
        g.applied_seq = snapshot.seq;
        g.snapshot = Some(snapshot);
        true
    }

    pub async fn snapshot(&self) -> Option<SlotSnapshot> {
        self.inner.read().await.snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PollScope;

    fn snapshot(seq: u64, lot_id: i64) -> SlotSnapshot {
        SlotSnapshot {
            seq,
            scope: PollScope {
                lot_id,
                vehicle_type: None,
            },
            polled_at_ms: 0,
            slots: vec![],
        }
    }

    #[tokio::test]
    async fn stale_response_is_rejected() {
        let board = SlotBoard::new();

        assert!(board.apply(snapshot(2, 20)).await);
        // A slower request issued earlier completes afterwards.
        assert!(!board.apply(snapshot(1, 10)).await);

        let current = board.snapshot().await.unwrap();
        assert_eq!(current.seq, 2);
        assert_eq!(current.scope.lot_id, 20);
    }

    #[tokio::test]
    async fn newer_response_replaces_wholesale() {
        let board = SlotBoard::new();
        assert!(board.apply(snapshot(1, 10)).await);
        assert!(board.apply(snapshot(2, 10)).await);
        assert_eq!(board.snapshot().await.unwrap().seq, 2);
    }
}
