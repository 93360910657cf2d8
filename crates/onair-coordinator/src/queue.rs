//! Waiting line for the on-air slot
//!
//! Fast-pass entries cluster at the front in arrival order; standard
//! entries follow, also in arrival order. A connection holds at most one
//! entry and never queues while it is on air.

use std::collections::VecDeque;

use thiserror::Error;

use onair_core::{CoordinatorError, Priority};
use onair_protocol::ConnectionId;

/// A contender waiting for the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    /// Waiting connection
    pub connection: ConnectionId,
    /// Placement class
    pub priority: Priority,
}

/// Queue operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Connection is already queued or on air
    #[error("Connection {0} already holds a slot")]
    DuplicateEntry(ConnectionId),
}

impl From<QueueError> for CoordinatorError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::DuplicateEntry(id) => CoordinatorError::DuplicateQueueEntry(id.to_string()),
        }
    }
}

/// Ordered waiting line
#[derive(Debug, Default)]
pub struct BroadcastQueue {
    entries: VecDeque<QueueEntry>,
}

impl BroadcastQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contender and return its 1-based position.
    ///
    /// `on_air` is the connection currently holding the slot, which may not
    /// queue behind itself.
    pub fn enqueue(
        &mut self,
        connection: ConnectionId,
        priority: Priority,
        on_air: Option<ConnectionId>,
    ) -> Result<usize, QueueError> {
        if on_air == Some(connection) || self.contains(&connection) {
            return Err(QueueError::DuplicateEntry(connection));
        }

        let entry = QueueEntry {
            connection,
            priority,
        };
        let index = match priority {
            Priority::Standard => self.entries.len(),
            Priority::FastPass => self
                .entries
                .iter()
                .take_while(|e| e.priority.is_fast_pass())
                .count(),
        };
        self.entries.insert(index, entry);
        Ok(index + 1)
    }

    /// Remove and return the front entry
    pub fn dequeue_head(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Remove a connection wherever it sits; returns whether it was queued
    pub fn remove(&mut self, connection: &ConnectionId) -> bool {
        match self.index_of(connection) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// 1-based rank of every entry, front first
    pub fn positions(&self) -> Vec<(ConnectionId, usize)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.connection, index + 1))
            .collect()
    }

    /// 1-based rank of one connection
    pub fn position_of(&self, connection: &ConnectionId) -> Option<usize> {
        self.index_of(connection).map(|index| index + 1)
    }

    /// Front entry without removing it
    pub fn head(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// Whether a connection is queued
    pub fn contains(&self, connection: &ConnectionId) -> bool {
        self.index_of(connection).is_some()
    }

    /// Entries front to back
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, connection: &ConnectionId) -> Option<usize> {
        self.entries.iter().position(|e| e.connection == *connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn order(queue: &BroadcastQueue) -> Vec<ConnectionId> {
        queue.iter().map(|e| e.connection).collect()
    }

    #[test]
    fn test_standard_entries_are_fifo() {
        let mut queue = BroadcastQueue::new();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());

        assert_eq!(queue.enqueue(a, Priority::Standard, None), Ok(1));
        assert_eq!(queue.enqueue(b, Priority::Standard, None), Ok(2));
        assert_eq!(queue.enqueue(c, Priority::Standard, None), Ok(3));
        assert_eq!(order(&queue), vec![a, b, c]);
    }

    #[test]
    fn test_fast_pass_jumps_standard_entries() {
        let mut queue = BroadcastQueue::new();
        let on_air = ConnectionId::new();
        let (y, z) = (ConnectionId::new(), ConnectionId::new());

        queue.enqueue(y, Priority::Standard, Some(on_air)).unwrap();
        assert_eq!(queue.enqueue(z, Priority::FastPass, Some(on_air)), Ok(1));
        assert_eq!(order(&queue), vec![z, y]);
    }

    #[test]
    fn test_fast_pass_clusters_in_arrival_order() {
        let mut queue = BroadcastQueue::new();
        let ids: Vec<ConnectionId> = (0..5).map(|_| ConnectionId::new()).collect();

        queue.enqueue(ids[0], Priority::Standard, None).unwrap();
        queue.enqueue(ids[1], Priority::FastPass, None).unwrap();
        queue.enqueue(ids[2], Priority::Standard, None).unwrap();
        queue.enqueue(ids[3], Priority::FastPass, None).unwrap();
        queue.enqueue(ids[4], Priority::FastPass, None).unwrap();

        assert_eq!(order(&queue), vec![ids[1], ids[3], ids[4], ids[0], ids[2]]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut queue = BroadcastQueue::new();
        let a = ConnectionId::new();

        queue.enqueue(a, Priority::Standard, None).unwrap();
        assert_eq!(
            queue.enqueue(a, Priority::FastPass, None),
            Err(QueueError::DuplicateEntry(a))
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_broadcaster_cannot_queue() {
        let mut queue = BroadcastQueue::new();
        let a = ConnectionId::new();

        assert_eq!(
            queue.enqueue(a, Priority::Standard, Some(a)),
            Err(QueueError::DuplicateEntry(a))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_and_positions() {
        let mut queue = BroadcastQueue::new();
        let (a, b, c) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());
        for id in [a, b, c] {
            queue.enqueue(id, Priority::Standard, None).unwrap();
        }

        assert!(queue.remove(&b));
        assert!(!queue.remove(&b));
        assert_eq!(queue.positions(), vec![(a, 1), (c, 2)]);
        assert_eq!(queue.position_of(&c), Some(2));

        assert_eq!(queue.dequeue_head().map(|e| e.connection), Some(a));
        assert_eq!(queue.head().map(|e| e.connection), Some(c));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Enqueue(usize, bool),
        Remove(usize),
        Dequeue,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..8usize, any::<bool>()).prop_map(|(i, p)| Op::Enqueue(i, p)),
            (0..8usize).prop_map(Op::Remove),
            Just(Op::Dequeue),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn entries_unique_and_fast_pass_grouped(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let ids: Vec<ConnectionId> = (0..8).map(|_| ConnectionId::new()).collect();
            let mut queue = BroadcastQueue::new();

            for op in ops {
                match op {
                    Op::Enqueue(i, fast) => {
                        let _ = queue.enqueue(ids[i], Priority::from(fast), None);
                    }
                    Op::Remove(i) => {
                        queue.remove(&ids[i]);
                    }
                    Op::Dequeue => {
                        queue.dequeue_head();
                    }
                }

                let unique: HashSet<ConnectionId> = queue.iter().map(|e| e.connection).collect();
                prop_assert_eq!(unique.len(), queue.len());

                let fast_prefix = queue.iter().take_while(|e| e.priority.is_fast_pass()).count();
                let fast_total = queue.iter().filter(|e| e.priority.is_fast_pass()).count();
                prop_assert_eq!(fast_prefix, fast_total);
            }
        }
    }
}
