//! Cancellable deadline queue on a virtual millisecond clock.
//!
//! Highlight auto-expiry must not depend on host timers: the engine owns an
//! explicit delayed-task queue whose clock only moves when the host calls
//! `advance_to`. Tests advance it directly instead of sleeping.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Handle for cancelling a scheduled deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeadlineToken(u64);

/// Min-heap of pending deadlines keyed by due time.
#[derive(Debug, Default)]
pub struct DeadlineQueue {
    heap: BinaryHeap<Reverse<(u64, u64)>>,
    cancelled: HashSet<u64>,
    next_token: u64,
    now_ms: u64,
}

impl DeadlineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule a deadline `ttl_ms` from now. Returns the cancellation
    /// token and the absolute due time.
    pub fn schedule(&mut self, ttl_ms: u64) -> (DeadlineToken, u64) {
        self.next_token += 1;
        let token = self.next_token;
        let due = self.now_ms.saturating_add(ttl_ms);
        self.heap.push(Reverse((due, token)));
        (DeadlineToken(token), due)
    }

    /// Cancel a pending deadline. Cancelling an already-expired or unknown
    /// token is a no-op.
    pub fn cancel(&mut self, token: DeadlineToken) {
        self.cancelled.insert(token.0);
    }

    /// Move virtual time forward and pop every deadline now due.
    ///
    /// Time never moves backwards; a stale `now_ms` is ignored.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<DeadlineToken> {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
        let mut due = Vec::new();
        while let Some(&Reverse((deadline, token))) = self.heap.peek() {
            if deadline > self.now_ms {
                break;
            }
            self.heap.pop();
            if !self.cancelled.remove(&token) {
                due.push(DeadlineToken(token));
            }
        }
        due
    }

    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    /// Drop every pending deadline without firing it.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.cancelled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let mut q = DeadlineQueue::new();
        let (_, due) = q.schedule(3000);
        assert_eq!(due, 3000);
        assert!(q.advance_to(2999).is_empty());
        assert_eq!(q.advance_to(3001).len(), 1);
        assert_eq!(q.pending(), 0);
    }

    #[test]
    fn test_cancel_suppresses_firing() {
        let mut q = DeadlineQueue::new();
        let (token, _) = q.schedule(100);
        let (kept, _) = q.schedule(100);
        q.cancel(token);
        let fired = q.advance_to(200);
        assert_eq!(fired, vec![kept]);
    }

    #[test]
    fn test_due_order_is_deadline_order() {
        let mut q = DeadlineQueue::new();
        let (late, _) = q.schedule(500);
        let (early, _) = q.schedule(100);
        let fired = q.advance_to(1000);
        assert_eq!(fired, vec![early, late]);
    }

    #[test]
    fn test_time_never_moves_backwards() {
        let mut q = DeadlineQueue::new();
        q.advance_to(1000);
        q.advance_to(400);
        assert_eq!(q.now_ms(), 1000);
        // New schedules are relative to the high-water mark.
        let (_, due) = q.schedule(50);
        assert_eq!(due, 1050);
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut q = DeadlineQueue::new();
        q.schedule(10);
        q.schedule(20);
        q.clear();
        assert!(q.advance_to(100).is_empty());
    }
}
