//! FIFO ready queue
//!
//! Append at the tail when a thread becomes ready, take from the head
//! when scheduling. Capacity is reserved up front so pushes never
//! allocate on the tick path.

use crate::id::Tid;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct ReadyQueue {
    queue: VecDeque<Tid>,
}

impl ReadyQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    /// Append to the tail
    #[inline]
    pub fn push(&mut self, tid: Tid) {
        debug_assert!(!self.contains(tid), "tid {} queued twice", tid);
        self.queue.push_back(tid);
    }

    /// Take the longest-waiting thread
    #[inline]
    pub fn pop(&mut self) -> Option<Tid> {
        self.queue.pop_front()
    }

    /// Drop `tid` from wherever it sits. Returns whether it was queued.
    pub fn remove(&mut self, tid: Tid) -> bool {
        match self.queue.iter().position(|&queued| queued == tid) {
            Some(idx) => {
                self.queue.remove(idx);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, tid: Tid) -> bool {
        self.queue.contains(&tid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Head-to-tail order
    pub fn iter(&self) -> impl Iterator<Item = Tid> + '_ {
        self.queue.iter().copied()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
