//! Set of threads counting down a sleep
//!
//! Membership only; the countdown itself lives in each TCB. Kept in
//! insertion order so wake-ups on the same tick are queued in the order
//! the threads went to sleep.

use crate::id::Tid;

#[derive(Debug)]
pub struct SleepSet {
    members: Vec<Tid>,
}

impl SleepSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, tid: Tid) {
        if !self.contains(tid) {
            self.members.push(tid);
        }
    }

    /// Returns whether `tid` was a member
    pub fn remove(&mut self, tid: Tid) -> bool {
        match self.members.iter().position(|&member| member == tid) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, tid: Tid) -> bool {
        self.members.contains(&tid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tid> + '_ {
        self.members.iter().copied()
    }

    /// Remove every member for which `expired` returns true, appending
    /// them to `out` in set order. `expired` sees each member exactly once.
    pub fn drain_expired<F>(&mut self, out: &mut Vec<Tid>, mut expired: F)
    where
        F: FnMut(Tid) -> bool,
    {
        self.members.retain(|&tid| {
            if expired(tid) {
                out.push(tid);
                false
            } else {
                true
            }
        });
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}
