//! Scheduler core
//!
//! Owns the TCB table, the ready queue and the sleep set, and decides which
//! thread runs next. It performs no context switch itself: every operation
//! that changes the running thread returns a [`Switch`] describing which
//! context to save and which to resume, and the runtime carries it out.
//! Callers must hold the timer masked for the whole operation, including
//! the switch that follows it.

use crate::error::{ThreadError, ThreadResult};
use crate::id::Tid;
use crate::ready_queue::ReadyQueue;
use crate::sleep_set::SleepSet;
use crate::slot::SlotTable;
use crate::state::ThreadState;
use crate::tcb::Tcb;
use crate::traits::ThreadPlatform;

/// A context switch decided by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    /// Thread that was running
    pub from: Tid,
    /// Thread that runs next
    pub to: Tid,
    /// Whether `from` must be suspended (false when it was terminated)
    pub save: bool,
}

impl Switch {
    /// Whether execution actually moves to another context
    #[inline]
    pub fn is_transfer(&self) -> bool {
        !self.save || self.from != self.to
    }
}

/// Outcome of `terminate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The main thread was named; the process must release everything and exit
    Process,
    /// A non-running thread was removed; the caller keeps running
    Removed,
    /// The caller terminated itself and must switch away for good
    Switch(Switch),
}

/// The scheduler state machine
pub struct Scheduler<P: ThreadPlatform> {
    platform: P,
    table: SlotTable<Tcb<P>>,
    ready: ReadyQueue,
    sleepers: SleepSet,
    running: Tid,
    total_quantums: u64,
    quantum_usecs: u64,
    /// Stack of a thread that terminated itself, freed once off it
    graveyard: Option<P::Stack>,
    /// Scratch buffer for tick wake-ups
    woken: Vec<Tid>,
}

impl<P: ThreadPlatform> Scheduler<P> {
    /// Create the scheduler with the calling thread as tid 0.
    ///
    /// Thread 0 starts `Running` in quantum 1; `total_quantums` is 1.
    pub fn new(mut platform: P, max_threads: usize, quantum_usecs: u64) -> ThreadResult<Self> {
        if quantum_usecs == 0 {
            return Err(ThreadError::InvalidQuantum);
        }

        let mut table = SlotTable::new(max_threads);
        let main = Tcb::main(platform.main_context());
        table
            .occupy(Tid::MAIN, main)
            .map_err(|_| ThreadError::NoSlotsAvailable)?;

        Ok(Self {
            platform,
            table,
            ready: ReadyQueue::with_capacity(max_threads),
            sleepers: SleepSet::with_capacity(max_threads),
            running: Tid::MAIN,
            total_quantums: 1,
            quantum_usecs,
            graveyard: None,
            woken: Vec::with_capacity(max_threads),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[inline]
    pub fn running(&self) -> Tid {
        self.running
    }

    #[inline]
    pub fn total_quantums(&self) -> u64 {
        self.total_quantums
    }

    #[inline]
    pub fn quantum_usecs(&self) -> u64 {
        self.quantum_usecs
    }

    /// Table size (`MAX_THREADS`)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of live threads, main included
    #[inline]
    pub fn live_count(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn thread(&self, tid: Tid) -> Option<&Tcb<P>> {
        self.table.get(tid)
    }

    #[inline]
    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    #[inline]
    pub fn sleep_set(&self) -> &SleepSet {
        &self.sleepers
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Map a C-style integer to an in-range tid
    pub fn lookup(&self, raw: i64) -> ThreadResult<Tid> {
        Tid::from_raw(raw)
            .filter(|&tid| self.table.in_range(tid))
            .ok_or(ThreadError::InvalidTid(raw))
    }

    /// Quanta `tid` has been running
    pub fn quantums(&self, tid: Tid) -> ThreadResult<u64> {
        self.live(tid).map(Tcb::quantums_run)
    }

    pub fn state(&self, tid: Tid) -> ThreadResult<ThreadState> {
        self.live(tid).map(Tcb::state)
    }

    fn live(&self, tid: Tid) -> ThreadResult<&Tcb<P>> {
        if !self.table.in_range(tid) {
            return Err(ThreadError::InvalidTid(i64::from(tid.as_u32())));
        }
        self.table.get(tid).ok_or(ThreadError::NoSuchThread(tid))
    }

    fn live_mut(&mut self, tid: Tid) -> ThreadResult<&mut Tcb<P>> {
        if !self.table.in_range(tid) {
            return Err(ThreadError::InvalidTid(i64::from(tid.as_u32())));
        }
        self.table.get_mut(tid).ok_or(ThreadError::NoSuchThread(tid))
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create a thread that will start at `entry`.
    ///
    /// Claims the lowest free tid and appends it to the ready queue.
    /// A stack allocation failure comes back as a fatal `Memory` error.
    pub fn spawn(&mut self, entry: P::Entry) -> ThreadResult<Tid> {
        let tid = self.table.lowest_free().ok_or(ThreadError::NoSlotsAvailable)?;

        let stack = self.platform.allocate_stack()?;
        let context = self.platform.bootstrap_context(&stack);
        self.table
            .occupy(tid, Tcb::spawned(tid, stack, context, entry))
            .map_err(|_| ThreadError::NoSlotsAvailable)?;
        self.ready.push(tid);

        crate::ktrace!("spawned thread {}", tid);
        Ok(tid)
    }

    /// End thread `tid`.
    pub fn terminate(&mut self, tid: Tid) -> ThreadResult<Termination> {
        self.live(tid)?;

        if tid.is_main() {
            return Ok(Termination::Process);
        }
        if tid == self.running {
            return self.schedule(ThreadState::Terminated).map(Termination::Switch);
        }

        self.ready.remove(tid);
        self.sleepers.remove(tid);
        drop(self.table.release(tid));

        crate::ktrace!("terminated thread {}", tid);
        Ok(Termination::Removed)
    }

    /// Block thread `tid`.
    ///
    /// Returns a switch when the running thread blocks itself.
    pub fn block(&mut self, tid: Tid) -> ThreadResult<Option<Switch>> {
        let state = self.live(tid)?.state;
        if tid.is_main() {
            return Err(ThreadError::BlockMain);
        }

        match state {
            ThreadState::Running => self.schedule(ThreadState::Blocked).map(Some),
            ThreadState::Ready => {
                self.ready.remove(tid);
                self.live_mut(tid)?.state = ThreadState::Blocked;
                Ok(None)
            }
            ThreadState::Sleeping => {
                // Countdown keeps running; only the blocked overlay is added.
                self.live_mut(tid)?.state = ThreadState::Blocked;
                Ok(None)
            }
            ThreadState::Blocked | ThreadState::Terminated => Ok(None),
        }
    }

    /// Lift a block on `tid`. A no-op for threads that are not blocked.
    pub fn resume(&mut self, tid: Tid) -> ThreadResult<()> {
        let tcb = self.live_mut(tid)?;
        if tcb.state != ThreadState::Blocked {
            return Ok(());
        }

        if tcb.is_asleep() {
            tcb.state = ThreadState::Sleeping;
        } else {
            tcb.state = ThreadState::Ready;
            self.ready.push(tid);
        }
        Ok(())
    }

    /// Put the running thread to sleep for `quanta` timer ticks.
    pub fn sleep(&mut self, quanta: u32) -> ThreadResult<Switch> {
        if self.running.is_main() {
            return Err(ThreadError::SleepMain);
        }
        if quanta == 0 {
            return Err(ThreadError::InvalidSleep);
        }
        if self.ready.is_empty() {
            return Err(ThreadError::NothingToRun);
        }

        let tid = self.running;
        self.live_mut(tid)?.sleep_remaining = quanta;
        self.sleepers.insert(tid);
        self.schedule(ThreadState::Sleeping)
    }

    /// Timer tick: advance sleep countdowns, then preempt the running
    /// thread to the tail of the ready queue.
    pub fn tick(&mut self) -> ThreadResult<Switch> {
        let Self {
            table,
            sleepers,
            ready,
            woken,
            ..
        } = self;

        woken.clear();
        sleepers.drain_expired(woken, |tid| match table.get_mut(tid) {
            Some(tcb) => {
                tcb.sleep_remaining = tcb.sleep_remaining.saturating_sub(1);
                tcb.sleep_remaining == 0
            }
            None => true,
        });

        for &tid in woken.iter() {
            if let Some(tcb) = table.get_mut(tid) {
                if tcb.state == ThreadState::Sleeping {
                    tcb.state = ThreadState::Ready;
                    ready.push(tid);
                }
            }
        }

        self.schedule(ThreadState::Ready)
    }

    /// Move the running thread to `outgoing` and pick the next one.
    ///
    /// `Running` leaves everything as is. `Terminated` frees the slot
    /// and parks the stack until [`Scheduler::reap`].
    fn schedule(&mut self, outgoing: ThreadState) -> ThreadResult<Switch> {
        let prev = self.running;
        if outgoing == ThreadState::Running {
            return Ok(Switch {
                from: prev,
                to: prev,
                save: true,
            });
        }
        if outgoing != ThreadState::Ready && self.ready.is_empty() {
            return Err(ThreadError::NothingToRun);
        }

        match outgoing {
            ThreadState::Terminated => {
                let mut tcb = self
                    .table
                    .release(prev)
                    .ok_or(ThreadError::NoSuchThread(prev))?;
                self.graveyard = tcb.stack.take();
            }
            ThreadState::Ready => {
                self.live_mut(prev)?.state = ThreadState::Ready;
                self.ready.push(prev);
            }
            state => self.live_mut(prev)?.state = state,
        }

        let next = self.ready.pop().ok_or(ThreadError::NothingToRun)?;
        let tcb = self.live_mut(next)?;
        tcb.state = ThreadState::Running;
        tcb.quantums_run += 1;
        self.total_quantums += 1;
        self.running = next;

        crate::ktrace!("schedule {} ({}) -> {}", prev, outgoing, next);

        #[cfg(feature = "debug-assertions")]
        debug_assert_eq!(self.check_invariants(), Ok(()));

        Ok(Switch {
            from: prev,
            to: next,
            save: outgoing != ThreadState::Terminated,
        })
    }

    // ------------------------------------------------------------------
    // Runtime hooks
    // ------------------------------------------------------------------

    /// Context slot of `tid`. Stable for the thread's lifetime.
    pub fn context_ptr(&mut self, tid: Tid) -> Option<*mut P::Context> {
        self.table
            .get_mut(tid)
            .map(|tcb| &mut tcb.context as *mut P::Context)
    }

    /// Hand out the entry point of a thread about to run for the first time
    pub fn take_entry(&mut self, tid: Tid) -> Option<P::Entry> {
        self.table.get_mut(tid).and_then(|tcb| tcb.entry.take())
    }

    /// Release the stack of a thread that terminated itself.
    ///
    /// Must only be called once execution has left that stack.
    pub fn reap(&mut self) -> bool {
        self.graveyard.take().is_some()
    }

    /// Whether a self-terminated stack is waiting for [`Scheduler::reap`]
    #[inline]
    pub fn has_graveyard(&self) -> bool {
        self.graveyard.is_some()
    }

    /// Free every thread for process exit.
    ///
    /// The running thread's stack is kept alive (execution is still on
    /// it); every other stack is released. Returns how many threads were
    /// released.
    pub fn release_all(&mut self) -> usize {
        self.ready.clear();
        self.sleepers.clear();

        let running = self.running;
        let mut released = 0;
        for (tid, mut tcb) in self.table.drain() {
            if tid == running {
                if let Some(stack) = tcb.stack.take() {
                    self.graveyard = Some(stack);
                }
            }
            released += 1;
        }
        released
    }

    /// Check the table/queue invariants
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut running = 0;
        for (tid, tcb) in self.table.iter() {
            if tcb.tid() != tid {
                return Err(format!("slot {} holds tcb {}", tid, tcb.tid()));
            }
            match tcb.state {
                ThreadState::Running => {
                    running += 1;
                    if tid != self.running {
                        return Err(format!("{} running but running_tid is {}", tid, self.running));
                    }
                }
                ThreadState::Ready => {
                    if self.ready.iter().filter(|&queued| queued == tid).count() != 1 {
                        return Err(format!("ready thread {} not queued exactly once", tid));
                    }
                }
                ThreadState::Sleeping => {
                    if !tcb.is_asleep() || !self.sleepers.contains(tid) {
                        return Err(format!("sleeping thread {} has no countdown", tid));
                    }
                }
                ThreadState::Blocked => {}
                ThreadState::Terminated => {
                    return Err(format!("terminated thread {} still in table", tid));
                }
            }
            if tcb.is_asleep() != self.sleepers.contains(tid) {
                return Err(format!("sleep set disagrees with countdown of {}", tid));
            }
        }
        if running != 1 {
            return Err(format!("{} running threads", running));
        }
        for tid in self.ready.iter() {
            if self.table.get(tid).map(Tcb::state) != Some(ThreadState::Ready) {
                return Err(format!("queued thread {} is not ready", tid));
            }
        }
        for tid in self.sleepers.iter() {
            match self.table.get(tid).map(Tcb::state) {
                Some(ThreadState::Sleeping) | Some(ThreadState::Blocked) => {}
                other => return Err(format!("sleeper {} in state {:?}", tid, other)),
            }
        }
        if self.table.get(Tid::MAIN).is_none() {
            return Err("main thread missing".into());
        }
        Ok(())
    }
}

impl<P: ThreadPlatform> core::fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.running)
            .field("total_quantums", &self.total_quantums)
            .field("live", &self.table.len())
            .field("ready", &self.ready)
            .field("sleepers", &self.sleepers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<usize>>>;

    struct MockStack {
        id: usize,
        released: Log,
    }

    impl Drop for MockStack {
        fn drop(&mut self) {
            self.released.borrow_mut().push(self.id);
        }
    }

    #[derive(Debug, PartialEq)]
    enum MockContext {
        Main,
        Bootstrap(usize),
    }

    struct MockPlatform {
        next_stack: usize,
        fail_alloc: bool,
        released: Log,
    }

    impl ThreadPlatform for MockPlatform {
        type Stack = MockStack;
        type Context = MockContext;
        type Entry = &'static str;

        fn allocate_stack(&mut self) -> Result<MockStack, MemoryError> {
            if self.fail_alloc {
                return Err(MemoryError::AllocationFailed(12));
            }
            self.next_stack += 1;
            Ok(MockStack {
                id: self.next_stack,
                released: self.released.clone(),
            })
        }

        fn bootstrap_context(&mut self, stack: &MockStack) -> MockContext {
            MockContext::Bootstrap(stack.id)
        }

        fn main_context(&mut self) -> MockContext {
            MockContext::Main
        }
    }

    fn platform(released: Log) -> MockPlatform {
        MockPlatform {
            next_stack: 0,
            fail_alloc: false,
            released,
        }
    }

    fn scheduler(max: usize) -> (Scheduler<MockPlatform>, Log) {
        let released = Log::default();
        (Scheduler::new(platform(released.clone()), max, 100).unwrap(), released)
    }

    fn switch(from: u32, to: u32, save: bool) -> Switch {
        Switch {
            from: t(from),
            to: t(to),
            save,
        }
    }

    fn t(id: u32) -> Tid {
        Tid::new(id)
    }

    fn queued(s: &Scheduler<MockPlatform>) -> Vec<u32> {
        s.ready_queue().iter().map(Tid::as_u32).collect()
    }

    #[test]
    fn test_initial_state() {
        let (s, _) = scheduler(10);
        assert_eq!(s.running(), Tid::MAIN);
        assert_eq!(s.total_quantums(), 1);
        assert_eq!(s.quantums(Tid::MAIN), Ok(1));
        assert_eq!(s.state(Tid::MAIN), Ok(ThreadState::Running));
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_zero_quantum_rejected() {
        let result = Scheduler::new(platform(Log::default()), 10, 0);
        assert_eq!(result.err(), Some(ThreadError::InvalidQuantum));
    }

    #[test]
    fn test_spawn_then_tick() {
        let (mut s, _) = scheduler(10);
        assert_eq!(s.spawn("f"), Ok(t(1)));
        assert_eq!(s.quantums(t(0)), Ok(1));
        assert_eq!(s.quantums(t(1)), Ok(0));
        assert_eq!(s.thread(t(1)).unwrap().context, MockContext::Bootstrap(1));

        let sw = s.tick().unwrap();
        assert_eq!(sw, switch(0, 1, true));
        assert_eq!(s.running(), t(1));
        assert_eq!(s.quantums(t(1)), Ok(1));
        assert_eq!(s.total_quantums(), 2);
        assert_eq!(s.take_entry(t(1)), Some("f"));
        assert_eq!(s.take_entry(t(1)), None);
    }

    #[test]
    fn test_round_robin_fifo() {
        let (mut s, _) = scheduler(10);
        for _ in 0..3 {
            s.spawn("w").unwrap();
        }
        let order: Vec<u32> = (0..5).map(|_| s.tick().unwrap().to.as_u32()).collect();
        assert_eq!(order, vec![1, 2, 3, 0, 1]);
        assert_eq!(s.total_quantums(), 6);
        assert_eq!(s.quantums(t(1)), Ok(2));
        assert_eq!(s.quantums(t(0)), Ok(2));
    }

    #[test]
    fn test_tick_with_empty_queue_keeps_running() {
        let (mut s, _) = scheduler(4);
        let sw = s.tick().unwrap();
        assert!(!sw.is_transfer());
        assert_eq!(s.running(), Tid::MAIN);
        assert_eq!(s.quantums(Tid::MAIN), Ok(2));
        assert_eq!(s.total_quantums(), 2);
    }

    #[test]
    fn test_capacity() {
        let (mut s, _) = scheduler(5);
        for expected in 1..5 {
            assert_eq!(s.spawn("x"), Ok(t(expected)));
        }
        assert_eq!(s.spawn("x"), Err(ThreadError::NoSlotsAvailable));

        assert_eq!(s.terminate(t(2)), Ok(Termination::Removed));
        assert_eq!(s.spawn("y"), Ok(t(2)));
    }

    #[test]
    fn test_spawn_alloc_failure_leaves_state() {
        let (mut s, _) = scheduler(5);
        s.platform.fail_alloc = true;
        let err = s.spawn("x").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(s.live_count(), 1);
        assert!(s.ready_queue().is_empty());
    }

    #[test]
    fn test_invalid_tids() {
        let (mut s, _) = scheduler(4);
        assert_eq!(s.block(t(9)), Err(ThreadError::InvalidTid(9)));
        assert_eq!(s.resume(t(2)), Err(ThreadError::NoSuchThread(t(2))));
        assert_eq!(s.terminate(t(3)), Err(ThreadError::NoSuchThread(t(3))));
        assert_eq!(s.quantums(t(4)), Err(ThreadError::InvalidTid(4)));
        assert_eq!(s.lookup(-1), Err(ThreadError::InvalidTid(-1)));
        assert_eq!(s.lookup(4), Err(ThreadError::InvalidTid(4)));
        assert_eq!(s.lookup(3), Ok(t(3)));
    }

    #[test]
    fn test_main_cannot_block_or_sleep() {
        let (mut s, _) = scheduler(4);
        assert_eq!(s.sleep(3), Err(ThreadError::SleepMain));

        s.spawn("a").unwrap();
        s.tick().unwrap();
        assert_eq!(s.running(), t(1));
        assert_eq!(s.block(Tid::MAIN), Err(ThreadError::BlockMain));
        assert_eq!(s.sleep(0), Err(ThreadError::InvalidSleep));
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_block_ready_thread_without_switch() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.spawn("b").unwrap();
        assert_eq!(s.block(t(1)), Ok(None));
        assert_eq!(queued(&s), vec![2]);
        assert_eq!(s.state(t(1)), Ok(ThreadState::Blocked));

        // Idempotent
        assert_eq!(s.block(t(1)), Ok(None));
        assert_eq!(queued(&s), vec![2]);

        s.resume(t(1)).unwrap();
        assert_eq!(queued(&s), vec![2, 1]);
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_block_running_switches() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.tick().unwrap();

        let total = s.total_quantums();
        let sw = s.block(t(1)).unwrap().unwrap();
        assert_eq!(sw, switch(1, 0, true));
        assert_eq!(s.total_quantums(), total + 1);
        assert_eq!(s.state(t(1)), Ok(ThreadState::Blocked));
        assert!(s.ready_queue().is_empty());

        // Blocked threads are skipped by ticks
        s.tick().unwrap();
        assert_eq!(s.running(), t(0));
    }

    #[test]
    fn test_resume_is_noop_for_ready_and_running() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.resume(t(1)).unwrap();
        s.resume(t(0)).unwrap();
        assert_eq!(queued(&s), vec![1]);
        assert_eq!(s.state(t(0)), Ok(ThreadState::Running));
    }

    #[test]
    fn test_sleep_wakes_on_kth_tick() {
        let (mut s, _) = scheduler(4);
        s.spawn("sleeper").unwrap();
        s.tick().unwrap();
        assert_eq!(s.running(), t(1));

        let sw = s.sleep(3).unwrap();
        assert_eq!(sw.to, t(0));
        assert_eq!(s.state(t(1)), Ok(ThreadState::Sleeping));

        s.tick().unwrap();
        s.tick().unwrap();
        assert!(!s.ready_queue().contains(t(1)));
        assert_eq!(s.running(), t(0));

        // Third tick: countdown reaches zero, queued ahead of the preempted main
        let sw = s.tick().unwrap();
        assert_eq!(sw.to, t(1));
        assert_eq!(queued(&s), vec![0]);
        assert!(s.sleep_set().is_empty());
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_voluntary_switch_does_not_count_down() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.spawn("b").unwrap();
        s.tick().unwrap();
        s.sleep(1).unwrap();
        assert_eq!(s.running(), t(2));

        s.block(t(2)).unwrap();
        assert_eq!(s.thread(t(1)).unwrap().sleep_remaining(), 1);
    }

    #[test]
    fn test_blocked_sleeper_overlay() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.tick().unwrap();
        s.sleep(2).unwrap();

        // Block while asleep, then resume before the countdown ends
        s.block(t(1)).unwrap();
        assert_eq!(s.state(t(1)), Ok(ThreadState::Blocked));
        s.tick().unwrap();
        s.resume(t(1)).unwrap();
        assert_eq!(s.state(t(1)), Ok(ThreadState::Sleeping));
        assert!(!s.ready_queue().contains(t(1)));

        s.tick().unwrap();
        assert_eq!(s.running(), t(1));
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_blocked_sleeper_stays_blocked_after_countdown() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.tick().unwrap();
        s.sleep(1).unwrap();
        s.block(t(1)).unwrap();

        s.tick().unwrap();
        assert_eq!(s.state(t(1)), Ok(ThreadState::Blocked));
        assert!(s.sleep_set().is_empty());

        s.resume(t(1)).unwrap();
        assert_eq!(queued(&s), vec![1]);
    }

    #[test]
    fn test_terminate_self() {
        let (mut s, released) = scheduler(4);
        s.spawn("a").unwrap();
        s.spawn("b").unwrap();
        s.tick().unwrap();
        assert_eq!(s.running(), t(1));

        let outcome = s.terminate(t(1)).unwrap();
        assert_eq!(outcome, Termination::Switch(switch(1, 2, false)));
        assert!(s.thread(t(1)).is_none());
        assert!(released.borrow().is_empty());
        assert!(s.has_graveyard());

        assert!(s.reap());
        assert_eq!(*released.borrow(), vec![1]);
        assert_eq!(s.spawn("c"), Ok(t(1)));
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_terminate_other_releases_stack() {
        let (mut s, released) = scheduler(4);
        s.spawn("a").unwrap();
        s.spawn("b").unwrap();
        assert_eq!(s.terminate(t(1)), Ok(Termination::Removed));
        assert_eq!(*released.borrow(), vec![1]);
        assert_eq!(queued(&s), vec![2]);
    }

    #[test]
    fn test_terminate_sleeping_thread() {
        let (mut s, released) = scheduler(4);
        s.spawn("a").unwrap();
        s.tick().unwrap();
        s.sleep(5).unwrap();
        assert_eq!(s.terminate(t(1)), Ok(Termination::Removed));
        assert!(s.sleep_set().is_empty());
        assert_eq!(*released.borrow(), vec![1]);
        assert_eq!(s.check_invariants(), Ok(()));
    }

    #[test]
    fn test_terminate_main_ends_process() {
        let (mut s, released) = scheduler(4);
        s.spawn("a").unwrap();
        s.spawn("b").unwrap();
        s.tick().unwrap();
        assert_eq!(s.terminate(Tid::MAIN), Ok(Termination::Process));

        // Caller (thread 1) keeps its stack until the process is gone
        assert_eq!(s.release_all(), 3);
        assert_eq!(*released.borrow(), vec![2]);
        assert!(s.has_graveyard());
    }

    #[test]
    fn test_total_quantums_counts_every_schedule() {
        let (mut s, _) = scheduler(4);
        s.spawn("a").unwrap();
        s.spawn("b").unwrap();
        s.tick().unwrap(); // 2
        s.block(t(1)).unwrap(); // 3
        s.resume(t(1)).unwrap();
        s.tick().unwrap(); // 4
        assert_eq!(s.running(), t(0));
        s.tick().unwrap(); // 5
        assert_eq!(s.running(), t(1));
        s.sleep(1).unwrap(); // 6
        assert_eq!(s.total_quantums(), 6);
    }

    /// Deterministic pseudo-random op sequence; invariants after every step
    #[test]
    fn test_random_operations_preserve_invariants() {
        let (mut s, _) = scheduler(8);
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move |bound: u64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed % bound
        };

        let mut spawned = 0;
        for _ in 0..5_000 {
            let tid = t(next(8) as u32);
            let before = s.total_quantums();
            match next(6) {
                0 => {
                    if s.spawn("r").is_ok() {
                        spawned += 1;
                    }
                }
                1 if !tid.is_main() => {
                    if let Ok(Termination::Switch(_)) = s.terminate(tid) {
                        s.reap();
                    }
                }
                2 => {
                    let _ = s.block(tid);
                }
                3 => {
                    let _ = s.resume(tid);
                }
                4 => {
                    let _ = s.sleep(next(4) as u32);
                }
                _ => {
                    s.tick().unwrap();
                    assert_eq!(s.total_quantums(), before + 1);
                }
            }
            assert!(s.total_quantums() >= before);
            assert_eq!(s.check_invariants(), Ok(()));
            assert!(s.thread(Tid::MAIN).is_some());
        }
        assert!(spawned > 0);
    }
}
