//! Thread identifier type

use core::fmt;

/// Identifier of a user-level thread
///
/// A small index into the TCB table. `Tid::MAIN` (0) is the thread that
/// called `init`; it is never spawned. Identifiers of terminated threads
/// are handed out again by later spawns.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Tid(u32);

impl Tid {
    /// The initial thread
    pub const MAIN: Tid = Tid(0);

    #[inline]
    pub const fn new(id: u32) -> Self {
        Tid(id)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }

    /// Build a tid from a raw (possibly negative) C-style integer.
    ///
    /// Returns `None` for negative values; range against the table is
    /// checked by the scheduler.
    #[inline]
    pub fn from_raw(raw: i64) -> Option<Tid> {
        u32::try_from(raw).ok().map(Tid)
    }
}

impl From<u32> for Tid {
    #[inline]
    fn from(id: u32) -> Self {
        Tid(id)
    }
}

impl From<Tid> for u32 {
    #[inline]
    fn from(id: Tid) -> Self {
        id.0
    }
}

impl fmt::Debug for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tid({})", self.0)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
