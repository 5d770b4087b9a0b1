//! Fixed-capacity slot table for thread control blocks
//!
//! Slots are indexed by tid. Allocation always claims the lowest free
//! index, so identifiers of terminated threads are reused first-fit.

use crate::id::Tid;

/// One table entry
#[derive(Debug)]
pub enum Slot<T> {
    Free,
    Occupied(T),
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }
}

/// Arena of `capacity` slots; never grows after construction
#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    occupied: usize,
}

impl<T> SlotTable<T> {
    /// Create a table with every slot free
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Free);
        Self { slots, occupied: 0 }
    }

    /// Total number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Whether `tid` indexes into the table
    #[inline]
    pub fn in_range(&self, tid: Tid) -> bool {
        tid.as_usize() < self.slots.len()
    }

    /// Lowest free slot, if any
    pub fn lowest_free(&self) -> Option<Tid> {
        self.slots
            .iter()
            .position(Slot::is_free)
            .map(|idx| Tid::new(idx as u32))
    }

    /// Store `value` in the free slot `tid`.
    ///
    /// Returns the value back if the slot is taken or out of range.
    pub fn occupy(&mut self, tid: Tid, value: T) -> Result<(), T> {
        match self.slots.get_mut(tid.as_usize()) {
            Some(slot @ Slot::Free) => {
                *slot = Slot::Occupied(value);
                self.occupied += 1;
                Ok(())
            }
            _ => Err(value),
        }
    }

    /// Free slot `tid`, handing back what it held
    pub fn release(&mut self, tid: Tid) -> Option<T> {
        let slot = self.slots.get_mut(tid.as_usize())?;
        match std::mem::replace(slot, Slot::Free) {
            Slot::Occupied(value) => {
                self.occupied -= 1;
                Some(value)
            }
            Slot::Free => None,
        }
    }

    #[inline]
    pub fn get(&self, tid: Tid) -> Option<&T> {
        match self.slots.get(tid.as_usize()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut T> {
        match self.slots.get_mut(tid.as_usize()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Occupied slots in tid order
    pub fn iter(&self) -> impl Iterator<Item = (Tid, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| match slot {
            Slot::Occupied(value) => Some((Tid::new(idx as u32), value)),
            Slot::Free => None,
        })
    }

    /// Free every slot, returning the held values in tid order
    pub fn drain(&mut self) -> Vec<(Tid, T)> {
        let mut out = Vec::with_capacity(self.occupied);
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied(value) = std::mem::replace(slot, Slot::Free) {
                out.push((Tid::new(idx as u32), value));
            }
        }
        self.occupied = 0;
        out
    }
}
