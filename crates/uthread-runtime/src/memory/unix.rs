//! Unix stack implementation using mmap

use super::round_to_page;
use nix::errno::Errno;
use std::ptr::NonNull;
use uthread_core::constants::GUARD_SIZE;
use uthread_core::error::MemoryError;

/// System page size, falling back to the guard size constant
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        GUARD_SIZE
    }
}

/// One thread's stack: `[guard | usable]`, growing down from `top()`
pub struct StackRegion {
    base: NonNull<u8>,
    total: usize,
    guard: usize,
}

impl StackRegion {
    /// Map a stack with at least `stack_size` usable bytes.
    pub fn allocate(stack_size: usize) -> Result<Self, MemoryError> {
        if stack_size == 0 {
            return Err(MemoryError::InvalidSize(stack_size));
        }

        let guard = page_size();
        let total = round_to_page(stack_size, guard)
            .and_then(|usable| usable.checked_add(guard))
            .ok_or(MemoryError::InvalidSize(stack_size))?;

        // SAFETY: anonymous private mapping, no address hint.
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                total,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed(Errno::last() as i32));
        }
        let base = NonNull::new(base.cast::<u8>()).ok_or(MemoryError::AllocationFailed(0))?;

        // Guard page at the low end; stacks grow down into it on overflow
        // SAFETY: the first `guard` bytes belong to the mapping just created.
        let ret = unsafe { libc::mprotect(base.as_ptr().cast(), guard, libc::PROT_NONE) };
        if ret != 0 {
            let errno = Errno::last() as i32;
            // SAFETY: unmapping the region created above.
            unsafe { libc::munmap(base.as_ptr().cast(), total) };
            return Err(MemoryError::ProtectionFailed(errno));
        }

        Ok(Self { base, total, guard })
    }

    /// One past the highest usable byte (initial stack pointer)
    #[inline]
    pub fn top(&self) -> *mut u8 {
        // SAFETY: `total` is the mapping length.
        unsafe { self.base.as_ptr().add(self.total) }
    }

    /// Lowest usable byte, just above the guard page
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        // SAFETY: `guard < total`.
        unsafe { self.base.as_ptr().add(self.guard) }
    }

    #[inline]
    pub fn usable_size(&self) -> usize {
        self.total - self.guard
    }

    #[inline]
    pub fn guard_size(&self) -> usize {
        self.guard
    }

    /// Whether `addr` lies in the usable part of this stack
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.bottom() as usize && addr < self.top() as usize
    }
}

impl Drop for StackRegion {
    fn drop(&mut self) {
        // SAFETY: `base`/`total` describe a mapping owned by this value.
        unsafe {
            libc::munmap(self.base.as_ptr().cast(), self.total);
        }
    }
}

impl std::fmt::Debug for StackRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackRegion")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("usable", &self.usable_size())
            .finish()
    }
}
