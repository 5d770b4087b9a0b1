//! Stack memory for spawned threads
//!
//! Each thread gets its own anonymous mapping with a `PROT_NONE` guard page
//! below the usable stack, so an overflow faults instead of corrupting a
//! neighbour. The mapping is released when the [`StackRegion`] is dropped.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::*;
    } else {
        compile_error!("uthread stacks require a unix target");
    }
}

/// Round `size` up to a multiple of `page`. `None` on overflow.
#[inline]
pub fn round_to_page(size: usize, page: usize) -> Option<usize> {
    debug_assert!(page.is_power_of_two());
    size.checked_add(page - 1).map(|s| s & !(page - 1))
}
