//! # Hart Boot Synchronization
//!
//! The two pieces of state genuinely shared for read/write across harts:
//! the available-hart mask and the cold-boot gate. Both live behind their
//! own spinlock, held only across the load-modify-store, never across a
//! poll loop or a blocking instruction.

use ember_hal::arch::riscv64::barriers::{cpu_relax, hang};
use ember_hal::HartId;
use spin::Mutex;

/// Width of the available-hart mask: one bit per hart, machine word sized.
pub const MASK_BITS: usize = usize::BITS as usize;

/// Shared hart-coordination state, created once at firmware load and never
/// destroyed.
pub struct HartSync {
    avail: Mutex<usize>,
    coldboot_released: Mutex<bool>,
}

impl HartSync {
    /// Create the state: empty mask, closed gate.
    pub const fn new() -> Self {
        Self {
            avail: Mutex::new(0),
            coldboot_released: Mutex::new(false),
        }
    }

    /// Announce `hart` as available.
    ///
    /// The bit is set only while the hart is online; the lifecycle clears
    /// it before any power transition.
    pub fn mark_available(&self, hart: HartId) {
        if hart.fits_mask() {
            *self.avail.lock() |= 1 << hart.as_usize();
        }
    }

    /// Withdraw `hart` from the available mask.
    pub fn unmark_available(&self, hart: HartId) {
        if hart.fits_mask() {
            *self.avail.lock() &= !(1 << hart.as_usize());
        }
    }

    /// Snapshot of the available-hart mask.
    pub fn available_mask(&self) -> usize {
        *self.avail.lock()
    }

    /// Open the cold-boot gate. Idempotent: opening an open gate is a
    /// success no-op.
    pub fn publish_coldboot_release(&self) {
        *self.coldboot_released.lock() = true;
    }

    /// Busy-wait until the cold-boot hart opens the gate.
    ///
    /// Only used during the initial boot window, so there is no timeout.
    /// A hart id at or past the mask width or the platform's hart count is
    /// a configuration error: the hart parks forever rather than going on
    /// to corrupt shared state.
    pub fn wait_for_coldboot_release(&self, hart: HartId, hart_count: usize) {
        if hart.as_usize() >= hart_count || !hart.fits_mask() {
            hang();
        }
        loop {
            let released = *self.coldboot_released.lock();
            if released {
                break;
            }
            cpu_relax();
        }
    }
}

impl Default for HartSync {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HartSync {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HartSync")
            .field("available_mask", &self.available_mask())
            .finish()
    }
}

/// Firmware-lifetime instance shared by every hart.
pub static HART_SYNC: HartSync = HartSync::new();

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use std::{thread, vec::Vec};

    #[test]
    fn test_mark_unmark_no_cross_talk() {
        let sync = HartSync::new();
        sync.mark_available(HartId::new(0));
        sync.mark_available(HartId::new(5));
        assert_eq!(sync.available_mask(), 0b10_0001);

        sync.unmark_available(HartId::new(0));
        assert_eq!(sync.available_mask(), 0b10_0000);

        // Clearing a clear bit leaves the others alone.
        sync.unmark_available(HartId::new(3));
        assert_eq!(sync.available_mask(), 0b10_0000);
    }

    #[test]
    fn test_out_of_range_hart_ignored_by_mask_ops() {
        let sync = HartSync::new();
        sync.mark_available(HartId::new(MASK_BITS));
        assert_eq!(sync.available_mask(), 0);
    }

    #[test]
    fn test_coldboot_release_is_idempotent() {
        let sync = HartSync::new();
        sync.publish_coldboot_release();
        sync.publish_coldboot_release();
        sync.wait_for_coldboot_release(HartId::new(1), 4);
    }

    #[test]
    fn test_waiters_block_until_release() {
        static SYNC: HartSync = HartSync::new();
        static WOKE: AtomicUsize = AtomicUsize::new(0);

        let waiters: Vec<_> = (1..4)
            .map(|hart| {
                thread::spawn(move || {
                    SYNC.wait_for_coldboot_release(HartId::new(hart), 4);
                    WOKE.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        // Nobody may pass a closed gate.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(WOKE.load(Ordering::SeqCst), 0);

        SYNC.publish_coldboot_release();
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert_eq!(WOKE.load(Ordering::SeqCst), 3);
    }
}
