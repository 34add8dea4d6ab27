//! # Memory Barriers and Wait Primitives
//!
//! Ordering and idle primitives used around mailbox sends and low-power
//! entry. Device-register writes must be committed before a doorbell bit is
//! raised, and before a hart enters any low-power state.

/// Full memory and I/O barrier (`fence iorw, iorw`).
#[inline]
pub fn mb() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("fence iorw, iorw", options(nostack));
    }
    #[cfg(not(target_arch = "riscv64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Hardware wait-for-interrupt.
///
/// For a hart that has been hotplugged out this never returns through
/// normal control flow; the hart is reanimated at the warm entry point.
#[inline]
pub fn wfi() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }
}

/// Polite busy-wait hint for spin loops.
#[inline(always)]
pub fn cpu_relax() {
    core::hint::spin_loop();
}

/// Park the calling hart forever.
///
/// Used for unrecoverable configuration errors, where returning would let
/// the hart go on to corrupt shared state.
pub fn hang() -> ! {
    loop {
        wfi();
        cpu_relax();
    }
}
