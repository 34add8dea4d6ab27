//! # Cache Maintenance
//!
//! The C9xx cores carry vendor cache-maintenance instructions beyond the
//! base ISA. The two the power lifecycle needs are the full D-cache
//! clean-and-invalidate and the instruction-stream synchronization that
//! must follow it. Neither has an assembler mnemonic, so both are emitted
//! as raw instruction words.

/// `dcache.ciall` instruction word: clean and invalidate the whole D-cache.
#[cfg(target_arch = "riscv64")]
const DCACHE_CIALL_INSN: u32 = 0x0030_000b;

/// `sync.is` instruction word: synchronize the instruction stream across
/// the cluster after cache maintenance.
#[cfg(target_arch = "riscv64")]
const SYNC_IS_INSN: u32 = 0x01b0_000b;

/// Synchronize instruction fetch with preceding stores (`fence.i`).
#[inline]
pub fn fence_i() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("fence.i", options(nostack));
    }
}

/// Clean and invalidate the entire data cache.
#[inline]
pub fn dcache_clean_invalidate_all() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!(".word {insn}", insn = const DCACHE_CIALL_INSN, options(nostack));
    }
}

/// Broadcast instruction-stream synchronization.
#[inline]
pub fn sync_is() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!(".word {insn}", insn = const SYNC_IS_INSN, options(nostack));
    }
}
