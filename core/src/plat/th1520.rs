//! # TH1520 Platform Control
//!
//! [`CoreControl`] for the C910 application cluster on the TH1520. The
//! quiesce steps go through the vendor CSRs; the warm-boot plumbing goes
//! through two always-on register blocks:
//!
//! - the AON system block, holding the chip low-power-mode register, the
//!   four suspend-indicator words the boot ROM checks on the next wake,
//!   and the staged warm-entry address handed from boot ROM to the loader
//! - the AP system block, holding the per-core reset-vector base address
//!   (RVBA) registers

use ember_hal::arch::riscv64::{barriers, cache, csr};
use ember_hal::{csr_read_clear, csr_set, csr_write};
use ember_mbox::mmio::RegBank;

use crate::power::{CoreControl, IrqSnapshot, LowPowerMode};

// ============================================================================
// Register Blocks
// ============================================================================

/// AON system-register block base.
pub const AON_SYS_BASE: usize = 0xFF_FFF4_4000;
/// AP system-register block base.
pub const AP_SYS_BASE: usize = 0xFF_EF01_0000;

const BLOCK_SIZE: usize = 0x100;

// AON system block offsets
const CHIP_LP_MODE: usize = 0x10;
const STR_INDICATOR_0: usize = 0x14;
const RESERVED_REG_0: usize = 0x30;

// AP system block offsets: RVBA low/high pairs, one per core.
const CORE0_RVBA_L: usize = 0x50;

/// Application cores in the cluster.
pub const CLUSTER_CORES: usize = 4;

/// Indicator words the boot ROM matches to recognize a warm resume.
const STR_INDICATOR_MAGIC: [u32; 4] = [0x5a5a_5a5a, 0x1234_5678, 0x32fd_e438, 0x8ab4_c52c];

/// Boot-ROM-to-loader stage flag.
const BROM_STAGE_FLAG: u32 = 0xff;
/// Loader entry address staged for the boot ROM.
const LOADER_ENTRY: u32 = 0xe000_0000;

/// Chip low-power-mode register values.
const LP_HW_VAD: u32 = 1 << 16;
const LP_STANDBY: u32 = 2 << 16;

// ============================================================================
// Control
// ============================================================================

/// Hardware lifecycle control for the TH1520 cluster.
#[derive(Debug)]
pub struct Th1520Control {
    aon_sys: RegBank,
    ap_sys: RegBank,
    warm_entry: usize,
}

impl Th1520Control {
    /// Bind the cluster's register blocks.
    ///
    /// `warm_entry` is the physical address of the firmware's warm-boot
    /// vector, staged into the always-on domain so the boot ROM can jump
    /// there after a wake event.
    ///
    /// # Safety
    ///
    /// Must only be constructed on a TH1520, where the register blocks are
    /// live at their architectural addresses.
    pub unsafe fn new(warm_entry: usize) -> Self {
        unsafe { Self::with_bases(AON_SYS_BASE, AP_SYS_BASE, warm_entry) }
    }

    /// Bind against explicit block addresses.
    ///
    /// # Safety
    ///
    /// Both addresses must cover [`BLOCK_SIZE`] bytes of writable
    /// registers (or equivalent memory under test).
    pub unsafe fn with_bases(aon_sys: usize, ap_sys: usize, warm_entry: usize) -> Self {
        Self {
            aon_sys: unsafe { RegBank::new(aon_sys, BLOCK_SIZE) },
            ap_sys: unsafe { RegBank::new(ap_sys, BLOCK_SIZE) },
            warm_entry,
        }
    }
}

impl CoreControl for Th1520Control {
    fn save_and_mask_interrupts(&self) -> IrqSnapshot {
        let irq_enable = (csr::Mstatus::MIE | csr::Mstatus::SIE).bits();
        IrqSnapshot {
            mstatus: csr_read_clear!(csr::MSTATUS, irq_enable),
            mie: csr_read_clear!(csr::MIE, csr::MIE_ALL_SOURCES),
        }
    }

    fn restore_interrupts(&self, snapshot: IrqSnapshot) {
        let irq_enable = (csr::Mstatus::MIE | csr::Mstatus::SIE).bits();
        csr_set!(csr::MIE, snapshot.mie & csr::MIE_ALL_SOURCES);
        csr_set!(csr::MSTATUS, snapshot.mstatus & irq_enable);
    }

    fn disable_prefetch(&self) {
        let prefetch = (csr::Mhint::L2PLD | csr::Mhint::IPLD | csr::Mhint::DPLD).bits();
        let _ = csr_read_clear!(csr::MHINT, prefetch);
    }

    fn flush_and_disable_dcache(&self) {
        cache::dcache_clean_invalidate_all();
        cache::sync_is();
        let _ = csr_read_clear!(csr::MHCR, csr::Mhcr::DE.bits());
    }

    fn disable_coherency(&self) {
        let _ = csr_read_clear!(csr::MSMPR, csr::Msmpr::MSPEN.bits());
    }

    fn barrier(&self) {
        barriers::mb();
    }

    fn set_low_power_mode(&self, mode: LowPowerMode) {
        let value = match mode {
            LowPowerMode::HwVad => LP_HW_VAD,
            LowPowerMode::Standby => LP_STANDBY,
        };
        self.aon_sys.write(CHIP_LP_MODE, value);
    }

    fn prime_master_warm_entry(&self) {
        for (i, magic) in STR_INDICATOR_MAGIC.iter().enumerate() {
            self.aon_sys.write(STR_INDICATOR_0 + 4 * i, *magic);
        }

        // Boot-ROM -> loader hop.
        self.aon_sys.write(RESERVED_REG_0, BROM_STAGE_FLAG);
        self.aon_sys.write(RESERVED_REG_0 + 4, LOADER_ENTRY);

        // Loader -> firmware warm vector, split low/high.
        self.aon_sys
            .write(RESERVED_REG_0 + 8, self.warm_entry as u32);
        self.aon_sys
            .write(RESERVED_REG_0 + 12, (self.warm_entry as u64 >> 32) as u32);
    }

    fn prime_aux_warm_entry(&self) {
        let low = self.warm_entry as u32;
        let high = (self.warm_entry as u64 >> 32) as u32;
        for core in 0..CLUSTER_CORES {
            self.ap_sys.write(CORE0_RVBA_L + 8 * core, low);
            self.ap_sys.write(CORE0_RVBA_L + 8 * core + 4, high);
        }
    }

    fn performance_disable(&self) {
        csr_write!(csr::MSMPR, 0);
        csr_write!(csr::MHINT2, 0);
        csr_write!(csr::MHINT4, 0);
        csr_write!(csr::MCCR2, 0x0249_0009);
        csr_write!(csr::MHCR, 0x11ff);
        csr_write!(csr::MXSTATUS, 0xc063_8000);
        csr_write!(csr::MHINT, 0x2_4000);
    }

    fn wait_for_interrupt(&self) {
        barriers::wfi();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::vec;

    fn leak_block() -> usize {
        let block = vec![0u32; BLOCK_SIZE / 4].into_boxed_slice();
        Box::leak(block).as_ptr() as usize
    }

    fn peek(addr: usize) -> u32 {
        unsafe { (addr as *const u32).read_volatile() }
    }

    fn test_control(warm_entry: usize) -> (Th1520Control, usize, usize) {
        let aon = leak_block();
        let ap = leak_block();
        let ctl = unsafe { Th1520Control::with_bases(aon, ap, warm_entry) };
        (ctl, aon, ap)
    }

    #[test]
    fn test_master_warm_entry_priming() {
        let (ctl, aon, _ap) = test_control(0x1_2345_6000);
        ctl.prime_master_warm_entry();

        for (i, magic) in STR_INDICATOR_MAGIC.iter().enumerate() {
            assert_eq!(peek(aon + STR_INDICATOR_0 + 4 * i), *magic);
        }
        assert_eq!(peek(aon + RESERVED_REG_0), BROM_STAGE_FLAG);
        assert_eq!(peek(aon + RESERVED_REG_0 + 4), LOADER_ENTRY);
        assert_eq!(peek(aon + RESERVED_REG_0 + 8), 0x2345_6000);
        assert_eq!(peek(aon + RESERVED_REG_0 + 12), 0x1);
    }

    #[test]
    fn test_aux_warm_entry_primes_every_core() {
        let (ctl, _aon, ap) = test_control(0xc000_0000);
        ctl.prime_aux_warm_entry();

        for core in 0..CLUSTER_CORES {
            assert_eq!(peek(ap + CORE0_RVBA_L + 8 * core), 0xc000_0000);
            assert_eq!(peek(ap + CORE0_RVBA_L + 8 * core + 4), 0);
        }
    }

    #[test]
    fn test_low_power_mode_values() {
        let (ctl, aon, _ap) = test_control(0);
        ctl.set_low_power_mode(LowPowerMode::Standby);
        assert_eq!(peek(aon + CHIP_LP_MODE), 2 << 16);

        ctl.set_low_power_mode(LowPowerMode::HwVad);
        assert_eq!(peek(aon + CHIP_LP_MODE), 1 << 16);
    }

    #[test]
    fn test_csr_paths_are_inert_off_target() {
        let (ctl, _aon, _ap) = test_control(0);
        let snapshot = ctl.save_and_mask_interrupts();
        ctl.restore_interrupts(snapshot);
        ctl.disable_prefetch();
        ctl.flush_and_disable_dcache();
        ctl.disable_coherency();
        ctl.barrier();
        ctl.performance_disable();
    }
}
