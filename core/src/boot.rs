//! # Firmware Entry Paths
//!
//! Two distinct code paths lead out of the reset vector:
//!
//! - the **cold path**, run once per hart on first boot: one elected hart
//!   performs the shared one-time initialization while every other hart
//!   waits on the cold-boot gate
//! - the **warm path**, taken when a sleeping or hotplugged-out core is
//!   reanimated: straight to the resume sequence, skipping the cold-only
//!   steps
//!
//! The split is decided by a per-hart passed-cold-boot-once marker, not by
//! re-entering a function through a non-local jump. In hardware the marker
//! survives retention because the firmware image (and its data) stays in
//! always-powered RAM across the states this firmware drives.

use core::sync::atomic::{AtomicBool, Ordering};

use ember_hal::arch::riscv64::barriers::hang;
use ember_hal::HartId;
use log::info;

use crate::power::{HartLifecycle, PrivilegedInit};
use crate::sync::{HartSync, MASK_BITS};

/// Most harts the available-mask can describe.
pub const MAX_HARTS: usize = MASK_BITS;

// ============================================================================
// Cold-Boot Ledger
// ============================================================================

/// Per-hart record of whether the hart has been through cold boot.
pub struct BootLedger {
    passed: [AtomicBool; MAX_HARTS],
}

impl BootLedger {
    /// Fresh ledger: no hart has booted.
    pub const fn new() -> Self {
        const UNSET: AtomicBool = AtomicBool::new(false);
        Self {
            passed: [UNSET; MAX_HARTS],
        }
    }

    /// Whether `hart` already went through the cold path.
    pub fn has_passed(&self, hart: HartId) -> bool {
        self.passed
            .get(hart.as_usize())
            .is_some_and(|p| p.load(Ordering::Acquire))
    }

    fn mark_passed(&self, hart: HartId) {
        if let Some(passed) = self.passed.get(hart.as_usize()) {
            passed.store(true, Ordering::Release);
        }
    }
}

impl Default for BootLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for BootLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootLedger").finish_non_exhaustive()
    }
}

/// Firmware-lifetime ledger.
pub static BOOT_LEDGER: BootLedger = BootLedger::new();

// ============================================================================
// Entry Flow
// ============================================================================

/// Topology facts and collaborators injected into the boot flow.
pub struct Platform<'a> {
    /// Harts on this platform.
    pub hart_count: usize,
    /// Hart elected to run the shared cold-boot initialization.
    pub coldboot_hart: HartId,
    /// PMP and trap-delegation setup, run per hart on boot and resume.
    pub privileged: &'a dyn PrivilegedInit,
    /// Shared hart-coordination state.
    pub sync: &'a HartSync,
    /// Per-hart cold-boot markers.
    pub ledger: &'a BootLedger,
}

impl core::fmt::Debug for Platform<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Platform")
            .field("hart_count", &self.hart_count)
            .field("coldboot_hart", &self.coldboot_hart)
            .finish_non_exhaustive()
    }
}

/// Per-hart firmware entry.
///
/// Reached from the reset vector on first boot and from the warm vector
/// after a wake event. A platform whose hart count exceeds the mask width,
/// or a hart id outside the declared count, is a configuration error that
/// parks the hart.
pub fn firmware_entry(plat: &Platform<'_>, lifecycle: &mut HartLifecycle<'_>, hart: HartId) {
    if plat.hart_count > MAX_HARTS || hart.as_usize() >= plat.hart_count {
        hang();
    }

    if plat.ledger.has_passed(hart) {
        // Warm path: reanimated after retention or hotplug-in.
        lifecycle.resume(plat.privileged);
        return;
    }
    plat.ledger.mark_passed(hart);

    if hart == plat.coldboot_hart {
        if plat.privileged.initialize(hart).is_err() {
            hang();
        }
        plat.sync.mark_available(hart);
        info!("cold boot complete on {hart}; releasing held harts");
        plat.sync.publish_coldboot_release();
    } else {
        plat.sync.wait_for_coldboot_release(hart, plat.hart_count);
        if plat.privileged.initialize(hart).is_err() {
            hang();
        }
        plat.sync.mark_available(hart);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::{CoreControl, HartPowerState, IrqSnapshot, LowPowerMode};
    use ember_hal::Result;
    use ember_pm::aon::AonClient;
    use std::boxed::Box;

    struct NopControl;

    impl CoreControl for NopControl {
        fn save_and_mask_interrupts(&self) -> IrqSnapshot {
            IrqSnapshot::default()
        }
        fn restore_interrupts(&self, _snapshot: IrqSnapshot) {}
        fn disable_prefetch(&self) {}
        fn flush_and_disable_dcache(&self) {}
        fn disable_coherency(&self) {}
        fn barrier(&self) {}
        fn set_low_power_mode(&self, _mode: LowPowerMode) {}
        fn prime_master_warm_entry(&self) {}
        fn prime_aux_warm_entry(&self) {}
        fn performance_disable(&self) {}
        fn wait_for_interrupt(&self) {}
    }

    struct OkInit;

    impl PrivilegedInit for OkInit {
        fn initialize(&self, _hart: HartId) -> Result<()> {
            Ok(())
        }
    }

    fn lifecycle(hart: HartId, sync: &'static HartSync) -> HartLifecycle<'static> {
        let ctl: &'static NopControl = Box::leak(Box::new(NopControl));
        let aon: &'static AonClient = Box::leak(Box::new(AonClient::new()));
        HartLifecycle::new(hart, HartId::new(0), ctl, aon, sync)
    }

    fn platform(sync: &'static HartSync, ledger: &'static BootLedger) -> Platform<'static> {
        Platform {
            hart_count: 4,
            coldboot_hart: HartId::new(0),
            privileged: &OkInit,
            sync,
            ledger,
        }
    }

    #[test]
    fn test_cold_path_releases_held_harts() {
        let sync: &'static HartSync = Box::leak(Box::new(HartSync::new()));
        let ledger: &'static BootLedger = Box::leak(Box::new(BootLedger::new()));
        let plat = platform(sync, ledger);

        let mut boot = lifecycle(HartId::new(0), sync);
        firmware_entry(&plat, &mut boot, HartId::new(0));
        assert_eq!(sync.available_mask(), 0b1);
        assert!(ledger.has_passed(HartId::new(0)));

        // A secondary hart now sails through the open gate.
        let mut second = lifecycle(HartId::new(2), sync);
        firmware_entry(&plat, &mut second, HartId::new(2));
        assert_eq!(sync.available_mask(), 0b101);
    }

    #[test]
    fn test_warm_path_resumes_instead_of_cold_booting() {
        let sync: &'static HartSync = Box::leak(Box::new(HartSync::new()));
        let ledger: &'static BootLedger = Box::leak(Box::new(BootLedger::new()));
        let plat = platform(sync, ledger);

        // First entry: cold. (Gate must be open for the secondary hart.)
        let mut boot = lifecycle(HartId::new(0), sync);
        firmware_entry(&plat, &mut boot, HartId::new(0));
        let mut hart = lifecycle(HartId::new(1), sync);
        firmware_entry(&plat, &mut hart, HartId::new(1));

        // Second entry of hart 1: warm, ends online and available again.
        sync.unmark_available(HartId::new(1));
        let mut rewoken = lifecycle(HartId::new(1), sync);
        firmware_entry(&plat, &mut rewoken, HartId::new(1));
        assert_eq!(rewoken.state(), HartPowerState::Online);
        assert_ne!(sync.available_mask() & 0b10, 0);
    }
}
