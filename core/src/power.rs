//! # Hart Power Lifecycle
//!
//! Per-hart state machine behind core hotplug and system suspend. The
//! transitions are only safe in a precise order: interrupts off, caches
//! quiesced, controller notified, and only then the wait-for-interrupt.
//! A hart that has entered the wait after a hotplug-out never returns
//! through normal control flow; it is reanimated at the warm entry point
//! by a reset-vector re-dispatch.
//!
//! Hardware is reached exclusively through the seam traits below, which is
//! what keeps the transition ordering testable off-target.

use ember_hal::arch::riscv64::barriers::hang;
use ember_hal::{Error, HartId, Result};
use ember_pm::aon::AonClient;

use crate::sync::HartSync;

// ============================================================================
// States
// ============================================================================

/// Lifecycle states of one hart.
///
/// `Online` is both the initial state and the steady state reached after a
/// completed resume. `Quiescing` and `AwaitingWake` exist only inside a
/// hotplug-out or suspend operation; no other hart ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HartPowerState {
    /// Running normally; available for work.
    Online,
    /// Interrupts masked, caches being drained.
    Quiescing,
    /// Controller notified; at or past the wait-for-interrupt.
    AwaitingWake,
    /// Re-entered at the warm vector, rebuilding privileged state.
    Resuming,
}

/// Interrupt-enable state captured by the quiesce step.
///
/// Resume re-derives machine state from scratch, so the snapshot is only
/// consumed when an aborted transition puts the hart back online.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrqSnapshot {
    /// Saved MSTATUS interrupt-enable bits.
    pub mstatus: usize,
    /// Saved MIE source bits.
    pub mie: usize,
}

/// Platform low-power modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowPowerMode {
    /// Voice-activity-detect retention.
    HwVad,
    /// Full standby (suspend-to-RAM).
    Standby,
}

// ============================================================================
// Hardware Seams
// ============================================================================

/// Hardware operations consumed by the lifecycle sequence.
pub trait CoreControl {
    /// Atomically snapshot and clear the interrupt-enable state.
    fn save_and_mask_interrupts(&self) -> IrqSnapshot;
    /// Restore a snapshot taken by [`Self::save_and_mask_interrupts`].
    fn restore_interrupts(&self, snapshot: IrqSnapshot);
    /// Clear the prefetch hint bits.
    fn disable_prefetch(&self);
    /// Full D-cache clean+invalidate, instruction-stream sync, cache off.
    fn flush_and_disable_dcache(&self);
    /// Drop out of the cross-core coherency fabric.
    fn disable_coherency(&self);
    /// Full memory barrier.
    fn barrier(&self);
    /// Program the platform low-power-mode register.
    fn set_low_power_mode(&self, mode: LowPowerMode);
    /// Prime the boot-ROM indicators and warm-entry address for the core
    /// driving system suspend.
    fn prime_master_warm_entry(&self);
    /// Prime the reset-vector base addresses of the application cores.
    fn prime_aux_warm_entry(&self);
    /// Drop the core to its boot-time performance profile.
    fn performance_disable(&self);
    /// Hardware wait-for-interrupt.
    fn wait_for_interrupt(&self);
}

/// Peer wake signalling (inter-processor interrupt collaborator).
///
/// Fire-and-forget: acknowledgment is observed indirectly when the peer
/// reaches `Online` and re-marks itself available.
pub trait WakeSignal {
    /// Wake a hotplugged-out peer.
    fn send_wake(&self, target: HartId);
}

/// One-time per-hart privileged-state setup (PMP regions, trap
/// delegation). Runs at cold boot and again on every warm resume.
pub trait PrivilegedInit {
    /// Initialize privileged state for `hart`.
    fn initialize(&self, hart: HartId) -> Result<()>;
}

// ============================================================================
// Lifecycle
// ============================================================================

/// The power-state machine of one hart.
pub struct HartLifecycle<'a> {
    hart: HartId,
    master: HartId,
    state: HartPowerState,
    ctl: &'a dyn CoreControl,
    aon: &'a AonClient,
    sync: &'a HartSync,
}

impl<'a> HartLifecycle<'a> {
    /// Bind the state machine of `hart`.
    ///
    /// `master` is the designated boot core, which has special rules for
    /// both hotplug directions.
    pub fn new(
        hart: HartId,
        master: HartId,
        ctl: &'a dyn CoreControl,
        aon: &'a AonClient,
        sync: &'a HartSync,
    ) -> Self {
        Self {
            hart,
            master,
            state: HartPowerState::Online,
            ctl,
            aon,
            sync,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> HartPowerState {
        self.state
    }

    /// This hart's id.
    pub const fn hart(&self) -> HartId {
        self.hart
    }

    /// Online -> Quiescing: mask interrupts and drain the caches, in order.
    fn quiesce(&mut self) -> IrqSnapshot {
        self.state = HartPowerState::Quiescing;
        let snapshot = self.ctl.save_and_mask_interrupts();
        self.ctl.disable_prefetch();
        self.ctl.flush_and_disable_dcache();
        self.ctl.disable_coherency();
        self.ctl.barrier();
        snapshot
    }

    /// A failed controller request aborts the transition: the hart stays
    /// online and never reaches the sleep instruction.
    fn abort_to_online(&mut self, snapshot: IrqSnapshot) {
        self.ctl.restore_interrupts(snapshot);
        self.sync.mark_available(self.hart);
        self.state = HartPowerState::Online;
    }

    /// Hotplug the calling hart out.
    ///
    /// On hardware a successful stop does not return: the hart parks in
    /// the wait-for-interrupt and is reanimated at the warm entry point
    /// when a peer's [`HartLifecycle::start`] revives it.
    pub fn stop(&mut self) -> Result<()> {
        // The master core is not hot-unpluggable on this cluster.
        if self.hart == self.master {
            return Err(Error::InvalidArgument);
        }

        self.sync.unmark_available(self.hart);
        let snapshot = self.quiesce();

        if let Err(e) = self.aon.cpu_hotplug(self.hart, false) {
            self.abort_to_online(snapshot);
            return Err(e);
        }

        self.state = HartPowerState::AwaitingWake;
        self.ctl.wait_for_interrupt();
        Ok(())
    }

    /// Drive whole-system suspend-to-RAM from the calling hart.
    ///
    /// On success the call spans the suspension: it returns after the wake
    /// event has re-entered the warm path and the hart is online again.
    pub fn suspend_system(&mut self, privileged: &dyn PrivilegedInit) -> Result<()> {
        self.sync.unmark_available(self.hart);
        let snapshot = self.quiesce();

        if let Err(e) = self.aon.system_suspend() {
            self.abort_to_online(snapshot);
            return Err(e);
        }

        self.state = HartPowerState::AwaitingWake;
        self.ctl.set_low_power_mode(LowPowerMode::Standby);
        self.ctl.prime_master_warm_entry();
        self.ctl.performance_disable();
        self.ctl.wait_for_interrupt();

        // The wake event re-dispatches through the warm vector; the resume
        // path below brings the hart back online.
        self.resume(privileged);
        Ok(())
    }

    /// Bring a stopped peer back online.
    ///
    /// The warm-entry address table is re-primed before any wake signal so
    /// the boot ROM recognizes the resume request. Non-master peers get a
    /// wake IPI; the master identity cannot be IPI-woken and instead rides
    /// the controller's physical reset path.
    pub fn start(&self, target: HartId, wake: &dyn WakeSignal) -> Result<()> {
        self.ctl.prime_aux_warm_entry();
        if target == self.master {
            self.aon.cpu_hotplug(target, true)
        } else {
            wake.send_wake(target);
            Ok(())
        }
    }

    /// Warm re-entry: rebuild privileged state and rejoin the cluster.
    ///
    /// Privileged-state initialization is not retryable; a failure parks
    /// the hart, since continuing would corrupt shared state.
    pub fn resume(&mut self, privileged: &dyn PrivilegedInit) {
        self.state = HartPowerState::Resuming;
        if privileged.initialize(self.hart).is_err() {
            hang();
        }
        self.sync.mark_available(self.hart);
        self.state = HartPowerState::Online;
    }
}

impl core::fmt::Debug for HartLifecycle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HartLifecycle")
            .field("hart", &self.hart)
            .field("state", &self.state)
            .finish()
    }
}
