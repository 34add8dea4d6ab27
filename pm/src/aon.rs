//! # Always-On Power Client
//!
//! The AON controller owns system-wide power sequencing. The application
//! cluster reaches it only through the mailbox, on the fixed logical
//! channel of the controller's service core.
//!
//! The client must be attached to the controller's mailbox adapter before
//! first use; locating that adapter in the device topology is the
//! platform's job, abstracted behind [`AdapterLocator`].

use ember_hal::{Error, HartId, Result};
use ember_mbox::adapter::MboxAdapter;
use log::warn;
use spin::Mutex;

use crate::rpc::{self, AckMode, LpmFunc};

/// Fixed logical channel of the AON controller (the E902 service core).
pub const AON_CHANNEL: u8 = 1;

/// Resolves the controller's mailbox adapter out of the device topology.
///
/// The implementation matches a compatible string, constructs and registers
/// the driver if needed, and hands back the registered adapter or a
/// definite no-device answer.
pub trait AdapterLocator {
    /// Locate the controller's adapter.
    fn locate(&self) -> Result<&'static dyn MboxAdapter>;
}

// ============================================================================
// Client
// ============================================================================

/// Client for power RPCs to the AON controller.
pub struct AonClient {
    mbox: Mutex<Option<&'static dyn MboxAdapter>>,
}

impl AonClient {
    /// Create an unattached client.
    pub const fn new() -> Self {
        Self {
            mbox: Mutex::new(None),
        }
    }

    /// Attach the controller's mailbox adapter.
    pub fn attach(&self, adapter: &'static dyn MboxAdapter) {
        *self.mbox.lock() = Some(adapter);
    }

    /// Locate the controller's adapter and attach it.
    pub fn attach_from(&self, locator: &dyn AdapterLocator) -> Result<()> {
        let adapter = locator.locate()?;
        self.attach(adapter);
        Ok(())
    }

    /// Whether an adapter has been attached.
    pub fn is_attached(&self) -> bool {
        self.mbox.lock().is_some()
    }

    // The adapter reference is copied out so the lock is never held across
    // the bounded ack wait inside the transport.
    fn adapter(&self) -> Result<&'static dyn MboxAdapter> {
        let adapter = *self.mbox.lock();
        adapter.ok_or(Error::NotInitialized)
    }

    /// Ask the controller to power a core up or down.
    ///
    /// Transport failures (notably a missed ack) are returned verbatim;
    /// whether to retry is the caller's decision.
    pub fn cpu_hotplug(&self, hart: HartId, online: bool) -> Result<()> {
        let adapter = self.adapter()?;

        let mut frame = rpc::lpm_frame(LpmFunc::CpuHotplug, AckMode::NotRequired);
        frame.set_be16(rpc::OFF_CPU_ID, hart.as_usize() as u16);
        frame.set_be16(rpc::OFF_CPU_STATUS, online as u16);

        adapter
            .write(AON_CHANNEL, frame.as_bytes())
            .inspect_err(|e| {
                warn!("aon: core hotplug notify failed for {hart} ({})", e.code());
            })
    }

    /// Ask the controller to take the whole system into suspend-to-RAM.
    pub fn system_suspend(&self) -> Result<()> {
        let adapter = self.adapter()?;

        let frame = rpc::lpm_frame(LpmFunc::RequireStr, AckMode::NotRequired);
        adapter
            .write(AON_CHANNEL, frame.as_bytes())
            .inspect_err(|e| {
                warn!("aon: suspend-to-ram notify failed ({})", e.code());
            })
    }
}

impl Default for AonClient {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for AonClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AonClient")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Process-wide client, attached once during cold boot.
pub static AON: AonClient = AonClient::new();
