//! # Mailbox Adapters
//!
//! A mailbox adapter is a driver-provided transport for exchanging
//! fixed-size frames with a peer execution domain. Drivers construct and
//! own their adapter instances; the registry only holds references to them,
//! so an adapter must outlive its registration.
//!
//! The registry is populated during sequential cold-boot device discovery
//! and read-mostly afterwards. Mutation still takes the lock.

use ember_hal::{Error, Result};
use spin::Mutex;

/// Upper bound on simultaneously registered adapters.
pub const MAX_ADAPTERS: usize = 8;

// ============================================================================
// Adapter Interface
// ============================================================================

/// Driver-side interface of one mailbox transport.
///
/// The default transfer bodies report the operation as unimplemented;
/// drivers override the directions their hardware supports.
pub trait MboxAdapter: Sync {
    /// Registry-unique adapter id assigned by the driver.
    fn id(&self) -> u32;

    /// Send one frame to the given remote channel.
    fn write(&self, _channel: u8, _buf: &[u8]) -> Result<()> {
        Err(Error::NotImplemented)
    }

    /// Receive one frame, waiting at most `timeout_us`.
    ///
    /// Returns the number of bytes received.
    fn read(&self, _channel: u8, _buf: &mut [u8], _timeout_us: u32) -> Result<usize> {
        Err(Error::NotImplemented)
    }
}

// ============================================================================
// Adapter Registry
// ============================================================================

/// Ordered collection of registered adapters with an id-uniqueness
/// invariant.
pub struct AdapterRegistry {
    adapters: Mutex<heapless::Vec<&'static dyn MboxAdapter, MAX_ADAPTERS>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            adapters: Mutex::new(heapless::Vec::new()),
        }
    }

    /// Find a registered adapter by id. Linear scan, first exact match.
    pub fn find(&self, id: u32) -> Option<&'static dyn MboxAdapter> {
        self.adapters.lock().iter().copied().find(|a| a.id() == id)
    }

    /// Register an adapter.
    ///
    /// Fails with [`Error::AlreadyExists`] when the id is already present,
    /// leaving the existing registration in place, and with
    /// [`Error::InvalidArgument`] when the platform declares more adapters
    /// than the registry can describe.
    pub fn add(&self, adapter: &'static dyn MboxAdapter) -> Result<()> {
        let mut adapters = self.adapters.lock();
        if adapters.iter().any(|a| a.id() == adapter.id()) {
            return Err(Error::AlreadyExists);
        }
        adapters
            .push(adapter)
            .map_err(|_| Error::InvalidArgument)?;
        Ok(())
    }

    /// Unlink an adapter.
    ///
    /// The caller must not remove an adapter that was never added; a second
    /// remove of the same adapter is not supported.
    pub fn remove(&self, adapter: &'static dyn MboxAdapter) {
        let mut adapters = self.adapters.lock();
        if let Some(pos) = adapters.iter().position(|a| a.id() == adapter.id()) {
            adapters.remove(pos);
        }
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Process-wide registry, populated during cold-boot device discovery.
pub static REGISTRY: AdapterRegistry = AdapterRegistry::new();

// ============================================================================
// Dispatch Helpers
// ============================================================================

/// Send through an adapter handle that may be absent.
///
/// Thin dispatch: validates the handle, then forwards and returns the
/// adapter's status verbatim.
pub fn adapter_write(
    adapter: Option<&dyn MboxAdapter>,
    channel: u8,
    buf: &[u8],
) -> Result<()> {
    let adapter = adapter.ok_or(Error::InvalidArgument)?;
    adapter.write(channel, buf)
}

/// Receive through an adapter handle that may be absent.
pub fn adapter_read(
    adapter: Option<&dyn MboxAdapter>,
    channel: u8,
    buf: &mut [u8],
    timeout_us: u32,
) -> Result<usize> {
    let adapter = adapter.ok_or(Error::InvalidArgument)?;
    adapter.read(channel, buf, timeout_us)
}
