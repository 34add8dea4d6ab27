//! # Ember Core
//!
//! Multi-hart lifecycle coordination:
//!
//! - `sync`: the available-hart mask and the cold-boot gate, the only
//!   cross-hart shared state in the firmware
//! - `power`: the per-hart power-state machine behind core hotplug and
//!   system suspend
//! - `boot`: the cold/warm dual entry flow out of the reset vector
//! - `plat`: platform bindings for the TH1520 application cluster
//!
//! There is no scheduler beneath this code. Every physical hart runs it
//! concurrently, cooperating only through shared memory and spinlocks.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod boot;
pub mod plat;
pub mod power;
pub mod sync;

pub use power::{HartLifecycle, HartPowerState};
pub use sync::{HartSync, HART_SYNC};
