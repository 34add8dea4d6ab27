//! # Ember Power Management
//!
//! Client side of the power RPC spoken with the always-on (AON) controller:
//!
//! - `rpc`: the wire codec for the fixed 28-byte request frames
//! - `aon`: the power-management client that builds core-hotplug and
//!   system-suspend requests and ships them through a mailbox adapter
//!
//! The AON controller is a separate, always-powered microcontroller; it
//! consumes raw wire bytes, so every multi-byte field is packed big-endian
//! regardless of host order.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod aon;
pub mod rpc;

pub use aon::{AonClient, AON};
