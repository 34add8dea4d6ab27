//! # Ember Mailbox
//!
//! Transport layer between the application cluster and peer execution
//! domains:
//!
//! - `mmio`: bounds-checked volatile register-bank windows
//! - `adapter`: the mailbox adapter interface and the process-wide registry
//! - `th1520`: the channel protocol driver for the TH1520 mailbox IP
//!
//! Adapters move fixed-size frames; what the frames mean belongs to the
//! layers above.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod adapter;
pub mod mmio;
pub mod th1520;

pub use adapter::{AdapterRegistry, MboxAdapter, REGISTRY};
