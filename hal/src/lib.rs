//! # Ember HAL
//!
//! Hardware primitives shared by every Ember crate:
//!
//! - `error`: the firmware-wide status-code taxonomy
//! - `hartid`: hart identifiers
//! - `arch`: architecture operations (CSR access, cache maintenance,
//!   barriers)
//!
//! Architecture-specific instruction sequences only compile for `riscv64`
//! targets. Host builds get inert fallbacks, which keeps the crates layered
//! on top of this one unit-testable off-target.

#![no_std]

pub mod arch;
pub mod error;
pub mod hartid;

pub use error::{Error, Result};
pub use hartid::HartId;
