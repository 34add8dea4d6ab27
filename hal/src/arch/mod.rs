//! # Architecture Support
//!
//! Architecture-specific primitives. Only RISC-V 64 is populated; the
//! instruction-level bodies are gated on the target so the rest of the
//! firmware builds (and tests) on any host.

pub mod riscv64;
