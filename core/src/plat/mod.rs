//! # Platform Bindings
//!
//! Concrete hardware behind the lifecycle seams. Only the TH1520
//! application cluster is populated.

pub mod th1520;
