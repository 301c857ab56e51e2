//! Common utilities and types shared across DriveGate crates.
//!
//! The error type lives here so the gateway library and its front ends
//! agree on one failure vocabulary.

pub mod error;

pub use error::{Error, Result};
