//! # Handshake Service
//!
//! Implements `HandshakeApi` on top of the pure state machine.
//!
//! - `registry` coalesces concurrent requests for one peer onto a single
//!   coordinator and fans the outcome out to every waiter.
//! - `coordinator` is the async driver executing fetch/send/report actions.
//! - `handle` is the per-caller outcome future.

mod coordinator;
mod core;
mod handle;
mod registry;

pub use self::core::HandshakeService;
pub use handle::HandshakeHandle;
pub use registry::{HandshakeRegistry, Registration};

#[cfg(test)]
mod tests;
