//! # Integration Tests
//!
//! - `flows` - DHT bootstrap followed by peer handshakes over the real
//!   identity cache and outbox adapters

pub mod flows;
