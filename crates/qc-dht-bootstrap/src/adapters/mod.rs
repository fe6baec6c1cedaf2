//! # Adapters
//!
//! - `settings` - in-memory and TOML `DhtSettingsSource`s
//! - `mocks` - scripted doubles (tests and the `test-utils` feature)

pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use settings::{StaticSettingsProvider, TomlSettingsProvider};

#[cfg(any(test, feature = "test-utils"))]
pub use mocks::{AllowAllPolicy, MockDhtNode, NodeCall, RecordingReconnect};
