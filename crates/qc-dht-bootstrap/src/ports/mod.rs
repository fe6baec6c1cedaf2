//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** `DhtBootstrapApi`, `RpcValidator`
//! - **Driven Ports (Outbound):** `DhtNode`, `DhtSettingsSource`, `RecordPolicy`, `ReconnectSignal`

pub mod inbound;
pub mod outbound;

pub use inbound::{DhtBootstrapApi, RpcValidator};
pub use outbound::{DhtNode, DhtSettingsSource, NodeBinding, RecordPolicy, ReconnectSignal};
