//! RPC validation gate types.

use std::fmt;

/// RPC the node consults a validator for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RpcKind {
    /// Incoming `store` RPC.
    Store,
    /// Incoming `request` (find value) RPC.
    Request,
}

impl RpcKind {
    /// Both gated RPCs.
    pub const ALL: [RpcKind; 2] = [RpcKind::Store, RpcKind::Request];
}

impl fmt::Display for RpcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => f.write_str("store"),
            Self::Request => f.write_str("request"),
        }
    }
}

/// Arguments of an incoming `store` RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    /// Record key.
    pub key: Vec<u8>,
    /// Record value.
    pub value: Vec<u8>,
    /// Node that originally published the record.
    pub publisher_id: Vec<u8>,
    /// Seconds since the record was published.
    pub age: u64,
    /// Requested lifetime in seconds.
    pub expire_seconds: u64,
}

/// Decision of a validation gate. The node must honour it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcVerdict {
    /// Store or serve as is.
    Accept,
    /// Store or serve this value instead.
    Replace(Vec<u8>),
    /// Refuse.
    Reject(String),
}

impl RpcVerdict {
    /// Whether the node may proceed (with the original or a replacement value).
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Reject(_))
    }
}
