use std::sync::Arc;

use tracing::debug;

use crate::domain::{RpcVerdict, StoreRequest};
use crate::ports::{RecordPolicy, RpcValidator};

/// Validator the bootstrap service installs on the node for `store` and
/// `request`. It forwards to the node-level record policy unchanged.
pub struct DhtRpcGate {
    policy: Arc<dyn RecordPolicy>,
}

impl DhtRpcGate {
    /// Gate in front of `policy`.
    pub fn new(policy: Arc<dyn RecordPolicy>) -> Self {
        Self { policy }
    }
}

impl RpcValidator for DhtRpcGate {
    fn validate_store(&self, request: &StoreRequest) -> RpcVerdict {
        let verdict = self.policy.validate_before_store(request);
        if let RpcVerdict::Reject(reason) = &verdict {
            debug!(key_len = request.key.len(), age = request.age, %reason, "store rejected");
        }
        verdict
    }

    fn validate_request(&self, key: &[u8]) -> RpcVerdict {
        let verdict = self.policy.validate_before_request(key);
        if let RpcVerdict::Reject(reason) = &verdict {
            debug!(key_len = key.len(), %reason, "request rejected");
        }
        verdict
    }
}
