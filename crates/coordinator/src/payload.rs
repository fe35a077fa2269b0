//! The opaque payload a funding transfer carries to the coordinator.

use concord_aggregator::Callback;
use concord_core::{AgreementId, Amount, CoordinatorError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub agreement_id: AgreementId,
    /// Requester-chosen nonce; with the requester it makes the request id.
    pub nonce: u64,
    pub callback: Callback,
    /// What the requester claims to have paid. Never used for crediting.
    pub declared_payment: Option<Amount>,
    /// Request parameters for the oracles, passed through untouched.
    pub data: Vec<u8>,
}

impl RequestPayload {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CoordinatorError::Serialization(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| CoordinatorError::Serialization(e.to_string()))
    }
}
