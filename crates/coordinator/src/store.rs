//! The single authoritative store: agreements, requests and ledger.

use concord_aggregator::RequestTracker;
use concord_core::{CoordinatorError, Result};
use concord_registry::AgreementRegistry;
use concord_settlement::PaymentLedger;
use serde::{Deserialize, Serialize};

/// Owned by one coordinator at a time; a fresh `Store::default()` per test
/// keeps cases isolated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    pub agreements: AgreementRegistry,
    pub requests: RequestTracker,
    pub ledger: PaymentLedger,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the whole store with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CoordinatorError::Serialization(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| CoordinatorError::Serialization(e.to_string()))
    }
}
