//! Concord Registry
//!
//! Service agreements keyed by their deterministic id. An agreement is only
//! accepted when every listed oracle has signed its id, position for
//! position.

use std::collections::{BTreeMap, HashSet};

use concord_core::{
    fmt_id, AgreementId, CoordinatorError, Result, ServiceAgreement, Timestamp,
};
use concord_crypto::{recover_signer, signed_message_digest, OracleSignature};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Append-only store of registered agreements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgreementRegistry {
    agreements: BTreeMap<AgreementId, ServiceAgreement>,
}

impl AgreementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store `agreement`, returning its id.
    ///
    /// The agreement must name at least one oracle, and `signatures[i]`
    /// must recover to `agreement.oracles[i]` over the signed-message
    /// digest of the id. Matching is positional: the same
    /// signatures in a different order are rejected. Nothing is stored
    /// unless every check passes.
    pub fn register(
        &mut self,
        agreement: ServiceAgreement,
        signatures: &[OracleSignature],
        now: Timestamp,
    ) -> Result<AgreementId> {
        // A request against an empty agreement could never reach quorum.
        if agreement.oracles.is_empty() {
            return Err(CoordinatorError::NoOracles);
        }
        if signatures.len() != agreement.oracles.len() {
            return Err(CoordinatorError::SignatureCountMismatch {
                expected: agreement.oracles.len(),
                got: signatures.len(),
            });
        }

        let mut seen = HashSet::with_capacity(agreement.oracles.len());
        for oracle in &agreement.oracles {
            if !seen.insert(*oracle) {
                return Err(CoordinatorError::DuplicateOracle(fmt_id(oracle)));
            }
        }

        if !agreement.is_open_at(now) {
            return Err(CoordinatorError::StaleAgreement {
                end_at: agreement.end_at,
                now,
            });
        }

        let id = agreement.id();
        if self.agreements.contains_key(&id) {
            return Err(CoordinatorError::DuplicateAgreement(fmt_id(&id)));
        }

        let digest = signed_message_digest(&id);
        for (index, (oracle, signature)) in agreement.oracles.iter().zip(signatures).enumerate() {
            let signer = recover_signer(&digest, signature)?;
            if signer != *oracle {
                warn!(
                    said = fmt_id(&id),
                    index,
                    expected = fmt_id(oracle),
                    recovered = fmt_id(&signer),
                    "oracle signature mismatch"
                );
                return Err(CoordinatorError::InvalidSignature {
                    index,
                    expected: fmt_id(oracle),
                });
            }
        }

        info!(
            said = fmt_id(&id),
            oracles = agreement.oracles.len(),
            payment = agreement.payment,
            end_at = agreement.end_at,
            "service agreement registered"
        );
        self.agreements.insert(id, agreement);
        Ok(id)
    }

    pub fn lookup(&self, id: &AgreementId) -> Option<&ServiceAgreement> {
        self.agreements.get(id)
    }

    pub fn contains(&self, id: &AgreementId) -> bool {
        self.agreements.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agreements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agreements.is_empty()
    }
}
