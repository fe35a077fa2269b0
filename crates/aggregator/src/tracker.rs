//! Request tracker: one entry per funded request, carrying the
//! aggregate-in-progress.

use std::collections::BTreeMap;

use concord_core::{
    fmt_id, Address, AgreementId, Amount, CoordinatorError, RequestId, Result, Selector,
    ServiceAgreement, Timestamp, U256,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mean::RunningMean;

/// Where the aggregate is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub target: Address,
    pub selector: Selector,
}

/// A funded unit of work raised against an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub agreement_id: AgreementId,
    pub requester: Address,
    /// Amount actually received from the funding source.
    pub paid: Amount,
    pub callback: Callback,
    /// Opaque request payload, passed through untouched.
    pub data: Vec<u8>,
    /// Snapshot of the agreement's oracles at acceptance.
    pub expected_responders: Vec<Address>,
    /// Responses by provider, never overwritten.
    pub responses: BTreeMap<Address, U256>,
    pub mean: RunningMean,
    pub fulfilled: bool,
    pub created_at: Timestamp,
    /// After this instant the request is past its response window.
    pub cancel_expiration: Timestamp,
}

impl Request {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RequestId,
        agreement_id: AgreementId,
        agreement: &ServiceAgreement,
        requester: Address,
        paid: Amount,
        callback: Callback,
        data: Vec<u8>,
        now: Timestamp,
        expiry_secs: u64,
    ) -> Self {
        Self {
            id,
            agreement_id,
            requester,
            paid,
            callback,
            data,
            expected_responders: agreement.oracles.clone(),
            responses: BTreeMap::new(),
            mean: RunningMean::new(),
            fulfilled: false,
            created_at: now,
            cancel_expiration: now.saturating_add(expiry_secs),
        }
    }

    pub fn is_expected(&self, provider: &Address) -> bool {
        self.expected_responders.contains(provider)
    }

    pub fn has_responded(&self, provider: &Address) -> bool {
        self.responses.contains_key(provider)
    }

    pub fn quorum(&self) -> usize {
        self.expected_responders.len()
    }

    pub fn quorum_reached(&self) -> bool {
        self.responses.len() == self.quorum()
    }

    /// The converged value, once fulfilled.
    pub fn aggregate(&self) -> Option<U256> {
        self.fulfilled.then(|| self.mean.value())
    }
}

/// In-flight and fulfilled requests keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestTracker {
    requests: BTreeMap<RequestId, Request>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly funded request. Ids are never reused.
    pub fn open(&mut self, request: Request) -> Result<RequestId> {
        let id = request.id;
        if self.requests.contains_key(&id) {
            return Err(CoordinatorError::DuplicateRequest(fmt_id(&id)));
        }
        debug!(
            request = fmt_id(&id),
            said = fmt_id(&request.agreement_id),
            responders = request.quorum(),
            "request opened"
        );
        self.requests.insert(id, request);
        Ok(id)
    }

    pub fn get(&self, id: &RequestId) -> Option<&Request> {
        self.requests.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &RequestId) -> Result<&mut Request> {
        self.requests
            .get_mut(id)
            .ok_or_else(|| CoordinatorError::UnknownRequest(fmt_id(id)))
    }

    /// Requests that are still waiting for responses.
    pub fn pending(&self) -> impl Iterator<Item = &Request> {
        self.requests.values().filter(|r| !r.fulfilled)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agreement() -> ServiceAgreement {
        ServiceAgreement {
            payment: 100,
            expiration: 300,
            end_at: 10_000,
            oracles: vec![[1u8; 20], [2u8; 20]],
            request_digest: [0u8; 32],
        }
    }

    fn request(id: u8) -> Request {
        let sa = agreement();
        Request::new(
            [id; 32],
            sa.id(),
            &sa,
            [9u8; 20],
            100,
            Callback { target: [7u8; 20], selector: [0xde, 0xad, 0xbe, 0xef] },
            vec![],
            1_000,
            300,
        )
    }

    #[test]
    fn test_new_request_snapshots_oracles() {
        let r = request(1);
        assert_eq!(r.expected_responders, agreement().oracles);
        assert!(r.responses.is_empty());
        assert!(!r.fulfilled);
        assert_eq!(r.cancel_expiration, 1_300);
        assert_eq!(r.quorum(), 2);
        assert!(r.aggregate().is_none());
    }

    #[test]
    fn test_open_rejects_reused_id() {
        let mut tracker = RequestTracker::new();
        tracker.open(request(1)).unwrap();
        assert!(matches!(
            tracker.open(request(1)),
            Err(CoordinatorError::DuplicateRequest(_))
        ));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_unknown_request() {
        let mut tracker = RequestTracker::new();
        assert!(tracker.get(&[5u8; 32]).is_none());
        assert!(matches!(
            tracker.get_mut(&[5u8; 32]),
            Err(CoordinatorError::UnknownRequest(_))
        ));
    }

    #[test]
    fn test_pending_excludes_fulfilled() {
        let mut tracker = RequestTracker::new();
        tracker.open(request(1)).unwrap();
        tracker.open(request(2)).unwrap();
        tracker.get_mut(&[1u8; 32]).unwrap().fulfilled = true;
        let pending: Vec<_> = tracker.pending().map(|r| r.id).collect();
        assert_eq!(pending, vec![[2u8; 32]]);
    }
}
