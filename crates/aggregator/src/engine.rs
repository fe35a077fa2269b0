//! Quorum-gated aggregation.
//!
//! Responses are buffered until every expected responder has answered once.
//! The answer that completes quorum finalizes the request: the aggregate is
//! fixed, the request is marked fulfilled and every responder is credited.
//! All of that is committed before [`submit_response`] returns, and the
//! caller only gets the [`Finalized`] snapshot to notify the consumer with
//! afterwards.

use concord_core::{fmt_id, Address, Amount, CoordinatorError, RequestId, Result, U256};
use concord_settlement::{split_payment, PaymentLedger};
use tracing::{debug, info};

use crate::tracker::{Callback, RequestTracker};

/// Outcome of an accepted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Recorded; quorum not yet reached. Nothing else happened.
    Buffered { received: usize, expected: usize },
    /// This response completed quorum and the request is now fulfilled.
    Finalized(Finalized),
}

/// A fully committed finalize transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub request_id: RequestId,
    pub aggregate: U256,
    pub callback: Callback,
    /// Amount credited to each responder.
    pub per_responder: Amount,
    /// Remainder of the payment that integer division left un-credited.
    pub undistributed: Amount,
    pub responders: Vec<Address>,
}

/// Record `provider`'s `value` for `request_id`, finalizing the request if
/// this completes quorum.
///
/// Rejections leave the request and the ledger untouched:
/// - unknown request id
/// - request already fulfilled
/// - provider not among the expected responders
/// - provider already responded
pub fn submit_response(
    tracker: &mut RequestTracker,
    ledger: &mut PaymentLedger,
    request_id: &RequestId,
    provider: &Address,
    value: U256,
) -> Result<Submission> {
    let request = tracker.get_mut(request_id)?;

    if request.fulfilled {
        return Err(CoordinatorError::AlreadyFulfilled(fmt_id(request_id)));
    }
    if !request.is_expected(provider) {
        return Err(CoordinatorError::UnauthorizedResponder(fmt_id(provider)));
    }
    if request.has_responded(provider) {
        return Err(CoordinatorError::AlreadyResponded(fmt_id(provider)));
    }

    request.responses.insert(*provider, value);
    request.mean.push(value);

    if !request.quorum_reached() {
        debug!(
            request = fmt_id(request_id),
            provider = fmt_id(provider),
            received = request.responses.len(),
            expected = request.quorum(),
            "response buffered"
        );
        return Ok(Submission::Buffered {
            received: request.responses.len(),
            expected: request.quorum(),
        });
    }

    // Commit point: nothing below may fail.
    request.fulfilled = true;
    let aggregate = request.mean.value();
    let split = split_payment(request.paid, request.quorum());
    let responders: Vec<Address> = request.responses.keys().copied().collect();
    for responder in &responders {
        ledger.credit(responder, split.per_responder);
    }

    info!(
        request = fmt_id(request_id),
        aggregate = %aggregate,
        responders = responders.len(),
        per_responder = split.per_responder,
        undistributed = split.undistributed,
        "request finalized"
    );

    Ok(Submission::Finalized(Finalized {
        request_id: *request_id,
        aggregate,
        callback: request.callback,
        per_responder: split.per_responder,
        undistributed: split.undistributed,
        responders,
    }))
}
