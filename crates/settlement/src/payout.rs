//! Payout split between the responders of a finalized request.
//!
//! All amounts are in the token's smallest unit.

use concord_core::Amount;

/// How a request's payment is divided among its responders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
    /// Credited to each responder.
    pub per_responder: Amount,
    /// Left un-credited by integer division.
    pub undistributed: Amount,
}

/// Split `paid` evenly across `responders`.
///
/// Integer division: the remainder is not distributed to anyone and stays
/// with the coordinator. Zero responders credits nobody.
pub fn split_payment(paid: Amount, responders: usize) -> PayoutSplit {
    if responders == 0 {
        return PayoutSplit {
            per_responder: 0,
            undistributed: paid,
        };
    }
    let n = responders as Amount;
    PayoutSplit {
        per_responder: paid / n,
        undistributed: paid % n,
    }
}
