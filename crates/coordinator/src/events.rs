//! Append-only log of what the coordinator did, in order.

use concord_core::{Address, AgreementId, Amount, RequestId, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorEvent {
    AgreementInitiated {
        said: AgreementId,
    },
    RequestAccepted {
        said: AgreementId,
        request_id: RequestId,
        requester: Address,
        paid: Amount,
    },
    ResponseRecorded {
        request_id: RequestId,
        provider: Address,
    },
    RequestFulfilled {
        request_id: RequestId,
        aggregate: U256,
    },
    CallbackFailed {
        request_id: RequestId,
        target: Address,
        reason: String,
    },
    Withdrawn {
        provider: Address,
        recipient: Address,
        amount: Amount,
    },
}
