//! Concord Core
//!
//! Identifiers, the service agreement record, the shared error taxonomy and
//! the clock abstraction used by every Concord crate.

pub mod clock;
pub mod ids;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{agreement_id, keccak256, request_id};
pub use primitive_types::U256;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 20-byte account identity (the tail of the keccak hash of a public key).
pub type Address = [u8; 20];

/// Deterministic service agreement identifier.
pub type AgreementId = [u8; 32];

/// Identifier of one funded request.
pub type RequestId = [u8; 32];

/// Four-byte selector naming the consumer entry point to call back.
pub type Selector = [u8; 4];

/// Token amount in the smallest unit (18 decimals for the default token).
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A multi-signed record authorising a fixed set of oracles to answer
/// requests at a fixed price.
///
/// Immutable once registered; the id is derived from every field, so two
/// agreements with the same id are the same agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAgreement {
    /// Minimum payment per request.
    pub payment: Amount,
    /// Seconds an oracle may take to respond once a request is accepted.
    pub expiration: u64,
    /// No new requests are accepted at or after this instant.
    pub end_at: Timestamp,
    /// Ordered oracle identities; signatures match these positionally.
    pub oracles: Vec<Address>,
    /// Opaque descriptor of the covered work.
    pub request_digest: [u8; 32],
}

impl ServiceAgreement {
    /// The agreement id: keccak-256 of the packed field encoding.
    pub fn id(&self) -> AgreementId {
        agreement_id(self)
    }

    pub fn is_oracle(&self, who: &Address) -> bool {
        self.oracles.contains(who)
    }

    /// Whether the agreement still accepts requests at `now`.
    pub fn is_open_at(&self, now: Timestamp) -> bool {
        self.end_at > now
    }
}

/// Which family a rejection belongs to, so callers can tell agreement
/// problems from request or balance problems without re-reading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    Agreement,
    Request,
    Balance,
    Caller,
    Storage,
}

/// Every rejection the coordinator can report. None of them leave partial
/// state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signature {index} was not produced by oracle {expected}")]
    InvalidSignature { index: usize, expected: String },
    #[error("service agreement {0} is already registered")]
    DuplicateAgreement(String),
    #[error("service agreement ends at {end_at}, which is not after {now}")]
    StaleAgreement { end_at: Timestamp, now: Timestamp },
    #[error("service agreement lists no oracles")]
    NoOracles,
    #[error("oracle {0} is listed more than once")]
    DuplicateOracle(String),
    #[error("expected {expected} oracle signatures, got {got}")]
    SignatureCountMismatch { expected: usize, got: usize },
    #[error("unknown service agreement {0}")]
    UnknownAgreement(String),
    #[error("caller {0} is not the funding source")]
    UntrustedCaller(String),
    #[error("callback target {0} is not allowed")]
    ForbiddenCallbackTarget(String),
    #[error("insufficient payment: required {required}, paid {paid}")]
    InsufficientPayment { required: Amount, paid: Amount },
    #[error("request {0} already exists")]
    DuplicateRequest(String),
    #[error("unknown request {0}")]
    UnknownRequest(String),
    #[error("{0} is not an expected responder for this request")]
    UnauthorizedResponder(String),
    #[error("{0} has already responded to this request")]
    AlreadyResponded(String),
    #[error("request {0} is already fulfilled")]
    AlreadyFulfilled(String),
    #[error("insufficient balance: requested {requested}, withdrawable {available}")]
    InsufficientBalance { requested: Amount, available: Amount },
    #[error("token transfer failed: {0}")]
    TransferFailed(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CoordinatorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedSignature(_)
            | Self::InvalidSignature { .. }
            | Self::DuplicateAgreement(_)
            | Self::StaleAgreement { .. }
            | Self::NoOracles
            | Self::DuplicateOracle(_)
            | Self::SignatureCountMismatch { .. }
            | Self::UnknownAgreement(_) => ErrorClass::Agreement,
            Self::UntrustedCaller(_) | Self::ForbiddenCallbackTarget(_) => ErrorClass::Caller,
            Self::InsufficientPayment { .. }
            | Self::DuplicateRequest(_)
            | Self::UnknownRequest(_)
            | Self::UnauthorizedResponder(_)
            | Self::AlreadyResponded(_)
            | Self::AlreadyFulfilled(_) => ErrorClass::Request,
            Self::InsufficientBalance { .. } | Self::TransferFailed(_) => ErrorClass::Balance,
            Self::Serialization(_) => ErrorClass::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Render an identifier for logs and error messages.
pub fn fmt_id(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
