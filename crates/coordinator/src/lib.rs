//! Concord Coordinator
//!
//! The externally callable surface: register multi-signed service
//! agreements, accept requests funded through the payment token, collect
//! oracle answers into an aggregate, deliver it to the consumer and let
//! oracles withdraw what they earned.
//!
//! [`Coordinator`] is the synchronous core. [`CoordinatorService`] puts it
//! behind a tokio command queue for concurrent callers.

pub mod config;
pub mod consumer;
pub mod coordinator;
pub mod events;
pub mod payload;
pub mod service;
pub mod store;

pub use config::{
    CoordinatorConfig, DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_QUEUE_DEPTH, DEFAULT_REQUEST_EXPIRY_SECS,
};
pub use consumer::{CallbackError, Consumer};
pub use coordinator::Coordinator;
pub use events::CoordinatorEvent;
pub use payload::RequestPayload;
pub use service::{CoordinatorHandle, CoordinatorService, ServiceError};
pub use store::Store;

pub use concord_aggregator::{Callback, Finalized, Request, Submission};
pub use concord_crypto::OracleSignature;
pub use concord_settlement::{InMemoryToken, PaymentToken, TransferError};
