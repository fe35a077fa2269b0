//! Consumer callback seam.

use concord_core::{RequestId, Selector, U256};
use thiserror::Error;

use crate::coordinator::Coordinator;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("consumer reverted: {0}")]
    Reverted(String),
    #[error("no consumer at callback target")]
    NoConsumer,
    /// The target's previous callback has not returned yet.
    #[error("consumer is already executing a callback")]
    Busy,
}

/// A contract-like recipient of aggregated answers.
///
/// The coordinator hands itself to the consumer, so a consumer can call
/// back into it. A nested finalization aimed at a consumer that is still
/// inside `on_fulfilled` is not delivered and fails with
/// [`CallbackError::Busy`].
///
/// By the time `on_fulfilled` runs the request is already fulfilled and
/// every responder credited; whatever the consumer returns, that state
/// stays.
pub trait Consumer: Send {
    fn on_fulfilled(
        &mut self,
        coordinator: &mut Coordinator,
        request_id: &RequestId,
        selector: Selector,
        value: U256,
    ) -> Result<(), CallbackError>;
}
