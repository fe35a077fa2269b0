//! Concord Aggregator
//!
//! Tracks funded requests and combines the answers of an agreement's
//! oracles into a single value once every one of them has responded.

pub mod engine;
pub mod mean;
pub mod tracker;

pub use engine::{submit_response, Finalized, Submission};
pub use mean::RunningMean;
pub use tracker::{Callback, Request, RequestTracker};
