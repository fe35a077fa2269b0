//! Concord Settlement
//!
//! Per-provider withdrawable balances, the payout split applied when a
//! request is finalized, and the token seam used to move funds out.
//!
//! Balances only grow through finalized requests and only shrink through
//! withdrawals that the token actually carried out.

pub mod ledger;
pub mod payout;
pub mod token;

pub use ledger::{LedgerEntry, PaymentLedger};
pub use payout::{split_payment, PayoutSplit};
pub use token::{InMemoryToken, PaymentToken, TransferError};
