//! Payment token seam.
//!
//! The coordinator holds the tokens it was paid. Withdrawals move them to
//! the provider's recipient through a [`PaymentToken`]. [`InMemoryToken`]
//! is a complete in-process token used by the app and by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use concord_core::{fmt_id, Address, Amount};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient token balance: have {have}, need {need}")]
    InsufficientFunds { have: Amount, need: Amount },
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Outbound transfers from the coordinator's own token account.
pub trait PaymentToken: Send {
    /// Move `amount` from the coordinator to `to`. Either the whole amount
    /// moves or nothing does.
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError>;
}

/// Simple balance table with a designated coordinator account.
#[derive(Debug, Clone)]
pub struct InMemoryToken {
    /// The account transfers are drawn from.
    holder: Address,
    balances: HashMap<Address, Amount>,
    /// Accounts that refuse to receive tokens.
    blocked: Vec<Address>,
}

impl InMemoryToken {
    pub fn new(holder: Address) -> Self {
        Self {
            holder,
            balances: HashMap::new(),
            blocked: Vec::new(),
        }
    }

    pub fn holder(&self) -> Address {
        self.holder
    }

    pub fn mint(&mut self, to: Address, amount: Amount) {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, who: &Address) -> Amount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Make `who` reject incoming transfers.
    pub fn block(&mut self, who: Address) {
        self.blocked.push(who);
    }

    /// Move tokens between two arbitrary accounts.
    pub fn transfer_from(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if self.blocked.contains(to) {
            return Err(TransferError::Rejected(format!(
                "{} does not accept transfers",
                fmt_id(to)
            )));
        }
        let have = self.balance_of(from);
        if have < amount {
            return Err(TransferError::InsufficientFunds { have, need: amount });
        }
        self.balances.insert(*from, have - amount);
        let to_balance = self.balances.entry(*to).or_insert(0);
        *to_balance = to_balance.saturating_add(amount);
        debug!(from = fmt_id(from), to = fmt_id(to), amount, "token transfer");
        Ok(())
    }
}

/// A token shared with other owners, e.g. the funding side of a test or the
/// host application that also mints and inspects balances.
impl<T: PaymentToken> PaymentToken for Arc<Mutex<T>> {
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let mut inner = self
            .lock()
            .map_err(|_| TransferError::Rejected("token lock poisoned".into()))?;
        inner.transfer(to, amount)
    }
}

impl PaymentToken for InMemoryToken {
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let holder = self.holder;
        self.transfer_from(&holder, to, amount)
    }
}
