//! Provider payment ledger.

use std::collections::BTreeMap;

use concord_core::{fmt_id, Address, Amount, CoordinatorError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::token::PaymentToken;

/// A provider's accrued balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub withdrawable: Amount,
    /// Lifetime credits, for audit.
    pub total_credited: Amount,
    /// Lifetime withdrawals, for audit.
    pub total_withdrawn: Amount,
}

/// Withdrawable balances keyed by provider identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentLedger {
    entries: BTreeMap<Address, LedgerEntry>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `provider`. Only called when a request finalizes.
    pub fn credit(&mut self, provider: &Address, amount: Amount) {
        let entry = self.entries.entry(*provider).or_default();
        entry.withdrawable = entry.withdrawable.saturating_add(amount);
        entry.total_credited = entry.total_credited.saturating_add(amount);
    }

    /// Debit `amount` from `provider` and pay it to `recipient` through
    /// `token`.
    ///
    /// The balance is reduced before the token is called, so a transfer that
    /// re-enters sees the reduced balance. If the transfer fails the debit
    /// is reverted.
    pub fn withdraw(
        &mut self,
        provider: &Address,
        recipient: &Address,
        amount: Amount,
        token: &mut dyn PaymentToken,
    ) -> Result<()> {
        let available = self.balance_of(provider);
        if amount > available {
            return Err(CoordinatorError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let entry = self.entries.entry(*provider).or_default();
        entry.withdrawable = available - amount;

        if let Err(e) = token.transfer(recipient, amount) {
            let entry = self.entries.entry(*provider).or_default();
            entry.withdrawable = available;
            warn!(
                provider = fmt_id(provider),
                recipient = fmt_id(recipient),
                amount,
                error = %e,
                "withdrawal transfer failed, balance restored"
            );
            return Err(CoordinatorError::TransferFailed(e.to_string()));
        }

        let entry = self.entries.entry(*provider).or_default();
        entry.total_withdrawn = entry.total_withdrawn.saturating_add(amount);
        info!(
            provider = fmt_id(provider),
            recipient = fmt_id(recipient),
            amount,
            remaining = available - amount,
            "withdrawal completed"
        );
        Ok(())
    }

    pub fn balance_of(&self, provider: &Address) -> Amount {
        self.entries
            .get(provider)
            .map(|e| e.withdrawable)
            .unwrap_or(0)
    }

    pub fn entry(&self, provider: &Address) -> Option<&LedgerEntry> {
        self.entries.get(provider)
    }

    /// Sum of every provider's withdrawable balance.
    pub fn total_withdrawable(&self) -> Amount {
        self.entries
            .values()
            .fold(0, |acc: Amount, e| acc.saturating_add(e.withdrawable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{InMemoryToken, TransferError};

    const COORDINATOR: Address = [0xc0; 20];
    const ORACLE: Address = [0x01; 20];
    const PAYEE: Address = [0x02; 20];

    fn funded_token(amount: Amount) -> InMemoryToken {
        let mut token = InMemoryToken::new(COORDINATOR);
        token.mint(COORDINATOR, amount);
        token
    }

    #[test]
    fn test_credit_accumulates() {
        let mut ledger = PaymentLedger::new();
        ledger.credit(&ORACLE, 10);
        ledger.credit(&ORACLE, 5);
        assert_eq!(ledger.balance_of(&ORACLE), 15);
        assert_eq!(ledger.entry(&ORACLE).unwrap().total_credited, 15);
        assert_eq!(ledger.total_withdrawable(), 15);
    }

    #[test]
    fn test_withdraw_exact_balance_zeroes_it() {
        let mut ledger = PaymentLedger::new();
        let mut token = funded_token(100);
        ledger.credit(&ORACLE, 33);

        ledger.withdraw(&ORACLE, &PAYEE, 33, &mut token).unwrap();
        assert_eq!(ledger.balance_of(&ORACLE), 0);
        assert_eq!(token.balance_of(&PAYEE), 33);
        assert_eq!(token.balance_of(&COORDINATOR), 67);

        let err = ledger.withdraw(&ORACLE, &PAYEE, 1, &mut token).unwrap_err();
        assert_eq!(
            err,
            CoordinatorError::InsufficientBalance { requested: 1, available: 0 }
        );
    }

    #[test]
    fn test_overdraw_rejected_without_effect() {
        let mut ledger = PaymentLedger::new();
        let mut token = funded_token(100);
        ledger.credit(&ORACLE, 10);

        assert!(ledger.withdraw(&ORACLE, &PAYEE, 11, &mut token).is_err());
        assert_eq!(ledger.balance_of(&ORACLE), 10);
        assert_eq!(token.balance_of(&PAYEE), 0);
    }

    #[test]
    fn test_failed_transfer_restores_balance() {
        let mut ledger = PaymentLedger::new();
        let mut token = funded_token(100);
        token.block(PAYEE);
        ledger.credit(&ORACLE, 10);

        let err = ledger.withdraw(&ORACLE, &PAYEE, 10, &mut token).unwrap_err();
        assert!(matches!(err, CoordinatorError::TransferFailed(_)));
        assert_eq!(ledger.balance_of(&ORACLE), 10);
        assert_eq!(ledger.entry(&ORACLE).unwrap().total_withdrawn, 0);
    }

    #[derive(Default)]
    struct RecordingToken {
        transfers: Vec<(Address, Amount)>,
    }

    impl PaymentToken for RecordingToken {
        fn transfer(&mut self, to: &Address, amount: Amount) -> std::result::Result<(), TransferError> {
            self.transfers.push((*to, amount));
            Ok(())
        }
    }

    #[test]
    fn test_unknown_provider_has_zero_balance() {
        let ledger = PaymentLedger::new();
        assert_eq!(ledger.balance_of(&ORACLE), 0);
        assert!(ledger.entry(&ORACLE).is_none());
    }

    #[test]
    fn test_zero_withdrawal_is_allowed() {
        let mut ledger = PaymentLedger::new();
        let mut token = RecordingToken::default();
        ledger.withdraw(&ORACLE, &PAYEE, 0, &mut token).unwrap();
        assert_eq!(token.transfers, vec![(PAYEE, 0)]);
    }
}
