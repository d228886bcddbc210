//! Wallet Aggregate
//!
//! Wallet is the aggregate holding a user's balance. Exactly one wallet
//! exists per user, keyed by the owner's user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Amount, Balance, DomainError};

use super::Aggregate;

/// Wallet Aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Unique wallet ID
    id: Uuid,

    /// Owner user ID
    owner_id: Uuid,

    /// Current balance
    balance: Balance,

    /// Credit issued when the wallet was opened
    opening_balance: Balance,

    /// When the wallet was created
    created_at: DateTime<Utc>,
}

impl Wallet {
    /// Open a wallet for `owner_id` with its initial credit
    pub fn open(owner_id: Uuid, initial: Balance) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            balance: initial,
            opening_balance: initial,
            created_at: Utc::now(),
        }
    }

    /// Debit (withdraw) money from the wallet
    ///
    /// Leaves the balance untouched when it cannot cover `amount`.
    pub fn debit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        if !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.balance.value(),
            ));
        }
        self.balance = self.balance.debit(amount)?;
        Ok(())
    }

    /// Credit (deposit) money to the wallet
    pub fn credit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        self.balance = self.balance.credit(amount)?;
        Ok(())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn opening_balance(&self) -> Balance {
        self.opening_balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Aggregate for Wallet {
    fn aggregate_type() -> &'static str {
        "Wallet"
    }

    fn key(&self) -> Uuid {
        self.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet_with(balance: u64) -> Wallet {
        Wallet::open(Uuid::new_v4(), Balance::new(balance))
    }

    #[test]
    fn test_wallet_open() {
        let owner_id = Uuid::new_v4();
        let wallet = Wallet::open(owner_id, Balance::zero());

        assert_eq!(wallet.owner_id(), owner_id);
        assert_eq!(wallet.key(), owner_id);
        assert_ne!(wallet.id(), owner_id);
        assert_eq!(wallet.balance(), Balance::zero());
    }

    #[test]
    fn test_wallet_credit() {
        let mut wallet = wallet_with(0);
        wallet.credit(&Amount::new(100).unwrap()).unwrap();
        assert_eq!(wallet.balance().value(), 100);
        assert_eq!(wallet.opening_balance(), Balance::zero());
    }

    #[test]
    fn test_wallet_debit() {
        let mut wallet = wallet_with(100);
        wallet.debit(&Amount::new(30).unwrap()).unwrap();
        assert_eq!(wallet.balance().value(), 70);
    }

    #[test]
    fn test_wallet_insufficient_funds() {
        let mut wallet = wallet_with(50);
        let result = wallet.debit(&Amount::new(100).unwrap());

        assert_eq!(result, Err(DomainError::insufficient_funds(100, 50)));
        assert_eq!(wallet.balance().value(), 50);
    }
}
