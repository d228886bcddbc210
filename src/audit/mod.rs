//! Ledger Audit Service
//!
//! Checks the wallet store against its conservation invariant: funds only
//! enter the system when a wallet is opened, so the sum of live balances must
//! equal the sum of opening balances at every instant.

use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::Wallet;
use crate::store::{StoreError, WalletStoreRef};

/// Result of a ledger audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub is_valid: bool,
    pub wallets_checked: u64,
    /// Credit issued at wallet creation
    pub total_issued: u128,
    pub total_balance: u128,
    /// First wallet holding more than was ever issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_wallet: Option<Uuid>,
}

impl AuditReport {
    /// Audit a point-in-time set of wallets
    pub fn from_wallets(wallets: &[Wallet]) -> Self {
        let total_issued: u128 = wallets
            .iter()
            .map(|w| u128::from(w.opening_balance().value()))
            .sum();
        let total_balance: u128 = wallets
            .iter()
            .map(|w| u128::from(w.balance().value()))
            .sum();

        let first_invalid_wallet = wallets
            .iter()
            .find(|w| u128::from(w.balance().value()) > total_issued)
            .map(|w| w.id());

        Self {
            is_valid: total_issued == total_balance && first_invalid_wallet.is_none(),
            wallets_checked: wallets.len() as u64,
            total_issued,
            total_balance,
            first_invalid_wallet,
        }
    }
}

/// Runs audits against the live wallet store
#[derive(Clone)]
pub struct LedgerAuditService {
    wallets: WalletStoreRef,
}

impl LedgerAuditService {
    pub fn new(wallets: WalletStoreRef) -> Self {
        Self { wallets }
    }

    /// Snapshot every wallet and check conservation
    pub async fn verify(&self) -> Result<AuditReport, StoreError> {
        let snapshot = self.wallets.snapshot().await?;
        let report = AuditReport::from_wallets(&snapshot);

        if report.is_valid {
            tracing::debug!(
                wallets = report.wallets_checked,
                total = %report.total_balance,
                "Ledger audit passed"
            );
        } else {
            tracing::error!(
                wallets = report.wallets_checked,
                issued = %report.total_issued,
                balance = %report.total_balance,
                first_invalid_wallet = ?report.first_invalid_wallet,
                "Ledger audit failed"
            );
        }

        Ok(report)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Balance};
    use crate::store::{InMemoryWalletStore, WalletStore};
    use std::sync::Arc;

    fn wallet(balance: u64) -> Wallet {
        Wallet::open(Uuid::new_v4(), Balance::new(balance))
    }

    #[test]
    fn test_empty_ledger_is_valid() {
        let report = AuditReport::from_wallets(&[]);
        assert!(report.is_valid);
        assert_eq!(report.wallets_checked, 0);
        assert_eq!(report.total_balance, 0);
    }

    #[test]
    fn test_detects_created_money() {
        let mut inflated = wallet(100);
        inflated.credit(&Amount::new(50).unwrap()).unwrap();

        let report = AuditReport::from_wallets(&[wallet(2000), inflated]);
        assert!(!report.is_valid);
        assert_eq!(report.total_issued, 2100);
        assert_eq!(report.total_balance, 2150);
    }

    #[tokio::test]
    async fn test_transfers_keep_ledger_balanced() {
        let store = Arc::new(InMemoryWalletStore::new());
        let (a, b) = (wallet(2000), wallet(0));
        let (a_id, b_id) = (a.owner_id(), b.owner_id());
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();

        store
            .transfer(a_id, b_id, Amount::new(750).unwrap())
            .await
            .unwrap();

        let report = LedgerAuditService::new(store).verify().await.unwrap();
        assert!(report.is_valid);
        assert_eq!(report.total_balance, 2000);
        assert_eq!(report.wallets_checked, 2);
    }

    #[test]
    fn test_report_serialization() {
        let json = serde_json::to_value(AuditReport::from_wallets(&[wallet(5)])).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["totalIssued"], 5);
        assert!(json.get("firstInvalidWallet").is_none());
    }
}
