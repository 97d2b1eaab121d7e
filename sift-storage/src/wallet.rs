//! Referral-balance withdrawal with an optimistic-lock ledger boundary.
//!
//! A withdrawal moves funds from a user's referral wallet into their main
//! wallet. The debit and credit are committed together by
//! [`WalletStore::commit_transfer`], which rejects the plan if either wallet
//! changed since it was read. [`withdraw_referral_balance`] re-reads and
//! retries on such conflicts, so two concurrent full-balance withdrawals
//! cannot both succeed.

use ::async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core::LedgerError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletKind {
    Referral,
    Main,
}

/// A wallet balance in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub wallet_id: Uuid,
    pub owner_id: Uuid,
    pub kind: WalletKind,
    pub currency: String,
    pub balance_minor: i64,
    /// Bumped on every committed change.
    pub version: u64,
}

impl Wallet {
    pub fn new(owner_id: Uuid, kind: WalletKind, currency: impl Into<String>, balance_minor: i64) -> Self {
        Self {
            wallet_id: Uuid::now_v7(),
            owner_id,
            kind,
            currency: currency.into(),
            balance_minor,
            version: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub referral_wallet_id: Uuid,
    pub main_wallet_id: Uuid,
    pub amount_minor: i64,
}

/// A debit/credit pair computed against specific wallet versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub from_wallet_id: Uuid,
    pub from_version: u64,
    pub to_wallet_id: Uuid,
    pub to_version: u64,
    pub amount_minor: i64,
}

/// Ledger entry for a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount_minor: i64,
    pub from_balance_after: i64,
    pub to_balance_after: i64,
    /// Attempts taken by the withdrawal that produced this receipt.
    pub attempts: u32,
    pub committed_at: DateTime<Utc>,
}

/// Transactional wallet storage.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get(&self, wallet_id: Uuid) -> Result<Wallet, LedgerError>;

    /// Apply debit and credit together, or nothing.
    ///
    /// Fails with [`LedgerError::VersionConflict`] if either wallet's version
    /// no longer matches the plan.
    async fn commit_transfer(&self, plan: &TransferPlan) -> Result<TransferReceipt, LedgerError>;
}

/// Move `amount_minor` from a referral wallet to the same owner's main wallet.
///
/// Version conflicts are retried up to `max_retries` times, re-reading both
/// balances on each attempt.
pub async fn withdraw_referral_balance<S>(
    store: &S,
    request: &WithdrawalRequest,
    max_retries: u32,
) -> Result<TransferReceipt, LedgerError>
where
    S: WalletStore + ?Sized,
{
    if request.amount_minor <= 0 {
        return Err(LedgerError::InvalidAmount {
            amount: request.amount_minor,
            reason: "must be > 0".to_string(),
        });
    }
    if request.referral_wallet_id == request.main_wallet_id {
        return Err(LedgerError::InvalidWalletPair {
            reason: "source and target are the same wallet".to_string(),
        });
    }

    let attempts = max_retries.saturating_add(1);
    for attempt in 1..=attempts {
        let source = store.get(request.referral_wallet_id).await?;
        let target = store.get(request.main_wallet_id).await?;
        let plan = plan_withdrawal(&source, &target, request.amount_minor)?;

        match store.commit_transfer(&plan).await {
            Ok(mut receipt) => {
                receipt.attempts = attempt;
                info!(
                    transfer_id = %receipt.transfer_id,
                    owner_id = %source.owner_id,
                    amount_minor = receipt.amount_minor,
                    attempt,
                    "Referral balance withdrawn"
                );
                return Ok(receipt);
            }
            Err(LedgerError::VersionConflict { wallet_id, expected, found }) => {
                debug!(%wallet_id, expected, found, attempt, "Withdrawal raced a concurrent update, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    warn!(
        referral_wallet_id = %request.referral_wallet_id,
        attempts,
        "Withdrawal abandoned after repeated version conflicts"
    );
    Err(LedgerError::RetriesExhausted { attempts })
}

fn plan_withdrawal(source: &Wallet, target: &Wallet, amount_minor: i64) -> Result<TransferPlan, LedgerError> {
    if source.kind != WalletKind::Referral || target.kind != WalletKind::Main {
        return Err(LedgerError::InvalidWalletPair {
            reason: format!("expected referral -> main, got {:?} -> {:?}", source.kind, target.kind),
        });
    }
    if source.owner_id != target.owner_id {
        return Err(LedgerError::InvalidWalletPair {
            reason: "wallets belong to different owners".to_string(),
        });
    }
    if source.currency != target.currency {
        return Err(LedgerError::CurrencyMismatch {
            source_currency: source.currency.clone(),
            target_currency: target.currency.clone(),
        });
    }
    if source.balance_minor < amount_minor {
        return Err(LedgerError::InsufficientFunds {
            wallet_id: source.wallet_id,
            requested: amount_minor,
            available: source.balance_minor,
        });
    }
    Ok(TransferPlan {
        from_wallet_id: source.wallet_id,
        from_version: source.version,
        to_wallet_id: target.wallet_id,
        to_version: target.version,
        amount_minor,
    })
}

// ============================================================================
// IN-MEMORY LEDGER
// ============================================================================

#[derive(Debug, Default)]
struct LedgerState {
    wallets: HashMap<Uuid, Wallet>,
    receipts: Vec<TransferReceipt>,
}

/// In-memory [`WalletStore`]. One mutex guards wallets and ledger together,
/// which makes each commit a single transactional boundary.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWalletStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, wallet: Wallet) {
        self.state.lock().await.wallets.insert(wallet.wallet_id, wallet);
    }

    /// Credit a wallet outside of any transfer (e.g. a referral reward).
    pub async fn deposit(&self, wallet_id: Uuid, amount_minor: i64) -> Result<Wallet, LedgerError> {
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or(LedgerError::WalletNotFound { wallet_id })?;
        wallet.balance_minor += amount_minor;
        wallet.version += 1;
        Ok(wallet.clone())
    }

    /// Committed transfers, oldest first.
    pub async fn receipts(&self) -> Vec<TransferReceipt> {
        self.state.lock().await.receipts.clone()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get(&self, wallet_id: Uuid) -> Result<Wallet, LedgerError> {
        self.state
            .lock()
            .await
            .wallets
            .get(&wallet_id)
            .cloned()
            .ok_or(LedgerError::WalletNotFound { wallet_id })
    }

    async fn commit_transfer(&self, plan: &TransferPlan) -> Result<TransferReceipt, LedgerError> {
        let mut state = self.state.lock().await;

        let mut source = checked(&state.wallets, plan.from_wallet_id, plan.from_version)?;
        let mut target = checked(&state.wallets, plan.to_wallet_id, plan.to_version)?;
        if source.balance_minor < plan.amount_minor {
            return Err(LedgerError::InsufficientFunds {
                wallet_id: source.wallet_id,
                requested: plan.amount_minor,
                available: source.balance_minor,
            });
        }

        source.balance_minor -= plan.amount_minor;
        source.version += 1;
        target.balance_minor += plan.amount_minor;
        target.version += 1;

        let receipt = TransferReceipt {
            transfer_id: Uuid::now_v7(),
            from_wallet_id: source.wallet_id,
            to_wallet_id: target.wallet_id,
            amount_minor: plan.amount_minor,
            from_balance_after: source.balance_minor,
            to_balance_after: target.balance_minor,
            attempts: 1,
            committed_at: Utc::now(),
        };
        state.wallets.insert(source.wallet_id, source);
        state.wallets.insert(target.wallet_id, target);
        state.receipts.push(receipt.clone());
        Ok(receipt)
    }
}

fn checked(wallets: &HashMap<Uuid, Wallet>, wallet_id: Uuid, expected: u64) -> Result<Wallet, LedgerError> {
    let wallet = wallets.get(&wallet_id).ok_or(LedgerError::WalletNotFound { wallet_id })?;
    if wallet.version != expected {
        return Err(LedgerError::VersionConflict {
            wallet_id,
            expected,
            found: wallet.version,
        });
    }
    Ok(wallet.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup(balance: i64) -> (InMemoryWalletStore, WithdrawalRequest) {
        let owner = Uuid::now_v7();
        let referral = Wallet::new(owner, WalletKind::Referral, "USD", balance);
        let main = Wallet::new(owner, WalletKind::Main, "USD", 0);
        let request = WithdrawalRequest {
            referral_wallet_id: referral.wallet_id,
            main_wallet_id: main.wallet_id,
            amount_minor: balance,
        };
        let store = InMemoryWalletStore::new();
        store.insert(referral).await;
        store.insert(main).await;
        (store, request)
    }

    #[tokio::test]
    async fn test_withdrawal_moves_funds() {
        let (store, request) = setup(500).await;
        let receipt = withdraw_referral_balance(&store, &request, 3).await.unwrap();

        assert_eq!(receipt.from_balance_after, 0);
        assert_eq!(receipt.to_balance_after, 500);
        assert_eq!(receipt.attempts, 1);
        assert_eq!(store.get(request.main_wallet_id).await.unwrap().version, 1);
        assert_eq!(store.receipts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let (store, mut request) = setup(500).await;
        request.amount_minor = 0;
        let err = withdraw_referral_balance(&store, &request, 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { amount: 0, .. }));
    }

    #[tokio::test]
    async fn test_rejects_overdraft() {
        let (store, mut request) = setup(500).await;
        request.amount_minor = 501;
        let err = withdraw_referral_balance(&store, &request, 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 500, .. }));
        assert!(store.receipts().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_swapped_wallets() {
        let (store, request) = setup(500).await;
        let swapped = WithdrawalRequest {
            referral_wallet_id: request.main_wallet_id,
            main_wallet_id: request.referral_wallet_id,
            amount_minor: 1,
        };
        let err = withdraw_referral_balance(&store, &swapped, 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidWalletPair { .. }));
    }

    #[tokio::test]
    async fn test_rejects_currency_mismatch() {
        let owner = Uuid::now_v7();
        let referral = Wallet::new(owner, WalletKind::Referral, "USD", 100);
        let main = Wallet::new(owner, WalletKind::Main, "EUR", 0);
        let request = WithdrawalRequest {
            referral_wallet_id: referral.wallet_id,
            main_wallet_id: main.wallet_id,
            amount_minor: 100,
        };
        let store = InMemoryWalletStore::new();
        store.insert(referral).await;
        store.insert(main).await;

        let err = withdraw_referral_balance(&store, &request, 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_stale_plan_is_rejected() {
        let (store, request) = setup(500).await;
        let source = store.get(request.referral_wallet_id).await.unwrap();
        let target = store.get(request.main_wallet_id).await.unwrap();
        let plan = plan_withdrawal(&source, &target, 100).unwrap();

        store.deposit(request.referral_wallet_id, 10).await.unwrap();
        let err = store.commit_transfer(&plan).await.unwrap_err();
        assert!(matches!(err, LedgerError::VersionConflict { expected: 0, found: 1, .. }));
    }
}
