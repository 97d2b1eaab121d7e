use ::async_trait::async_trait;
use proptest::prelude::*;
use serde::Serialize;
use serde_json::json;
use sift_core::{compile, FieldMapping, LedgerError, QueryCondition, RawValues};
use sift_storage::{
    withdraw_referral_balance, InMemoryDataSource, InMemoryWalletStore, ListQuery, TransferPlan,
    TransferReceipt, Wallet, WalletKind, WalletStore, WithdrawalRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
struct Row {
    status: String,
    amount: i64,
}

fn row() -> impl Strategy<Value = Row> {
    (prop::sample::select(vec!["A", "B", "C"]), -100i64..100).prop_map(|(status, amount)| Row {
        status: status.to_string(),
        amount,
    })
}

async fn funded_pair(store: &InMemoryWalletStore, balance: i64) -> WithdrawalRequest {
    let owner = Uuid::now_v7();
    let referral = Wallet::new(owner, WalletKind::Referral, "USD", balance);
    let main = Wallet::new(owner, WalletKind::Main, "USD", 0);
    let request = WithdrawalRequest {
        referral_wallet_id: referral.wallet_id,
        main_wallet_id: main.wallet_id,
        amount_minor: balance,
    };
    store.insert(referral).await;
    store.insert(main).await;
    request
}

/// Bumps the source wallet between read and commit for the first `races` commits.
struct RacingStore {
    inner: InMemoryWalletStore,
    races: AtomicUsize,
}

#[async_trait]
impl WalletStore for RacingStore {
    async fn get(&self, wallet_id: Uuid) -> Result<Wallet, LedgerError> {
        self.inner.get(wallet_id).await
    }

    async fn commit_transfer(&self, plan: &TransferPlan) -> Result<TransferReceipt, LedgerError> {
        let remaining = self.races.load(Ordering::SeqCst);
        if remaining > 0 {
            self.races.store(remaining - 1, Ordering::SeqCst);
            self.inner.deposit(plan.from_wallet_id, 0).await?;
        }
        self.inner.commit_transfer(plan).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_full_withdrawals_succeed_once() {
    let store = Arc::new(InMemoryWalletStore::new());
    let request = funded_pair(&store, 1_000).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let request = request.clone();
            tokio::spawn(async move { withdraw_referral_balance(store.as_ref(), &request, 5).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InsufficientFunds { available: 0, .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(store.get(request.referral_wallet_id).await.unwrap().balance_minor, 0);
    assert_eq!(store.get(request.main_wallet_id).await.unwrap().balance_minor, 1_000);
    assert_eq!(store.receipts().await.len(), 1);
}

#[tokio::test]
async fn version_conflict_is_retried() {
    let inner = InMemoryWalletStore::new();
    let request = funded_pair(&inner, 300).await;
    let store = RacingStore {
        inner: inner.clone(),
        races: AtomicUsize::new(2),
    };

    let receipt = withdraw_referral_balance(&store, &request, 3).await.unwrap();
    assert_eq!(receipt.attempts, 3);
    assert_eq!(inner.get(request.main_wallet_id).await.unwrap().balance_minor, 300);
}

#[tokio::test]
async fn retries_are_bounded() {
    let inner = InMemoryWalletStore::new();
    let request = funded_pair(&inner, 300).await;
    let store = RacingStore {
        inner: inner.clone(),
        races: AtomicUsize::new(10),
    };

    let err = withdraw_referral_balance(&store, &request, 2).await.unwrap_err();
    assert_eq!(err, LedgerError::RetriesExhausted { attempts: 3 });
    assert!(inner.receipts().await.is_empty());
    assert_eq!(inner.get(request.referral_wallet_id).await.unwrap().balance_minor, 300);
}

#[tokio::test]
async fn unknown_wallet_is_reported() {
    let store = InMemoryWalletStore::new();
    let missing = Uuid::now_v7();
    let request = WithdrawalRequest {
        referral_wallet_id: missing,
        main_wallet_id: Uuid::now_v7(),
        amount_minor: 1,
    };
    let err = withdraw_referral_balance(&store, &request, 1).await.unwrap_err();
    assert_eq!(err, LedgerError::WalletNotFound { wallet_id: missing });
}

proptest! {
    #[test]
    fn compiled_filter_agrees_with_manual_filter(
        rows in prop::collection::vec(row(), 0..40),
        statuses in prop::sample::subsequence(vec!["A", "B", "C"], 1..=3),
        from in -100i64..100,
        span in 0i64..100,
    ) {
        let to = from + span;
        let mappings = vec![FieldMapping::direct("status"), FieldMapping::direct("amount").to_field("amount")];
        let mut raw = RawValues::new();
        raw.insert("status".into(), json!(statuses));
        raw.insert("amount".into(), json!({ "from": from, "to": to }));
        let condition = compile(&raw, &mappings);

        let expected = rows
            .iter()
            .filter(|r| statuses.contains(&r.status.as_str()) && r.amount >= from && r.amount <= to)
            .count();
        let source = InMemoryDataSource::new("rows", rows);
        let page = source.query(&ListQuery::new(condition, 1, 100)).unwrap();
        prop_assert_eq!(page.total as usize, expected);
        prop_assert_eq!(page.items.len(), expected);
    }

    #[test]
    fn paging_visits_every_row_once(
        rows in prop::collection::vec(row(), 0..60),
        page_size in 1u32..15,
    ) {
        let total = rows.len();
        let source = InMemoryDataSource::new("rows", rows);
        let mut seen = 0usize;
        let mut page_no = 1;
        loop {
            let page = source.query(&ListQuery::new(QueryCondition::new(), page_no, page_size)).unwrap();
            seen += page.items.len();
            if !page.has_more() {
                break;
            }
            prop_assert_eq!(page.items.len(), page_size as usize);
            page_no += 1;
        }
        prop_assert_eq!(seen, total);
    }
}
