//! Sift Test Utilities
//!
//! Shared test infrastructure for the sift workspace:
//! - A scriptable mock data source (call counting, gating, failure injection)
//! - Proptest generators for mappings, rule trees and raw values
//! - Fixture rows and funded wallets
//! - Assertions on compiled conditions

pub use sift_core::{
    compile, compile_group, Comparator, DataSourceError, DynamicFilterGroup, DynamicFilterNode,
    DynamicFilterRule, FieldMapping, QueryCondition, RawValues, RuleOperator,
};
pub use sift_storage::{DataSource, InMemoryDataSource, ListQuery, Page};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

// ============================================================================
// MOCK DATA SOURCE
// ============================================================================

/// In-memory data source with knobs for orchestration tests.
///
/// Every call is counted and recorded before it does anything else, so a
/// test can observe a fetch that is still pending. A gated source holds each
/// call until [`MockDataSource::release`] hands out a permit; waiters are
/// released in call order.
#[derive(Debug, Clone)]
pub struct MockDataSource<T> {
    inner: InMemoryDataSource<T>,
    calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<ListQuery>>>,
    failures: Arc<Mutex<VecDeque<DataSourceError>>>,
    gate: Option<Arc<Semaphore>>,
}

impl<T> MockDataSource<T>
where
    T: Serialize + Clone + Send + Sync,
{
    /// Answers immediately.
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            inner: InMemoryDataSource::new("mock", rows),
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            gate: None,
        }
    }

    /// Holds every call until released.
    pub fn gated(rows: Vec<T>) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(rows)
        }
    }

    /// Let `n` pending (or future) calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Fail the next call with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: DataSourceError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<ListQuery> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_query(&self) -> Option<ListQuery> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    pub fn push(&self, row: T) {
        self.inner.push(row);
    }
}

#[async_trait]
impl<T> DataSource for MockDataSource<T>
where
    T: Serialize + Clone + Send + Sync,
{
    type Item = T;

    async fn list(&self, query: &ListQuery) -> Result<Page<T>, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|e| DataSourceError::Unavailable {
                reason: e.to_string(),
            })?;
            permit.forget();
        }

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match failure {
            Some(error) => Err(error),
            None => self.inner.query(query),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for sift filter types.

    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Field names that never collide with logical keys or `search`.
    pub fn arb_field_name() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z]{0,10}".prop_filter("reserved key", |s| s != "search")
    }

    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i32>().prop_map(Value::from),
            "[A-Z_]{1,10}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ]
    }

    pub fn arb_comparator() -> impl Strategy<Value = Comparator> {
        prop_oneof![Just(Comparator::And), Just(Comparator::Or)]
    }

    pub fn arb_field_mapping() -> impl Strategy<Value = FieldMapping> {
        (arb_field_name(), arb_comparator(), prop::option::of(arb_field_name())).prop_map(
            |(key, comparator, target)| {
                let mut mapping = FieldMapping::direct(key);
                if let Some(field) = target {
                    mapping = mapping.to_field(field);
                }
                mapping.comparator = comparator;
                mapping
            },
        )
    }

    pub fn arb_operator() -> impl Strategy<Value = RuleOperator> {
        prop::sample::select(vec![
            RuleOperator::Equals,
            RuleOperator::Contains,
            RuleOperator::StartsWith,
            RuleOperator::EndsWith,
            RuleOperator::Gt,
            RuleOperator::Gte,
            RuleOperator::Lt,
            RuleOperator::Lte,
            RuleOperator::In,
        ])
    }

    pub fn arb_rule() -> impl Strategy<Value = DynamicFilterRule> {
        (arb_field_name(), arb_operator(), arb_scalar())
            .prop_map(|(field, operator, value)| DynamicFilterRule::new(field, operator, value))
    }

    /// Rule trees up to four levels deep.
    pub fn arb_group() -> impl Strategy<Value = DynamicFilterGroup> {
        let leaf = (arb_comparator(), prop::collection::vec(arb_rule(), 0..4)).prop_map(|(condition, rules)| {
            let mut group = DynamicFilterGroup::new(condition);
            group.rules = rules.into_iter().map(DynamicFilterNode::Rule).collect();
            group
        });
        leaf.prop_recursive(4, 32, 4, |inner| {
            (arb_comparator(), prop::collection::vec(arb_rule(), 0..3), prop::collection::vec(inner, 0..3))
                .prop_map(|(condition, rules, groups)| {
                    let mut group = DynamicFilterGroup::new(condition);
                    group.rules.extend(rules.into_iter().map(DynamicFilterNode::Rule));
                    group.rules.extend(groups.into_iter().map(DynamicFilterNode::Group));
                    group
                })
        })
    }

    /// Raw values for `keys`: absent, scalar, list or range.
    pub fn arb_raw_values(keys: Vec<String>) -> impl Strategy<Value = RawValues> {
        let value = prop_oneof![
            Just(Value::Null),
            arb_scalar(),
            prop::collection::vec(arb_scalar(), 0..4).prop_map(Value::Array),
            (prop::option::of(any::<i32>()), prop::option::of(any::<i32>()))
                .prop_map(|(from, to)| serde_json::json!({ "from": from, "to": to })),
        ];
        prop::collection::vec(value, keys.len()).prop_map(move |values| {
            keys.iter().cloned().zip(values).collect::<RawValues>()
        })
    }

    /// Page sizes a list view might be configured with.
    pub fn arb_page_size() -> impl Strategy<Value = u32> {
        1u32..=50
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows and wallets for common scenarios.

    use serde_json::{json, Value};
    use sift_storage::{InMemoryWalletStore, Wallet, WalletKind, WithdrawalRequest};
    use uuid::Uuid;

    pub const STATUSES: [&str; 3] = ["PENDING", "PAID", "FAILED"];
    pub const TRANSACTION_TYPES: [&str; 3] = ["SIGNUP_BONUS", "PURCHASE_COMMISSION", "WITHDRAWAL"];
    pub const TIERS: [&str; 3] = ["SILVER", "GOLD", "PLATINUM"];

    /// `n` referral transaction rows with deterministic contents.
    ///
    /// Row `i` has amount `(i + 1) * 10`, status `STATUSES[i % 3]`, type
    /// `TRANSACTION_TYPES[i % 3]` and is created on day `i % 28 + 1` of
    /// March 2024.
    pub fn referral_transactions(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "id": i,
                    "referenceId": format!("REF-{:04}", i),
                    "status": STATUSES[i % 3],
                    "type": TRANSACTION_TYPES[i % 3],
                    "amount": (i as i64 + 1) * 10,
                    "currency": "USD",
                    "createdAt": format!("2024-03-{:02}T12:00:00.000Z", i % 28 + 1),
                    "user": {
                        "email": format!("user{}@example.com", i),
                        "fullName": format!("User {}", i),
                        "membershipTier": { "name": TIERS[i % 3] }
                    }
                })
            })
            .collect()
    }

    /// `n` membership cron job rows.
    pub fn membership_cron_jobs(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "id": i,
                    "jobName": if i % 2 == 0 { "EXPIRE_MEMBERSHIPS" } else { "RENEW_MEMBERSHIPS" },
                    "status": STATUSES[i % 3],
                    "lastRunAt": format!("2024-04-{:02}T03:00:00.000Z", i % 28 + 1),
                    "membershipTier": { "name": TIERS[i % 3] }
                })
            })
            .collect()
    }

    /// A referral and a main wallet for one owner, plus a request that
    /// withdraws the full referral balance.
    pub async fn funded_wallets(store: &InMemoryWalletStore, balance_minor: i64) -> WithdrawalRequest {
        let owner = Uuid::now_v7();
        let referral = Wallet::new(owner, WalletKind::Referral, "USD", balance_minor);
        let main = Wallet::new(owner, WalletKind::Main, "USD", 0);
        let request = WithdrawalRequest {
            referral_wallet_id: referral.wallet_id,
            main_wallet_id: main.wallet_id,
            amount_minor: balance_minor,
        };
        store.insert(referral).await;
        store.insert(main).await;
        request
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on compiled conditions.

    use super::*;
    use serde_json::Value;

    /// Assert that every `AND`/`OR`/`NOT` key in `condition` holds an array.
    #[track_caller]
    pub fn assert_logical_keys_hold_arrays(condition: &QueryCondition) {
        fn check(value: &Value, path: &str) {
            if let Value::Object(map) = value {
                for (key, inner) in map {
                    let here = format!("{}.{}", path, key);
                    if matches!(key.as_str(), "AND" | "OR" | "NOT") {
                        match inner {
                            Value::Array(items) => items.iter().for_each(|item| check(item, &here)),
                            other => panic!("{} holds {:?}, expected an array", here, other),
                        }
                    } else {
                        check(inner, &here);
                    }
                }
            }
        }
        check(&condition.clone().into_json(), "$");
    }

    /// Assert that `condition` equals the given JSON.
    #[track_caller]
    pub fn assert_condition_json(condition: &QueryCondition, expected: Value) {
        assert_eq!(condition.clone().into_json(), expected, "compiled condition mismatch");
    }
}

// ============================================================================
// TESTS
// ============================================================================
