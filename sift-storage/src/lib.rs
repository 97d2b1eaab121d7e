//! Sift Storage - Data-Source Seam and Wallet Ledger
//!
//! Defines the [`DataSource`] abstraction list views fetch through, an
//! in-memory implementation that evaluates compiled conditions, and the
//! transactional referral-withdrawal flow.

pub mod eval;
pub mod memory;
pub mod source;
pub mod wallet;

pub use eval::matches;
pub use memory::InMemoryDataSource;
pub use source::{DataSource, ListQuery, OrderBy, Page, SortDirection};
pub use wallet::{
    withdraw_referral_balance, InMemoryWalletStore, TransferPlan, TransferReceipt, Wallet, WalletKind,
    WalletStore, WithdrawalRequest,
};
