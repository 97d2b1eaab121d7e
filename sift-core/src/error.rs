//! Error types for sift operations
//!
//! The compilers have no error path. Errors only arise at the data-source
//! boundary, in the wallet ledger, and while loading configuration.

use thiserror::Error;
use uuid::Uuid;

/// Data-source (fetch) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("Request to {resource} failed with status {status}: {message}")]
    RequestFailed {
        resource: String,
        status: u16,
        message: String,
    },

    #[error("Request to {resource} timed out after {timeout_ms}ms")]
    Timeout { resource: String, timeout_ms: u64 },

    #[error("Invalid response from {resource}: {reason}")]
    InvalidResponse { resource: String, reason: String },

    #[error("Data source unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Wallet ledger errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Wallet not found: {wallet_id}")]
    WalletNotFound { wallet_id: Uuid },

    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: i64, reason: String },

    #[error("Currency mismatch: {source_currency} -> {target_currency}")]
    CurrencyMismatch {
        source_currency: String,
        target_currency: String,
    },

    #[error("Insufficient funds in wallet {wallet_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        wallet_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("Wallet {wallet_id} changed concurrently: expected version {expected}, found {found}")]
    VersionConflict {
        wallet_id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("Withdrawal gave up after {attempts} attempts due to concurrent updates")]
    RetriesExhausted { attempts: u32 },

    #[error("Invalid wallet pairing: {reason}")]
    InvalidWalletPair { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all sift errors.
#[derive(Debug, Clone, Error)]
pub enum SiftError {
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for sift operations.
pub type SiftResult<T> = Result<T, SiftError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_error_display_request_failed() {
        let err = DataSourceError::RequestFailed {
            resource: "referral-transactions".to_string(),
            status: 503,
            message: "maintenance".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("referral-transactions"));
        assert!(msg.contains("503"));
        assert!(msg.contains("maintenance"));
    }

    #[test]
    fn test_ledger_error_display_insufficient_funds() {
        let err = LedgerError::InsufficientFunds {
            wallet_id: Uuid::nil(),
            requested: 500,
            available: 120,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Insufficient funds"));
        assert!(msg.contains("500"));
        assert!(msg.contains("120"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_ledger_error_display_version_conflict() {
        let err = LedgerError::VersionConflict {
            wallet_id: Uuid::nil(),
            expected: 3,
            found: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("expected version 3"));
        assert!(msg.contains("found 4"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "views.referral.page_size".to_string(),
            value: "0".to_string(),
            reason: "must be > 0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("page_size"));
        assert!(msg.contains("must be > 0"));
    }

    #[test]
    fn test_sift_error_from_variants() {
        let source = SiftError::from(DataSourceError::Unavailable {
            reason: "offline".to_string(),
        });
        assert!(matches!(source, SiftError::DataSource(_)));

        let ledger = SiftError::from(LedgerError::RetriesExhausted { attempts: 4 });
        assert!(matches!(ledger, SiftError::Ledger(_)));

        let config = SiftError::from(ConfigError::MissingRequired {
            field: "api_base_url".to_string(),
        });
        assert!(matches!(config, SiftError::Config(_)));
    }
}
