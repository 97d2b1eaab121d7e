//! Error type for the view layer.

use crate::api_client::ApiClientError;
use crate::config::ConfigError;
use sift_core::SiftError;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("API client error: {0}")]
    Api(#[from] ApiClientError),

    #[error(transparent)]
    Sift(#[from] SiftError),
}

pub type ViewResult<T> = Result<T, ViewError>;

impl From<sift_core::LedgerError> for ViewError {
    fn from(err: sift_core::LedgerError) -> Self {
        ViewError::Sift(err.into())
    }
}

impl From<sift_core::DataSourceError> for ViewError {
    fn from(err: sift_core::DataSourceError) -> Self {
        ViewError::Sift(err.into())
    }
}
