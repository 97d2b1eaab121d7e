//! Data-source seam for paged list fetches.
//!
//! A list view hands a compiled [`QueryCondition`] plus paging to a
//! [`DataSource`] and gets a [`Page`] back. Implementations live in this
//! crate (in-memory) and in `sift-views` (REST).

use ::async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sift_core::{DataSourceError, QueryCondition};

/// Sort direction for [`OrderBy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Single-field ordering. Dotted paths address relation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// One page request against a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(rename = "where")]
    pub where_: QueryCondition,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

impl ListQuery {
    pub fn new(where_: QueryCondition, page: u32, page_size: u32) -> Self {
        Self {
            where_,
            page: page.max(1),
            page_size,
            order_by: None,
        }
    }

    pub fn ordered_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            page_size,
        }
    }

    /// `page * page_size < total`.
    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Anything that can answer a paged, filtered list query.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Item: Send;

    /// Fetch one page of rows matching `query.where_`.
    async fn list(&self, query: &ListQuery) -> Result<Page<Self::Item>, DataSourceError>;
}

#[async_trait]
impl<S> DataSource for std::sync::Arc<S>
where
    S: DataSource + ?Sized,
{
    type Item = S::Item;

    async fn list(&self, query: &ListQuery) -> Result<Page<Self::Item>, DataSourceError> {
        (**self).list(query).await
    }
}
