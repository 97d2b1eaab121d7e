//! In-memory data source backed by the condition evaluator.

use crate::eval::{compare_values, lookup, matches};
use crate::source::{DataSource, ListQuery, Page, SortDirection};
use ::async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sift_core::DataSourceError;
use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Rows held in memory and filtered with [`matches`].
///
/// Cloning shares the same rows.
#[derive(Debug)]
pub struct InMemoryDataSource<T> {
    resource: String,
    rows: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for InMemoryDataSource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T> InMemoryDataSource<T>
where
    T: Serialize + Clone + Send + Sync,
{
    pub fn new(resource: impl Into<String>, rows: Vec<T>) -> Self {
        Self {
            resource: resource.into(),
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn push(&self, row: T) {
        self.rows.write().unwrap_or_else(PoisonError::into_inner).push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `query` synchronously.
    pub fn query(&self, query: &ListQuery) -> Result<Page<T>, DataSourceError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);

        let mut hits: Vec<(Value, &T)> = Vec::new();
        for row in rows.iter() {
            let json = serde_json::to_value(row).map_err(|e| DataSourceError::InvalidResponse {
                resource: self.resource.clone(),
                reason: e.to_string(),
            })?;
            if matches(&json, &query.where_) {
                hits.push((json, row));
            }
        }

        if let Some(order) = &query.order_by {
            hits.sort_by(|(a, _), (b, _)| {
                let ordering = match (lookup(a, &order.field), lookup(b, &order.field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total = hits.len() as u64;
        let items: Vec<T> = hits
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .map(|(_, row)| row.clone())
            .collect();

        debug!(
            resource = %self.resource,
            page = query.page,
            page_size = query.page_size,
            total,
            returned = items.len(),
            "In-memory list query"
        );

        Ok(Page {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }
}

#[async_trait]
impl<T> DataSource for InMemoryDataSource<T>
where
    T: Serialize + Clone + Send + Sync,
{
    type Item = T;

    async fn list(&self, query: &ListQuery) -> Result<Page<T>, DataSourceError> {
        self.query(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::OrderBy;
    use serde::Deserialize;
    use serde_json::json;
    use sift_core::QueryCondition;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u32,
        status: String,
        amount: i64,
    }

    fn source() -> InMemoryDataSource<Row> {
        let rows = (1..=25)
            .map(|id| Row {
                id,
                status: if id % 2 == 0 { "PAID" } else { "PENDING" }.to_string(),
                amount: i64::from(id) * 10,
            })
            .collect();
        InMemoryDataSource::new("rows", rows)
    }

    fn paid() -> QueryCondition {
        serde_json::from_value(json!({ "status": "PAID" })).unwrap()
    }

    #[tokio::test]
    async fn test_filters_and_counts() {
        let page = source().list(&ListQuery::new(paid(), 1, 5)).await.unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 5);
        assert!(page.items.iter().all(|r| r.status == "PAID"));
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn test_last_page_is_short() {
        let page = source().list(&ListQuery::new(paid(), 3, 5)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_orders_descending() {
        let query = ListQuery::new(QueryCondition::new(), 1, 3).ordered_by(OrderBy::desc("amount"));
        let page = source().list(&query).await.unwrap();
        let ids: Vec<u32> = page.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![25, 24, 23]);
    }

    #[test]
    fn test_clones_share_rows() {
        let a = source();
        let b = a.clone();
        b.push(Row {
            id: 99,
            status: "PAID".to_string(),
            amount: 1,
        });
        assert_eq!(a.len(), 26);
    }
}
