//! Per-view filter schema.

use crate::compiler::compile;
use crate::condition::QueryCondition;
use crate::mapping::FieldMapping;
use crate::search::SearchSpec;
use crate::value::RawValues;
use serde_json::Value;

/// Key of the free-text search field in a raw value bag.
pub const SEARCH_KEY: &str = "search";

/// Everything a list view needs to turn its committed filter into a `where`
/// condition.
#[derive(Debug, Clone, Default)]
pub struct FilterSchema {
    pub mappings: Vec<FieldMapping>,
    pub search: Option<SearchSpec>,
}

impl FilterSchema {
    pub fn new(mappings: Vec<FieldMapping>) -> Self {
        Self {
            mappings,
            search: None,
        }
    }

    pub fn with_search(mut self, search: SearchSpec) -> Self {
        self.search = Some(search);
        self
    }

    /// Compile the mapped fields, then AND in the search clause.
    ///
    /// The `search` key never reaches the field mappings.
    pub fn compile(&self, raw: &RawValues) -> QueryCondition {
        let mut fields = raw.clone();
        let query = fields.remove(SEARCH_KEY);
        let condition = compile(&fields, &self.mappings);

        let search = match (&self.search, query) {
            (Some(spec), Some(Value::String(query))) => spec.compile(&query),
            _ => None,
        };
        match search {
            Some(search) => condition.merge_and(search),
            None => condition,
        }
    }

    /// Keys of every mapped field, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.key.as_str())
    }
}
