//! Free-text search clause.

use crate::condition::QueryCondition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields a list view's search box matches against.
///
/// Dotted paths (`user.email`) are written as relation filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub fields: Vec<String>,
    /// Emit `mode: "insensitive"` alongside `contains`.
    pub case_insensitive: bool,
}

impl SearchSpec {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            case_insensitive: true,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// `{ OR: [{ field: { contains: q } }, ..] }`, or `None` for a blank query.
    pub fn compile(&self, query: &str) -> Option<QueryCondition> {
        let query = query.trim();
        if query.is_empty() || self.fields.is_empty() {
            return None;
        }
        let alternatives = self
            .fields
            .iter()
            .map(|path| self.field_clause(path, query))
            .map(QueryCondition::into_json)
            .collect();
        let mut condition = QueryCondition::new();
        condition.set_group(crate::condition::OR_KEY, alternatives);
        Some(condition)
    }

    fn field_clause(&self, path: &str, query: &str) -> QueryCondition {
        let mut contains = Map::new();
        contains.insert("contains".to_string(), Value::String(query.to_string()));
        if self.case_insensitive {
            contains.insert("mode".to_string(), Value::String("insensitive".to_string()));
        }

        let mut segments = path.rsplit('.');
        let leaf = segments.next().unwrap_or(path);
        let mut value = Value::Object(contains);
        let mut key = leaf.to_string();
        for parent in segments {
            let mut wrapper = Map::new();
            wrapper.insert(key, value);
            value = Value::Object(wrapper);
            key = parent.to_string();
        }
        QueryCondition::single(key, value)
    }
}
