//! Compiled query conditions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const AND_KEY: &str = "AND";
pub const OR_KEY: &str = "OR";
pub const NOT_KEY: &str = "NOT";

/// Nested boolean condition tree accepted by a data source as its `where`
/// argument.
///
/// Keys are output field names or one of `AND`/`OR`/`NOT`. A field maps to a
/// literal, an operator object such as `{gte, lte}`, or a nested condition
/// on a relation. The logical keys always hold arrays of sub-conditions:
/// the constructors only write arrays there, and a condition read from a map
/// or deserialized is checked with [`validate_logical_keys`] at every depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryCondition(Map<String, Value>);

impl QueryCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ AND: [..] }` over the non-empty conditions; a single condition is
    /// returned as-is.
    pub fn all_of<I>(conditions: I) -> Self
    where
        I: IntoIterator<Item = QueryCondition>,
    {
        Self::combine(AND_KEY, conditions)
    }

    /// `{ OR: [..] }` over the non-empty conditions; a single condition is
    /// returned as-is.
    pub fn any_of<I>(conditions: I) -> Self
    where
        I: IntoIterator<Item = QueryCondition>,
    {
        Self::combine(OR_KEY, conditions)
    }

    fn combine<I>(key: &str, conditions: I) -> Self
    where
        I: IntoIterator<Item = QueryCondition>,
    {
        let mut parts: Vec<QueryCondition> =
            conditions.into_iter().filter(|c| !c.is_empty()).collect();
        match parts.len() {
            0 => Self::new(),
            1 => parts.remove(0),
            _ => {
                let mut condition = Self::new();
                condition.set_group(key, parts.into_iter().map(QueryCondition::into_json).collect());
                condition
            }
        }
    }

    /// AND this condition with `other`. An empty side is the identity.
    pub fn merge_and(self, other: QueryCondition) -> Self {
        Self::all_of([self, other])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn and_conditions(&self) -> Option<&Vec<Value>> {
        self.0.get(AND_KEY).and_then(Value::as_array)
    }

    pub fn or_conditions(&self) -> Option<&Vec<Value>> {
        self.0.get(OR_KEY).and_then(Value::as_array)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }

    /// Set a field condition. Logical keys go through [`Self::set_group`].
    pub(crate) fn set_field(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub(crate) fn set_group(&mut self, key: &str, conditions: Vec<Value>) {
        self.0.insert(key.to_string(), Value::Array(conditions));
    }

    /// Single-entry condition `{ key: value }`.
    pub(crate) fn single(key: impl Into<String>, value: Value) -> Self {
        let mut condition = Self::new();
        condition.set_field(key, value);
        condition
    }
}

/// A logical key holding something other than an array of objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Logical key {key} at {path} must hold an array of conditions")]
pub struct InvalidCondition {
    pub key: String,
    pub path: String,
}

/// Check that every `AND`/`OR`/`NOT` key in `map`, at any depth, holds an
/// array of objects.
pub fn validate_logical_keys(map: &Map<String, Value>) -> Result<(), InvalidCondition> {
    validate_at(map, "$")
}

fn validate_at(map: &Map<String, Value>, path: &str) -> Result<(), InvalidCondition> {
    for (key, value) in map {
        let here = format!("{}.{}", path, key);
        match (key.as_str(), value) {
            (AND_KEY | OR_KEY | NOT_KEY, Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(inner) => validate_at(inner, &format!("{}[{}]", here, i))?,
                        _ => {
                            return Err(InvalidCondition {
                                key: key.clone(),
                                path: here,
                            })
                        }
                    }
                }
            }
            (AND_KEY | OR_KEY | NOT_KEY, _) => {
                return Err(InvalidCondition {
                    key: key.clone(),
                    path: here,
                })
            }
            (_, Value::Object(inner)) => validate_at(inner, &here)?,
            _ => {}
        }
    }
    Ok(())
}

impl TryFrom<Map<String, Value>> for QueryCondition {
    type Error = InvalidCondition;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        validate_logical_keys(&map)?;
        Ok(Self(map))
    }
}

impl<'de> Deserialize<'de> for QueryCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        QueryCondition::try_from(map).map_err(serde::de::Error::custom)
    }
}

impl From<QueryCondition> for Value {
    fn from(condition: QueryCondition) -> Self {
        condition.into_json()
    }
}

/// `{gte, lte}` operator object. Absent bounds are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl RangeBounds {
    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }

    pub fn into_json(self) -> Value {
        let mut map = Map::new();
        if let Some(gte) = self.gte {
            map.insert("gte".to_string(), gte);
        }
        if let Some(lte) = self.lte {
            map.insert("lte".to_string(), lte);
        }
        Value::Object(map)
    }
}
