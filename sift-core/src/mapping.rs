//! Field mapping descriptors.
//!
//! A [`FieldMapping`] declares how one filter field of a list view becomes a
//! query condition. Descriptors are fixed per feature and are not validated at
//! runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Value transform applied before a value is written into the condition.
pub type Transform = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Skip-predicate. Receives `Value::Null` for an absent key.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Logical combinator for buckets and groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Comparator {
    /// Key used in a compiled condition.
    pub fn as_key(&self) -> &'static str {
        match self {
            Comparator::And => "AND",
            Comparator::Or => "OR",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Output field a mapped value is written to.
#[derive(Clone)]
pub struct FieldTarget {
    pub field: String,
    /// When set, `field` is a relation and the value is written as
    /// `{ field: { nested_field: value } }`.
    pub nested_field: Option<String>,
    pub transform: Option<Transform>,
}

impl FieldTarget {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            nested_field: None,
            transform: None,
        }
    }

    pub(crate) fn apply_transform(&self, value: &Value) -> Value {
        match &self.transform {
            Some(transform) => transform(value),
            None => value.clone(),
        }
    }
}

impl fmt::Debug for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTarget")
            .field("field", &self.field)
            .field("nested_field", &self.nested_field)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Declarative rule for one logical filter field.
#[derive(Clone)]
pub struct FieldMapping {
    /// Key of the field in the raw value bag.
    pub key: String,
    /// Output target. `None` writes to an output field named `key`.
    pub target: Option<FieldTarget>,
    pub condition: Option<Predicate>,
    /// Bucket that receives the OR-group of an array value.
    pub comparator: Comparator,
}

impl FieldMapping {
    /// A field that maps directly onto an output field of the same name.
    pub fn direct(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: None,
            condition: None,
            comparator: Comparator::And,
        }
    }

    /// Write to `field` instead of `key`.
    pub fn to_field(mut self, field: impl Into<String>) -> Self {
        let target = self.target.get_or_insert_with(|| FieldTarget::new(String::new()));
        target.field = field.into();
        self
    }

    /// Write to `{ field: { nested_field: value } }`.
    pub fn nested(mut self, field: impl Into<String>, nested_field: impl Into<String>) -> Self {
        let target = self.target.get_or_insert_with(|| FieldTarget::new(String::new()));
        target.field = field.into();
        target.nested_field = Some(nested_field.into());
        self
    }

    /// Apply `transform` to each value (or each selected range bound).
    ///
    /// A transform implies a mapped target; when none was declared yet the
    /// target field defaults to `key`.
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let key = self.key.clone();
        let target = self.target.get_or_insert_with(|| FieldTarget::new(key));
        target.transform = Some(Arc::new(transform));
        self
    }

    /// Attach a shared transform (see [`crate::transform`]).
    pub fn with_transform(mut self, transform: Transform) -> Self {
        let key = self.key.clone();
        let target = self.target.get_or_insert_with(|| FieldTarget::new(key));
        target.transform = Some(transform);
        self
    }

    /// Skip this field whenever `predicate` returns false.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(predicate));
        self
    }

    pub fn or(mut self) -> Self {
        self.comparator = Comparator::Or;
        self
    }

    pub fn and(mut self) -> Self {
        self.comparator = Comparator::And;
        self
    }

    pub(crate) fn accepts(&self, value: &Value) -> bool {
        match &self.condition {
            Some(predicate) => predicate(value),
            None => true,
        }
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("key", &self.key)
            .field("target", &self.target)
            .field("condition", &self.condition.as_ref().map(|_| "<fn>"))
            .field("comparator", &self.comparator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_mapping_has_no_target() {
        let mapping = FieldMapping::direct("status");
        assert!(mapping.target.is_none());
        assert_eq!(mapping.comparator, Comparator::And);
    }

    #[test]
    fn test_nested_sets_both_fields() {
        let mapping = FieldMapping::direct("email").nested("user", "email").or();
        let target = mapping.target.as_ref().unwrap();
        assert_eq!(target.field, "user");
        assert_eq!(target.nested_field.as_deref(), Some("email"));
        assert_eq!(mapping.comparator, Comparator::Or);
    }

    #[test]
    fn test_transform_without_target_defaults_field_to_key() {
        let mapping = FieldMapping::direct("createdAt").transform(|v| v.clone());
        assert_eq!(mapping.target.as_ref().unwrap().field, "createdAt");
    }

    #[test]
    fn test_when_predicate_is_consulted() {
        let mapping = FieldMapping::direct("q").when(|v| v != &json!(""));
        assert!(!mapping.accepts(&json!("")));
        assert!(mapping.accepts(&json!("x")));
    }

    #[test]
    fn test_comparator_serde_uses_upper_case() {
        assert_eq!(serde_json::to_value(Comparator::Or).unwrap(), json!("OR"));
        let parsed: Comparator = serde_json::from_value(json!("AND")).unwrap();
        assert_eq!(parsed, Comparator::And);
    }
}
