//! Raw UI values and their tagged classification.
//!
//! Filter panels hand the compiler a loosely typed bag of JSON values keyed by
//! field. [`FilterValue::classify`] is the one place that decides what shape a
//! value has; the compiler only ever switches on the resulting tag.

use serde_json::{Map, Value};

/// Loose bag of raw filter values keyed by field, as produced by a filter form.
pub type RawValues = Map<String, Value>;

const RANGE_FROM_KEYS: [&str; 2] = ["from", "min"];
const RANGE_TO_KEYS: [&str; 2] = ["to", "max"];

/// A raw value after shape classification.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Any defined, non-null value that is neither a list nor a range.
    Scalar(Value),
    /// A non-empty list of values; expands into an OR-group.
    List(Vec<Value>),
    /// A `from`/`min` .. `to`/`max` object.
    Range(RangeValue),
}

impl FilterValue {
    /// Classify a raw value.
    ///
    /// Returns `None` for values that contribute nothing: `null` and empty
    /// arrays. Any object carrying a `from`, `min`, `to` or `max` key is a
    /// range, whatever else it contains.
    pub fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some(Self::List(items.clone())),
            Value::Object(map) if is_range_shaped(map) => Some(Self::Range(RangeValue::from_object(map))),
            other => Some(Self::Scalar(other.clone())),
        }
    }

    /// Convert back into the raw JSON representation.
    pub fn into_json(self) -> Value {
        match self {
            Self::Scalar(value) => value,
            Self::List(items) => Value::Array(items),
            Self::Range(range) => Value::Object(range.raw),
        }
    }
}

fn is_range_shaped(map: &Map<String, Value>) -> bool {
    RANGE_FROM_KEYS
        .iter()
        .chain(RANGE_TO_KEYS.iter())
        .any(|key| map.contains_key(*key))
}

/// First non-null value among `keys`, in order (`from ?? min`).
fn first_present(map: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
        .cloned()
}

/// Lower/upper bound pair of a range-shaped value.
///
/// The original object is retained so an unmapped field can pass it through
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    pub from: Option<Value>,
    pub to: Option<Value>,
    raw: Map<String, Value>,
}

impl RangeValue {
    /// Build a range with `from`/`to` keys.
    pub fn new(from: Option<Value>, to: Option<Value>) -> Self {
        let mut raw = Map::new();
        raw.insert("from".to_string(), from.clone().unwrap_or(Value::Null));
        raw.insert("to".to_string(), to.clone().unwrap_or(Value::Null));
        Self { from, to, raw }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            from: first_present(map, &RANGE_FROM_KEYS),
            to: first_present(map, &RANGE_TO_KEYS),
            raw: map.clone(),
        }
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// The raw JSON object this range was read from.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

/// Typed builder for a [`RawValues`] bag.
///
/// Lets callers state the shape of each value instead of relying on
/// [`FilterValue::classify`] to sniff it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterValues {
    values: RawValues,
}

impl FilterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn list<I, V>(mut self, key: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.values.insert(key.into(), Value::Array(items));
        self
    }

    pub fn range(mut self, key: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        let range = RangeValue::new(from, to);
        self.values.insert(key.into(), FilterValue::Range(range).into_json());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FilterValue) {
        self.values.insert(key.into(), value.into_json());
    }

    pub fn get(&self, key: &str) -> Option<FilterValue> {
        self.values.get(key).and_then(FilterValue::classify)
    }

    pub fn as_raw(&self) -> &RawValues {
        &self.values
    }

    pub fn into_raw(self) -> RawValues {
        self.values
    }
}

impl From<FilterValues> for RawValues {
    fn from(values: FilterValues) -> Self {
        values.into_raw()
    }
}
