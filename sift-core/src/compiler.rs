//! Field-mapping condition compiler.
//!
//! Walks the mappings in declaration order and folds each raw value into the
//! output condition:
//!
//! ```text
//! list   + no target  → { OR: [{key: a}, {key: b}] }            → AND/OR bucket
//! scalar + no target  → { key: value }
//! list   + target     → { OR: [{field: t(a)}, {field: t(b)}] }  → AND/OR bucket
//! range  + target     → { field: { gte: t(from), lte: t(to) } }
//! scalar + target     → { field: t(value) }  or  { field: { nested: t(value) } }
//! ```
//!
//! Buckets are written last as `AND: [..]` and `OR: [..]`. Nothing here can
//! fail: missing or malformed input is skipped.

use crate::condition::{QueryCondition, RangeBounds, AND_KEY, OR_KEY};
use crate::mapping::{Comparator, FieldMapping, FieldTarget};
use crate::value::{FilterValue, RangeValue, RawValues};
use serde_json::{Map, Value};

/// Compile raw UI values into a query condition.
pub fn compile(raw: &RawValues, mappings: &[FieldMapping]) -> QueryCondition {
    let mut output = QueryCondition::new();
    let mut and_bucket: Vec<Value> = Vec::new();
    let mut or_bucket: Vec<Value> = Vec::new();

    for mapping in mappings {
        let value = raw.get(&mapping.key).unwrap_or(&Value::Null);
        if !mapping.accepts(value) {
            continue;
        }
        let Some(value) = FilterValue::classify(value) else {
            continue;
        };

        let group = match &mapping.target {
            None => compile_direct(&mut output, &mapping.key, value),
            Some(target) => compile_mapped(&mut output, target, value),
        };

        if let Some(group) = group {
            match mapping.comparator {
                Comparator::And => and_bucket.push(group),
                Comparator::Or => or_bucket.push(group),
            }
        }
    }

    if !and_bucket.is_empty() {
        output.set_group(AND_KEY, and_bucket);
    }
    if !or_bucket.is_empty() {
        output.set_group(OR_KEY, or_bucket);
    }
    output
}

/// Unmapped field. Lists become an OR-of-equals group keyed by `key`; any
/// other value, range-shaped objects included, passes through verbatim.
fn compile_direct(output: &mut QueryCondition, key: &str, value: FilterValue) -> Option<Value> {
    match value {
        FilterValue::List(items) => {
            let alternatives = items.into_iter().map(|item| single(key, item)).collect();
            Some(or_group(alternatives))
        }
        other => {
            output.set_field(key, other.into_json());
            None
        }
    }
}

fn compile_mapped(output: &mut QueryCondition, target: &FieldTarget, value: FilterValue) -> Option<Value> {
    match value {
        FilterValue::List(items) => {
            let alternatives = items
                .iter()
                .map(|item| single(&target.field, wrap_nested(target, target.apply_transform(item))))
                .collect();
            Some(or_group(alternatives))
        }
        FilterValue::Range(range) => {
            let bounds = range_bounds(target, &range);
            if !bounds.is_empty() {
                output.set_field(target.field.clone(), bounds.into_json());
            }
            None
        }
        FilterValue::Scalar(value) => {
            let value = wrap_nested(target, target.apply_transform(&value));
            output.set_field(target.field.clone(), value);
            None
        }
    }
}

/// The transform runs on the already-selected bound, never on the object.
fn range_bounds(target: &FieldTarget, range: &RangeValue) -> RangeBounds {
    RangeBounds {
        gte: range.from.as_ref().map(|bound| target.apply_transform(bound)),
        lte: range.to.as_ref().map(|bound| target.apply_transform(bound)),
    }
}

fn wrap_nested(target: &FieldTarget, value: Value) -> Value {
    match &target.nested_field {
        Some(nested) => single(nested, value),
        None => value,
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn or_group(alternatives: Vec<Value>) -> Value {
    single(OR_KEY, Value::Array(alternatives))
}
