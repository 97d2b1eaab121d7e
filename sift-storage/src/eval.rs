//! In-process evaluation of compiled conditions against JSON rows.
//!
//! Interprets the same `where` shape a relational query layer would:
//! logical groups, scalar equality, operator objects and relation filters.
//! Used by [`crate::InMemoryDataSource`] and as a test oracle.

use serde_json::{Map, Value};
use sift_core::condition::{AND_KEY, NOT_KEY, OR_KEY};
use sift_core::QueryCondition;
use std::cmp::Ordering;

const OPERATORS: &[&str] = &[
    "equals",
    "in",
    "notIn",
    "gt",
    "gte",
    "lt",
    "lte",
    "contains",
    "startsWith",
    "endsWith",
    "not",
    "mode",
];

/// True when `row` satisfies `condition`. An empty condition matches all rows.
pub fn matches(row: &Value, condition: &QueryCondition) -> bool {
    matches_map(row, condition.as_map())
}

fn matches_map(row: &Value, condition: &Map<String, Value>) -> bool {
    condition.iter().all(|(key, filter)| match key.as_str() {
        AND_KEY => sub_conditions(filter).all(|c| matches_map(row, c)),
        // `OR: []` matches nothing.
        OR_KEY => sub_conditions(filter).any(|c| matches_map(row, c)),
        NOT_KEY => !sub_conditions(filter).any(|c| matches_map(row, c)),
        field => field_matches(row.get(field), filter),
    })
}

fn sub_conditions(filter: &Value) -> Box<dyn Iterator<Item = &Map<String, Value>> + '_> {
    match filter {
        Value::Array(items) => Box::new(items.iter().filter_map(Value::as_object)),
        Value::Object(map) => Box::new(std::iter::once(map)),
        _ => Box::new(std::iter::empty()),
    }
}

fn is_operator_object(filter: &Map<String, Value>) -> bool {
    !filter.is_empty() && filter.keys().all(|k| OPERATORS.contains(&k.as_str()))
}

fn field_matches(value: Option<&Value>, filter: &Value) -> bool {
    match filter {
        Value::Object(map) if is_operator_object(map) => operators_match(value, map),
        Value::Object(map) => relation_matches(value, map),
        Value::Null => value.map_or(true, Value::is_null),
        literal => value.is_some_and(|v| values_equal(v, literal, false)),
    }
}

fn relation_matches(value: Option<&Value>, filter: &Map<String, Value>) -> bool {
    match value {
        Some(object @ Value::Object(_)) => matches_map(object, filter),
        Some(Value::Array(rows)) => {
            if let Some(Value::Object(every)) = filter.get("every") {
                return rows.iter().all(|r| matches_map(r, every));
            }
            if let Some(Value::Object(none)) = filter.get("none") {
                return !rows.iter().any(|r| matches_map(r, none));
            }
            let some = match filter.get("some") {
                Some(Value::Object(some)) => some,
                _ => filter,
            };
            rows.iter().any(|r| matches_map(r, some))
        }
        _ => false,
    }
}

fn operators_match(value: Option<&Value>, ops: &Map<String, Value>) -> bool {
    let insensitive = ops.get("mode").and_then(Value::as_str) == Some("insensitive");
    ops.iter().all(|(op, operand)| match op.as_str() {
        "mode" => true,
        "not" => match operand {
            Value::Object(inner) if is_operator_object(inner) => !operators_match(value, inner),
            other => !value.is_some_and(|v| values_equal(v, other, insensitive)),
        },
        "equals" => value.is_some_and(|v| values_equal(v, operand, insensitive)),
        "in" => value.is_some_and(|v| one_of(v, operand, insensitive)),
        "notIn" => !value.is_some_and(|v| one_of(v, operand, insensitive)),
        // A null bound is an open bound.
        "gt" | "gte" | "lt" | "lte" if operand.is_null() => true,
        "gt" => compare(value, operand) == Some(Ordering::Greater),
        "gte" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
        "lt" => compare(value, operand) == Some(Ordering::Less),
        "lte" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
        "contains" => text_test(value, operand, insensitive, |h, n| h.contains(n)),
        "startsWith" => text_test(value, operand, insensitive, |h, n| h.starts_with(n)),
        "endsWith" => text_test(value, operand, insensitive, |h, n| h.ends_with(n)),
        _ => false,
    })
}

fn one_of(value: &Value, operand: &Value, insensitive: bool) -> bool {
    match operand {
        Value::Array(candidates) => candidates.iter().any(|c| values_equal(value, c, insensitive)),
        single => values_equal(value, single, insensitive),
    }
}

fn text_test<F>(value: Option<&Value>, operand: &Value, insensitive: bool, test: F) -> bool
where
    F: Fn(&str, &str) -> bool,
{
    match (value.and_then(Value::as_str), operand.as_str()) {
        (Some(haystack), Some(needle)) if insensitive => {
            test(&haystack.to_lowercase(), &needle.to_lowercase())
        }
        (Some(haystack), Some(needle)) => test(haystack, needle),
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value, insensitive: bool) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) if insensitive => x.to_lowercase() == y.to_lowercase(),
        _ => a == b,
    }
}

/// Numbers compare numerically, strings lexicographically (so ISO
/// timestamps order chronologically). Mixed types are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare(value: Option<&Value>, operand: &Value) -> Option<Ordering> {
    compare_values(value?, operand)
}

/// Resolve a dotted path (`user.email`) inside a row.
pub fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(value: Value) -> QueryCondition {
        serde_json::from_value(value).unwrap()
    }

    fn row() -> Value {
        json!({
            "status": "PAID",
            "amount": 150,
            "createdAt": "2024-03-02T10:00:00.000Z",
            "user": { "email": "Ada@Example.com", "tier": "GOLD" },
            "tags": [{ "name": "vip" }, { "name": "early" }]
        })
    }

    #[test]
    fn test_empty_condition_matches() {
        assert!(matches(&row(), &QueryCondition::new()));
    }

    #[test]
    fn test_scalar_equality_and_numbers() {
        assert!(matches(&row(), &cond(json!({ "status": "PAID" }))));
        assert!(matches(&row(), &cond(json!({ "amount": 150.0 }))));
        assert!(!matches(&row(), &cond(json!({ "status": "FAILED" }))));
    }

    #[test]
    fn test_range_on_numbers_and_timestamps() {
        assert!(matches(&row(), &cond(json!({ "amount": { "gte": 100, "lte": 200 } }))));
        assert!(!matches(&row(), &cond(json!({ "amount": { "gt": 150 } }))));
        assert!(matches(
            &row(),
            &cond(json!({ "createdAt": { "gte": "2024-03-02T00:00:00.000Z", "lte": "2024-03-02T23:59:59.999Z" } }))
        ));
    }

    #[test]
    fn test_null_bound_is_open() {
        assert!(matches(&row(), &cond(json!({ "amount": { "gte": 100, "lte": null } }))));
    }

    #[test]
    fn test_logical_groups() {
        let either = cond(json!({ "OR": [{ "status": "FAILED" }, { "status": "PAID" }] }));
        assert!(matches(&row(), &either));

        let both = cond(json!({ "AND": [{ "status": "PAID" }, { "amount": { "lt": 100 } }] }));
        assert!(!matches(&row(), &both));

        assert!(!matches(&row(), &cond(json!({ "OR": [] }))));
        assert!(matches(&row(), &cond(json!({ "AND": [] }))));
        assert!(matches(&row(), &cond(json!({ "NOT": [{ "status": "FAILED" }] }))));
    }

    #[test]
    fn test_relation_and_insensitive_contains() {
        let search = cond(json!({ "user": { "email": { "contains": "ada@", "mode": "insensitive" } } }));
        assert!(matches(&row(), &search));

        let sensitive = cond(json!({ "user": { "email": { "contains": "ada@" } } }));
        assert!(!matches(&row(), &sensitive));
    }

    #[test]
    fn test_array_relation_is_some() {
        assert!(matches(&row(), &cond(json!({ "tags": { "name": "vip" } }))));
        assert!(!matches(&row(), &cond(json!({ "tags": { "every": { "name": "vip" } } }))));
        assert!(matches(&row(), &cond(json!({ "tags": { "none": { "name": "spam" } } }))));
    }

    #[test]
    fn test_in_not_in_and_not() {
        assert!(matches(&row(), &cond(json!({ "status": { "in": ["PAID", "PENDING"] } }))));
        assert!(!matches(&row(), &cond(json!({ "status": { "notIn": ["PAID"] } }))));
        assert!(matches(&row(), &cond(json!({ "status": { "not": "FAILED" } }))));
        assert!(matches(&row(), &cond(json!({ "amount": { "not": { "lt": 10 } } }))));
    }

    #[test]
    fn test_prefix_suffix() {
        assert!(matches(&row(), &cond(json!({ "status": { "startsWith": "PA" } }))));
        assert!(matches(&row(), &cond(json!({ "status": { "endsWith": "ID" } }))));
        assert!(!matches(&row(), &cond(json!({ "amount": { "startsWith": "1" } }))));
    }

    #[test]
    fn test_missing_field_never_matches_literal() {
        assert!(!matches(&row(), &cond(json!({ "reference": "R-1" }))));
        assert!(matches(&row(), &cond(json!({ "reference": null }))));
    }

    #[test]
    fn test_lookup_dotted_path() {
        assert_eq!(lookup(&row(), "user.tier"), Some(&json!("GOLD")));
        assert_eq!(lookup(&row(), "user.missing"), None);
    }
}
