//! Dynamic filter groups.
//!
//! A [`DynamicFilterGroup`] is a boolean tree of rules built by an advanced
//! filter editor. [`compile_group`] turns it into the same [`QueryCondition`]
//! shape the field-mapping compiler produces.

use crate::condition::QueryCondition;
use crate::mapping::Comparator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Comparison operator of a single rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleOperator {
    /// Equal to. Also the fallback for unknown operator names.
    #[default]
    Equals,
    /// Contains substring
    Contains,
    StartsWith,
    EndsWith,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// In list of values
    In,
    /// Inclusive `[min, max]` pair
    Between,
}

impl RuleOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleOperator::Equals => "equals",
            RuleOperator::Contains => "contains",
            RuleOperator::StartsWith => "startsWith",
            RuleOperator::EndsWith => "endsWith",
            RuleOperator::Gt => "gt",
            RuleOperator::Gte => "gte",
            RuleOperator::Lt => "lt",
            RuleOperator::Lte => "lte",
            RuleOperator::In => "in",
            RuleOperator::Between => "between",
        }
    }

    /// Parse an operator name; anything unrecognised is `Equals`.
    pub fn parse(s: &str) -> Self {
        match s {
            "contains" => RuleOperator::Contains,
            "startsWith" => RuleOperator::StartsWith,
            "endsWith" => RuleOperator::EndsWith,
            "gt" => RuleOperator::Gt,
            "gte" => RuleOperator::Gte,
            "lt" => RuleOperator::Lt,
            "lte" => RuleOperator::Lte,
            "in" => RuleOperator::In,
            "between" => RuleOperator::Between,
            _ => RuleOperator::Equals,
        }
    }
}

impl From<String> for RuleOperator {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RuleOperator> for String {
    fn from(op: RuleOperator) -> Self {
        op.as_str().to_string()
    }
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicFilterRule {
    /// Field to filter on
    pub field: String,
    /// Operator to apply
    pub operator: RuleOperator,
    /// Value to compare against. `between` expects `[min, max]`.
    pub value: Value,
}

impl DynamicFilterRule {
    pub fn new(field: impl Into<String>, operator: RuleOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, RuleOperator::Equals, value)
    }

    pub fn between(field: impl Into<String>, min: Value, max: Value) -> Self {
        Self::new(field, RuleOperator::Between, Value::Array(vec![min, max]))
    }

    fn compile(&self) -> Value {
        let condition = match self.operator {
            RuleOperator::Between => {
                let mut bounds = Map::new();
                bounds.insert("gte".to_string(), self.value.get(0).cloned().unwrap_or(Value::Null));
                bounds.insert("lte".to_string(), self.value.get(1).cloned().unwrap_or(Value::Null));
                Value::Object(bounds)
            }
            RuleOperator::Equals => self.value.clone(),
            other => operator_object(other.as_str(), self.value.clone()),
        };
        let mut map = Map::new();
        map.insert(self.field.clone(), condition);
        Value::Object(map)
    }
}

fn operator_object(operator: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(operator.to_string(), value);
    Value::Object(map)
}

/// Entry of a group: either a nested group or a rule.
///
/// On the wire an entry carrying a `condition` key is a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicFilterNode {
    Group(DynamicFilterGroup),
    Rule(DynamicFilterRule),
}

impl From<DynamicFilterRule> for DynamicFilterNode {
    fn from(rule: DynamicFilterRule) -> Self {
        Self::Rule(rule)
    }
}

impl From<DynamicFilterGroup> for DynamicFilterNode {
    fn from(group: DynamicFilterGroup) -> Self {
        Self::Group(group)
    }
}

impl DynamicFilterNode {
    fn compile(&self) -> Value {
        match self {
            DynamicFilterNode::Group(group) => {
                let mut map = Map::new();
                map.insert(group.condition.as_key().to_string(), Value::Array(group.compile_rules()));
                Value::Object(map)
            }
            DynamicFilterNode::Rule(rule) => rule.compile(),
        }
    }
}

/// `{ condition: AND|OR, rules: [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicFilterGroup {
    pub condition: Comparator,
    pub rules: Vec<DynamicFilterNode>,
}

impl DynamicFilterGroup {
    pub fn new(condition: Comparator) -> Self {
        Self {
            condition,
            rules: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(Comparator::And)
    }

    pub fn or() -> Self {
        Self::new(Comparator::Or)
    }

    pub fn rule(mut self, rule: DynamicFilterRule) -> Self {
        self.rules.push(DynamicFilterNode::Rule(rule));
        self
    }

    pub fn group(mut self, group: DynamicFilterGroup) -> Self {
        self.rules.push(DynamicFilterNode::Group(group));
        self
    }

    /// Nesting depth; a group of only rules has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .rules
            .iter()
            .map(|node| match node {
                DynamicFilterNode::Group(group) => group.depth(),
                DynamicFilterNode::Rule(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Total number of rules in the tree.
    pub fn rule_count(&self) -> usize {
        self.rules
            .iter()
            .map(|node| match node {
                DynamicFilterNode::Group(group) => group.rule_count(),
                DynamicFilterNode::Rule(_) => 1,
            })
            .sum()
    }

    fn compile_rules(&self) -> Vec<Value> {
        self.rules.iter().map(DynamicFilterNode::compile).collect()
    }
}

/// Compile a rule tree into `{ [condition]: [..] }`.
pub fn compile_group(group: &DynamicFilterGroup) -> QueryCondition {
    let mut condition = QueryCondition::new();
    condition.set_group(group.condition.as_key(), group.compile_rules());
    condition
}
