//! Sift Core - Filter Descriptors and Compilers
//!
//! Pure data structures and pure functions. No I/O, no runtime.
//! Every other sift crate depends on this one.
//!
//! Two compilers turn user input into a [`QueryCondition`], the nested
//! `AND`/`OR`/range object a data source accepts as its `where` argument:
//!
//! - [`compile`] walks a flat list of [`FieldMapping`] descriptors over a bag
//!   of raw UI values.
//! - [`compile_group`] walks an arbitrarily nested [`DynamicFilterGroup`].

pub mod compiler;
pub mod condition;
pub mod error;
pub mod group;
pub mod mapping;
pub mod schema;
pub mod search;
pub mod transform;
pub mod value;

pub use compiler::compile;
pub use condition::{validate_logical_keys, InvalidCondition, QueryCondition, RangeBounds};
pub use error::{ConfigError, DataSourceError, LedgerError, SiftError, SiftResult};
pub use group::{compile_group, DynamicFilterGroup, DynamicFilterNode, DynamicFilterRule, RuleOperator};
pub use mapping::{Comparator, FieldMapping, FieldTarget, Predicate, Transform};
pub use schema::{FilterSchema, SEARCH_KEY};
pub use search::SearchSpec;
pub use value::{FilterValue, FilterValues, RangeValue, RawValues};
