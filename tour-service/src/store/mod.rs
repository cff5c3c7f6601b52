//! Document storage abstraction
//!
//! - [`Collection`]: async capability trait the handler factory is generic over
//! - [`Schema`]: per-resource field declarations, coercion and constraints
//! - [`Filter`], [`FindQuery`], [`Projection`], [`SortKey`]: structured query model
//! - [`MemoryCollection`]: the in-process implementation
//! - [`StoreError`]: structured storage errors

mod error;
mod filter;
mod memory;
mod schema;
mod traits;

/// A stored JSON document
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use filter::{
    compare_values, lookup_path, FieldValue, Filter, FilterClause, FilterOperator,
    FilterPredicate, FindQuery, OrderDirection, Projection, SortKey, UnknownOperator,
};
pub use memory::MemoryCollection;
pub use schema::{
    format_date, parse_date, DocumentRule, FieldDef, FieldType, SaveHook, Schema,
    CREATED_AT_FIELD, ID_FIELD,
};
pub use traits::{Collection, Resource, StoreResult, UpdateOptions};
