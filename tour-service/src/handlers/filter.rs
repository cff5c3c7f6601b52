//! Translation of query-string filters into structured predicates
//!
//! `price[gte]=100` becomes a `Compare { Gte, Number(100) }` clause on
//! `price`; `difficulty=easy` becomes an exact match. Fields must be in the
//! schema's filterable allow-list and operators in the closed
//! [`FilterOperator`] set; anything else is dropped and logged. Values are
//! coerced by the field's declared type.

use std::collections::BTreeMap;

use super::error::AppError;
use crate::store::{
    parse_date, FieldType, FieldValue, Filter, FilterOperator, FilterPredicate, Schema,
    StoreError, StoreOperation,
};

/// Split `field[op]` into its parts; plain keys have no operator
fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.strip_suffix(']').and_then(|rest| rest.split_once('[')) {
        Some((field, operator)) => (field, Some(operator)),
        None => (key, None),
    }
}

/// Build a filter from the non-reserved query parameters.
///
/// # Errors
///
/// `BadRequest` when a value cannot be coerced to its field's type.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use tour_service::handlers::translate;
/// use tour_service::store::{FieldDef, Schema};
///
/// let schema = Schema::new(vec![FieldDef::number("price"), FieldDef::text("difficulty")]);
/// let candidates = BTreeMap::from([
///     ("price[gte]".to_string(), "100".to_string()),
///     ("difficulty".to_string(), "easy".to_string()),
///     ("password".to_string(), "hunter2".to_string()),
/// ]);
///
/// let filter = translate(&candidates, &schema).unwrap();
/// assert_eq!(filter.clauses().len(), 2);
/// ```
pub fn translate(candidates: &BTreeMap<String, String>, schema: &Schema) -> Result<Filter, AppError> {
    let mut filter = Filter::new();

    for (key, raw) in candidates {
        let (field, operator) = split_key(key);

        if !schema.is_filterable(field) {
            tracing::warn!(parameter = %key, "Dropping filter on non-filterable field");
            continue;
        }

        let operator = match operator.map(str::parse::<FilterOperator>) {
            None => None,
            Some(Ok(operator)) => Some(operator),
            Some(Err(unknown)) => {
                tracing::warn!(parameter = %key, error = %unknown, "Dropping filter with unsupported operator");
                continue;
            }
        };

        let Some(field_type) = schema.path_type(field) else {
            continue;
        };
        let value = coerce(field, field_type.scalar(), raw)?;

        let predicate = match operator {
            Some(operator) => FilterPredicate::Compare { operator, value },
            None => FilterPredicate::Equals(value),
        };
        filter.push(field, predicate);
    }

    Ok(filter)
}

fn coerce(field: &str, field_type: &FieldType, raw: &str) -> Result<FieldValue, AppError> {
    let invalid = || AppError::from(StoreError::invalid_value(StoreOperation::Find, field, raw));

    match field_type {
        FieldType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FieldValue::Number)
            .ok_or_else(invalid),
        FieldType::Boolean => match raw.trim() {
            "true" => Ok(FieldValue::Bool(true)),
            "false" => Ok(FieldValue::Bool(false)),
            _ => Err(invalid()),
        },
        FieldType::Date => parse_date(raw).map(FieldValue::Date).ok_or_else(invalid),
        _ => Ok(FieldValue::Text(raw.to_string())),
    }
}
