//! Structured query model accepted by collections
//!
//! Filters, sort keys and projections are plain data. Nothing a client sends
//! is ever interpreted as an operator or expression by the store; the filter
//! translator produces these values from the allow-listed query parameters.
//!
//! # Example
//!
//! ```rust
//! use tour_service::store::{Filter, FilterOperator, FindQuery, SortKey};
//!
//! let filter = Filter::new()
//!     .compare("price", FilterOperator::Gte, 100.0)
//!     .equals("difficulty", "easy");
//!
//! let query = FindQuery::new(filter)
//!     .sort(vec![SortKey::descending("price"), SortKey::ascending("id")])
//!     .skip(0)
//!     .limit(10);
//! assert_eq!(query.limit, Some(10));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Document;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One ordered sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: OrderDirection,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Descending,
        }
    }

    /// Parse a single sort token where a leading `-` means descending.
    ///
    /// Returns `None` for an empty token.
    ///
    /// ```rust
    /// use tour_service::store::{OrderDirection, SortKey};
    ///
    /// let key = SortKey::parse("-ratingsAverage").unwrap();
    /// assert_eq!(key.field, "ratingsAverage");
    /// assert_eq!(key.direction, OrderDirection::Descending);
    /// assert!(SortKey::parse(" - ").is_none());
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let key = match token.strip_prefix('-') {
            Some(field) => Self::descending(field.trim()),
            None => Self::ascending(token),
        };
        (!key.field.is_empty()).then_some(key)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderDirection::Ascending => write!(f, "{}", self.field),
            OrderDirection::Descending => write!(f, "-{}", self.field),
        }
    }
}

/// Closed set of comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Greater than or equal to
    Gte,
    /// Greater than
    Gt,
    /// Less than or equal to
    Lte,
    /// Less than
    Lt,
}

impl FilterOperator {
    /// Whether an ordering between stored and wanted value satisfies the operator
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Gte => ordering != Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
            Self::Lte => ordering != Ordering::Greater,
            Self::Lt => ordering == Ordering::Less,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gte => write!(f, "gte"),
            Self::Gt => write!(f, "gt"),
            Self::Lte => write!(f, "lte"),
            Self::Lt => write!(f, "lt"),
        }
    }
}

/// Error returned when an operator name is outside the closed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filter operator '{}'", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gte" => Ok(Self::Gte),
            "gt" => Ok(Self::Gt),
            "lte" => Ok(Self::Lte),
            "lt" => Ok(Self::Lt),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

/// A typed value a predicate compares against
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Order a stored JSON value relative to this value.
    ///
    /// Returns `None` when the stored value has a different type.
    fn compare_stored(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (Self::Number(wanted), Value::Number(n)) => n.as_f64()?.partial_cmp(wanted),
            (Self::Text(wanted), Value::String(s)) => Some(s.as_str().cmp(wanted.as_str())),
            (Self::Bool(wanted), Value::Bool(b)) => Some(b.cmp(wanted)),
            (Self::Date(wanted), Value::String(s)) => {
                let stored = DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc);
                Some(stored.cmp(wanted))
            }
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// Exact match, exclusion, or operator-qualified comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPredicate {
    Equals(FieldValue),
    /// Missing values and values of another type also match
    NotEquals(FieldValue),
    Compare {
        operator: FilterOperator,
        value: FieldValue,
    },
}

impl FilterPredicate {
    /// Test a stored value. Arrays match when any element matches.
    pub fn matches(&self, stored: Option<&Value>) -> bool {
        if let Self::NotEquals(unwanted) = self {
            return !Self::equals_any(unwanted, stored);
        }
        match stored {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => items.iter().any(|item| self.matches_scalar(item)),
            Some(value) => self.matches_scalar(value),
        }
    }

    fn equals_any(wanted: &FieldValue, stored: Option<&Value>) -> bool {
        match stored {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| wanted.compare_stored(item) == Some(Ordering::Equal)),
            Some(value) => wanted.compare_stored(value) == Some(Ordering::Equal),
        }
    }

    fn matches_scalar(&self, stored: &Value) -> bool {
        match self {
            Self::Equals(wanted) => wanted.compare_stored(stored) == Some(Ordering::Equal),
            Self::NotEquals(unwanted) => unwanted.compare_stored(stored) != Some(Ordering::Equal),
            Self::Compare { operator, value } => value
                .compare_stored(stored)
                .is_some_and(|ordering| operator.accepts(ordering)),
        }
    }
}

/// A predicate bound to a (possibly dot-delimited) field path
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub predicate: FilterPredicate,
}

/// Conjunction of clauses; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FilterClause>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn equals(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(field, FilterPredicate::Equals(value.into()))
    }

    #[must_use]
    pub fn compare(
        self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.and(
            field,
            FilterPredicate::Compare {
                operator,
                value: value.into(),
            },
        )
    }

    /// Exclude documents whose field equals `value`
    #[must_use]
    pub fn not_equals(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.and(field, FilterPredicate::NotEquals(value.into()))
    }

    #[must_use]
    pub fn and(mut self, field: impl Into<String>, predicate: FilterPredicate) -> Self {
        self.push(field, predicate);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, predicate: FilterPredicate) {
        self.clauses.push(FilterClause {
            field: field.into(),
            predicate,
        });
    }

    /// Append every clause of another filter
    pub fn extend(&mut self, other: Filter) {
        self.clauses.extend(other.clauses);
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.predicate.matches(lookup_path(document, &clause.field)))
    }
}

/// Which fields a query returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Every visible field
    #[default]
    All,
    /// Only the listed fields (plus `id`)
    Include(Vec<String>),
    /// Every visible field except the listed ones
    Exclude(Vec<String>),
}

impl Projection {
    /// Shape a stored document for output.
    ///
    /// Hidden fields are dropped unless an inclusion projection names them.
    pub fn apply(&self, document: &Document, hidden: &[&str]) -> Document {
        match self {
            Self::All => document
                .iter()
                .filter(|(key, _)| !hidden.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Self::Include(fields) => document
                .iter()
                .filter(|(key, _)| key.as_str() == "id" || fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Self::Exclude(fields) => document
                .iter()
                .filter(|(key, _)| {
                    !hidden.contains(&key.as_str()) && !fields.iter().any(|f| f == *key)
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// A complete collection query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Resolve a dot-delimited path inside a document
pub fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Total order used for sorting: missing < booleans < numbers < strings < others
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (left, right) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}
