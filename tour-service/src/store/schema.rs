//! Per-resource document schemas
//!
//! A [`Schema`] declares the fields a resource stores, how incoming JSON is
//! coerced into them, and the constraints checked before a write. It also
//! drives the query layer: only fields marked filterable or sortable are
//! accepted from clients, and the declared type decides how a query-string
//! value is coerced.
//!
//! `id` and `createdAt` are implicit on every schema; they are assigned by
//! the store and cannot be written by clients.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tour_service::store::{FieldDef, Schema};
//!
//! let schema = Schema::new(vec![
//!     FieldDef::text("name").required("Please provide a name"),
//!     FieldDef::number("rating").min(1.0, "Rating must be 1 or above").default_value(json!(3.5)),
//! ]);
//!
//! let body = json!({"name": "Ada", "ignored": true});
//! let document = schema.prepare(body.as_object().unwrap().clone(), None, true).unwrap();
//! assert_eq!(document.get("rating"), Some(&json!(3.5)));
//! assert!(document.get("ignored").is_none());
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

use super::filter::Filter;
use super::Document;

/// Field assigned by the store to every document
pub const ID_FIELD: &str = "id";
/// Creation timestamp assigned by the store; hidden unless projected
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Declared storage type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// RFC 3339 timestamp
    Date,
    /// Id of a document in the named resource
    Reference(&'static str),
    Array(Box<FieldType>),
    /// Free-form nested object; sub-paths are addressable with dots
    Object,
}

impl FieldType {
    /// The scalar type a single query value is compared as
    pub fn scalar(&self) -> &FieldType {
        match self {
            Self::Array(inner) => inner.scalar(),
            other => other,
        }
    }
}

/// Cross-field validation; returns a message when the document is invalid
pub type DocumentRule = fn(&Document) -> Option<String>;
/// Mutation applied to every document right before it is written
pub type SaveHook = fn(&mut Document);
/// Field computed from the stored document at read time
pub type VirtualField = (&'static str, fn(&Document) -> Option<Value>);

/// One declared field and its constraints
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    required: Option<String>,
    default: Option<Value>,
    min: Option<(f64, String)>,
    max: Option<(f64, String)>,
    min_length: Option<(usize, String)>,
    max_length: Option<(usize, String)>,
    one_of: Option<(&'static [&'static str], String)>,
    email: Option<String>,
    round_to: Option<i32>,
    lowercase: bool,
    trim: bool,
    unique: bool,
    hidden: bool,
    filterable: bool,
    sortable: bool,
}

impl FieldDef {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: None,
            default: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            one_of: None,
            email: None,
            round_to: None,
            lowercase: false,
            trim: false,
            unique: false,
            hidden: false,
            filterable: true,
            sortable: true,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn reference(name: &'static str, resource: &'static str) -> Self {
        Self::new(name, FieldType::Reference(resource))
    }

    pub fn array(name: &'static str, inner: FieldType) -> Self {
        Self::new(name, FieldType::Array(Box::new(inner)))
    }

    pub fn object(name: &'static str) -> Self {
        Self::new(name, FieldType::Object).sortable(false)
    }

    #[must_use]
    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(message.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn min(mut self, bound: f64, message: impl Into<String>) -> Self {
        self.min = Some((bound, message.into()));
        self
    }

    #[must_use]
    pub fn max(mut self, bound: f64, message: impl Into<String>) -> Self {
        self.max = Some((bound, message.into()));
        self
    }

    #[must_use]
    pub fn min_length(mut self, length: usize, message: impl Into<String>) -> Self {
        self.min_length = Some((length, message.into()));
        self
    }

    #[must_use]
    pub fn max_length(mut self, length: usize, message: impl Into<String>) -> Self {
        self.max_length = Some((length, message.into()));
        self
    }

    #[must_use]
    pub fn one_of(mut self, values: &'static [&'static str], message: impl Into<String>) -> Self {
        self.one_of = Some((values, message.into()));
        self
    }

    /// Text must look like an email address
    #[must_use]
    pub fn email(mut self, message: impl Into<String>) -> Self {
        self.email = Some(message.into());
        self
    }

    /// Round numbers to the given number of decimals on write
    #[must_use]
    pub fn round_to(mut self, decimals: i32) -> Self {
        self.round_to = Some(decimals);
        self
    }

    #[must_use]
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Omit from output unless a projection names the field
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    #[must_use]
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Coerce a client-supplied value into the declared type.
    fn coerce(&self, value: Value) -> Result<Value, String> {
        let value = coerce_value(&self.field_type, value)
            .map_err(|raw| format!("Invalid {}: {}", self.name, display_raw(&raw)))?;
        Ok(self.apply_setters(value))
    }

    fn apply_setters(&self, value: Value) -> Value {
        match value {
            Value::String(s) => {
                let s = if self.trim { s.trim().to_string() } else { s };
                let s = if self.lowercase { s.to_lowercase() } else { s };
                Value::String(s)
            }
            Value::Number(n) => match (self.round_to, n.as_f64()) {
                (Some(decimals), Some(f)) => {
                    let factor = 10f64.powi(decimals);
                    number_value((f * factor).round() / factor)
                }
                _ => Value::Number(n),
            },
            other => other,
        }
    }

    /// Check constraints on a present (non-null) value
    fn check(&self, value: &Value, errors: &mut Vec<String>) {
        if let Some(n) = value.as_f64() {
            if let Some((bound, message)) = &self.min {
                if n < *bound {
                    errors.push(message.clone());
                }
            }
            if let Some((bound, message)) = &self.max {
                if n > *bound {
                    errors.push(message.clone());
                }
            }
        }

        if let Some(s) = value.as_str() {
            let length = s.chars().count();
            if let Some((min, message)) = &self.min_length {
                if length < *min {
                    errors.push(message.clone());
                }
            }
            if let Some((max, message)) = &self.max_length {
                if length > *max {
                    errors.push(message.clone());
                }
            }
            if let Some((values, message)) = &self.one_of {
                if !values.contains(&s) {
                    errors.push(message.clone());
                }
            }
            if let Some(message) = &self.email {
                if !looks_like_email(s) {
                    errors.push(message.clone());
                }
            }
        }
    }
}

/// Declared fields, keys and hooks of one resource
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDef>,
    compound_unique: Vec<Vec<&'static str>>,
    rules: Vec<DocumentRule>,
    save_hook: Option<SaveHook>,
    virtuals: Vec<VirtualField>,
    read_scope: Filter,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Require the combination of fields to be unique across documents
    #[must_use]
    pub fn unique_together(mut self, fields: &[&'static str]) -> Self {
        self.compound_unique.push(fields.to_vec());
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: DocumentRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn on_save(mut self, hook: SaveHook) -> Self {
        self.save_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn virtual_field(mut self, name: &'static str, compute: fn(&Document) -> Option<Value>) -> Self {
        self.virtuals.push((name, compute));
        self
    }

    /// Restrict every read, update and delete to documents matching `scope`
    #[must_use]
    pub fn read_scope(mut self, scope: Filter) -> Self {
        self.read_scope = scope;
        self
    }

    /// Clauses the store ANDs into every lookup
    pub fn scope(&self) -> &Filter {
        &self.read_scope
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Type of a (possibly dotted) path, or `None` when the path is unknown.
    ///
    /// Sub-paths of object fields resolve to `Text`.
    pub fn path_type(&self, path: &str) -> Option<FieldType> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        match (head, rest) {
            (ID_FIELD, None) => Some(FieldType::Text),
            (CREATED_AT_FIELD, None) => Some(FieldType::Date),
            (_, None) => self.field(head).map(|f| f.field_type.clone()),
            (_, Some(rest)) if !rest.is_empty() => {
                let field = self.field(head)?;
                match field.field_type.scalar() {
                    FieldType::Object => Some(FieldType::Text),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn is_filterable(&self, path: &str) -> bool {
        let head = path.split('.').next().unwrap_or(path);
        match self.field(head) {
            Some(field) => field.filterable && self.path_type(path).is_some(),
            None => matches!(head, ID_FIELD | CREATED_AT_FIELD) && head == path,
        }
    }

    pub fn is_sortable(&self, path: &str) -> bool {
        let head = path.split('.').next().unwrap_or(path);
        match self.field(head) {
            Some(field) => field.sortable && self.path_type(path).is_some(),
            None => matches!(head, ID_FIELD | CREATED_AT_FIELD) && head == path,
        }
    }

    /// Whether a projection may name this top-level field
    pub fn is_projectable(&self, name: &str) -> bool {
        matches!(name, ID_FIELD | CREATED_AT_FIELD)
            || self.field(name).is_some()
            || self.virtuals.iter().any(|(virtual_name, _)| *virtual_name == name)
    }

    /// Fields omitted from output unless explicitly projected
    pub fn hidden_fields(&self) -> Vec<&'static str> {
        std::iter::once(CREATED_AT_FIELD)
            .chain(self.fields.iter().filter(|f| f.hidden).map(|f| f.name))
            .collect()
    }

    /// Every unique key, single-field keys first
    pub fn unique_keys(&self) -> Vec<Vec<&'static str>> {
        self.fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| vec![f.name])
            .chain(self.compound_unique.iter().cloned())
            .collect()
    }

    /// Add computed fields to an output document
    pub fn apply_virtuals(&self, document: &mut Document) {
        for (name, compute) in &self.virtuals {
            if let Some(value) = compute(document) {
                document.insert((*name).to_string(), value);
            }
        }
    }

    /// Build the document to store from a client body.
    ///
    /// With `existing` the body is merged over it (update); otherwise defaults
    /// are applied (create). Unknown fields and the store-managed `id` and
    /// `createdAt` are dropped. Type coercion errors are always reported;
    /// constraint checks run only when `run_validators` is set.
    ///
    /// # Errors
    ///
    /// Returns every validation message found, in field declaration order.
    pub fn prepare(
        &self,
        input: Document,
        existing: Option<&Document>,
        run_validators: bool,
    ) -> Result<Document, Vec<String>> {
        let mut document = existing.cloned().unwrap_or_default();
        let mut errors = Vec::new();
        let mut uncoercible = Vec::new();

        for field in &self.fields {
            let Some(value) = input.get(field.name) else {
                continue;
            };
            if value.is_null() {
                document.remove(field.name);
                continue;
            }
            match field.coerce(value.clone()) {
                Ok(value) => {
                    document.insert(field.name.to_string(), value);
                }
                Err(message) => {
                    errors.push(message);
                    uncoercible.push(field.name);
                }
            }
        }

        if existing.is_none() {
            for field in &self.fields {
                if let Some(default) = &field.default {
                    if !document.contains_key(field.name) {
                        document.insert(field.name.to_string(), default.clone());
                    }
                }
            }
        }

        if run_validators {
            for field in self.fields.iter().filter(|f| !uncoercible.contains(&f.name)) {
                match document.get(field.name) {
                    Some(value) if !is_blank(value) => field.check(value, &mut errors),
                    _ => {
                        if let Some(message) = &field.required {
                            errors.push(message.clone());
                        }
                    }
                }
            }
            errors.extend(self.rules.iter().filter_map(|rule| rule(&document)));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        if let Some(hook) = self.save_hook {
            hook(&mut document);
        }
        Ok(document)
    }
}

/// Coerce a JSON value into a field type; returns the offending value on failure
fn coerce_value(field_type: &FieldType, value: Value) -> Result<Value, Value> {
    match (field_type, value) {
        (FieldType::Text, Value::String(s)) => Ok(Value::String(s)),
        (FieldType::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (FieldType::Text, Value::Bool(b)) => Ok(Value::String(b.to_string())),

        (FieldType::Number, Value::Number(n)) => Ok(Value::Number(n)),
        (FieldType::Number, Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(number_value(n)),
            _ => Err(Value::String(s)),
        },

        (FieldType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
        (FieldType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(Value::String(s)),
        },

        (FieldType::Date, Value::String(s)) => match parse_date(&s) {
            Some(date) => Ok(Value::String(format_date(date))),
            None => Err(Value::String(s)),
        },
        (FieldType::Date, Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|date| Value::String(format_date(date)))
            .ok_or(Value::Number(n)),

        (FieldType::Reference(_), Value::String(s)) if !s.trim().is_empty() => {
            Ok(Value::String(s))
        }

        (FieldType::Array(inner), Value::Array(items)) => items
            .into_iter()
            .map(|item| coerce_value(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (FieldType::Array(inner), scalar) => {
            coerce_value(inner, scalar).map(|item| Value::Array(vec![item]))
        }

        (FieldType::Object, Value::Object(map)) => Ok(Value::Object(map)),

        (_, other) => Err(other),
    }
}

/// Parse the date forms accepted in bodies and query strings.
///
/// RFC 3339, `YYYY-MM-DD`, and `YYYY-MM-DD,HH:MM` are accepted.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    let normalized = raw.replacen(',', "T", 1);
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical stored representation of a timestamp
pub fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Store integral values as integers so `"5"` and `5` look the same
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2 && !tld.ends_with('.'))
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
