//! Query specification parsing for list operations
//!
//! [`QuerySpec::parse`] turns the raw query-string map of a list request into
//! pagination, sort keys, a projection and the remaining filter candidates.
//! Parsing never fails: malformed `page` or `limit` values fall back to their
//! defaults. Sort and projection names are checked against the resource
//! schema when the parsed query is turned into a [`FindQuery`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use tour_service::handlers::QuerySpec;
//!
//! let raw = HashMap::from([
//!     ("sort".to_string(), "-price,ratingsAverage".to_string()),
//!     ("page".to_string(), "3".to_string()),
//!     ("limit".to_string(), "10".to_string()),
//!     ("difficulty".to_string(), "easy".to_string()),
//! ]);
//!
//! let spec = QuerySpec::parse(&raw);
//! assert_eq!(spec.page, 3);
//! assert_eq!(spec.offset(), 20);
//! assert_eq!(spec.filters.get("difficulty").map(String::as_str), Some("easy"));
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::store::{Filter, FindQuery, Projection, Schema, SortKey, CREATED_AT_FIELD, ID_FIELD};

/// Default number of documents per page
pub const DEFAULT_LIMIT: u32 = 100;

/// Maximum allowed documents per page
pub const MAX_LIMIT: u32 = 1000;

/// Query keys that control the query rather than filter it
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Page size bounds, usually taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueryLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Fixed query parameters forced onto every request of an alias route
///
/// ```rust
/// use std::collections::HashMap;
/// use tour_service::handlers::{QueryPreset, QuerySpec};
///
/// let preset = QueryPreset::new().set("limit", "5").set("sort", "-ratingsAverage,price");
/// let mut raw = HashMap::from([("limit".to_string(), "50".to_string())]);
/// preset.apply(&mut raw);
///
/// assert_eq!(QuerySpec::parse(&raw).limit, 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPreset {
    params: Vec<(&'static str, &'static str)>,
}

impl QueryPreset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: &'static str, value: &'static str) -> Self {
        self.params.push((key, value));
        self
    }

    /// Overwrite the raw parameters with the preset values
    pub fn apply(&self, raw: &mut HashMap<String, String>) {
        for (key, value) in &self.params {
            raw.insert((*key).to_string(), (*value).to_string());
        }
    }
}

/// Parsed list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Every non-reserved parameter, untranslated
    pub filters: BTreeMap<String, String>,
    /// Requested sort keys; empty means the default order
    pub sort: Vec<SortKey>,
    /// Requested projection
    pub fields: Projection,
    /// Page number (1-indexed)
    pub page: u32,
    /// Page size
    pub limit: u32,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            sort: Vec::new(),
            fields: Projection::All,
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QuerySpec {
    /// Parse with the default page size bounds
    pub fn parse(raw: &HashMap<String, String>) -> Self {
        Self::parse_with_limits(raw, QueryLimits::default())
    }

    /// Parse with explicit page size bounds
    pub fn parse_with_limits(raw: &HashMap<String, String>, limits: QueryLimits) -> Self {
        let filters = raw
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let sort = raw
            .get("sort")
            .map(|value| value.split(',').filter_map(SortKey::parse).collect())
            .unwrap_or_default();

        let fields = raw
            .get("fields")
            .map(|value| parse_projection(value))
            .unwrap_or_default();

        let page = positive(raw.get("page")).unwrap_or(1);
        let limit = positive(raw.get("limit"))
            .unwrap_or(limits.default_limit)
            .min(limits.max_limit.max(1));

        Self {
            filters,
            sort,
            fields,
            page,
            limit,
        }
    }

    /// Number of documents skipped before this page
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Sort keys the schema allows, defaulting to newest first, always ending
    /// with an ascending `id` tie-break
    pub fn sort_keys(&self, schema: &Schema) -> Vec<SortKey> {
        let mut keys: Vec<SortKey> = self
            .sort
            .iter()
            .filter(|key| {
                let allowed = schema.is_sortable(&key.field);
                if !allowed {
                    tracing::debug!(field = %key.field, "Ignoring sort on unsortable field");
                }
                allowed
            })
            .cloned()
            .collect();

        if keys.is_empty() {
            keys.push(SortKey::descending(CREATED_AT_FIELD));
        }
        if !keys.iter().any(|key| key.field == ID_FIELD) {
            keys.push(SortKey::ascending(ID_FIELD));
        }
        keys
    }

    /// Projection restricted to fields the schema knows
    pub fn projection(&self, schema: &Schema) -> Projection {
        let known = |fields: &[String]| -> Vec<String> {
            fields
                .iter()
                .filter(|field| schema.is_projectable(field))
                .cloned()
                .collect()
        };

        match &self.fields {
            Projection::All => Projection::All,
            Projection::Include(fields) => match known(fields) {
                kept if kept.is_empty() => Projection::All,
                kept => Projection::Include(kept),
            },
            Projection::Exclude(fields) => match known(fields) {
                kept if kept.is_empty() => Projection::All,
                kept => Projection::Exclude(kept),
            },
        }
    }

    /// Combine with a translated filter into a store query
    pub fn to_find_query(&self, filter: Filter, schema: &Schema) -> FindQuery {
        FindQuery::new(filter)
            .sort(self.sort_keys(schema))
            .projection(self.projection(schema))
            .skip(self.offset())
            .limit(u64::from(self.limit))
    }
}

fn positive(value: Option<&String>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
}

/// `name,price` includes; `-secret,-images` excludes. Inclusion wins when mixed.
fn parse_projection(value: &str) -> Projection {
    let entries: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    let included: Vec<String> = entries
        .iter()
        .filter(|entry| !entry.starts_with('-'))
        .map(|entry| (*entry).to_string())
        .collect();
    if !included.is_empty() {
        return Projection::Include(included);
    }

    let excluded: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.strip_prefix('-'))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();
    if excluded.is_empty() {
        Projection::All
    } else {
        Projection::Exclude(excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FieldDef, OrderDirection};

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDef::text("name"),
            FieldDef::number("price"),
            FieldDef::number("ratingsAverage"),
            FieldDef::object("startLocation"),
        ])
    }

    #[test]
    fn test_defaults() {
        let spec = QuerySpec::parse(&HashMap::new());
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 100);
        assert_eq!(spec.offset(), 0);
        assert!(spec.filters.is_empty());
        assert_eq!(spec.fields, Projection::All);
    }

    #[test]
    fn test_reserved_keys_are_not_filters() {
        let spec = QuerySpec::parse(&raw(&[
            ("page", "2"),
            ("sort", "price"),
            ("limit", "5"),
            ("fields", "name"),
            ("price[gte]", "100"),
        ]));
        assert_eq!(spec.filters.len(), 1);
        assert!(spec.filters.contains_key("price[gte]"));
    }

    #[test]
    fn test_malformed_pagination_falls_back() {
        for bad in ["abc", "0", "-3", "", "1.5"] {
            let spec = QuerySpec::parse(&raw(&[("page", bad), ("limit", bad)]));
            assert_eq!(spec.page, 1, "page={bad}");
            assert_eq!(spec.limit, DEFAULT_LIMIT, "limit={bad}");
        }
    }

    #[test]
    fn test_limit_is_capped() {
        let spec = QuerySpec::parse(&raw(&[("limit", "5000")]));
        assert_eq!(spec.limit, MAX_LIMIT);

        let limits = QueryLimits {
            default_limit: 10,
            max_limit: 50,
        };
        assert_eq!(QuerySpec::parse_with_limits(&raw(&[]), limits).limit, 10);
        assert_eq!(QuerySpec::parse_with_limits(&raw(&[("limit", "80")]), limits).limit, 50);
    }

    #[test]
    fn test_offset() {
        let spec = QuerySpec::parse(&raw(&[("page", "3"), ("limit", "10")]));
        assert_eq!(spec.offset(), 20);
    }

    #[test]
    fn test_sort_keys_default_to_newest_with_tie_break() {
        let keys = QuerySpec::parse(&HashMap::new()).sort_keys(&schema());
        assert_eq!(
            keys,
            vec![SortKey::descending("createdAt"), SortKey::ascending("id")]
        );
    }

    #[test]
    fn test_sort_keys_keep_order_and_drop_unknown() {
        let spec = QuerySpec::parse(&raw(&[("sort", "-ratingsAverage, bogus ,price")]));
        let keys = spec.sort_keys(&schema());

        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].field, "ratingsAverage");
        assert_eq!(keys[0].direction, OrderDirection::Descending);
        assert_eq!(keys[1], SortKey::ascending("price"));
        assert_eq!(keys[2], SortKey::ascending("id"));
    }

    #[test]
    fn test_sort_on_created_at_is_kept_ascending() {
        let spec = QuerySpec::parse(&raw(&[("sort", "createdAt")]));
        assert_eq!(
            spec.sort_keys(&schema()),
            vec![SortKey::ascending("createdAt"), SortKey::ascending("id")]
        );
    }

    #[test]
    fn test_sort_on_unsortable_only_falls_back_to_default() {
        let spec = QuerySpec::parse(&raw(&[("sort", "startLocation")]));
        assert_eq!(spec.sort_keys(&schema())[0], SortKey::descending("createdAt"));
    }

    #[test]
    fn test_projection_include() {
        let spec = QuerySpec::parse(&raw(&[("fields", "name, price,nope")]));
        assert_eq!(
            spec.projection(&schema()),
            Projection::Include(vec!["name".into(), "price".into()])
        );
    }

    #[test]
    fn test_projection_exclude() {
        let spec = QuerySpec::parse(&raw(&[("fields", "-price,-ratingsAverage")]));
        assert_eq!(
            spec.projection(&schema()),
            Projection::Exclude(vec!["price".into(), "ratingsAverage".into()])
        );
    }

    #[test]
    fn test_projection_of_unknown_fields_is_all() {
        let spec = QuerySpec::parse(&raw(&[("fields", "password")]));
        assert_eq!(spec.projection(&schema()), Projection::All);
    }

    #[test]
    fn test_preset_overrides_client_values() {
        let preset = QueryPreset::new()
            .set("limit", "5")
            .set("sort", "-ratingsAverage,price")
            .set("fields", "name,price,ratingsAverage");
        let mut params = raw(&[("limit", "50"), ("difficulty", "easy")]);
        preset.apply(&mut params);

        let spec = QuerySpec::parse(&params);
        assert_eq!(spec.limit, 5);
        assert_eq!(spec.sort[0], SortKey::descending("ratingsAverage"));
        assert_eq!(spec.filters.get("difficulty").map(String::as_str), Some("easy"));
    }

    #[test]
    fn test_to_find_query() {
        let spec = QuerySpec::parse(&raw(&[("page", "2"), ("limit", "2"), ("sort", "-price")]));
        let query = spec.to_find_query(Filter::new(), &schema());

        assert_eq!(query.skip, 2);
        assert_eq!(query.limit, Some(2));
        assert_eq!(
            query.sort,
            vec![SortKey::descending("price"), SortKey::ascending("id")]
        );
    }
}
