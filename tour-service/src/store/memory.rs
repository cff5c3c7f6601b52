//! In-memory document collection
//!
//! Documents live in a `BTreeMap` keyed by id behind a `tokio::sync::RwLock`.
//! Ids are UUIDv7 TypeIDs, so map order is creation order. Every mutation
//! (validation, unique-key check, write) completes under a single write lock.
//!
//! The schema's read scope is ANDed into every lookup: documents outside it
//! cannot be listed, read, counted, updated or deleted. Unique keys still
//! consider them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::{StoreError, StoreOperation};
use super::filter::{compare_values, lookup_path, Filter, FindQuery, OrderDirection, Projection};
use super::schema::{format_date, Schema, CREATED_AT_FIELD, ID_FIELD};
use super::traits::{Collection, Resource, StoreResult, UpdateOptions};
use super::Document;
use crate::ids::DocumentId;

/// Collection backed by process memory
pub struct MemoryCollection<R: Resource> {
    schema: Schema,
    hidden: Vec<&'static str>,
    documents: RwLock<BTreeMap<String, Document>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> MemoryCollection<R> {
    pub fn new() -> Self {
        let schema = R::schema();
        let hidden = schema.hidden_fields();
        Self {
            schema,
            hidden,
            documents: RwLock::new(BTreeMap::new()),
            _resource: PhantomData,
        }
    }

    /// Insert pre-existing documents, keeping any `id` they carry.
    ///
    /// Documents go through the same validation and unique checks as
    /// [`Collection::create`]. Returns the number of documents inserted.
    pub async fn import(&self, documents: Vec<Document>) -> StoreResult<usize> {
        let mut stored = self.documents.write().await;
        let mut inserted = 0;

        for mut fields in documents {
            let id = match fields.remove(ID_FIELD) {
                Some(Value::String(id)) if !id.is_empty() => id,
                _ => DocumentId::new(R::ID_PREFIX).into(),
            };
            let created_at = fields
                .remove(CREATED_AT_FIELD)
                .unwrap_or_else(|| Value::String(format_date(Utc::now())));
            let mut document = self.prepare_new(fields, StoreOperation::Create)?;
            document.insert(CREATED_AT_FIELD.to_string(), created_at);
            document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

            self.ensure_unique(&stored, &document, &id, StoreOperation::Create)?;
            stored.insert(id, document);
            inserted += 1;
        }

        tracing::debug!(resource = R::NAME, inserted, "Imported documents");
        Ok(inserted)
    }

    fn prepare_new(&self, fields: Document, operation: StoreOperation) -> StoreResult<Document> {
        self.schema
            .prepare(fields, None, true)
            .map_err(|messages| {
                StoreError::validation_failed(operation, &messages).with_entity_type(R::NAME)
            })
    }

    fn ensure_unique(
        &self,
        stored: &BTreeMap<String, Document>,
        candidate: &Document,
        own_id: &str,
        operation: StoreOperation,
    ) -> StoreResult<()> {
        for key in self.schema.unique_keys() {
            let Some(values) = key_values(candidate, &key) else {
                continue;
            };
            let clash = stored
                .iter()
                .filter(|(id, _)| id.as_str() != own_id)
                .any(|(_, other)| key_values(other, &key).as_ref() == Some(&values));

            if clash {
                let shown = values
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(StoreError::duplicate(operation, shown).with_entity_type(R::NAME));
            }
        }
        Ok(())
    }

    /// The caller's filter restricted to the schema's read scope
    fn scoped(&self, filter: &Filter) -> Filter {
        let mut scoped = self.schema.scope().clone();
        scoped.extend(filter.clone());
        scoped
    }

    fn in_scope(&self, document: &Document) -> bool {
        self.schema.scope().matches(document)
    }

    /// Output view of a stored document
    fn render(&self, document: &Document, projection: &Projection) -> Document {
        let mut full = document.clone();
        self.schema.apply_virtuals(&mut full);
        projection.apply(&full, &self.hidden)
    }
}

impl<R: Resource> Default for MemoryCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Collection<R> for MemoryCollection<R> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn find(&self, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let filter = self.scoped(&query.filter);
        let stored = self.documents.read().await;

        let mut matching: Vec<&Document> = stored
            .values()
            .filter(|document| filter.matches(document))
            .collect();

        if !query.sort.is_empty() {
            matching.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|key| {
                        let ordering =
                            compare_values(lookup_path(a, &key.field), lookup_path(b, &key.field));
                        match key.direction {
                            OrderDirection::Ascending => ordering,
                            OrderDirection::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|document| self.render(document, &query.projection))
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        let stored = self.documents.read().await;
        Ok(stored
            .get(id)
            .filter(|document| self.in_scope(document))
            .map(|document| self.render(document, &Projection::All)))
    }

    async fn count_documents(&self, filter: &Filter) -> StoreResult<u64> {
        let filter = self.scoped(filter);
        let stored = self.documents.read().await;
        let count = stored.values().filter(|document| filter.matches(document)).count();
        Ok(count as u64)
    }

    async fn create(&self, fields: Document) -> StoreResult<Document> {
        let mut document = self.prepare_new(fields, StoreOperation::Create)?;
        let id: String = DocumentId::new(R::ID_PREFIX).into();
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        document.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(format_date(Utc::now())),
        );

        let mut stored = self.documents.write().await;
        self.ensure_unique(&stored, &document, &id, StoreOperation::Create)?;
        let rendered = self.render(&document, &Projection::All);
        stored.insert(id, document);
        Ok(rendered)
    }

    async fn find_by_id_and_update(
        &self,
        id: &str,
        fields: Document,
        options: UpdateOptions,
    ) -> StoreResult<Option<Document>> {
        let mut stored = self.documents.write().await;
        let Some(existing) = stored.get(id).filter(|document| self.in_scope(document)) else {
            return Ok(None);
        };

        let updated = self
            .schema
            .prepare(fields, Some(existing), options.run_validators)
            .map_err(|messages| {
                StoreError::validation_failed(StoreOperation::Update, &messages)
                    .with_entity(R::NAME, id)
            })?;
        self.ensure_unique(&stored, &updated, id, StoreOperation::Update)?;

        let rendered = if options.return_updated {
            self.render(&updated, &Projection::All)
        } else {
            self.render(existing, &Projection::All)
        };
        stored.insert(id.to_string(), updated);
        Ok(Some(rendered))
    }

    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<bool> {
        let mut stored = self.documents.write().await;
        if !stored.get(id).is_some_and(|document| self.in_scope(document)) {
            return Ok(false);
        }
        Ok(stored.remove(id).is_some())
    }
}

/// Values of a unique key, or `None` when any part is missing
fn key_values(document: &Document, key: &[&str]) -> Option<Vec<Value>> {
    key.iter()
        .map(|field| document.get(*field).filter(|v| !v.is_null()).cloned())
        .collect()
}
