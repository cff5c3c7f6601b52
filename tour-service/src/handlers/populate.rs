//! Related-document expansion for read operations
//!
//! A [`PopulateSpec`] names a field to fill and the [`RelationLoader`] that
//! fills it. Two loaders cover the relations between resources:
//!
//! - [`ReferencedBy`]: documents in another collection whose foreign field
//!   holds this document's id (a tour's reviews)
//! - [`References`]: documents whose ids this document stores (a review's
//!   user, a tour's guides)
//!
//! Expansion is best effort. A loader failure is logged and the field keeps
//! its stored value; the request still succeeds.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::store::{
    Collection, Document, Filter, FindQuery, Projection, Resource, SortKey, StoreResult, ID_FIELD,
};

/// Loads the value for one relation of a document
#[async_trait]
pub trait RelationLoader: Send + Sync {
    /// The expanded value for `path`, or `None` to leave the field as stored
    async fn load(
        &self,
        document: &Document,
        path: &str,
        select: &Projection,
    ) -> StoreResult<Option<Value>>;
}

/// Virtual relation: documents pointing back at this one
pub struct ReferencedBy<R: Resource, C: Collection<R>> {
    collection: Arc<C>,
    foreign_field: &'static str,
    nested: Vec<PopulateSpec>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource, C: Collection<R>> ReferencedBy<R, C> {
    pub fn new(collection: Arc<C>, foreign_field: &'static str) -> Self {
        Self {
            collection,
            foreign_field,
            nested: Vec::new(),
            _resource: PhantomData,
        }
    }

    /// Expand relations of the loaded documents too
    #[must_use]
    pub fn nested(mut self, spec: PopulateSpec) -> Self {
        self.nested.push(spec);
        self
    }
}

#[async_trait]
impl<R: Resource, C: Collection<R>> RelationLoader for ReferencedBy<R, C> {
    async fn load(
        &self,
        document: &Document,
        _path: &str,
        select: &Projection,
    ) -> StoreResult<Option<Value>> {
        let Some(id) = document.get(ID_FIELD).and_then(Value::as_str) else {
            return Ok(None);
        };

        let query = FindQuery::new(Filter::new().equals(self.foreign_field, id))
            .sort(vec![SortKey::ascending(ID_FIELD)])
            .projection(select.clone());
        let related = self.collection.find(&query).await?;
        let related = expand_all(related, &self.nested).await;

        Ok(Some(Value::Array(
            related.into_iter().map(Value::Object).collect(),
        )))
    }
}

/// Stored reference: an id or an array of ids in the document itself
pub struct References<R: Resource, C: Collection<R>> {
    collection: Arc<C>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource, C: Collection<R>> References<R, C> {
    pub fn new(collection: Arc<C>) -> Self {
        Self {
            collection,
            _resource: PhantomData,
        }
    }

    async fn fetch(&self, id: &str, select: &Projection) -> StoreResult<Option<Value>> {
        Ok(self
            .collection
            .find_by_id(id)
            .await?
            .map(|doc| Value::Object(select.apply(&doc, &[]))))
    }
}

#[async_trait]
impl<R: Resource, C: Collection<R>> RelationLoader for References<R, C> {
    async fn load(
        &self,
        document: &Document,
        path: &str,
        select: &Projection,
    ) -> StoreResult<Option<Value>> {
        match document.get(path) {
            Some(Value::String(id)) => Ok(Some(self.fetch(id, select).await?.unwrap_or(Value::Null))),
            Some(Value::Array(items)) => {
                let ids = items.iter().filter_map(Value::as_str);
                let fetched = join_all(ids.map(|id| self.fetch(id, select))).await;

                let mut related = Vec::new();
                for result in fetched {
                    if let Some(value) = result? {
                        related.push(value);
                    }
                }
                Ok(Some(Value::Array(related)))
            }
            _ => Ok(None),
        }
    }
}

/// One relation to expand
#[derive(Clone)]
pub struct PopulateSpec {
    pub path: &'static str,
    loader: Arc<dyn RelationLoader>,
    select: Projection,
}

impl PopulateSpec {
    pub fn new(path: &'static str, loader: impl RelationLoader + 'static) -> Self {
        Self {
            path,
            loader: Arc::new(loader),
            select: Projection::All,
        }
    }

    /// Keep only these fields of the related documents
    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = Projection::Include(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }
}

impl std::fmt::Debug for PopulateSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopulateSpec")
            .field("path", &self.path)
            .field("select", &self.select)
            .finish_non_exhaustive()
    }
}

/// Fill every configured relation of one document
pub async fn expand(mut document: Document, specs: &[PopulateSpec]) -> Document {
    if specs.is_empty() {
        return document;
    }

    let results = join_all(
        specs
            .iter()
            .map(|spec| spec.loader.load(&document, spec.path, &spec.select)),
    )
    .await;

    for (spec, result) in specs.iter().zip(results) {
        match result {
            Ok(Some(value)) => {
                document.insert(spec.path.to_string(), value);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    path = spec.path,
                    document_id = document.get(ID_FIELD).and_then(serde_json::Value::as_str).unwrap_or_default(),
                    error = %err,
                    "Relation expansion failed, leaving field unexpanded"
                );
            }
        }
    }

    document
}

pub async fn expand_all(documents: Vec<Document>, specs: &[PopulateSpec]) -> Vec<Document> {
    if specs.is_empty() {
        return documents;
    }
    join_all(documents.into_iter().map(|doc| expand(doc, specs))).await
}
