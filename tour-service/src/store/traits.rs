//! Collection capability traits
//!
//! The handler factory talks to storage only through [`Collection`]. Methods
//! return `impl Future + Send` (RPITIT), so implementations are plain
//! `async fn`s without boxing.
//!
//! # Example
//!
//! ```rust,ignore
//! use tour_service::store::{Collection, FindQuery, Filter, SortKey};
//!
//! let cheapest = tours
//!     .find(&FindQuery::new(Filter::new()).sort(vec![SortKey::ascending("price")]).limit(1))
//!     .await?;
//! ```

use std::future::Future;

use super::error::StoreError;
use super::filter::{Filter, FindQuery};
use super::schema::Schema;
use super::Document;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A resource kind stored in its own collection
pub trait Resource: Send + Sync + 'static {
    /// Display name used in errors and logs (e.g. "Tour")
    const NAME: &'static str;
    /// Envelope key for a single document
    const SINGULAR: &'static str;
    /// Envelope key for a list of documents
    const PLURAL: &'static str;
    /// TypeID prefix of generated ids
    const ID_PREFIX: &'static str;

    fn schema() -> Schema;
}

/// Options for [`Collection::find_by_id_and_update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Return the document after the update rather than before it
    pub return_updated: bool,
    /// Check field constraints against the merged document
    pub run_validators: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            return_updated: true,
            run_validators: true,
        }
    }
}

/// Storage capability for one resource
///
/// Returned documents are output views: hidden fields are removed unless the
/// query's projection names them, and schema virtuals are filled in.
pub trait Collection<R: Resource>: Send + Sync + 'static {
    /// Schema the collection validates against
    fn schema(&self) -> &Schema;

    /// Find documents matching the query, sorted and windowed
    fn find(&self, query: &FindQuery) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Load one document; `Ok(None)` when no document has that id
    fn find_by_id(&self, id: &str) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Count documents matching the filter
    fn count_documents(&self, filter: &Filter) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Validate and insert a new document
    ///
    /// # Errors
    ///
    /// `ValidationFailed` when constraints fail, `Duplicate` when a unique key
    /// already exists.
    fn create(&self, fields: Document) -> impl Future<Output = StoreResult<Document>> + Send;

    /// Merge fields into an existing document; `Ok(None)` when it does not exist
    fn find_by_id_and_update(
        &self,
        id: &str,
        fields: Document,
        options: UpdateOptions,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Remove a document; `false` when it did not exist
    fn find_by_id_and_delete(&self, id: &str) -> impl Future<Output = StoreResult<bool>> + Send;
}
