//! Generic CRUD handlers for any resource
//!
//! [`ResourceHandlers`] binds a [`Resource`] to a [`Collection`] and exposes
//! the five REST operations with one request/response/error contract. Each
//! resource differs only in its [`HandlerConfig`]: who may call what, how
//! nested routes and ownership fill in fields, and which relations are
//! expanded on reads.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tour_service::handlers::{HandlerConfig, ResourceHandlers};
//! use tour_service::middleware::{Access, Role};
//! use tour_service::resources::Tour;
//! use tour_service::store::MemoryCollection;
//!
//! let tours = Arc::new(MemoryCollection::<Tour>::new());
//! let router: axum::Router = ResourceHandlers::<Tour, _>::new(
//!     tours,
//!     HandlerConfig::new().writes(Access::Roles(&[Role::Admin, Role::LeadGuide])),
//! )
//! .router();
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde_json::Value;

use super::context::RequestContext;
use super::error::{ApiOperation, AppError};
use super::filter::translate;
use super::populate::{expand, expand_all, PopulateSpec};
use super::query::{QueryLimits, QueryPreset, QuerySpec};
use super::response::{ItemResponse, ListResponse, NoContent};
use crate::middleware::{Access, Principal};
use crate::store::{Collection, Document, FieldValue, FilterPredicate, Resource, UpdateOptions};

/// Path parameter carrying a parent id, copied into a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParentLink {
    param: &'static str,
    field: &'static str,
}

/// Per-operation access policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationAccess {
    pub list: Access,
    pub get: Access,
    pub create: Access,
    pub update: Access,
    pub delete: Access,
}

/// Behaviour of one resource's handlers
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    access: OperationAccess,
    parent: Option<ParentLink>,
    owner_field: Option<&'static str>,
    principal_scope: Option<&'static str>,
    populate: Vec<PopulateSpec>,
    populate_list: Vec<PopulateSpec>,
    preset: Option<QueryPreset>,
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same policy for every operation
    #[must_use]
    pub fn access(mut self, access: Access) -> Self {
        self.access = OperationAccess {
            list: access,
            get: access,
            create: access,
            update: access,
            delete: access,
        };
        self
    }

    /// Policy for create, update and delete
    #[must_use]
    pub fn writes(mut self, access: Access) -> Self {
        self.access.create = access;
        self.access.update = access;
        self.access.delete = access;
        self
    }

    /// Policy for a single operation
    #[must_use]
    pub fn allow(mut self, operation: ApiOperation, access: Access) -> Self {
        match operation {
            ApiOperation::List => self.access.list = access,
            ApiOperation::Get => self.access.get = access,
            ApiOperation::Create => self.access.create = access,
            ApiOperation::Update => self.access.update = access,
            ApiOperation::Delete => self.access.delete = access,
            ApiOperation::Authorize | ApiOperation::Route => {}
        }
        self
    }

    /// Restrict lists to documents whose `field` equals path parameter
    /// `param`, and fill `field` from it on create
    #[must_use]
    pub fn nested_under(mut self, param: &'static str, field: &'static str) -> Self {
        self.parent = Some(ParentLink { param, field });
        self
    }

    /// Fill `field` with the caller's id on create when the body omits it
    #[must_use]
    pub fn owned_by(mut self, field: &'static str) -> Self {
        self.owner_field = Some(field);
        self
    }

    /// Restrict lists to documents whose `field` is the caller's id
    #[must_use]
    pub fn scoped_to_principal(mut self, field: &'static str) -> Self {
        self.principal_scope = Some(field);
        self
    }

    /// Expand a relation on single-document reads
    #[must_use]
    pub fn populate(mut self, spec: PopulateSpec) -> Self {
        self.populate.push(spec);
        self
    }

    /// Expand a relation on list reads
    #[must_use]
    pub fn populate_list(mut self, spec: PopulateSpec) -> Self {
        self.populate_list.push(spec);
        self
    }

    /// Force fixed query parameters onto every list request
    #[must_use]
    pub fn preset(mut self, preset: QueryPreset) -> Self {
        self.preset = Some(preset);
        self
    }
}

/// CRUD operations for resource `R` stored in `C`
pub struct ResourceHandlers<R: Resource, C: Collection<R>> {
    collection: Arc<C>,
    config: Arc<HandlerConfig>,
    limits: QueryLimits,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource, C: Collection<R>> Clone for ResourceHandlers<R, C> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            config: self.config.clone(),
            limits: self.limits,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource, C: Collection<R>> ResourceHandlers<R, C> {
    pub fn new(collection: Arc<C>, config: HandlerConfig) -> Self {
        Self {
            collection,
            config: Arc::new(config),
            limits: QueryLimits::default(),
            _resource: PhantomData,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// List documents matching the query string
    pub async fn get_all(
        &self,
        context: &RequestContext,
        mut raw: HashMap<String, String>,
    ) -> Result<ListResponse<Document>, AppError> {
        let principal = self.authorize(context, &self.config.access.list, ApiOperation::List)?;

        if let Some(preset) = &self.config.preset {
            preset.apply(&mut raw);
        }
        let spec = QuerySpec::parse_with_limits(&raw, self.limits);
        let schema = self.collection.schema();
        let mut filter = translate(&spec.filters, schema)?;

        if let Some(parent) = self.config.parent {
            if let Some(parent_id) = context.param(parent.param) {
                filter.push(parent.field, FilterPredicate::Equals(FieldValue::from(parent_id)));
            }
        }
        if let Some(field) = self.config.principal_scope {
            let principal = principal.ok_or_else(|| {
                AppError::unauthorized("You are not logged in! Please log in to get access.")
            })?;
            filter.push(field, FilterPredicate::Equals(FieldValue::from(principal.id.as_str())));
        }

        let query = spec.to_find_query(filter, schema);
        let documents = self.collection.find(&query).await.map_err(AppError::from)?;
        let documents = expand_all(documents, &self.config.populate_list).await;

        Ok(ListResponse::new(R::PLURAL, documents))
    }

    /// Read one document by id
    pub async fn get_one(
        &self,
        context: &RequestContext,
        id: &str,
    ) -> Result<ItemResponse<Document>, AppError> {
        self.authorize(context, &self.config.access.get, ApiOperation::Get)?;

        let document = self
            .collection
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(R::NAME, id))?;
        let document = expand(document, &self.config.populate).await;

        Ok(ItemResponse::new(R::SINGULAR, document))
    }

    /// Create a document from the request body
    pub async fn create_one(
        &self,
        context: &RequestContext,
        mut body: Document,
    ) -> Result<ItemResponse<Document>, AppError> {
        let principal = self.authorize(context, &self.config.access.create, ApiOperation::Create)?;

        if let Some(parent) = self.config.parent {
            if let Some(parent_id) = context.param(parent.param) {
                body.entry(parent.field)
                    .or_insert_with(|| Value::String(parent_id.to_string()));
            }
        }
        if let (Some(field), Some(principal)) = (self.config.owner_field, principal) {
            body.entry(field)
                .or_insert_with(|| Value::String(principal.id.clone()));
        }

        let document = self.collection.create(body).await?;
        Ok(ItemResponse::created(R::SINGULAR, document))
    }

    /// Merge the request body into a document
    pub async fn update_one(
        &self,
        context: &RequestContext,
        id: &str,
        body: Document,
    ) -> Result<ItemResponse<Document>, AppError> {
        self.authorize(context, &self.config.access.update, ApiOperation::Update)?;

        let document = self
            .collection
            .find_by_id_and_update(id, body, UpdateOptions::default())
            .await?
            .ok_or_else(|| AppError::not_found(R::NAME, id).with_operation(ApiOperation::Update))?;

        Ok(ItemResponse::new(R::SINGULAR, document))
    }

    pub async fn delete_one(&self, context: &RequestContext, id: &str) -> Result<NoContent, AppError> {
        self.authorize(context, &self.config.access.delete, ApiOperation::Delete)?;

        if self.collection.find_by_id_and_delete(id).await? {
            Ok(NoContent)
        } else {
            Err(AppError::not_found(R::NAME, id).with_operation(ApiOperation::Delete))
        }
    }

    fn authorize<'a>(
        &self,
        context: &'a RequestContext,
        access: &Access,
        operation: ApiOperation,
    ) -> Result<Option<&'a Principal>, AppError> {
        context
            .authorize(access)
            .map_err(|err| err.with_operation(operation))
    }

    /// `/` (list, create) and `/{id}` (read, update, delete)
    pub fn router<S>(self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .route("/", get(list::<R, C>).post(create::<R, C>))
            .route(
                "/{id}",
                get(read::<R, C>).patch(update::<R, C>).delete(remove::<R, C>),
            )
            .with_state(self)
    }

    /// List and create only, for nested collection routes
    pub fn collection_route<S>(self) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        get(list::<R, C>).post(create::<R, C>).with_state(self)
    }

    /// List only, for alias routes
    pub fn list_route<S>(self) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        get(list::<R, C>).with_state(self)
    }
}

fn document_id(context: &RequestContext) -> Result<&str, AppError> {
    context
        .param("id")
        .ok_or_else(|| AppError::internal("route is missing its {id} parameter"))
}

fn json_body(body: Result<Json<Document>, JsonRejection>) -> Result<Document, AppError> {
    body.map(|Json(document)| document)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn list<R: Resource, C: Collection<R>>(
    State(handlers): State<ResourceHandlers<R, C>>,
    context: RequestContext,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<ListResponse<Document>, AppError> {
    let Query(raw) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    handlers.get_all(&context, raw).await
}

async fn read<R: Resource, C: Collection<R>>(
    State(handlers): State<ResourceHandlers<R, C>>,
    context: RequestContext,
) -> Result<ItemResponse<Document>, AppError> {
    handlers.get_one(&context, document_id(&context)?).await
}

async fn create<R: Resource, C: Collection<R>>(
    State(handlers): State<ResourceHandlers<R, C>>,
    context: RequestContext,
    body: Result<Json<Document>, JsonRejection>,
) -> Result<ItemResponse<Document>, AppError> {
    let body = json_body(body).map_err(|err| err.with_operation(ApiOperation::Create))?;
    handlers.create_one(&context, body).await
}

async fn update<R: Resource, C: Collection<R>>(
    State(handlers): State<ResourceHandlers<R, C>>,
    context: RequestContext,
    body: Result<Json<Document>, JsonRejection>,
) -> Result<ItemResponse<Document>, AppError> {
    let body = json_body(body).map_err(|err| err.with_operation(ApiOperation::Update))?;
    handlers.update_one(&context, document_id(&context)?, body).await
}

async fn remove<R: Resource, C: Collection<R>>(
    State(handlers): State<ResourceHandlers<R, C>>,
    context: RequestContext,
) -> Result<NoContent, AppError> {
    handlers.delete_one(&context, document_id(&context)?).await
}
