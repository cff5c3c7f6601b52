//! Generic REST handlers for document resources
//!
//! A list request flows through the pieces of this module in order:
//!
//! 1. [`QuerySpec::parse`] splits the query string into pagination, sort,
//!    projection and filter candidates
//! 2. [`translate`] turns the candidates into a structured
//!    [`Filter`](crate::store::Filter), checked against the resource schema
//! 3. [`ResourceHandlers`] runs the query against its
//!    [`Collection`](crate::store::Collection)
//! 4. [`expand`] fills configured relations
//! 5. [`ListResponse`] / [`ItemResponse`] wrap the result in the JSON envelope
//!
//! Failures are [`AppError`]s, rendered once by the error boundary.
//!
//! # Integration with Axum
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::Router;
//! use tour_service::handlers::{HandlerConfig, ResourceHandlers};
//! use tour_service::resources::Review;
//! use tour_service::store::MemoryCollection;
//!
//! let reviews = Arc::new(MemoryCollection::<Review>::new());
//! let app: Router = Router::new().nest(
//!     "/api/v1/reviews",
//!     ResourceHandlers::<Review, _>::new(reviews, HandlerConfig::new()).router(),
//! );
//! ```

mod context;
mod error;
mod factory;
mod filter;
mod populate;
mod query;
mod response;

pub use context::RequestContext;
pub use error::{ApiOperation, AppError, AppErrorKind, GENERIC_ERROR_MESSAGE};
pub use factory::{HandlerConfig, OperationAccess, ResourceHandlers};
pub use filter::translate;
pub use populate::{expand, expand_all, PopulateSpec, ReferencedBy, References, RelationLoader};
pub use query::{QueryLimits, QueryPreset, QuerySpec, DEFAULT_LIMIT, MAX_LIMIT, RESERVED_KEYS};
pub use response::{EnvelopeStatus, ErrorEnvelope, ItemResponse, ListResponse, NoContent};
