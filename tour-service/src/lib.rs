//! # tour-service
//!
//! Tour booking REST API built from one generic resource handler.
//!
//! ## Features
//!
//! - **Generic CRUD**: [`handlers::ResourceHandlers`] serves list, read,
//!   create, update and delete for any [`store::Resource`]
//! - **Query language**: `?price[gte]=100&sort=-ratingsAverage,price&fields=name,price&page=2&limit=10`
//! - **Schemas**: typed fields, defaults, range/length/enum checks and unique keys
//! - **Relations**: best-effort expansion of referenced and referencing documents
//! - **Auth**: HS256 JWT from a bearer header or cookie, per-operation role policies
//! - **Errors**: one rendering boundary, detailed in development and safe in production
//!
//! ## Example
//!
//! ```rust,no_run
//! use tour_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder().config(config.clone()).build().await?;
//!
//!     Server::new(config).serve(app(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod resources;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, Environment};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{
        AppError, AppErrorKind, HandlerConfig, PopulateSpec, QuerySpec, RequestContext,
        ResourceHandlers,
    };
    pub use crate::health::{health, readiness};
    pub use crate::ids::{DocumentId, MakeTypedRequestId, RequestId};
    pub use crate::middleware::{Access, Authentication, JwtAuth, Principal, Role};
    pub use crate::observability::init_tracing;
    pub use crate::resources::{Booking, Review, Tour, User};
    pub use crate::routes::app;
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder, SeedData};
    pub use crate::store::{Collection, Document, MemoryCollection, Resource};

    pub use axum::{
        extract::{Path, Query, State},
        response::{IntoResponse, Response},
        routing::{delete, get, patch, post},
        Json, Router,
    };
    pub use tokio;
    pub use tracing::{debug, error, info, warn};
}
