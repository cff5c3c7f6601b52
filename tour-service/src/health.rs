//! Health check handlers

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::{
    resources::{Booking, Review, Tour, User},
    state::AppState,
    store::{Collection, Filter, Resource, StoreResult},
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness check response with per-collection status
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,

    /// Service name
    pub service: String,

    /// Collection statuses
    pub dependencies: HashMap<String, DependencyStatus>,
}

/// Individual dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Dependency is healthy
    pub healthy: bool,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DependencyStatus {
    fn from_count(result: StoreResult<u64>) -> Self {
        match result {
            Ok(count) => Self {
                healthy: true,
                message: Some(format!("{count} documents")),
            },
            Err(err) => {
                tracing::error!("Collection health check failed: {}", err);
                Self {
                    healthy: false,
                    message: Some(err.to_string()),
                }
            }
        }
    }
}

/// Simple health check (liveness)
///
/// Always returns 200 OK if the service is running.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check (readiness)
///
/// Returns 200 OK when every collection answers a count, 503 otherwise.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut dependencies = HashMap::new();
    let everything = Filter::new();

    check::<Tour, _>(&mut dependencies, state.tours().as_ref(), &everything).await;
    check::<Review, _>(&mut dependencies, state.reviews().as_ref(), &everything).await;
    check::<User, _>(&mut dependencies, state.users().as_ref(), &everything).await;
    check::<Booking, _>(&mut dependencies, state.bookings().as_ref(), &everything).await;

    let ready = dependencies.values().all(|status| status.healthy);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        ready,
        service: state.config().service.name.clone(),
        dependencies,
    };
    (status, Json(response))
}

async fn check<R: Resource, C: Collection<R>>(
    dependencies: &mut HashMap<String, DependencyStatus>,
    collection: &C,
    filter: &Filter,
) {
    let status = DependencyStatus::from_count(collection.count_documents(filter).await);
    dependencies.insert(R::PLURAL.to_string(), status);
}
