//! Centralized error rendering
//!
//! Handlers return [`AppError`]s, whose `IntoResponse` produces the
//! production-safe body and tags the response with the error itself. This
//! middleware is the only place errors are logged and the only place the
//! final error body is chosen: full detail in development, the bare message
//! for operational errors in production, and a generic message for
//! everything else.

use std::any::Any;

use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::Environment;
use crate::handlers::AppError;

/// Re-render tagged error responses for the configured environment
pub async fn error_boundary(
    State(environment): State<Environment>,
    request: Request<Body>,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let Some(error) = response.extensions_mut().remove::<AppError>() else {
        return response;
    };

    log_error(&error, &method, &path);
    render(&error, environment)
}

/// Error body for the environment
pub fn render(error: &AppError, environment: Environment) -> Response {
    let envelope = match environment {
        Environment::Development => error.development_envelope(),
        Environment::Production => error.production_envelope(),
    };
    (error.status_code(), Json(envelope)).into_response()
}

fn log_error(error: &AppError, method: &Method, path: &str) {
    if error.is_operational {
        tracing::warn!(
            method = %method,
            path = %path,
            status = error.status_code().as_u16(),
            kind = %error.kind,
            operation = %error.operation,
            entity_type = error.entity_type.as_deref(),
            entity_id = error.entity_id.as_deref(),
            message = %error.message,
            "Request failed"
        );
    } else {
        tracing::error!(
            method = %method,
            path = %path,
            status = error.status_code().as_u16(),
            kind = %error.kind,
            operation = %error.operation,
            detail = error.detail.as_deref(),
            "Unexpected error"
        );
    }
}

/// Response for a panicking handler, for `CatchPanicLayer::custom`
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::internal(format!("handler panicked: {detail}")).into_response()
}
