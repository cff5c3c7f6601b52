//! Application error types for handler operations
//!
//! [`AppError`] is the single error type handlers return. It carries its
//! category, the operation that failed, the message a client may see, and an
//! explicit `is_operational` flag separating expected failures (bad input,
//! missing documents, rejected credentials) from programming or
//! infrastructure faults.
//!
//! `IntoResponse` renders the production-safe envelope and attaches the error
//! to the response extensions, so the error boundary middleware can log it
//! once and re-render it for development.
//!
//! # Example
//!
//! ```rust
//! use tour_service::handlers::{AppError, AppErrorKind};
//!
//! let error = AppError::not_found("Tour", "tour_01h455vb4pex5vsknk084sn02q");
//! assert!(matches!(error.kind, AppErrorKind::NotFound));
//! assert!(error.is_operational);
//! assert_eq!(error.status_code().as_u16(), 404);
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::response::{EnvelopeStatus, ErrorEnvelope};
use crate::store::{StoreError, StoreErrorKind, StoreOperation};

/// Message shown in production for non-operational errors
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

/// Operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing documents
    List,
    /// Reading a single document by id
    Get,
    /// Creating a document
    Create,
    /// Updating a document
    Update,
    /// Deleting a document
    Delete,
    /// Checking credentials and access policy
    Authorize,
    /// Matching the request to a route
    Route,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Authorize => write!(f, "authorize"),
            Self::Route => write!(f, "route"),
        }
    }
}

/// Category of application error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppErrorKind {
    /// Document or route does not exist
    NotFound,
    /// Stored constraints rejected the input (required, range, unique)
    ValidationFailed,
    /// The request itself is malformed
    BadRequest,
    /// Credentials are missing, invalid or expired
    Unauthorized,
    /// The principal lacks the required role
    Forbidden,
    /// Unexpected failure
    Internal,
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl AppErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailed | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }

    /// Whether errors of this kind are expected and safe to show to clients
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

/// Structured application error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: AppErrorKind,
    /// Client-facing message
    pub message: String,
    /// Expected failure whose message may be shown in production
    pub is_operational: bool,
    /// The resource involved (e.g., "Tour")
    pub entity_type: Option<String>,
    /// The id of the document involved
    pub entity_id: Option<String>,
    /// Internal detail, logged and shown only in development
    pub detail: Option<String>,
}

impl AppError {
    /// Create a new error; operational-ness follows the kind
    pub fn new(operation: ApiOperation, kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            is_operational: kind.is_operational(),
            entity_type: None,
            entity_id: None,
            detail: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            ApiOperation::Get,
            AppErrorKind::NotFound,
            "No document found with that ID",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Unknown route
    pub fn route_not_found(path: &str) -> Self {
        Self::new(
            ApiOperation::Route,
            AppErrorKind::NotFound,
            format!("Can't find {path} route on this server!"),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, AppErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Authorize, AppErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Authorize, AppErrorKind::Forbidden, message)
    }

    /// Create an internal error; the detail is never shown in production
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ApiOperation::Get, AppErrorKind::Internal, GENERIC_ERROR_MESSAGE)
            .with_detail(detail)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Body shown in production: the message for operational errors only
    pub fn production_envelope(&self) -> ErrorEnvelope {
        let message = if self.is_operational {
            self.message.clone()
        } else {
            GENERIC_ERROR_MESSAGE.to_string()
        };
        ErrorEnvelope {
            status: EnvelopeStatus::for_status(self.status_code()),
            message,
            error: None,
            stack: None,
        }
    }

    /// Body shown in development: message plus full error context
    pub fn development_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            status: EnvelopeStatus::for_status(self.status_code()),
            message: self.message.clone(),
            error: Some(serde_json::json!({
                "kind": self.kind.to_string(),
                "code": self.kind.error_code(),
                "statusCode": self.status_code().as_u16(),
                "operation": self.operation.to_string(),
                "isOperational": self.is_operational,
                "entityType": self.entity_type,
                "entityId": self.entity_id,
                "detail": self.detail,
            })),
            stack: Some(self.to_string()),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        if let Some(ref detail) = self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self.production_envelope())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

fn store_operation_to_api_operation(op: StoreOperation) -> ApiOperation {
    match op {
        StoreOperation::Find | StoreOperation::Count => ApiOperation::List,
        StoreOperation::FindById => ApiOperation::Get,
        StoreOperation::Create => ApiOperation::Create,
        StoreOperation::Update => ApiOperation::Update,
        StoreOperation::Delete => ApiOperation::Delete,
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let operation = store_operation_to_api_operation(err.operation);

        let kind = match err.kind {
            StoreErrorKind::NotFound => AppErrorKind::NotFound,
            StoreErrorKind::ValidationFailed | StoreErrorKind::Duplicate => {
                AppErrorKind::ValidationFailed
            }
            StoreErrorKind::InvalidValue => AppErrorKind::BadRequest,
            StoreErrorKind::Unavailable | StoreErrorKind::Internal => AppErrorKind::Internal,
        };

        let mut error = if kind.is_operational() {
            Self::new(operation, kind, err.message.clone())
        } else {
            Self::new(operation, kind, GENERIC_ERROR_MESSAGE).with_detail(err.to_string())
        };
        error.entity_type = err.entity_type;
        error.entity_id = err.entity_id;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_operation_display() {
        assert_eq!(format!("{}", ApiOperation::List), "list");
        assert_eq!(format!("{}", ApiOperation::Get), "get");
        assert_eq!(format!("{}", ApiOperation::Authorize), "authorize");
        assert_eq!(format!("{}", ApiOperation::Route), "route");
    }

    #[test]
    fn test_app_error_kind_status_codes() {
        assert_eq!(AppErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppErrorKind::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppErrorKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_kind_error_code() {
        assert_eq!(AppErrorKind::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(AppErrorKind::ValidationFailed.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_operational_flag_follows_kind() {
        assert!(AppError::bad_request("x").is_operational);
        assert!(AppError::forbidden("x").is_operational);
        assert!(!AppError::internal("lock poisoned").is_operational);
    }

    #[test]
    fn test_route_not_found_message() {
        let error = AppError::route_not_found("/api/v1/nothing");
        assert_eq!(error.message, "Can't find /api/v1/nothing route on this server!");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_production_envelope_hides_internal_details() {
        let error = AppError::internal("database exploded");
        let envelope = error.production_envelope();

        assert_eq!(envelope.status, EnvelopeStatus::Error);
        assert_eq!(envelope.message, GENERIC_ERROR_MESSAGE);
        assert!(envelope.error.is_none());
        assert!(envelope.stack.is_none());
    }

    #[test]
    fn test_production_envelope_shows_operational_message() {
        let envelope = AppError::not_found("Tour", "tour_1").production_envelope();
        assert_eq!(envelope.status, EnvelopeStatus::Fail);
        assert_eq!(envelope.message, "No document found with that ID");
    }

    #[test]
    fn test_development_envelope_includes_context() {
        let error = AppError::internal("database exploded");
        let envelope = error.development_envelope();

        let detail = envelope.error.unwrap();
        assert_eq!(detail["detail"], "database exploded");
        assert_eq!(detail["isOperational"], false);
        assert!(envelope.stack.unwrap().contains("database exploded"));
    }

    #[test]
    fn test_from_store_error_not_found() {
        let error: AppError = StoreError::not_found("Tour", "tour_1").into();
        assert_eq!(error.kind, AppErrorKind::NotFound);
        assert_eq!(error.operation, ApiOperation::Get);
        assert_eq!(error.entity_id.as_deref(), Some("tour_1"));
    }

    #[test]
    fn test_from_store_error_duplicate_is_validation_failure() {
        let error: AppError = StoreError::duplicate(StoreOperation::Create, "x").into();
        assert_eq!(error.kind, AppErrorKind::ValidationFailed);
        assert_eq!(error.operation, ApiOperation::Create);
        assert!(error.is_operational);
    }

    #[test]
    fn test_from_store_error_invalid_value_is_bad_request() {
        let error: AppError =
            StoreError::invalid_value(StoreOperation::Find, "price", "abc").into();
        assert_eq!(error.kind, AppErrorKind::BadRequest);
        assert_eq!(error.message, "Invalid price: abc.");
    }

    #[test]
    fn test_from_store_error_internal_hides_message() {
        let error: AppError = StoreError::internal(StoreOperation::Update, "lock poisoned").into();
        assert_eq!(error.kind, AppErrorKind::Internal);
        assert!(!error.is_operational);
        assert_eq!(error.message, GENERIC_ERROR_MESSAGE);
        assert!(error.detail.unwrap().contains("lock poisoned"));
    }

    #[test]
    fn test_into_response_attaches_error() {
        let response = AppError::forbidden("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let attached = response.extensions().get::<AppError>().unwrap();
        assert_eq!(attached.kind, AppErrorKind::Forbidden);
    }
}
