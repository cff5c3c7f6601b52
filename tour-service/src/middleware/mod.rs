//! Middleware for authentication, error rendering and request tracking

pub mod auth;
pub mod error_boundary;
pub mod request_tracking;

pub use auth::{
    Access, Authentication, Claims, JwtAuth, Principal, PrincipalStore, RejectionReason, Role,
};
pub use error_boundary::{error_boundary, panic_response};
pub use request_tracking::{
    sensitive_headers_layer, RequestTracking, REQUEST_ID_HEADER, SENSITIVE_HEADERS,
};
