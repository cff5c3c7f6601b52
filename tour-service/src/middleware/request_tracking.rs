//! Request id generation and propagation
//!
//! Each request gets a TypeID request id (`req_01h455vb4pex5vsknk084sn02q`)
//! unless the client already sent one; the id is echoed on the response and
//! recorded on the trace span. Credential headers are marked sensitive so
//! they never reach the logs.

use axum::http::{header, HeaderName};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::error::{Error, Result};
use crate::ids::MakeTypedRequestId;

/// Default request id header
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers masked in logs
pub const SENSITIVE_HEADERS: [HeaderName; 3] =
    [header::AUTHORIZATION, header::COOKIE, header::SET_COOKIE];

/// Request id layers for a configured header name
#[derive(Debug, Clone)]
pub struct RequestTracking {
    header: HeaderName,
}

impl RequestTracking {
    /// Fails when `header` is not a valid header name
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::try_from(header)
            .map_err(|err| Error::Internal(format!("invalid request id header '{header}': {err}")))?;
        Ok(Self { header })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Assign a typed request id when the request has none
    pub fn set_layer(&self) -> SetRequestIdLayer<MakeTypedRequestId> {
        SetRequestIdLayer::new(self.header.clone(), MakeTypedRequestId)
    }

    /// Copy the request id onto the response
    pub fn propagate_layer(&self) -> PropagateRequestIdLayer {
        PropagateRequestIdLayer::new(self.header.clone())
    }
}

impl Default for RequestTracking {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static(REQUEST_ID_HEADER),
        }
    }
}

/// Mark credential headers as sensitive
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(SENSITIVE_HEADERS)
}
