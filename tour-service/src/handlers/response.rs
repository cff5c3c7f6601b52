//! Response envelope for resource handlers
//!
//! Every JSON response shares one shape:
//!
//! - list: `{"status": "success", "results": n, "data": {"tours": [...]}}`
//! - item: `{"status": "success", "data": {"tour": {...}}}`
//! - error: `{"status": "fail" | "error", "message": "..."}` plus `error` and
//!   `stack` in development
//!
//! Deletes answer `204 No Content` with an empty body.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Outcome marker at the top of every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    /// Client error (4xx)
    Fail,
    /// Server error (5xx)
    Error,
}

impl EnvelopeStatus {
    /// Status for an HTTP status code
    ///
    /// ```rust
    /// use axum::http::StatusCode;
    /// use tour_service::handlers::EnvelopeStatus;
    ///
    /// assert_eq!(EnvelopeStatus::for_status(StatusCode::OK), EnvelopeStatus::Success);
    /// assert_eq!(EnvelopeStatus::for_status(StatusCode::NOT_FOUND), EnvelopeStatus::Fail);
    /// assert_eq!(EnvelopeStatus::for_status(StatusCode::BAD_GATEWAY), EnvelopeStatus::Error);
    /// ```
    #[must_use]
    pub fn for_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::Error
        } else if status.is_client_error() {
            Self::Fail
        } else {
            Self::Success
        }
    }
}

/// Failure body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: EnvelopeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Serialize)]
struct SuccessEnvelope<T> {
    status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    data: HashMap<&'static str, T>,
}

/// Single document response keyed by the resource's singular name
#[derive(Debug, Clone)]
pub struct ItemResponse<T> {
    pub key: &'static str,
    pub data: T,
    pub status_code: StatusCode,
}

impl<T> ItemResponse<T> {
    /// `200 OK` response
    pub fn new(key: &'static str, data: T) -> Self {
        Self {
            key,
            data,
            status_code: StatusCode::OK,
        }
    }

    /// `201 Created` response
    pub fn created(key: &'static str, data: T) -> Self {
        Self {
            key,
            data,
            status_code: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ItemResponse<T> {
    fn into_response(self) -> Response {
        let envelope = SuccessEnvelope {
            status: EnvelopeStatus::Success,
            results: None,
            data: HashMap::from([(self.key, self.data)]),
        };
        (self.status_code, Json(envelope)).into_response()
    }
}

/// Document list response keyed by the resource's plural name
#[derive(Debug, Clone)]
pub struct ListResponse<T> {
    pub key: &'static str,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(key: &'static str, data: Vec<T>) -> Self {
        Self { key, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        let envelope = SuccessEnvelope {
            status: EnvelopeStatus::Success,
            results: Some(self.data.len()),
            data: HashMap::from([(self.key, self.data)]),
        };
        (StatusCode::OK, Json(envelope)).into_response()
    }
}

/// `204 No Content` with an empty body
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_item_response_envelope() {
        let response = ItemResponse::new("tour", json!({"id": "tour_1"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "data": {"tour": {"id": "tour_1"}}})
        );
    }

    #[tokio::test]
    async fn test_created_response_status() {
        let response = ItemResponse::created("review", json!({})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_list_response_envelope() {
        let response = ListResponse::new("tours", vec![json!({"id": "a"}), json!({"id": "b"})])
            .into_response();
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "results": 2, "data": {"tours": [{"id": "a"}, {"id": "b"}]}})
        );
    }

    #[tokio::test]
    async fn test_empty_list_response() {
        let response = ListResponse::<Value>::new("reviews", vec![]).into_response();
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "results": 0, "data": {"reviews": []}})
        );
    }

    #[tokio::test]
    async fn test_no_content_has_empty_body() {
        let response = NoContent.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_error_envelope_skips_empty_fields() {
        let envelope = ErrorEnvelope {
            status: EnvelopeStatus::Fail,
            message: "No document found with that ID".into(),
            error: None,
            stack: None,
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": "fail", "message": "No document found with that ID"})
        );
    }
}
