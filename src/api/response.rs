use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ActionError, FieldErrors};

/// Error half of the action envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Uniform result of every server-side procedure:
/// `{ success, data?, error?: { message, details? }, status? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl<T> ActionResponse<T> {
    pub fn with_status(data: T, status: StatusCode) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: Some(status.as_u16()),
        }
    }

    pub fn failure(err: ActionError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                details: err.details().cloned(),
                code: Some(err.error_code().to_string()),
            }),
            status: Some(err.status_code().as_u16()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::OK)
    }

    /// The error code, when this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.code.as_deref())
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": { "message": "Failed to serialize response data" },
                        "status": 500
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Paginated read envelope: `{ items, isNext, total? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub is_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, is_next: bool, total: Option<i64>) -> Self {
        Self { items, is_next, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_carry_message_details_and_status() {
        let resp = ActionResponse::<()>::failure(ActionError::invalid_field("content", "Too short"));
        let body = serde_json::to_value(&resp).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"]["message"], "Too short");
        assert_eq!(body["error"]["details"]["content"][0], "Too short");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn pages_use_camel_case_keys() {
        let page = Page::new(vec![1, 2], true, Some(7));
        let body = serde_json::to_value(&page).unwrap();
        assert_eq!(body["isNext"], true);
        assert_eq!(body["total"], 7);

        let body = serde_json::to_value(Page::<u8>::new(vec![], false, None)).unwrap();
        assert!(body.get("total").is_none());
    }
}
