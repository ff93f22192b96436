use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Wrapper for API responses that adds the success envelope.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    data: Option<T>,
    message: Option<&'static str>,
    pagination: Option<PageInfo>,
    status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Plain 200 with a data payload.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            pagination: None,
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created with a confirmation message.
    pub fn created(data: T, message: &'static str) -> Self {
        Self {
            data: Some(data),
            message: Some(message),
            pagination: None,
            status_code: StatusCode::CREATED,
        }
    }

    /// 200 with a confirmation message.
    pub fn with_message(data: T, message: &'static str) -> Self {
        Self {
            message: Some(message),
            ..Self::success(data)
        }
    }

    /// 200 list payload with its pagination block.
    pub fn with_pagination(data: T, pagination: PageInfo) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::success(data)
        }
    }
}

impl ApiResponse<()> {
    /// 200 with a confirmation message and no data payload.
    pub fn message_only(message: &'static str) -> Self {
        Self {
            data: None,
            message: Some(message),
            pagination: None,
            status_code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));

        if let Some(message) = self.message {
            envelope.insert("message".to_string(), Value::String(message.to_string()));
        }

        if let Some(data) = &self.data {
            match serde_json::to_value(data) {
                Ok(value) => {
                    envelope.insert("data".to_string(), value);
                }
                Err(err) => {
                    tracing::error!("Failed to serialize response data: {}", err);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "message": "Failed to serialize response data"
                        })),
                    )
                        .into_response();
                }
            }
        }

        if let Some(pagination) = self.pagination {
            match serde_json::to_value(pagination) {
                Ok(value) => {
                    envelope.insert("pagination".to_string(), value);
                }
                Err(err) => {
                    tracing::error!("Failed to serialize pagination: {}", err);
                }
            }
        }

        (self.status_code, Json(Value::Object(envelope))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
