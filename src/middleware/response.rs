use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::error::ApiError;

/// JSON response with an explicit status. Bodies are sent bare, with no
/// envelope around them.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn ok(data: T) -> Self {
        Self::with_status(data, StatusCode::OK)
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data: Some(data),
            status_code,
        }
    }

    /// 201 Created, used for successful replacements
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self {
            data: None,
            status_code: StatusCode::NO_CONTENT,
        }
    }

    /// A lookup that matched nothing answers 204 with an empty body.
    pub fn found(data: Option<T>) -> Self {
        match data {
            Some(data) => Self::ok(data),
            None => Self::no_content(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let Some(data) = self.data else {
            return self.status_code.into_response();
        };
        if self.status_code == StatusCode::NO_CONTENT {
            return self.status_code.into_response();
        }

        match serde_json::to_value(&data) {
            Ok(value) => (self.status_code, Json(value)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to serialize response data" })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// `Json` extractor whose rejections use the API error body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!("Rejected JSON body: {}", rejection.body_text());
    ApiError::bad_request(format!("malformed request body: {}", rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lookup_is_no_content() {
        let response = ApiResponse::<u32>::found(None).into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = ApiResponse::found(Some(7)).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn created_keeps_status() {
        let response = ApiResponse::created(json!({ "id": 1 })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
