use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Envelope shared by every response, successful or not.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self::with_status(StatusCode::OK, message, data, meta)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data, Some(Meta::empty()))
    }

    pub fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: T,
        meta: Option<Meta>,
    ) -> Self {
        Self {
            success: status.is_success(),
            status_code: status.as_u16(),
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

/// Answers with the status carried in the envelope.
impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_camel_case_status_code() {
        let body = ApiResponse::success("OK", serde_json::json!({ "a": 1 }), Some(Meta::new(2, 10, 31)));
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["meta"]["page"], 2);
        assert_eq!(json["meta"]["total"], 31);
        assert!(json.get("status_code").is_none());
    }

    #[test]
    fn created_envelope_reports_201() {
        let body = ApiResponse::created("Created", 5);
        assert!(body.success);
        assert_eq!(body.status_code, 201);
        assert_eq!(body.into_response().status(), StatusCode::CREATED);
    }
}
