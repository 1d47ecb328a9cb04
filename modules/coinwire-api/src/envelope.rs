//! Wire envelope: every endpoint answers HTTP 200; failures ride inside
//! the body as `success = false` plus an error code.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Pager<T: Serialize> {
    pub total: u64,
    pub page: usize,
    pub size: usize,
    pub list: Vec<T>,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse> {
    Json(ApiResponse {
        success: true,
        data: Some(serde_json::to_value(data).expect("response data serializes")),
        error: None,
        message: "ok".to_string(),
    })
}

pub fn pager<T: Serialize>(total: u64, page: usize, size: usize, list: Vec<T>) -> Json<ApiResponse> {
    ok(Pager {
        total,
        page,
        size,
        list,
    })
}

pub fn error(code: u16, message: &str) -> Json<ApiResponse> {
    Json(ApiResponse {
        success: false,
        data: None,
        error: Some(ApiError {
            code,
            message: message.to_string(),
        }),
        message: "error".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_carries_data() {
        let Json(resp) = ok(vec!["coindesk", "jinse"]);
        assert!(resp.success);
        assert!(resp.error.is_none());
        assert_eq!(
            resp.data.unwrap(),
            serde_json::json!(["coindesk", "jinse"])
        );
    }

    #[test]
    fn error_envelope_carries_code_not_data() {
        let Json(resp) = error(404, "not found");
        assert!(!resp.success);
        assert!(resp.data.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, 404);
        assert_eq!(err.message, "not found");
    }

    #[test]
    fn pager_shape_matches_the_wire_contract() {
        let Json(resp) = pager(42, 2, 15, vec!["x"]);
        let value = resp.data.unwrap();
        assert_eq!(value["total"], 42);
        assert_eq!(value["page"], 2);
        assert_eq!(value["size"], 15);
        assert_eq!(value["list"][0], "x");
    }
}
