use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    #[default]
    Internal,
}

/// Error body returned by the backend: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: ErrorCode,
    #[serde(rename = "error")]
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_backend_error_body() {
        let body = serde_json::to_value(ApiError::validation("Missing orgId query param"))
            .expect("json");
        assert_eq!(
            body,
            serde_json::json!({ "error": "Missing orgId query param" })
        );
    }

    #[test]
    fn decodes_without_code() {
        let err: ApiError =
            serde_json::from_str(r#"{"error":"Missing orgId in request body"}"#).expect("json");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "Missing orgId in request body");
    }
}
