use crate::error::AppError;
use crate::transport::http::types::json_422;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value as JsonValue;

/// Unwraps a JSON body extractor, turning a rejection into a 422.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>, expected: &str) -> Result<T, AppError> {
    match body {
        Ok(Json(v)) => Ok(v),
        Err(e) => Err(json_422(e, expected)),
    }
}

/// Parses an optional raw body. An empty body reads as `{}`.
pub fn optional_json_body(bytes: &Bytes) -> Result<JsonValue, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(Default::default()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::InvalidBody(format!("Invalid JSON body: {}", e)))
}
