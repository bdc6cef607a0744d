//! Helpers shared by the HTTP gateways.

use moot_core::error::MootError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Error bodies seen from the two services: `{"detail": ...}` from the
/// analysis backend, `{"message": ...}` / `{"error": {"message": ...}}` from
/// the persona API.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detail { detail: String },
    Message { message: String },
    Nested { error: NestedError },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

pub(crate) fn map_http_error(status: StatusCode, body: String) -> MootError {
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody::Detail { detail }) => detail,
        Ok(ErrorBody::Message { message }) => message,
        Ok(ErrorBody::Nested { error }) => error.message,
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body,
    };

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    MootError::gateway(Some(status.as_u16()), message, is_retryable)
}

/// Turns a non-success status into a gateway error and parses the JSON body
/// otherwise.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, MootError> {
    let status = response.status();
    if !status.is_success() {
        let body_text = response
            .text()
            .await
            .unwrap_or_else(|_| format!("Failed to read {what} error body"));
        return Err(map_http_error(status, body_text));
    }

    response.json::<T>().await.map_err(|err| MootError::Serialization {
        format: "JSON".to_string(),
        message: format!("Failed to parse {what} response: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastapi_detail_is_extracted() {
        let err = map_http_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail": "cv2 exploded"}"#.to_string(),
        );
        match err {
            MootError::Gateway {
                status_code,
                message,
                is_retryable,
            } => {
                assert_eq!(status_code, Some(500));
                assert_eq!(message, "cv2 exploded");
                assert!(is_retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized_is_not_retryable() {
        let err = map_http_error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_nested_and_empty_bodies() {
        let nested = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "avatarId is invalid"}}"#.to_string(),
        );
        assert!(nested.to_string().contains("avatarId is invalid"));

        let empty = map_http_error(StatusCode::BAD_GATEWAY, String::new());
        assert!(empty.to_string().contains("502"));
    }
}
