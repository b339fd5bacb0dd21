//! HTTP utilities for ARM REST API calls

use crate::resource::ProviderError;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human message out of an ARM error body:
/// `{"error": {"code": "...", "message": "..."}}`
fn arm_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Map a non-success ARM response to the typed provider error
pub fn map_error(status: StatusCode, body: &str) -> ProviderError {
    let message = arm_error_message(body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Auth(message),
        StatusCode::FORBIDDEN => ProviderError::AccessDenied(message),
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::Transient(message),
        s if s.is_server_error() => ProviderError::Transient(message),
        _ => ProviderError::Api(message),
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("taz/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a GET request to an ARM endpoint
    pub async fn get(&self, url: &str, token: &str) -> Result<Value, ProviderError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("Failed to send request: {}", e)))?;

        Self::read_json(response).await
    }

    /// Make a PUT request to an ARM endpoint
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<Value, ProviderError> {
        tracing::debug!("PUT {}", url);

        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("Failed to send request: {}", e)))?;

        Self::read_json(response).await
    }

    /// Make a DELETE request to an ARM endpoint
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value, ProviderError> {
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("Failed to send request: {}", e)))?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ProviderError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("ARM error: {} - {}", status, sanitize_for_log(&body));
            return Err(map_error(status, &body));
        }

        // DELETE and async-accepted operations return empty bodies
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Api(format!("Failed to parse response JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping_distinguishes_denied_from_missing() {
        let denied = map_error(
            StatusCode::FORBIDDEN,
            r#"{"error": {"code": "AuthorizationFailed", "message": "no role"}}"#,
        );
        assert_eq!(denied, ProviderError::AccessDenied("no role".to_string()));

        let missing = map_error(
            StatusCode::NOT_FOUND,
            r#"{"error": {"code": "ResourceNotFound", "message": "gone"}}"#,
        );
        assert_eq!(missing, ProviderError::NotFound("gone".to_string()));
    }

    #[test]
    fn test_server_errors_and_throttling_are_transient() {
        assert!(matches!(
            map_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            map_error(StatusCode::TOO_MANY_REQUESTS, "{}"),
            ProviderError::Transient(_)
        ));
    }

    #[test]
    fn test_unparseable_body_falls_back_to_status() {
        let err = map_error(StatusCode::BAD_REQUEST, "<html>nope</html>");
        assert_eq!(err, ProviderError::Api("HTTP 400".to_string()));
    }

    #[test]
    fn test_sanitize_truncates_and_strips() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.len() < 300);

        assert_eq!(sanitize_for_log("ok\u{7}body"), "okbody");
    }
}
