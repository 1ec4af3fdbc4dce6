use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the human-readable message out of an error body.
    ///
    /// The backend answers with `{"detail": ...}`, `{"error": ...}` or a map of
    /// field name to a list of messages. Anything else falls back to the raw body.
    pub fn server_message(body: &str) -> String {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::truncate_body(body.trim());
        };

        match value {
            Value::Object(map) => {
                for key in ["detail", "error"] {
                    if let Some(message) = map.get(key).and_then(flatten_message) {
                        return message;
                    }
                }
                let fields: Vec<String> = map
                    .iter()
                    .filter_map(|(field, v)| {
                        let message = flatten_message(v)?;
                        Some(if field == "non_field_errors" {
                            message
                        } else {
                            format!("{}: {}", field, message)
                        })
                    })
                    .collect();
                if fields.is_empty() {
                    Self::truncate_body(body.trim())
                } else {
                    fields.join("; ")
                }
            }
            other => flatten_message(&other).unwrap_or_else(|| Self::truncate_body(body.trim())),
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 => ApiError::Validation(Self::server_message(body)),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(Self::server_message(body)),
            404 => ApiError::NotFound(Self::server_message(body)),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(Self::server_message(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// Errors that end the session: the user has to log in again.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ApiError::Auth(_) | ApiError::MissingRefreshToken | ApiError::Unauthorized
        )
    }
}

fn flatten_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_message).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message_is_surfaced() {
        let body = r#"{"detail": "No active account found with the given credentials"}"#;
        assert_eq!(
            ApiError::server_message(body),
            "No active account found with the given credentials"
        );
    }

    #[test]
    fn test_field_errors_are_flattened() {
        let body = r#"{"username": ["A user with that username already exists."]}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            err,
            ApiError::Validation("username: A user with that username already exists.".to_string())
        );
    }

    #[test]
    fn test_non_field_errors_have_no_prefix() {
        let body = r#"{"non_field_errors": ["No account with this email"]}"#;
        assert_eq!(ApiError::server_message(body), "No account with this email");
    }

    #[test]
    fn test_plain_text_body_falls_back_to_raw() {
        assert_eq!(ApiError::server_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized);
        assert_eq!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited);
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "{\"error\": \"smtp down\"}"),
            ApiError::ServerError(ref m) if m == "smtp down"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "short"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let message = ApiError::server_message(&body);
        assert!(message.contains("truncated"));
        assert!(message.len() < body.len() + 50);
    }

    #[test]
    fn test_is_auth_error() {
        assert!(ApiError::Auth("expired".into()).is_auth_error());
        assert!(ApiError::MissingRefreshToken.is_auth_error());
        assert!(!ApiError::Network("down".into()).is_auth_error());
        assert!(!ApiError::Validation("bad".into()).is_auth_error());
    }
}
