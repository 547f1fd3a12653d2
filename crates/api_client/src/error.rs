use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Rejected before sending, or refused by the server as invalid (400/422).
    Validation(String),
    /// The request could not be sent, the connection dropped, or it timed out.
    Network(String),
    Server { status: u16, message: String },
    Decode(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(message)
            | ApiError::Network(message)
            | ApiError::Decode(message) => message,
            ApiError::Server { message, .. } => message,
        }
    }

    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let message = error_message(status, body);
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(message) => write!(f, "{}", message),
            ApiError::Network(message) => write!(f, "network error: {}", message),
            ApiError::Server { status, message } => {
                write!(f, "server error ({}): {}", status, message)
            }
            ApiError::Decode(message) => write!(f, "invalid response: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::Validation(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::from_status(status, &[])
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(payload) = serde_json::from_slice::<ErrorPayload>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            if !message.trim().is_empty() {
                return message;
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }
    status
        .canonical_reason()
        .map(|reason| reason.to_string())
        .unwrap_or_else(|| format!("http {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_json_error_field() {
        let err = ApiError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"error":"database unavailable"}"#,
        );
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                message: "database unavailable".to_string()
            }
        );
    }

    #[test]
    fn bad_request_is_a_validation_error() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, br#"{"message":"Title taken"}"#);
        assert_eq!(err, ApiError::Validation("Title taken".to_string()));
    }

    #[test]
    fn falls_back_to_body_then_reason() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(err.message(), "upstream down");
        let err = ApiError::from_status(StatusCode::NOT_FOUND, b"");
        assert_eq!(err.message(), "Not Found");
    }
}
