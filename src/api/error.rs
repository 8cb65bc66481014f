use reqwest::StatusCode;
use thiserror::Error;

pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to get response";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited: {message}")]
    RateLimited { message: String },
    #[error("quota exceeded: {message}")]
    QuotaExceeded { message: String },
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("no response body")]
    MissingBody,
    #[error("a response is already streaming")]
    Busy,
    #[error("turn cancelled")]
    Cancelled,
}

impl ChatError {
    /// Maps a non-success status and its optional `error` body field.
    pub fn from_status(status: StatusCode, server_message: Option<String>) -> Self {
        let message = server_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
        match status.as_u16() {
            429 => ChatError::RateLimited { message },
            402 => ChatError::QuotaExceeded { message },
            status => ChatError::Status { status, message },
        }
    }

    /// Short text for the user-visible notification channel.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Configuration(detail) => format!("Chat is not configured: {detail}"),
            ChatError::Network(_) => "Could not reach the assistant. Please try again.".to_string(),
            ChatError::RateLimited { message }
            | ChatError::QuotaExceeded { message }
            | ChatError::Status { message, .. } => message.clone(),
            ChatError::MissingBody => "No response body".to_string(),
            ChatError::Busy => "Please wait for the current reply to finish.".to_string(),
            ChatError::Cancelled => "Reply cancelled.".to_string(),
        }
    }

    /// Whether this failure rolls back the optimistic user turn.
    pub fn rolls_back_turn(&self) -> bool {
        !matches!(self, ChatError::Busy | ChatError::Cancelled)
    }
}

pub(crate) fn map_reqwest_error(error: reqwest::Error, request_url: &str) -> ChatError {
    if error.is_connect() {
        return ChatError::Network(format!("cannot reach chat endpoint '{request_url}': {error}"));
    }
    if error.is_timeout() {
        return ChatError::Network(format!("request to '{request_url}' timed out: {error}"));
    }
    ChatError::Network(format!("request to '{request_url}' failed: {error}"))
}

/// A data line that never became valid JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dropped malformed data line after {retries} retries ({reason}): {line}")]
pub struct DecodeError {
    pub line: String,
    pub retries: u32,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_uses_server_message() {
        let err = ChatError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some("Rate limit exceeded. Please try again in a moment.".to_string()),
        );
        assert_eq!(
            err,
            ChatError::RateLimited {
                message: "Rate limit exceeded. Please try again in a moment.".to_string()
            }
        );

        let err = ChatError::from_status(StatusCode::PAYMENT_REQUIRED, Some("Pay up".into()));
        assert!(matches!(err, ChatError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_status_mapping_falls_back_to_generic_message() {
        let err = ChatError::from_status(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(err.user_message(), FALLBACK_ERROR_MESSAGE);

        let err = ChatError::from_status(StatusCode::BAD_GATEWAY, Some("   ".into()));
        assert_eq!(
            err,
            ChatError::Status {
                status: 502,
                message: FALLBACK_ERROR_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn test_busy_and_cancelled_do_not_roll_back() {
        assert!(!ChatError::Busy.rolls_back_turn());
        assert!(!ChatError::Cancelled.rolls_back_turn());
        assert!(ChatError::MissingBody.rolls_back_turn());
        assert!(ChatError::Network("x".into()).rolls_back_turn());
    }
}
