use super::error::{map_reqwest_error, ChatError};
use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::{ChatRequest, ErrorBody};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// Opens the response byte stream for one chat turn.
pub trait ChatTransport: Send + Sync {
    fn open_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ByteStream, ChatError>>;
}

#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    chat_url: String,
    publishable_key: Option<String>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("chat_url", &self.chat_url)
            .field("publishable_key", &self.publishable_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        config
            .validate()
            .map_err(|error| ChatError::Configuration(error.to_string()))?;
        let chat_url = config
            .chat_url
            .clone()
            .ok_or_else(|| ChatError::Configuration("chat endpoint is not set".to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            chat_url,
            publishable_key: config.publishable_key.clone(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub async fn create_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let request_url = self.chat_url.clone();
        let mut builder = self
            .http
            .post(&request_url)
            .header(CONTENT_TYPE, "application/json")
            .json(request);

        if let Some(key) = &self.publishable_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, request);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| map_reqwest_error(error, &request_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                url = %request_url,
                "chat endpoint returned an error status"
            );
            return Err(ChatError::from_status(status, parsed.error));
        }
        if status == StatusCode::NO_CONTENT {
            return Err(ChatError::MissingBody);
        }

        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_reqwest_error(error, &request_url)));
        Ok(Box::pin(stream))
    }
}

impl ChatTransport for ChatClient {
    fn open_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ByteStream, ChatError>> {
        Box::pin(self.create_stream(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_missing_endpoint() {
        let err = ChatClient::new(&Config::default()).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn test_new_rejects_remote_endpoint_without_key() {
        let config = Config {
            chat_url: Some("https://demo.supabase.co/functions/v1/medical-chat".to_string()),
            ..Config::default()
        };
        let err = ChatClient::new(&config).unwrap_err();
        match err {
            ChatError::Configuration(detail) => {
                assert!(detail.contains("MEDCHAT_PUBLISHABLE_KEY"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let config = Config {
            chat_url: Some("https://demo.supabase.co/functions/v1/medical-chat".to_string()),
            publishable_key: Some("pk_secret".to_string()),
            ..Config::default()
        };
        let client = ChatClient::new(&config).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("pk_secret"));
        assert_eq!(
            client.chat_url(),
            "https://demo.supabase.co/functions/v1/medical-chat"
        );
    }
}
