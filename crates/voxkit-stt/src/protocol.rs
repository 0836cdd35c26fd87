use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use voxkit_foundation::SessionError;
use voxkit_session::{ConnectRequest, SessionProtocol};

use crate::wire::{end_of_stream_message, ClientConfiguration};

/// Supplies the bearer token for the transcription endpoint.
///
/// `refresh` is consulted on connect retries; the default just fetches a new
/// token, which is what most token caches want anyway.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, SessionError>;

    async fn refresh(&self) -> Result<String, SessionError> {
        self.token().await
    }
}

/// Session policy for the streaming transcription protocol: bearer-token
/// requests refreshed on retry, a `ClientConfiguration` handshake, and an
/// `EndOfStream` close announcement.
pub struct TranscribeProtocol {
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
    configuration: ClientConfiguration,
    retry_count: u32,
}

impl TranscribeProtocol {
    pub fn new(
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        configuration: ClientConfiguration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            tokens,
            configuration,
            retry_count: 1,
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    fn request_with_token(&self, token: &str) -> ConnectRequest {
        ConnectRequest::new(self.endpoint.clone())
            .with_header("Authorization", format!("Bearer {token}"))
    }
}

#[async_trait]
impl SessionProtocol for TranscribeProtocol {
    async fn create_request(&self) -> Result<ConnectRequest, SessionError> {
        let token = self.tokens.token().await?;
        Ok(self.request_with_token(&token))
    }

    async fn on_retry_attempt(
        &self,
        attempt: u32,
        _prev: &ConnectRequest,
        error: &SessionError,
    ) -> Result<ConnectRequest, SessionError> {
        debug!(target: "session", attempt, %error, "refreshing token for retry");
        let token = self.tokens.refresh().await?;
        Ok(self.request_with_token(&token))
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn open_message(&self) -> Option<String> {
        serde_json::to_string(&self.configuration).ok()
    }

    fn close_message(&self) -> Option<String> {
        Some(end_of_stream_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingTokens {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl TokenProvider for CountingTokens {
        async fn token(&self) -> Result<String, SessionError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(format!("tok-{n}"))
        }
    }

    #[tokio::test]
    async fn request_carries_a_bearer_token() {
        let protocol = TranscribeProtocol::new(
            "wss://transcribe.test/v1/stream",
            Arc::new(CountingTokens::default()),
            ClientConfiguration::new(),
        );
        let request = protocol.create_request().await.unwrap();
        assert_eq!(request.url, "wss://transcribe.test/v1/stream");
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer tok-0".to_string())]
        );
    }

    #[tokio::test]
    async fn retry_refreshes_the_token() {
        let protocol = TranscribeProtocol::new(
            "wss://transcribe.test/v1/stream",
            Arc::new(CountingTokens::default()),
            ClientConfiguration::new(),
        );
        let first = protocol.create_request().await.unwrap();
        let retried = protocol
            .on_retry_attempt(1, &first, &SessionError::FailedToConnect("401".into()))
            .await
            .unwrap();
        assert_eq!(retried.headers[0].1, "Bearer tok-1");
    }

    #[tokio::test]
    async fn handshake_messages_are_configured() {
        let protocol = TranscribeProtocol::new(
            "wss://transcribe.test/v1/stream",
            Arc::new(CountingTokens::default()),
            ClientConfiguration::new().with_model("dictation-v2"),
        );
        let open = protocol.open_message().unwrap();
        assert!(open.contains("ClientConfiguration"));
        assert!(open.contains("dictation-v2"));
        assert_eq!(protocol.close_message().unwrap(), r#"{"type":"EndOfStream"}"#);
    }
}
