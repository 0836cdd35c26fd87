use async_trait::async_trait;
use std::sync::Arc;

use voxkit_foundation::SessionError;

/// Everything needed to open one connection attempt.
///
/// The protocol layer builds these; a retry may rebuild them (typically to
/// refresh an auth header) before the next attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ConnectRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// One inbound unit from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    Text(String),
    Binary(Vec<u8>),
    /// The peer completed an orderly close.
    Closed,
}

/// Capability that opens message sockets.
///
/// The embedder supplies the concrete transport (a WebSocket stack on
/// device); the session engine only sees these two traits.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn TransportSocket>, SessionError>;
}

/// An established bidirectional message socket.
#[async_trait]
pub trait TransportSocket: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), SessionError>;

    async fn send_binary(&self, bytes: &[u8]) -> Result<(), SessionError>;

    /// Next inbound message. Resolves to `Closed` once the peer has closed;
    /// errors on abnormal termination.
    async fn receive(&self) -> Result<SocketMessage, SessionError>;

    /// Begin an orderly close with the given code.
    async fn close(&self, code: Option<u16>);

    /// Tear the socket down abnormally.
    async fn abort(&self);

    /// Whether the socket has fully closed (orderly or not).
    fn is_closed(&self) -> bool;
}
