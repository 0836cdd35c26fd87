use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Duration;
use tracing::{debug, trace, warn};

use voxkit_foundation::SessionError;

use crate::transport::{ConnectRequest, SocketMessage, StreamTransport, TransportSocket};

/// Lifecycle of the underlying connection. Only `Open` accepts sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Observer surface for one session.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_open(&self) {}
    async fn on_message(&self, _text: String) {}
    async fn on_error(&self, _error: SessionError) {}
    async fn on_close(&self) {}
}

/// Protocol policy hooks.
///
/// A single connection engine serves multiple protocol variants: the policy
/// decides how requests are built (and rebuilt on retry, typically with a
/// fresh auth token), what handshake messages frame the stream, and which
/// close code ends it.
#[async_trait]
pub trait SessionProtocol: Send + Sync {
    /// Build the first connection request.
    async fn create_request(&self) -> Result<ConnectRequest, SessionError>;

    /// Build the request for retry `attempt` after `error` failed the
    /// previous one. Defaults to reusing the previous request unchanged.
    async fn on_retry_attempt(
        &self,
        _attempt: u32,
        prev: &ConnectRequest,
        _error: &SessionError,
    ) -> Result<ConnectRequest, SessionError> {
        Ok(prev.clone())
    }

    /// How many times a failed connect is retried.
    fn retry_count(&self) -> u32 {
        0
    }

    /// Text message sent immediately after the socket opens.
    fn open_message(&self) -> Option<String> {
        None
    }

    /// Text message announcing end-of-stream before an orderly close.
    fn close_message(&self) -> Option<String> {
        None
    }

    /// Close code used when no close message is configured.
    fn close_code(&self) -> Option<u16> {
        None
    }
}

/// Timing knobs for the graceful-close handshake.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long to wait for the peer to close after the close message.
    pub close_timeout: Duration,
    /// Poll interval while waiting.
    pub close_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            close_timeout: Duration::from_millis(5_000),
            close_poll_interval: Duration::from_millis(50),
        }
    }
}

struct Link {
    socket: Arc<dyn TransportSocket>,
    listener: Arc<dyn SessionListener>,
}

#[derive(Default)]
struct ConnectState {
    connect_called: bool,
}

/// One streaming connection: connect with retry, an open-message handshake,
/// a serial receive loop, readiness-gated sends, and a graceful close that
/// waits for the server's ack.
///
/// A session connects at most once; after it closes, a new instance is
/// required. `connect` and `disconnect` are serialized on an internal mutex,
/// while `send` only reads the connection status so audio forwarding never
/// queues behind a connect in progress.
pub struct AsyncSession {
    transport: Arc<dyn StreamTransport>,
    protocol: Arc<dyn SessionProtocol>,
    config: SessionConfig,
    state: tokio::sync::Mutex<ConnectState>,
    link: Arc<RwLock<Option<Link>>>,
    status: Arc<RwLock<ConnectionStatus>>,
    disconnecting: Arc<AtomicBool>,
}

impl AsyncSession {
    pub fn new(transport: Arc<dyn StreamTransport>, protocol: Arc<dyn SessionProtocol>) -> Self {
        Self::with_config(transport, protocol, SessionConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn StreamTransport>,
        protocol: Arc<dyn SessionProtocol>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            protocol,
            config,
            state: tokio::sync::Mutex::new(ConnectState::default()),
            link: Arc::new(RwLock::new(None)),
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            disconnecting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Connect exactly once for this instance's lifetime.
    ///
    /// A second call blocks on the internal mutex, then returns without side
    /// effects. Failed attempts consult the protocol's retry policy; when
    /// retries are exhausted the listener sees a single `on_error`.
    pub async fn connect(&self, listener: Arc<dyn SessionListener>) {
        let mut state = self.state.lock().await;
        if state.connect_called {
            debug!(target: "session", "connect ignored: already attempted on this instance");
            return;
        }
        state.connect_called = true;
        *self.status.write() = ConnectionStatus::Connecting;

        let mut request = match self.protocol.create_request().await {
            Ok(request) => request,
            Err(err) => {
                *self.status.write() = ConnectionStatus::Disconnected;
                listener
                    .on_error(SessionError::Unknown(err.to_string()))
                    .await;
                return;
            }
        };
        let mut remaining = self.protocol.retry_count();
        let mut attempt = 0u32;

        loop {
            debug!(target: "session", url = %request.url, attempt, "connecting");
            match self.transport.connect(&request).await {
                Ok(socket) => {
                    *self.link.write() = Some(Link {
                        socket: socket.clone(),
                        listener: listener.clone(),
                    });
                    // Receive loop runs detached; it owns its shutdown by
                    // nullifying the link and resetting status on exit.
                    tokio::spawn(Self::receive_loop(
                        socket.clone(),
                        listener.clone(),
                        self.link.clone(),
                        self.status.clone(),
                        self.disconnecting.clone(),
                    ));
                    if let Some(open) = self.protocol.open_message() {
                        if let Err(err) = socket.send_text(&open).await {
                            warn!(target: "session", %err, "failed to send open message");
                        }
                    }
                    *self.status.write() = ConnectionStatus::Open;
                    listener.on_open().await;
                    return;
                }
                Err(err) => {
                    if remaining == 0 {
                        warn!(target: "session", %err, "connect failed, retries exhausted");
                        *self.status.write() = ConnectionStatus::Disconnected;
                        listener
                            .on_error(SessionError::Unknown(err.to_string()))
                            .await;
                        return;
                    }
                    attempt += 1;
                    remaining -= 1;
                    debug!(target: "session", %err, attempt, "connect failed, retrying");
                    request = match self
                        .protocol
                        .on_retry_attempt(attempt, &request, &err)
                        .await
                    {
                        Ok(request) => request,
                        Err(err) => {
                            *self.status.write() = ConnectionStatus::Disconnected;
                            listener
                                .on_error(SessionError::Unknown(err.to_string()))
                                .await;
                            return;
                        }
                    };
                }
            }
        }
    }

    async fn receive_loop(
        socket: Arc<dyn TransportSocket>,
        listener: Arc<dyn SessionListener>,
        link: Arc<RwLock<Option<Link>>>,
        status: Arc<RwLock<ConnectionStatus>>,
        disconnecting: Arc<AtomicBool>,
    ) {
        loop {
            match socket.receive().await {
                Ok(SocketMessage::Text(text)) => listener.on_message(text).await,
                Ok(SocketMessage::Binary(_)) => {
                    trace!(target: "session", "ignoring inbound binary message");
                }
                Ok(SocketMessage::Closed) => break,
                Err(err) => {
                    if disconnecting.load(Ordering::SeqCst) {
                        debug!(target: "session", %err, "read error during disconnect, swallowed");
                    } else {
                        listener
                            .on_error(SessionError::Unknown(err.to_string()))
                            .await;
                    }
                    break;
                }
            }
        }
        listener.on_close().await;
        *link.write() = None;
        *status.write() = ConnectionStatus::Disconnected;
    }

    /// Close the session. Idempotent; a no-op unless currently open.
    ///
    /// With a close message configured, announces end-of-stream and polls for
    /// the server's close up to the configured timeout; past it the socket is
    /// cancelled abnormally and the listener sees `DisconnectTimeout` once.
    /// Without one, the session closes the socket itself.
    pub async fn disconnect(&self) {
        let _state = self.state.lock().await;
        if *self.status.read() != ConnectionStatus::Open {
            debug!(target: "session", "disconnect ignored: not open");
            return;
        }
        *self.status.write() = ConnectionStatus::Closing;
        self.disconnecting.store(true, Ordering::SeqCst);

        let (socket, listener) = match self.link.read().as_ref() {
            Some(l) => (l.socket.clone(), l.listener.clone()),
            None => return,
        };

        match self.protocol.close_message() {
            Some(close_message) => {
                if let Err(err) = socket.send_text(&close_message).await {
                    warn!(target: "session", %err, "failed to send close message");
                }
                let mut waited = Duration::ZERO;
                while waited < self.config.close_timeout {
                    if socket.is_closed() {
                        debug!(target: "session", ?waited, "peer closed within the window");
                        return;
                    }
                    tokio::time::sleep(self.config.close_poll_interval).await;
                    waited += self.config.close_poll_interval;
                }
                warn!(target: "session", "peer did not close in time, aborting socket");
                listener.on_error(SessionError::DisconnectTimeout).await;
                socket.abort().await;
            }
            None => {
                socket.close(self.protocol.close_code()).await;
            }
        }
    }

    /// Send a text message. Dropped (returning `false`) unless open.
    pub async fn send_text(&self, text: &str) -> bool {
        let Some(socket) = self.open_socket() else {
            trace!(target: "session", "dropping text send: not open");
            return false;
        };
        socket.send_text(text).await.is_ok()
    }

    /// Send a binary message. Dropped (returning `false`) unless open.
    /// No internal buffering: a frame either goes out now or not at all.
    pub async fn send_binary(&self, bytes: &[u8]) -> bool {
        let Some(socket) = self.open_socket() else {
            trace!(target: "session", "dropping binary send: not open");
            return false;
        };
        socket.send_binary(bytes).await.is_ok()
    }

    fn open_socket(&self) -> Option<Arc<dyn TransportSocket>> {
        if *self.status.read() != ConnectionStatus::Open {
            return None;
        }
        self.link.read().as_ref().map(|l| l.socket.clone())
    }
}
