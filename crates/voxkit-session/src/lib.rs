//! Streaming session engine for VoxKit.
//!
//! Manages one bidirectional message connection: connect with retry and
//! pluggable request policy, an open-message handshake, a serial receive
//! loop, readiness-gated sends, and a graceful close that waits for the
//! server's ack before giving up. The concrete socket lives behind the
//! `StreamTransport` capability supplied by the embedder.

pub mod session;
pub mod transport;

pub use session::{
    AsyncSession, ConnectionStatus, SessionConfig, SessionListener, SessionProtocol,
};
pub use transport::{ConnectRequest, SocketMessage, StreamTransport, TransportSocket};
