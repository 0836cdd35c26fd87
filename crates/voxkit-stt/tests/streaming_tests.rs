//! End-to-end streaming transcription tests.
//!
//! A recorder with a mock audio source drives the streaming plugin against a
//! scripted in-memory transport: full capture cycles, frame forwarding,
//! decode failures that force-stop the recorder, and connect failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use voxkit_audio::{AudioFrame, MockAudioSource, RecordingConfig};
use voxkit_foundation::{SessionError, VoxKitError};
use voxkit_recorder::{RecorderCore, RecorderState};
use voxkit_session::{ConnectRequest, SocketMessage, StreamTransport, TransportSocket};
use voxkit_stt::{
    end_of_stream_message, ClientConfiguration, ProtocolSessionFactory, StreamEvent,
    StreamingTranscriptionPlugin, TokenProvider, TranscribeProtocol,
};

type Inbound = Result<SocketMessage, SessionError>;

struct MockSocket {
    incoming_tx: mpsc::UnboundedSender<Inbound>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
    sent_texts: Mutex<Vec<String>>,
    sent_binaries: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    ack_close: bool,
}

impl MockSocket {
    fn new() -> Arc<Self> {
        Self::build(true)
    }

    /// A peer that never answers the end-of-stream announcement.
    fn silent() -> Arc<Self> {
        Self::build(false)
    }

    fn build(ack_close: bool) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            incoming_tx,
            incoming: tokio::sync::Mutex::new(incoming_rx),
            sent_texts: Mutex::new(Vec::new()),
            sent_binaries: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            ack_close,
        })
    }

    fn push_text(&self, text: &str) {
        let _ = self
            .incoming_tx
            .send(Ok(SocketMessage::Text(text.to_string())));
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent_texts.lock().clone()
    }

    fn sent_binaries(&self) -> Vec<Vec<u8>> {
        self.sent_binaries.lock().clone()
    }
}

#[async_trait]
impl TransportSocket for MockSocket {
    async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        self.sent_texts.lock().push(text.to_string());
        // The scripted peer acks end-of-stream promptly unless silenced.
        if self.ack_close && text == end_of_stream_message() {
            self.closed.store(true, Ordering::SeqCst);
            let _ = self.incoming_tx.send(Ok(SocketMessage::Closed));
        }
        Ok(())
    }

    async fn send_binary(&self, bytes: &[u8]) -> Result<(), SessionError> {
        self.sent_binaries.lock().push(bytes.to_vec());
        Ok(())
    }

    async fn receive(&self) -> Result<SocketMessage, SessionError> {
        let mut incoming = self.incoming.lock().await;
        match incoming.recv().await {
            Some(inbound) => inbound,
            None => Ok(SocketMessage::Closed),
        }
    }

    async fn close(&self, _code: Option<u16>) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.incoming_tx.send(Ok(SocketMessage::Closed));
    }

    async fn abort(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.incoming_tx.send(Ok(SocketMessage::Closed));
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockTransport {
    script: Mutex<VecDeque<Result<Arc<MockSocket>, SessionError>>>,
    requests: Mutex<Vec<ConnectRequest>>,
}

impl MockTransport {
    fn scripted(script: Vec<Result<Arc<MockSocket>, SessionError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn TransportSocket>, SessionError> {
        self.requests.lock().push(request.clone());
        match self.script.lock().pop_front() {
            Some(Ok(socket)) => Ok(socket as Arc<dyn TransportSocket>),
            Some(Err(err)) => Err(err),
            None => Err(SessionError::FailedToConnect("script exhausted".into())),
        }
    }
}

struct StaticTokens;

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn token(&self) -> Result<String, SessionError> {
        Ok("fixed-token".into())
    }
}

struct Harness {
    core: Arc<RecorderCore>,
    source: Arc<MockAudioSource>,
    transport: Arc<MockTransport>,
    plugin: Arc<StreamingTranscriptionPlugin>,
    events: broadcast::Receiver<StreamEvent>,
}

async fn harness(sockets: Vec<Result<Arc<MockSocket>, SessionError>>) -> Harness {
    let source = Arc::new(MockAudioSource::new());
    let core = RecorderCore::new(source.clone(), RecordingConfig::default());
    let transport = MockTransport::scripted(sockets);
    let protocol = Arc::new(
        TranscribeProtocol::new(
            "wss://transcribe.test/v1/stream",
            Arc::new(StaticTokens),
            ClientConfiguration::new().with_model("dictation-v2"),
        )
        .with_retry_count(0),
    );
    let plugin = Arc::new(StreamingTranscriptionPlugin::new(Arc::new(
        ProtocolSessionFactory::new(transport.clone(), protocol),
    )));
    let events = plugin.events();
    core.set_plugins(vec![plugin.clone()]).await;
    Harness {
        core,
        source,
        transport,
        plugin,
        events,
    }
}

async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Compact string form of the observed events.
fn drain(events: &mut broadcast::Receiver<StreamEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(match event {
            StreamEvent::Connecting => "connecting".to_string(),
            StreamEvent::Started => "started".to_string(),
            StreamEvent::Updated(stream) => format!("updated:{}", stream.state().text),
            StreamEvent::Completed { stream, error } => format!(
                "completed:{}:{}",
                stream.state().text,
                match error {
                    None => "ok".to_string(),
                    Some(VoxKitError::Decode(_)) => "decode".to_string(),
                    Some(VoxKitError::Session(_)) => "session".to_string(),
                    Some(other) => format!("{other}"),
                }
            ),
        });
    }
    out
}

fn replace_text_message(text: &str) -> String {
    format!(
        r#"{{"actions":[{{"id":"0","index":0,"type":"replace_text",
            "parameters":{{"start":0,"end":0,"text":"{text}"}}}}]}}"#
    )
}

#[tokio::test]
async fn full_cycle_streams_audio_and_completes_once() {
    let socket = MockSocket::new();
    let mut h = harness(vec![Ok(socket.clone())]).await;

    h.core.start().await;
    settle().await;
    assert_eq!(h.core.recorder_state(), RecorderState::Recording);

    // The configuration handshake went out first.
    let texts = socket.sent_texts();
    assert!(texts[0].contains("ClientConfiguration"), "{texts:?}");
    assert!(texts[0].contains("dictation-v2"));

    h.source.emit(AudioFrame::new(vec![0x0102, -2], 16_000)).await;
    settle().await;
    assert_eq!(socket.sent_binaries(), vec![vec![0x02, 0x01, 0xFE, 0xFF]]);

    socket.push_text(&replace_text_message("Attendi"));
    settle().await;

    h.core.stop().await;
    settle().await;
    assert_eq!(h.core.recorder_state(), RecorderState::Idle);
    assert_eq!(socket.sent_texts().last().unwrap(), &end_of_stream_message());

    assert_eq!(
        drain(&mut h.events),
        vec![
            "connecting",
            "started",
            "updated:Attendi",
            "completed:Attendi:ok",
        ]
    );
}

#[tokio::test]
async fn frames_after_close_are_not_forwarded() {
    let socket = MockSocket::new();
    let mut h = harness(vec![Ok(socket.clone())]).await;

    h.core.start().await;
    settle().await;
    h.core.stop().await;
    settle().await;

    h.source.emit(AudioFrame::new(vec![1], 16_000)).await;
    settle().await;
    assert!(socket.sent_binaries().is_empty());

    let events = drain(&mut h.events);
    assert_eq!(events.last().unwrap(), "completed::ok");
}

#[tokio::test]
async fn undecodable_message_force_stops_and_completes_with_error() {
    let socket = MockSocket::new();
    let mut h = harness(vec![Ok(socket.clone())]).await;
    let errors = Arc::new(Mutex::new(Vec::new()));
    let _error_guard = h.core.model().on_error({
        let errors = errors.clone();
        move |err| {
            let errors = errors.clone();
            async move {
                errors.lock().push(err);
            }
        }
    });

    h.core.start().await;
    settle().await;
    socket.push_text("{not json");
    settle().await;
    settle().await;

    // The plugin stopped the recorder and closed the session itself.
    assert_eq!(h.core.recorder_state(), RecorderState::Idle);
    assert!(socket.is_closed());

    let events = drain(&mut h.events);
    assert_eq!(
        events,
        vec!["connecting", "started", "completed::decode"],
        "exactly one completion, carrying the decode error"
    );
    assert!(errors
        .lock()
        .iter()
        .any(|e| matches!(e, VoxKitError::Decode(_))));
}

#[tokio::test]
async fn updates_stop_after_completion() {
    let socket = MockSocket::new();
    let mut h = harness(vec![Ok(socket.clone())]).await;

    h.core.start().await;
    settle().await;
    h.core.stop().await;
    settle().await;

    // A straggler message after the cycle completed must not emit updates.
    let mut late_events = h.plugin.events();
    socket.push_text(&replace_text_message("late"));
    settle().await;

    let events = drain(&mut h.events);
    assert!(
        !events.iter().any(|e| e.starts_with("updated")),
        "{events:?}"
    );
    assert!(late_events.try_recv().is_err());
}

#[tokio::test]
async fn connect_failure_completes_the_cycle_and_stops_the_recorder() {
    let mut h = harness(vec![Err(SessionError::FailedToConnect("refused".into()))]).await;

    h.core.start().await;
    settle().await;
    settle().await;

    assert_eq!(h.core.recorder_state(), RecorderState::Idle);
    assert_eq!(drain(&mut h.events), vec!["connecting", "completed::session"]);
}

#[tokio::test]
async fn each_cycle_uses_a_fresh_session() {
    let first = MockSocket::new();
    let second = MockSocket::new();
    let mut h = harness(vec![Ok(first.clone()), Ok(second.clone())]).await;

    h.core.start().await;
    settle().await;
    h.core.stop().await;
    settle().await;

    h.core.start().await;
    settle().await;
    h.source.emit(AudioFrame::new(vec![5], 16_000)).await;
    settle().await;
    h.core.stop().await;
    settle().await;

    assert_eq!(h.transport.request_count(), 2);
    assert!(first.sent_binaries().is_empty());
    assert_eq!(second.sent_binaries().len(), 1);

    let completions = drain(&mut h.events)
        .into_iter()
        .filter(|e| e.starts_with("completed"))
        .count();
    assert_eq!(completions, 2, "one completion per cycle");
}

#[tokio::test]
async fn rejected_batch_keeps_the_stream_alive() {
    let socket = MockSocket::new();
    let mut h = harness(vec![Ok(socket.clone())]).await;

    h.core.start().await;
    settle().await;

    // Well-formed message targeting an annotation that does not exist: the
    // batch is rejected, the cycle keeps going.
    socket.push_text(
        r#"{"actions":[{"id":"9","index":9,"type":"remove_annotation",
            "parameters":{"annotation_id":"ghost"}}]}"#,
    );
    settle().await;
    assert_eq!(h.core.recorder_state(), RecorderState::Recording);

    socket.push_text(&replace_text_message("still here"));
    settle().await;
    h.core.stop().await;
    settle().await;

    let events = drain(&mut h.events);
    assert!(events.contains(&"updated:still here".to_string()), "{events:?}");
    assert_eq!(events.last().unwrap(), "completed:still here:ok");
}

#[tokio::test(start_paused = true)]
async fn missed_close_ack_completes_with_the_timeout_recorded() {
    let socket = MockSocket::silent();
    let mut h = harness(vec![Ok(socket.clone())]).await;
    let errors = Arc::new(Mutex::new(Vec::new()));
    let _error_guard = h.core.model().on_error({
        let errors = errors.clone();
        move |err| {
            let errors = errors.clone();
            async move {
                errors.lock().push(err);
            }
        }
    });

    h.core.start().await;
    settle().await;

    // Stop blocks through the full close window; virtual time covers it.
    h.core.stop().await;
    settle().await;

    assert_eq!(h.core.recorder_state(), RecorderState::Idle);
    let events = drain(&mut h.events);
    assert_eq!(
        events,
        vec!["connecting", "started", "completed::session"],
        "one completion carrying the timeout"
    );
    assert!(errors
        .lock()
        .iter()
        .any(|e| matches!(
            e,
            VoxKitError::Session(SessionError::DisconnectTimeout)
        )));
}

#[tokio::test]
async fn deactivation_closes_a_live_session() {
    let socket = MockSocket::new();
    let h = harness(vec![Ok(socket.clone())]).await;

    h.core.start().await;
    settle().await;
    assert!(!socket.is_closed());

    h.core.set_plugins(Vec::new()).await;
    settle().await;
    assert!(socket.is_closed());
    // The dropped subscriptions no longer forward frames.
    h.source.emit(AudioFrame::new(vec![3], 16_000)).await;
    settle().await;
    assert!(socket.sent_binaries().is_empty());
}
