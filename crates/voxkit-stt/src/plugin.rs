//! Streaming transcription plugin.
//!
//! Bridges the recorder lifecycle to one `AsyncSession` per capture cycle:
//! a session opens on `start`, audio frames are forwarded while the session
//! is open, and `before_stop` announces end-of-stream and waits out the
//! graceful close. Inbound action messages drive a `TranscribeStream` whose
//! snapshots are published to observers.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use voxkit_audio::AudioFrame;
use voxkit_foundation::{SessionError, VoxKitError};
use voxkit_recorder::{CallbackGuard, RecorderModel, RecorderPlugin};
use voxkit_session::{AsyncSession, SessionConfig, SessionListener, SessionProtocol, StreamTransport};
use voxkit_transcript::{MessageDecoder, TranscribeStream};

use crate::events::StreamEvent;

/// Creates the session for each capture cycle.
///
/// Sessions connect at most once, so every cycle needs a fresh instance.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Arc<AsyncSession>;
}

/// Factory binding one transport and one protocol policy.
pub struct ProtocolSessionFactory {
    transport: Arc<dyn StreamTransport>,
    protocol: Arc<dyn SessionProtocol>,
    config: SessionConfig,
}

impl ProtocolSessionFactory {
    pub fn new(transport: Arc<dyn StreamTransport>, protocol: Arc<dyn SessionProtocol>) -> Self {
        Self {
            transport,
            protocol,
            config: SessionConfig::default(),
        }
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

impl SessionFactory for ProtocolSessionFactory {
    fn create(&self) -> Arc<AsyncSession> {
        Arc::new(AsyncSession::with_config(
            self.transport.clone(),
            self.protocol.clone(),
            self.config,
        ))
    }
}

/// Per-cycle state, reset when a new cycle begins.
#[derive(Default)]
struct CycleState {
    session: Option<Arc<AsyncSession>>,
    stream: TranscribeStream,
    /// True from cycle start until `Completed` is emitted.
    is_connecting: bool,
    is_open: bool,
    is_closing: bool,
    error: Option<VoxKitError>,
}

pub struct StreamingTranscriptionPlugin {
    sessions: Arc<dyn SessionFactory>,
    events_tx: broadcast::Sender<StreamEvent>,
    state: Arc<tokio::sync::Mutex<CycleState>>,
    guards: parking_lot::Mutex<Vec<CallbackGuard>>,
}

impl StreamingTranscriptionPlugin {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            sessions,
            events_tx,
            state: Arc::new(tokio::sync::Mutex::new(CycleState::default())),
            guards: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Observer stream of per-cycle events.
    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.events_tx.subscribe()
    }
}

#[async_trait]
impl RecorderPlugin for StreamingTranscriptionPlugin {
    fn name(&self) -> &str {
        "streaming-transcription"
    }

    async fn activate(&self, model: &Arc<RecorderModel>) {
        let mut guards = self.guards.lock();

        let on_start = {
            let state = self.state.clone();
            let events = self.events_tx.clone();
            let sessions = self.sessions.clone();
            let model = Arc::downgrade(model);
            move || {
                let state = state.clone();
                let events = events.clone();
                let sessions = sessions.clone();
                let model = model.clone();
                async move {
                    let session = {
                        let mut cycle = state.lock().await;
                        if cycle.is_connecting {
                            debug!(target: "stt", "start ignored: cycle already in flight");
                            return;
                        }
                        *cycle = CycleState {
                            is_connecting: true,
                            ..CycleState::default()
                        };
                        let session = sessions.create();
                        cycle.session = Some(session.clone());
                        let _ = events.send(StreamEvent::Connecting);
                        session
                    };
                    let listener = Arc::new(StreamListener {
                        state,
                        events,
                        model,
                    });
                    session.connect(listener).await;
                }
            }
        };

        let on_audio_frame = {
            let state = self.state.clone();
            move |frame: AudioFrame| {
                let state = state.clone();
                async move {
                    let session = {
                        let cycle = state.lock().await;
                        if !cycle.is_open {
                            return;
                        }
                        match &cycle.session {
                            Some(session) => session.clone(),
                            None => return,
                        }
                    };
                    session.send_binary(&frame.to_le_bytes()).await;
                }
            }
        };

        let on_before_stop = {
            let state = self.state.clone();
            move || {
                let state = state.clone();
                async move {
                    let session = {
                        let mut cycle = state.lock().await;
                        if cycle.is_closing {
                            return;
                        }
                        cycle.is_closing = true;
                        match cycle.session.clone() {
                            Some(session) => session,
                            None => return,
                        }
                    };
                    // Awaited: the recorder's stop sequence holds here until
                    // the server acks the close or the window elapses.
                    session.disconnect().await;
                }
            }
        };

        *guards = vec![
            model.on_start(on_start),
            model.on_audio_frame(on_audio_frame),
            model.on_before_stop(on_before_stop),
        ];
    }

    async fn deactivate(&self, _model: &Arc<RecorderModel>) {
        self.guards.lock().clear();
        let state = self.state.clone();
        // Tear down any live session without holding up deactivation.
        tokio::spawn(async move {
            let session = {
                let mut cycle = state.lock().await;
                cycle.is_closing = true;
                cycle.session.take()
            };
            if let Some(session) = session {
                session.disconnect().await;
            }
        });
    }
}

/// Session listener bridging back onto the plugin's cycle state.
///
/// Holds only a weak reference to the recorder model: the subscription is a
/// relation, never ownership.
struct StreamListener {
    state: Arc<tokio::sync::Mutex<CycleState>>,
    events: broadcast::Sender<StreamEvent>,
    model: Weak<RecorderModel>,
}

impl StreamListener {
    /// Deliver to the recorder's error channel off this call stack; the
    /// listener may be invoked while a lifecycle dispatch is in progress.
    fn report_error(&self, error: VoxKitError) {
        if let Some(model) = self.model.upgrade() {
            tokio::spawn(async move {
                model.report_error(error).await;
            });
        }
    }

    fn force_stop(&self) {
        if let Some(model) = self.model.upgrade() {
            model.stop();
        }
    }

    fn complete_if_pending(&self, cycle: &mut CycleState) {
        if cycle.is_connecting {
            cycle.is_connecting = false;
            let _ = self.events.send(StreamEvent::Completed {
                stream: cycle.stream.clone(),
                error: cycle.error.clone(),
            });
        }
    }
}

#[async_trait]
impl SessionListener for StreamListener {
    async fn on_open(&self) {
        let mut cycle = self.state.lock().await;
        cycle.is_open = true;
        let _ = self.events.send(StreamEvent::Started);
    }

    async fn on_message(&self, text: String) {
        match MessageDecoder::decode(&text) {
            Ok(actions) => {
                let mut cycle = self.state.lock().await;
                if !cycle.is_open {
                    debug!(target: "stt", "dropping actions outside an open cycle");
                    return;
                }
                match cycle.stream.receive_actions(&actions) {
                    Ok(next) => {
                        cycle.stream = next;
                        let _ = self.events.send(StreamEvent::Updated(cycle.stream.clone()));
                    }
                    Err(err) => {
                        // The batch is rejected; the document keeps its
                        // pre-image and the stream stays live.
                        warn!(target: "stt", %err, "rejected action batch");
                        drop(cycle);
                        self.report_error(err.into());
                    }
                }
            }
            Err(err) => {
                warn!(target: "stt", %err, "undecodable server message, closing cycle");
                let session = {
                    let mut cycle = self.state.lock().await;
                    cycle.error = Some(err.clone().into());
                    cycle.is_closing = true;
                    cycle.session.clone()
                };
                self.report_error(err.into());
                self.force_stop();
                if let Some(session) = session {
                    session.disconnect().await;
                }
            }
        }
    }

    async fn on_error(&self, error: SessionError) {
        // A missed close ack is informational; the cycle still completes
        // through the ordinary close path.
        let informational = matches!(error, SessionError::DisconnectTimeout);
        {
            let mut cycle = self.state.lock().await;
            if cycle.error.is_none() {
                cycle.error = Some(error.clone().into());
            }
        }
        self.report_error(error.into());
        if !informational {
            self.force_stop();
            // A failed connect never reaches on_close; the cycle ends here.
            let mut cycle = self.state.lock().await;
            self.complete_if_pending(&mut cycle);
        }
    }

    async fn on_close(&self) {
        let mut cycle = self.state.lock().await;
        cycle.is_open = false;
        self.complete_if_pending(&mut cycle);
    }
}
