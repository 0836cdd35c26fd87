use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use voxkit_audio::AudioFrame;
use voxkit_foundation::VoxKitError;

use crate::registry::{AsyncCallback, CallbackChannel, CallbackGuard};
use crate::state::RecorderState;

type Forwarder = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Shared recorder surface: current state, its published stream, and the
/// lifecycle callback registry.
///
/// The model owns no policy. The embedding core drives `update_state` and the
/// `invoke_*` dispatchers; plugins and presenters subscribe through the
/// `on_*` registrations. All dispatches are funneled through one gate so no
/// two lifecycle events ever interleave on a single recorder.
pub struct RecorderModel {
    state: RwLock<RecorderState>,
    state_tx: broadcast::Sender<RecorderState>,
    volume_tx: broadcast::Sender<f32>,
    dispatch_gate: tokio::sync::Mutex<()>,

    state_update: CallbackChannel<RecorderState>,
    before_start: CallbackChannel<()>,
    start: CallbackChannel<()>,
    before_stop: CallbackChannel<()>,
    stop: CallbackChannel<()>,
    error: CallbackChannel<VoxKitError>,
    audio_frame: CallbackChannel<AudioFrame>,

    // Imperative forwarders installed by the core. Invocations are deferred
    // to the runtime so a callback may request a transition mid-dispatch
    // without deadlocking on the dispatch gate.
    start_forwarder: RwLock<Option<Forwarder>>,
    stop_forwarder: RwLock<Option<Forwarder>>,
}

impl Default for RecorderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderModel {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(16);
        let (volume_tx, _) = broadcast::channel(64);
        Self {
            state: RwLock::new(RecorderState::Idle),
            state_tx,
            volume_tx,
            dispatch_gate: tokio::sync::Mutex::new(()),
            state_update: CallbackChannel::new(),
            before_start: CallbackChannel::new(),
            start: CallbackChannel::new(),
            before_stop: CallbackChannel::new(),
            stop: CallbackChannel::new(),
            error: CallbackChannel::new(),
            audio_frame: CallbackChannel::new(),
            start_forwarder: RwLock::new(None),
            stop_forwarder: RwLock::new(None),
        }
    }

    pub fn state(&self) -> RecorderState {
        *self.state.read()
    }

    /// Published stream of state changes.
    pub fn state_stream(&self) -> broadcast::Receiver<RecorderState> {
        self.state_tx.subscribe()
    }

    /// Published stream of per-frame RMS volume while recording.
    pub fn volume_stream(&self) -> broadcast::Receiver<f32> {
        self.volume_tx.subscribe()
    }

    // ── Registration ────────────────────────────────────────────────

    pub fn on_state_update<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn(RecorderState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.state_update.register(wrap(f))
    }

    pub fn on_before_start<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.before_start.register(wrap_unit(f))
    }

    pub fn on_start<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.start.register(wrap_unit(f))
    }

    pub fn on_before_stop<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.before_stop.register(wrap_unit(f))
    }

    pub fn on_stop<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop.register(wrap_unit(f))
    }

    pub fn on_error<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn(VoxKitError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.error.register(wrap(f))
    }

    pub fn on_audio_frame<F, Fut>(&self, f: F) -> CallbackGuard
    where
        F: Fn(AudioFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.audio_frame.register(wrap(f))
    }

    // ── Imperative forwarders ───────────────────────────────────────

    /// Request a recorder start. No-op until the core installs its handler.
    pub fn start(&self) {
        if let Some(forward) = self.start_forwarder.read().clone() {
            tokio::spawn(forward());
        }
    }

    /// Request a recorder stop. No-op until the core installs its handler.
    pub fn stop(&self) {
        if let Some(forward) = self.stop_forwarder.read().clone() {
            tokio::spawn(forward());
        }
    }

    pub(crate) fn set_start_forwarder(&self, f: Forwarder) {
        *self.start_forwarder.write() = Some(f);
    }

    pub(crate) fn set_stop_forwarder(&self, f: Forwarder) {
        *self.stop_forwarder.write() = Some(f);
    }

    // ── Dispatch (driven by the core) ───────────────────────────────

    /// Store `new` and dispatch `state_update` callbacks serially.
    /// Re-entering the current state is a no-op.
    pub(crate) async fn update_state(&self, new: RecorderState) {
        {
            let mut current = self.state.write();
            if *current == new {
                return;
            }
            info!(target: "recorder", "state {} -> {}", *current, new);
            *current = new;
        }
        let _ = self.state_tx.send(new);
        let _gate = self.dispatch_gate.lock().await;
        self.state_update.dispatch(new).await;
    }

    pub(crate) async fn invoke_before_start(&self) {
        debug!(target: "recorder", "dispatch before_start");
        let _gate = self.dispatch_gate.lock().await;
        self.before_start.dispatch(()).await;
    }

    pub(crate) async fn invoke_start(&self) {
        debug!(target: "recorder", "dispatch start");
        let _gate = self.dispatch_gate.lock().await;
        self.start.dispatch(()).await;
    }

    pub(crate) async fn invoke_before_stop(&self) {
        debug!(target: "recorder", "dispatch before_stop");
        let _gate = self.dispatch_gate.lock().await;
        self.before_stop.dispatch(()).await;
    }

    pub(crate) async fn invoke_stop(&self) {
        debug!(target: "recorder", "dispatch stop");
        let _gate = self.dispatch_gate.lock().await;
        self.stop.dispatch(()).await;
    }

    pub(crate) async fn invoke_audio_frame(&self, frame: AudioFrame) {
        let _gate = self.dispatch_gate.lock().await;
        let _ = self.volume_tx.send(frame.rms_volume());
        self.audio_frame.dispatch(frame).await;
    }

    /// Deliver an error to the `error` channel.
    ///
    /// Public because plugins report their own failures here; nothing ever
    /// propagates across a plugin boundary as a panic or return value.
    pub async fn report_error(&self, error: VoxKitError) {
        tracing::warn!(target: "recorder", %error, "recorder error");
        let _gate = self.dispatch_gate.lock().await;
        self.error.dispatch(error).await;
    }
}

fn wrap<A, F, Fut>(f: F) -> AsyncCallback<A>
where
    A: Clone + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

fn wrap_unit<F, Fut>(f: F) -> AsyncCallback<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |_| Box::pin(f()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use voxkit_foundation::AudioSourceError;

    #[tokio::test]
    async fn update_state_stores_and_dispatches() {
        let model = RecorderModel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _g = model.on_state_update({
            let seen = seen.clone();
            move |state| {
                let seen = seen.clone();
                async move {
                    seen.lock().push(state);
                }
            }
        });
        model.update_state(RecorderState::Loading).await;
        assert_eq!(model.state(), RecorderState::Loading);
        assert_eq!(*seen.lock(), vec![RecorderState::Loading]);
    }

    #[tokio::test]
    async fn re_entering_current_state_is_silent() {
        let model = RecorderModel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _g = model.on_state_update({
            let seen = seen.clone();
            move |state| {
                let seen = seen.clone();
                async move {
                    seen.lock().push(state);
                }
            }
        });
        model.update_state(RecorderState::Idle).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn state_stream_publishes_transitions() {
        let model = RecorderModel::new();
        let mut stream = model.state_stream();
        model.update_state(RecorderState::Loading).await;
        model.update_state(RecorderState::Recording).await;
        assert_eq!(stream.recv().await.unwrap(), RecorderState::Loading);
        assert_eq!(stream.recv().await.unwrap(), RecorderState::Recording);
    }

    #[tokio::test]
    async fn errors_reach_the_error_channel() {
        let model = RecorderModel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _g = model.on_error({
            let seen = seen.clone();
            move |err| {
                let seen = seen.clone();
                async move {
                    seen.lock().push(err);
                }
            }
        });
        model
            .report_error(AudioSourceError::PermissionDenied.into())
            .await;
        assert_eq!(
            *seen.lock(),
            vec![VoxKitError::Audio(AudioSourceError::PermissionDenied)]
        );
    }

    #[tokio::test]
    async fn volume_stream_carries_frame_rms() {
        let model = RecorderModel::new();
        let mut volumes = model.volume_stream();
        model
            .invoke_audio_frame(AudioFrame::new(vec![100; 16], 16_000))
            .await;
        let rms = volumes.recv().await.unwrap();
        assert!((rms - 100.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn forwarders_are_initially_unset() {
        let model = RecorderModel::new();
        // Must not panic or spawn anything.
        model.start();
        model.stop();
    }
}
