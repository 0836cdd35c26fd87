use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use voxkit_audio::{AudioFrame, AudioFrameSink, AudioSource, RecordingConfig};

use crate::model::RecorderModel;
use crate::plugin::RecorderPlugin;
use crate::state::RecorderState;

struct Lifecycle {
    plugins: Vec<Arc<dyn RecorderPlugin>>,
    pending_start: Option<JoinHandle<()>>,
    frame_pump: Option<JoinHandle<()>>,
}

/// Drives the recorder lifecycle state machine.
///
/// One mutex serializes `start`, `stop`, `release`, and `set_plugins`: the
/// OS audio session is a global resource, and parallel transitions would
/// desynchronize the state machine from it. `start` splits into a prelude
/// run under the mutex and a cancellable tail task that waits out the start
/// delay; the tail re-acquires no lock.
pub struct RecorderCore {
    model: Arc<RecorderModel>,
    source: Arc<dyn AudioSource>,
    config: RecordingConfig,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
    started: AtomicBool,
    released: AtomicBool,
}

impl RecorderCore {
    pub fn new(source: Arc<dyn AudioSource>, config: RecordingConfig) -> Arc<Self> {
        let core = Arc::new(Self {
            model: Arc::new(RecorderModel::new()),
            source,
            config,
            lifecycle: tokio::sync::Mutex::new(Lifecycle {
                plugins: Vec::new(),
                pending_start: None,
                frame_pump: None,
            }),
            started: AtomicBool::new(false),
            released: AtomicBool::new(false),
        });

        // The model forwards imperative start/stop requests back into the
        // core. Weak references only: the core owns the model, never the
        // other way around.
        let weak = Arc::downgrade(&core);
        core.model.set_start_forwarder(Arc::new({
            let weak = weak.clone();
            move || {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(core) = weak.upgrade() {
                        core.start().await;
                    }
                })
            }
        }));
        core.model.set_stop_forwarder(Arc::new({
            let weak = weak.clone();
            move || {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(core) = weak.upgrade() {
                        core.stop().await;
                    }
                })
            }
        }));
        core
    }

    pub fn model(&self) -> &Arc<RecorderModel> {
        &self.model
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.model.state()
    }

    pub fn recorder_state_stream(&self) -> tokio::sync::broadcast::Receiver<RecorderState> {
        self.model.state_stream()
    }

    /// Replace the plugin set: previous plugins deactivate in reverse
    /// registration order, then the new ones activate in order, each awaited.
    pub async fn set_plugins(&self, plugins: Vec<Arc<dyn RecorderPlugin>>) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let old: Vec<_> = lifecycle.plugins.drain(..).collect();
        for plugin in old.into_iter().rev() {
            debug!(target: "recorder", plugin = plugin.name(), "deactivating plugin");
            plugin.deactivate(&self.model).await;
        }
        for plugin in &plugins {
            debug!(target: "recorder", plugin = plugin.name(), "activating plugin");
            plugin.activate(&self.model).await;
        }
        lifecycle.plugins = plugins;
    }

    pub async fn start(self: &Arc<Self>) {
        self.start_delayed(Duration::ZERO).await;
    }

    /// Begin a capture cycle after `delay`.
    ///
    /// The delay lets a notification-sound plugin finish playback before the
    /// microphone opens, so the notification itself is not recorded. If the
    /// recorder is already started or released this is a no-op.
    pub async fn start_delayed(self: &Arc<Self>, delay: Duration) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.released.load(Ordering::SeqCst) || self.started.load(Ordering::SeqCst) {
            debug!(target: "recorder", "start ignored: already started or released");
            return;
        }
        self.started.store(true, Ordering::SeqCst);
        info!(target: "recorder", ?delay, "starting capture cycle");

        self.model.update_state(RecorderState::Loading).await;
        self.model.invoke_before_start().await;

        // Frames cross from the capture callback onto the recorder's logical
        // executor through a lossless ordered channel drained serially.
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<AudioFrame>();
        let pump_model = self.model.clone();
        lifecycle.frame_pump = Some(tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                // Frames are only delivered between `start` and `before_stop`.
                if pump_model.state() != RecorderState::Recording {
                    continue;
                }
                pump_model.invoke_audio_frame(frame).await;
            }
        }));
        let sink: AudioFrameSink = Arc::new(move |frame| {
            let _ = frame_tx.send(frame);
            Box::pin(async {})
        });

        let core = self.clone();
        lifecycle.pending_start = Some(tokio::spawn(async move {
            core.finish_start(delay, sink).await;
        }));
    }

    /// Tail of `start`: runs outside the lifecycle mutex and is aborted by
    /// `stop` or `release` while still pending.
    async fn finish_start(self: Arc<Self>, delay: Duration, sink: AudioFrameSink) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.released.load(Ordering::SeqCst) || !self.started.load(Ordering::SeqCst) {
            return;
        }
        match self.source.start_recording(self.config, sink).await {
            Ok(()) => {
                self.model.update_state(RecorderState::Recording).await;
                self.model.invoke_start().await;
            }
            Err(err) => {
                warn!(target: "recorder", %err, "audio source failed to start");
                self.started.store(false, Ordering::SeqCst);
                self.model.update_state(RecorderState::Idle).await;
                self.model.report_error(err.into()).await;
            }
        }
    }

    pub async fn stop(self: &Arc<Self>) {
        self.stop_delayed(Duration::ZERO).await;
    }

    /// End the capture cycle after `delay`. No-op when not started.
    pub async fn stop_delayed(self: &Arc<Self>, delay: Duration) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.released.load(Ordering::SeqCst) || !self.started.swap(false, Ordering::SeqCst) {
            debug!(target: "recorder", "stop ignored: not started or released");
            return;
        }
        info!(target: "recorder", ?delay, "stopping capture cycle");

        self.model.update_state(RecorderState::Processing).await;
        self.model.invoke_before_stop().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.source.stop_recording().await;

        if let Some(pending) = lifecycle.pending_start.take() {
            pending.abort();
            if let Err(join_err) = pending.await {
                // An aborted start tail is routine, never an error.
                if !join_err.is_cancelled() {
                    warn!(target: "recorder", %join_err, "start tail panicked");
                }
            }
        }

        self.model.invoke_stop().await;
        self.model.update_state(RecorderState::Idle).await;
    }

    /// Tear the recorder down for good: deactivate plugins, cancel pending
    /// work, stop capture. Idempotent; every later operation is a no-op.
    pub async fn release(self: &Arc<Self>) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(target: "recorder", "releasing recorder");
        let plugins: Vec<_> = lifecycle.plugins.drain(..).collect();
        for plugin in plugins {
            plugin.deactivate(&self.model).await;
        }
        if let Some(pending) = lifecycle.pending_start.take() {
            pending.abort();
        }
        if let Some(pump) = lifecycle.frame_pump.take() {
            pump.abort();
        }
        self.source.stop_recording().await;
        self.started.store(false, Ordering::SeqCst);
        self.model.update_state(RecorderState::Idle).await;
    }
}
