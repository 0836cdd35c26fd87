use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use voxkit_foundation::AudioSourceError;

use crate::config::RecordingConfig;
use crate::frame::AudioFrame;

/// Async sink the audio source drives with captured frames.
///
/// The source must invoke it in capture order and await each call before
/// issuing the next; the recorder relies on that for frame ordering.
pub type AudioFrameSink = Arc<dyn Fn(AudioFrame) -> BoxFuture<'static, ()> + Send + Sync>;

/// Capability over the platform microphone.
///
/// The OS audio session and permission prompts live behind this trait; the
/// core never talks to the platform directly. The session is a process-global
/// resource, so a second recorder starting while another holds it must be
/// answered with `AlreadyRecording`.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Whether a capture stream is currently running.
    fn is_recording(&self) -> bool;

    /// Begin capture and feed frames into `on_audio`.
    ///
    /// Fails with `PermissionDenied`, `AlreadyRecording`, or
    /// `UnsupportedAudioFormat` per the capture preconditions.
    async fn start_recording(
        &self,
        config: RecordingConfig,
        on_audio: AudioFrameSink,
    ) -> Result<(), AudioSourceError>;

    /// Stop capture. Infallible and idempotent.
    async fn stop_recording(&self);
}
