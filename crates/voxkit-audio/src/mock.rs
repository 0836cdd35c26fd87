//! Scripted audio source for tests.
//!
//! Emits whatever frames the test pushes through [`MockAudioSource::emit`]
//! and can be primed to fail `start_recording` with a chosen error.

use parking_lot::Mutex;

use async_trait::async_trait;
use voxkit_foundation::AudioSourceError;

use crate::config::RecordingConfig;
use crate::frame::AudioFrame;
use crate::source::{AudioFrameSink, AudioSource};

#[derive(Default)]
struct MockState {
    recording: bool,
    sink: Option<AudioFrameSink>,
    start_calls: u32,
    stop_calls: u32,
}

#[derive(Default)]
pub struct MockAudioSource {
    state: Mutex<MockState>,
    fail_start: Option<AudioSourceError>,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prime the next `start_recording` call to fail with `err`.
    pub fn failing_with(err: AudioSourceError) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            fail_start: Some(err),
        }
    }

    /// Drive one frame through the registered sink, awaiting delivery.
    ///
    /// Frames emitted while not recording are dropped, mirroring a real
    /// source whose stream has already been torn down.
    pub async fn emit(&self, frame: AudioFrame) {
        let sink = {
            let state = self.state.lock();
            if !state.recording {
                return;
            }
            state.sink.clone()
        };
        if let Some(sink) = sink {
            sink(frame).await;
        }
    }

    pub fn start_calls(&self) -> u32 {
        self.state.lock().start_calls
    }

    pub fn stop_calls(&self) -> u32 {
        self.state.lock().stop_calls
    }
}

#[async_trait]
impl AudioSource for MockAudioSource {
    fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    async fn start_recording(
        &self,
        config: RecordingConfig,
        on_audio: AudioFrameSink,
    ) -> Result<(), AudioSourceError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.start_calls += 1;
        if let Some(err) = &self.fail_start {
            return Err(err.clone());
        }
        if state.recording {
            return Err(AudioSourceError::AlreadyRecording);
        }
        state.recording = true;
        state.sink = Some(on_audio);
        Ok(())
    }

    async fn stop_recording(&self) {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        state.recording = false;
        state.sink = None;
    }
}
