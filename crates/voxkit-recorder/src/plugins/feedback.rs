//! Error-feedback plugin.
//!
//! Subscribes to the recorder's error channel and plays the embedder's
//! haptic/sound effects. The effects themselves (vibration motor, sound
//! playback) live behind the `FeedbackEffects` capability at the
//! application boundary.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use voxkit_foundation::{AudioSourceError, VoxKitError};

use crate::model::RecorderModel;
use crate::plugin::RecorderPlugin;
use crate::registry::CallbackGuard;

/// User-feedback effects supplied by the embedding application.
#[async_trait]
pub trait FeedbackEffects: Send + Sync {
    async fn vibrate(&self);
    async fn play_error_sound(&self);
}

pub struct ErrorFeedbackPlugin {
    effects: Arc<dyn FeedbackEffects>,
    subscription: Mutex<Option<CallbackGuard>>,
}

impl ErrorFeedbackPlugin {
    pub fn new(effects: Arc<dyn FeedbackEffects>) -> Self {
        Self {
            effects,
            subscription: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RecorderPlugin for ErrorFeedbackPlugin {
    fn name(&self) -> &str {
        "error-feedback"
    }

    async fn activate(&self, model: &Arc<RecorderModel>) {
        let effects = self.effects.clone();
        let guard = model.on_error(move |error| {
            let effects = effects.clone();
            async move {
                // A start attempt against a busy audio session is expected
                // when two recorders race; stay silent for it.
                if matches!(
                    error,
                    VoxKitError::Audio(AudioSourceError::AlreadyRecording)
                ) {
                    debug!(target: "recorder", "suppressing feedback for busy audio session");
                    return;
                }
                effects.vibrate().await;
                effects.play_error_sound().await;
            }
        });
        *self.subscription.lock() = Some(guard);
    }

    async fn deactivate(&self, _model: &Arc<RecorderModel>) {
        self.subscription.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecorderCore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voxkit_audio::{MockAudioSource, RecordingConfig};

    #[derive(Default)]
    struct CountingEffects {
        vibrations: AtomicUsize,
        sounds: AtomicUsize,
    }

    #[async_trait]
    impl FeedbackEffects for CountingEffects {
        async fn vibrate(&self) {
            self.vibrations.fetch_add(1, Ordering::SeqCst);
        }

        async fn play_error_sound(&self) {
            self.sounds.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn plays_feedback_on_permission_denied() {
        let effects = Arc::new(CountingEffects::default());
        let source = Arc::new(MockAudioSource::failing_with(
            AudioSourceError::PermissionDenied,
        ));
        let core = RecorderCore::new(source, RecordingConfig::default());
        core.set_plugins(vec![Arc::new(ErrorFeedbackPlugin::new(effects.clone()))])
            .await;

        core.start().await;
        // Let the start tail run and fail.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(effects.vibrations.load(Ordering::SeqCst), 1);
        assert_eq!(effects.sounds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn suppresses_already_recording() {
        let effects = Arc::new(CountingEffects::default());
        let plugin = ErrorFeedbackPlugin::new(effects.clone());
        let model = Arc::new(RecorderModel::new());
        plugin.activate(&model).await;

        model
            .report_error(AudioSourceError::AlreadyRecording.into())
            .await;
        assert_eq!(effects.vibrations.load(Ordering::SeqCst), 0);

        plugin.deactivate(&model).await;
        model
            .report_error(AudioSourceError::PermissionDenied.into())
            .await;
        assert_eq!(
            effects.vibrations.load(Ordering::SeqCst),
            0,
            "deactivated plugin must not react"
        );
    }
}
