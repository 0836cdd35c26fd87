/// Lifecycle state of one recorder.
///
/// The lifecycle is cyclic: a completed capture returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    /// `start()` accepted; waiting out the start delay before capture begins.
    Loading,
    Recording,
    /// `stop()` accepted; draining the tail of the capture.
    Processing,
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "idle"),
            RecorderState::Loading => write!(f, "loading"),
            RecorderState::Recording => write!(f, "recording"),
            RecorderState::Processing => write!(f, "processing"),
        }
    }
}
