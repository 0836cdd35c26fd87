use thiserror::Error;

/// Top-level error union for the VoxKit core.
///
/// Every failure that crosses a component boundary is folded into this type
/// before it reaches the recorder's `error` callback channel, so embedders
/// handle a single tagged union rather than per-component channels.
/// Cancellation of an in-flight delayed transition is expressed as task
/// abort and never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoxKitError {
    #[error("Audio source error: {0}")]
    Audio(#[from] AudioSourceError),

    #[error("Streaming session error: {0}")]
    Session(#[from] SessionError),

    #[error("Message decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Plugin '{plugin}' failed during {operation}: {reason}")]
    Plugin {
        plugin: String,
        operation: String,
        reason: String,
    },
}

/// Errors an `AudioSource` implementation may raise when capture starts.
///
/// The OS audio session is a process-global resource; `AlreadyRecording`
/// is how a second recorder learns another one holds it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioSourceError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Audio session is already recording")]
    AlreadyRecording,

    #[error("Unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),
}

/// Errors surfaced by the streaming session engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Failed to connect: {0}")]
    FailedToConnect(String),

    #[error("Connection closed abnormally: {0}")]
    ClosedAbnormally(String),

    #[error("Connect attempt timed out")]
    ConnectTimeout,

    #[error("Peer did not close within the disconnect window")]
    DisconnectTimeout,

    #[error("Session error: {0}")]
    Unknown(String),
}

/// Errors produced while decoding inbound server messages.
///
/// The decoder is strict: a message with an unknown action type or a missing
/// required field rejects the whole message rather than dropping the action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Message is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown action type: {0:?}")]
    UnknownActionType(String),

    #[error("Unknown annotation kind: {0:?}")]
    UnknownAnnotationKind(String),

    #[error("Invalid value for {path}: {reason}")]
    InvalidField { path: String, reason: String },
}

/// Errors from applying actions to the transcript document or computing
/// their inverses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("Range [{start}, {end}) out of bounds for text of length {len}")]
    IndexOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("No annotation with id {id:?} found while inverting {op}")]
    AnnotationNotFound { op: AnnotationOp, id: String },
}

/// Which mutation the undoable mapper was inverting when a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOp {
    Remove,
    Update,
}

impl std::fmt::Display for AnnotationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationOp::Remove => write!(f, "remove"),
            AnnotationOp::Update => write!(f, "update"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_error_into_voxkit_error() {
        let err: VoxKitError = AudioSourceError::PermissionDenied.into();
        assert!(matches!(err, VoxKitError::Audio(_)));
    }

    #[test]
    fn session_error_into_voxkit_error() {
        let err: VoxKitError = SessionError::DisconnectTimeout.into();
        assert!(matches!(err, VoxKitError::Session(_)));
    }

    #[test]
    fn unsupported_format_message() {
        let err = AudioSourceError::UnsupportedAudioFormat("48000 Hz stereo".into());
        assert!(format!("{err}").contains("48000 Hz stereo"));
    }

    #[test]
    fn missing_field_carries_path() {
        let err = DecodeError::MissingField("actions[2].parameters.start".into());
        assert!(format!("{err}").contains("actions[2].parameters.start"));
    }

    #[test]
    fn annotation_not_found_names_operation() {
        let err = TranscriptError::AnnotationNotFound {
            op: AnnotationOp::Update,
            id: "6A".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("update"));
        assert!(msg.contains("6A"));
    }
}
