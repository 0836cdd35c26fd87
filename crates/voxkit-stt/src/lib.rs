//! Streaming transcription for VoxKit.
//!
//! Wires the recorder core to a remote transcription service: the streaming
//! plugin pipes capture frames into a per-cycle `AsyncSession`, decodes
//! inbound action messages, and maintains the undoable `TranscribeStream`.
//! Also carries the client wire messages, the session protocol policy, and
//! the synchronous one-shot transcribe collaborator.

pub mod events;
pub mod plugin;
pub mod protocol;
pub mod service;
pub mod wire;

pub use events::StreamEvent;
pub use plugin::{ProtocolSessionFactory, SessionFactory, StreamingTranscriptionPlugin};
pub use protocol::{TokenProvider, TranscribeProtocol};
pub use service::{encode_audio_base64, TranscribeService};
pub use wire::{ClientConfiguration, end_of_stream_message};
