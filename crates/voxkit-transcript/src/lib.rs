//! Operation-history transcription document for the VoxKit core.
//!
//! A stream of typed server actions mutates an annotated text document; for
//! every applied action the crate records an inverse computed against its
//! pre-image, giving arbitrary-depth undo and redo without snapshotting
//! intermediate states.

pub mod action;
pub mod decoder;
pub mod document;
pub mod stream;
pub mod undo;

pub use action::{Annotation, AnnotationKind, EntityType, IntentStatus, TranscribeAction};
pub use decoder::MessageDecoder;
pub use document::DocumentState;
pub use stream::TranscribeStream;
pub use undo::{UndoableAction, UndoableMapper};
