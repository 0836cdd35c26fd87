/// A typed span over the transcript text.
///
/// `start`/`end` are half-open character indices counted in Unicode scalar
/// values, valid against the document text at the moment the annotation was
/// applied. Later text edits do not re-validate or shift them; the server
/// sends explicit annotation updates instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub kind: AnnotationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Span whose transcription is still tentative and may be rewritten.
    TranscriptionTentative,
    /// A recognized or in-flight voice intent.
    Intent { status: IntentStatus },
    /// A named entity detected in the transcript.
    Entity { entity_type: EntityType, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    Pending,
    Recognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Name,
}

/// One mutation of the transcript document, as decoded from a server message.
///
/// `id` is the server-assigned action id; `index` is the action's monotonic
/// position in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscribeAction {
    ReplaceText {
        id: String,
        index: u64,
        start: usize,
        end: usize,
        text: String,
    },
    AddAnnotation {
        id: String,
        index: u64,
        annotation: Annotation,
    },
    UpdateAnnotation {
        id: String,
        index: u64,
        annotation: Annotation,
    },
    RemoveAnnotation {
        id: String,
        index: u64,
        annotation_id: String,
    },
}

impl TranscribeAction {
    /// Server-assigned id of this action.
    pub fn id(&self) -> &str {
        match self {
            TranscribeAction::ReplaceText { id, .. }
            | TranscribeAction::AddAnnotation { id, .. }
            | TranscribeAction::UpdateAnnotation { id, .. }
            | TranscribeAction::RemoveAnnotation { id, .. } => id,
        }
    }

    /// Monotonic position of this action in the stream.
    pub fn index(&self) -> u64 {
        match self {
            TranscribeAction::ReplaceText { index, .. }
            | TranscribeAction::AddAnnotation { index, .. }
            | TranscribeAction::UpdateAnnotation { index, .. }
            | TranscribeAction::RemoveAnnotation { index, .. } => *index,
        }
    }
}
