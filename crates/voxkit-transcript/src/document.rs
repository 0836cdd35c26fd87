use voxkit_foundation::TranscriptError;

use crate::action::{Annotation, TranscribeAction};

/// Immutable snapshot of the annotated transcript.
///
/// Character indices throughout this module count Unicode scalar values, not
/// bytes; the same counting applies to server-sent and locally computed
/// ranges. Annotations keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    pub text: String,
    pub annotations: Vec<Annotation>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of actions, producing the post-image state.
    ///
    /// The batch is atomic: on the first failing action the whole call fails
    /// and `self` is unchanged.
    pub fn apply(&self, actions: &[TranscribeAction]) -> Result<DocumentState, TranscriptError> {
        let mut next = self.clone();
        for action in actions {
            next.apply_one(action)?;
        }
        Ok(next)
    }

    pub(crate) fn apply_one(&mut self, action: &TranscribeAction) -> Result<(), TranscriptError> {
        match action {
            TranscribeAction::ReplaceText {
                start, end, text, ..
            } => self.replace_text(*start, *end, text),
            TranscribeAction::AddAnnotation { annotation, .. } => {
                self.annotations.push(annotation.clone());
                Ok(())
            }
            TranscribeAction::UpdateAnnotation { annotation, .. } => {
                // First insertion-order match only; duplicate ids past it are
                // left alone. Absence is not an error at the document level;
                // the undoable mapper rejects it when building history.
                if let Some(slot) = self
                    .annotations
                    .iter_mut()
                    .find(|a| a.id == annotation.id)
                {
                    *slot = annotation.clone();
                }
                Ok(())
            }
            TranscribeAction::RemoveAnnotation { annotation_id, .. } => {
                self.annotations.retain(|a| a.id != *annotation_id);
                Ok(())
            }
        }
    }

    /// Splice `replacement` over the half-open character range `[start, end)`.
    fn replace_text(
        &mut self,
        start: usize,
        end: usize,
        replacement: &str,
    ) -> Result<(), TranscriptError> {
        let (byte_start, byte_end) = self.byte_range(start, end)?;
        let mut next = String::with_capacity(
            self.text.len() - (byte_end - byte_start) + replacement.len(),
        );
        next.push_str(&self.text[..byte_start]);
        next.push_str(replacement);
        next.push_str(&self.text[byte_end..]);
        self.text = next;
        Ok(())
    }

    /// The text currently under `[start, end)`, in characters.
    pub(crate) fn char_slice(&self, start: usize, end: usize) -> Result<String, TranscriptError> {
        let (byte_start, byte_end) = self.byte_range(start, end)?;
        Ok(self.text[byte_start..byte_end].to_string())
    }

    /// First annotation in insertion order with the given id.
    pub(crate) fn find_annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_range(&self, start: usize, end: usize) -> Result<(usize, usize), TranscriptError> {
        let len = self.char_len();
        if start > end || end > len {
            return Err(TranscriptError::IndexOutOfBounds { start, end, len });
        }
        Ok((
            byte_offset(&self.text, start),
            byte_offset(&self.text, end),
        ))
    }
}

/// Byte offset of the `char_idx`-th Unicode scalar value.
///
/// Caller has already bounds-checked `char_idx <= chars().count()`.
fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}
