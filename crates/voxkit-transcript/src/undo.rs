use voxkit_foundation::{AnnotationOp, TranscriptError};

use crate::action::TranscribeAction;
use crate::document::DocumentState;

/// An applied action paired with the inverse list that reverts it.
///
/// The inverse is computed against the action's pre-image state and, applied
/// in order, restores that pre-image. Storing inverses up front keeps undo
/// O(actions undone) instead of replaying history from the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoableAction {
    pub original: TranscribeAction,
    pub inverse: Vec<TranscribeAction>,
}

/// Computes inverses for a batch of actions against a pre-image state.
///
/// Stateless; a unit struct so call sites read `UndoableMapper::map(...)`.
pub struct UndoableMapper;

impl UndoableMapper {
    /// Map each action to its undoable form.
    ///
    /// Inverses are computed against the incrementally updated state: the
    /// inverse of the third action sees the effects of the first two. Fails
    /// with `AnnotationNotFound` when a remove or update targets an id the
    /// pre-image does not hold; the caller rejects the whole batch.
    pub fn map(
        pre_state: &DocumentState,
        actions: &[TranscribeAction],
    ) -> Result<Vec<UndoableAction>, TranscriptError> {
        let mut working = pre_state.clone();
        let mut mapped = Vec::with_capacity(actions.len());
        for action in actions {
            let inverse = Self::inverse_of(&working, action)?;
            working.apply_one(action)?;
            mapped.push(UndoableAction {
                original: action.clone(),
                inverse,
            });
        }
        Ok(mapped)
    }

    fn inverse_of(
        state: &DocumentState,
        action: &TranscribeAction,
    ) -> Result<Vec<TranscribeAction>, TranscriptError> {
        match action {
            TranscribeAction::ReplaceText {
                id,
                index,
                start,
                end,
                text,
            } => {
                let original_slice = state.char_slice(*start, *end)?;
                Ok(vec![TranscribeAction::ReplaceText {
                    id: id.clone(),
                    index: *index,
                    start: *start,
                    end: start + text.chars().count(),
                    text: original_slice,
                }])
            }
            TranscribeAction::AddAnnotation { id, index, annotation } => {
                Ok(vec![TranscribeAction::RemoveAnnotation {
                    id: id.clone(),
                    index: *index,
                    annotation_id: annotation.id.clone(),
                }])
            }
            TranscribeAction::RemoveAnnotation {
                id,
                index,
                annotation_id,
            } => {
                let found = state.find_annotation(annotation_id).ok_or_else(|| {
                    TranscriptError::AnnotationNotFound {
                        op: AnnotationOp::Remove,
                        id: annotation_id.clone(),
                    }
                })?;
                Ok(vec![TranscribeAction::AddAnnotation {
                    id: id.clone(),
                    index: *index,
                    annotation: found.clone(),
                }])
            }
            TranscribeAction::UpdateAnnotation { id, index, annotation } => {
                let prior = state.find_annotation(&annotation.id).ok_or_else(|| {
                    TranscriptError::AnnotationNotFound {
                        op: AnnotationOp::Update,
                        id: annotation.id.clone(),
                    }
                })?;
                Ok(vec![
                    TranscribeAction::RemoveAnnotation {
                        id: id.clone(),
                        index: *index,
                        annotation_id: annotation.id.clone(),
                    },
                    TranscribeAction::AddAnnotation {
                        id: id.clone(),
                        index: *index,
                        annotation: prior.clone(),
                    },
                ])
            }
        }
    }
}
