use voxkit_foundation::TranscriptError;

use crate::action::TranscribeAction;
use crate::document::DocumentState;
use crate::undo::{UndoableAction, UndoableMapper};

/// The versioned transcript: current document state plus undo/redo stacks.
///
/// Values are immutable; every operation returns a new stream. Replaying
/// `history` from an empty document always reproduces `state`.
#[derive(Debug, Clone, Default)]
pub struct TranscribeStream {
    state: DocumentState,
    history: Vec<UndoableAction>,
    undone: Vec<UndoableAction>,
}

impl TranscribeStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn history(&self) -> &[UndoableAction] {
        &self.history
    }

    pub fn undone(&self) -> &[UndoableAction] {
        &self.undone
    }

    /// Apply a batch of server actions atomically.
    ///
    /// On success the batch is appended to history and the redo stack is
    /// cleared. On failure (out-of-bounds edit, unknown annotation id) the
    /// stream is unchanged and the whole batch is rejected.
    pub fn receive_actions(
        &self,
        actions: &[TranscribeAction],
    ) -> Result<TranscribeStream, TranscriptError> {
        let mapped = UndoableMapper::map(&self.state, actions)?;
        let next_state = self.state.apply(actions)?;
        let mut history = self.history.clone();
        history.extend(mapped);
        Ok(TranscribeStream {
            state: next_state,
            history,
            undone: Vec::new(),
        })
    }

    /// Revert the `n` most recent actions, most recent first.
    ///
    /// `n` is clamped to the history length; undoing past the first action
    /// yields the pre-initial document without error. Reverted entries move
    /// to the redo stack.
    pub fn undo_operations(&self, n: usize) -> Result<TranscribeStream, TranscriptError> {
        let count = n.min(self.history.len());
        let mut history = self.history.clone();
        let mut undone = self.undone.clone();
        let mut state = self.state.clone();
        for _ in 0..count {
            let entry = history.pop().expect("count clamped to history length");
            state = state.apply(&entry.inverse)?;
            undone.push(entry);
        }
        Ok(TranscribeStream {
            state,
            history,
            undone,
        })
    }

    /// Re-apply up to `n` undone actions in their original order.
    pub fn redo_operations(&self, n: usize) -> Result<TranscribeStream, TranscriptError> {
        let count = n.min(self.undone.len());
        let mut history = self.history.clone();
        let mut undone = self.undone.clone();
        let mut state = self.state.clone();
        for _ in 0..count {
            let entry = undone.pop().expect("count clamped to undone length");
            state = state.apply(std::slice::from_ref(&entry.original))?;
            history.push(entry);
        }
        Ok(TranscribeStream {
            state,
            history,
            undone,
        })
    }
}
